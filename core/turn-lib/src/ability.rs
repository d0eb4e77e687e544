//! 技能定義與施放
use crate::*;

/// 技能可作用的對象
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq, Display, EnumIter)]
pub enum AbilityKind {
    /// 同陣營（治療）
    Ally,
    /// 不同陣營（傷害）
    #[default]
    Enemy,
    /// 所有人（傷害）
    All,
}

impl AbilityKind {
    pub fn accepts(self, caster: Team, target: Team) -> bool {
        match self {
            AbilityKind::Ally => caster == target,
            AbilityKind::Enemy => caster != target,
            AbilityKind::All => true,
        }
    }
}

/// 技能範圍形狀，實際格子由地圖層計算
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq)]
#[serde(tag = "type")]
pub enum AbilityShape {
    #[default]
    Single,
    Radius {
        radius: i32,
    },
    Cone {
        range: i32,
        angle: f32,
    },
    Line {
        length: u32,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Ability {
    pub name: AbilityName,
    /// 魔力消耗
    pub cost: i32,
    /// 傷害或治療量
    pub value: i32,
    pub kind: AbilityKind,
    /// 使用後需經過的回合數
    pub cooldown: u32,
    pub requires_target: bool,
    /// 單位：格
    pub range: f32,
    pub shape: AbilityShape,
    pub include_origin: bool,
    pub effects: Vec<Effect>,
}

impl Default for Ability {
    fn default() -> Self {
        Self {
            name: String::new(),
            cost: 0,
            value: 0,
            kind: AbilityKind::Enemy,
            cooldown: 0,
            requires_target: true,
            range: 1.0,
            shape: AbilityShape::Single,
            include_origin: false,
            effects: vec![],
        }
    }
}

impl Ability {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbilitySlot {
    pub ability: Ability,
    pub turns_since_used: u32,
}

impl AbilitySlot {
    /// 新取得的技能可以立即使用
    pub fn new(ability: Ability) -> Self {
        let turns_since_used = ability.cooldown;
        Self {
            ability,
            turns_since_used,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.turns_since_used >= self.ability.cooldown
    }

    pub fn remaining_cooldown(&self) -> u32 {
        self.ability.cooldown.saturating_sub(self.turns_since_used)
    }
}

/// 施放結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CastReport {
    pub caster: CombatantID,
    pub ability: AbilityName,
    pub targets: Vec<CombatantID>,
    pub defeated: Vec<CombatantID>,
}

impl TurnScheduler {
    /// 檢查行動中的戰鬥者能否施放，回傳技能副本
    pub fn usable_ability(&self, name: &str) -> Result<Ability, Error> {
        let func = "TurnScheduler::usable_ability";
        let caster_id = self.active_id().ok_or(Error::NoActiveCombatant { func })?;
        let caster = self
            .combatant(caster_id)
            .ok_or(Error::CombatantNotFound { func, id: caster_id })?;
        let slot = caster.ability(name).ok_or_else(|| Error::AbilityNotFound {
            func,
            combatant: caster_id,
            ability: name.to_string(),
        })?;
        if !slot.is_ready() {
            return Err(Error::AbilityOnCooldown {
                func,
                ability: name.to_string(),
                remaining: slot.remaining_cooldown(),
            });
        }
        if slot.ability.cost > caster.mp {
            return Err(Error::NotEnoughMana {
                func,
                ability: name.to_string(),
                cost: slot.ability.cost,
                mana: caster.mp,
            });
        }
        Ok(slot.ability.clone())
    }

    /// 預覽施放後的回合順序；無法施放時不變更預覽
    pub fn preview_ability(&mut self, name: &str) -> Result<(), Error> {
        self.usable_ability(name)?;
        let cost = self.config().ability_cost;
        self.update_preview_for_action(cost);
        Ok(())
    }

    /// 對候選目標施放技能
    ///
    /// 候選目標依技能種類過濾，死亡者與重複者略過。成功後重置冷卻、
    /// 推進先攻、扣除魔力並提交預覽。
    pub fn cast_ability(
        &mut self,
        name: &str,
        candidates: &[CombatantID],
    ) -> Result<CastReport, Error> {
        let func = "TurnScheduler::cast_ability";
        let ability = self.usable_ability(name)?;
        let caster_id = self.active_id().ok_or(Error::NoActiveCombatant { func })?;
        let caster_team = self
            .combatant(caster_id)
            .map(|c| c.team)
            .ok_or(Error::CombatantNotFound { func, id: caster_id })?;

        let mut targets: Vec<CombatantID> = vec![];
        for id in candidates {
            let Some(target) = self.combatant(*id) else {
                continue;
            };
            if target.is_alive && ability.kind.accepts(caster_team, target.team) && !targets.contains(id)
            {
                targets.push(*id);
            }
        }
        if ability.requires_target && targets.is_empty() {
            return Err(Error::NoValidTarget {
                func,
                ability: ability.name,
            });
        }

        let mut defeated = vec![];
        for id in &targets {
            let Some(target) = self.combatant_mut(*id) else {
                continue;
            };
            for effect in &ability.effects {
                if effect.is_instant() {
                    target.apply_single_effect(effect);
                } else {
                    target.attach_effect(effect.clone());
                }
            }
            match ability.kind {
                AbilityKind::Ally => target.heal(ability.value),
                AbilityKind::Enemy | AbilityKind::All => target.take_damage(ability.value),
            }
            if !target.is_alive {
                defeated.push(*id);
            }
        }

        let ability_cost = self.config().ability_cost;
        if let Some(caster) = self.combatant_mut(caster_id) {
            if let Some(slot) = caster.ability_mut(&ability.name) {
                slot.turns_since_used = 0;
            }
            caster.update_initiative(ability_cost);
            caster.update_mana(ability.cost);
            caster.has_cast_ability = true;
        }

        log::debug!(
            "{caster_id} 施放 {}，目標 {targets:?}，倒下 {defeated:?}",
            ability.name
        );
        self.events_mut().publish(TurnEvent::AbilityUsed {
            caster: caster_id,
            ability: ability.name.clone(),
            targets: targets.clone(),
        });
        for id in &defeated {
            self.events_mut().publish(TurnEvent::CombatantDefeated(*id));
        }
        self.action_completed();

        Ok(CastReport {
            caster: caster_id,
            ability: ability.name,
            targets,
            defeated,
        })
    }
}
