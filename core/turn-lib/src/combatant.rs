use crate::*;
use std::collections::BTreeMap;

/// 持續效果，每回合開始時結算一次
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Effect {
    pub name: String,
    /// 剩餘回合數；0 代表立即生效、不會附加
    pub duration: u32,
    pub health_per_turn: i32,
    pub mana_per_turn: i32,
    pub speed_modifier: i32,
}

impl Effect {
    pub fn is_instant(&self) -> bool {
        self.duration == 0
    }
}

/// 戰鬥者的基礎數值
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CombatantTemplate {
    pub name: String,
    pub max_hp: i32,
    pub max_mp: i32,
    pub speed: i32,
    /// 單位：格
    pub move_range: f32,
    pub sprint_range: f32,
    pub abilities: Vec<AbilityName>,
}

impl Default for CombatantTemplate {
    fn default() -> Self {
        Self {
            name: String::new(),
            max_hp: 10,
            max_mp: 10,
            speed: 1,
            move_range: 3.0,
            sprint_range: 6.0,
            abilities: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Combatant {
    pub id: CombatantID,
    pub name: String,
    pub team: Team,
    pub hp: i32,
    pub max_hp: i32,
    pub mp: i32,
    pub max_mp: i32,
    pub base_speed: i32,
    pub initiative: Initiative,
    pub move_range: f32,
    pub sprint_range: f32,
    pub is_alive: bool,
    pub is_active: bool,
    pub has_moved: bool,
    pub has_cast_ability: bool,
    pub effects: Vec<Effect>,
    pub abilities: Vec<AbilitySlot>,
    /// 目前所站格子的地形效果，回合結束時附加
    pub tile_effect: Option<Effect>,
}

impl Combatant {
    pub fn new(id: CombatantID, name: impl Into<String>, team: Team, speed: i32) -> Self {
        let template = CombatantTemplate {
            name: name.into(),
            speed,
            ..Default::default()
        };
        Self::with_abilities(id, team, &template, vec![])
    }

    /// 依模板建立，技能名稱必須都在技能表中
    pub fn from_template(
        id: CombatantID,
        team: Team,
        template: &CombatantTemplate,
        ability_table: &BTreeMap<AbilityName, Ability>,
    ) -> Result<Self, Error> {
        let func = "Combatant::from_template";
        let abilities = template
            .abilities
            .iter()
            .map(|name| {
                ability_table
                    .get(name)
                    .cloned()
                    .map(AbilitySlot::new)
                    .ok_or_else(|| Error::AbilityNotFound {
                        func,
                        combatant: id,
                        ability: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::with_abilities(id, team, template, abilities))
    }

    fn with_abilities(
        id: CombatantID,
        team: Team,
        template: &CombatantTemplate,
        abilities: Vec<AbilitySlot>,
    ) -> Self {
        Self {
            id,
            name: template.name.clone(),
            team,
            hp: template.max_hp,
            max_hp: template.max_hp,
            mp: template.max_mp,
            max_mp: template.max_mp,
            base_speed: template.speed,
            initiative: 0,
            move_range: template.move_range,
            sprint_range: template.sprint_range,
            is_alive: template.max_hp > 0,
            is_active: false,
            has_moved: false,
            has_cast_ability: false,
            effects: vec![],
            abilities,
            tile_effect: None,
        }
    }

    /// 含效果修正的速度，至少為 1
    pub fn speed(&self) -> i32 {
        let modifier: i32 = self.effects.iter().map(|e| e.speed_modifier).sum();
        (self.base_speed + modifier).max(1)
    }

    /// 先攻推進 `cost / speed`（整數除法）
    pub fn update_initiative(&mut self, cost: i32) {
        self.initiative += cost / self.speed();
    }

    pub fn take_damage(&mut self, amount: i32) {
        if !self.is_alive {
            return;
        }
        self.hp = (self.hp - amount).max(0);
        if self.hp == 0 {
            self.is_alive = false;
            self.is_active = false;
            log::info!("{} ({}) 倒下", self.name, self.id);
        }
    }

    pub fn heal(&mut self, amount: i32) {
        if !self.is_alive {
            return;
        }
        self.hp = (self.hp + amount).min(self.max_hp);
    }

    pub fn update_mana(&mut self, cost: i32) {
        self.mp = (self.mp - cost).clamp(0, self.max_mp);
    }

    /// 同名效果會被刷新而非疊加
    pub fn attach_effect(&mut self, effect: Effect) {
        match self.effects.iter_mut().find(|e| e.name == effect.name) {
            Some(existing) => *existing = effect,
            None => self.effects.push(effect),
        }
    }

    /// 立即結算一次效果，不附加
    pub fn apply_single_effect(&mut self, effect: &Effect) {
        self.apply_delta(effect.health_per_turn, effect.mana_per_turn);
    }

    /// 結算所有附加效果並扣除剩餘回合，到期的移除
    pub fn apply_effects(&mut self) {
        let deltas: Vec<_> = self
            .effects
            .iter()
            .map(|e| (e.health_per_turn, e.mana_per_turn))
            .collect();
        for (health, mana) in deltas {
            self.apply_delta(health, mana);
        }
        for effect in self.effects.iter_mut() {
            effect.duration = effect.duration.saturating_sub(1);
        }
        self.effects.retain(|e| e.duration > 0);
    }

    fn apply_delta(&mut self, health: i32, mana: i32) {
        match health {
            h if h < 0 => self.take_damage(-h),
            h if h > 0 => self.heal(h),
            _ => {}
        }
        if self.is_alive {
            self.mp = (self.mp + mana).clamp(0, self.max_mp);
        }
    }

    /// 回合開始時重置行動紀錄
    pub fn start_turn(&mut self) {
        self.has_moved = false;
        self.has_cast_ability = false;
    }

    /// 每個真正的回合開始時，所有技能冷卻計數 +1
    pub fn tick_abilities(&mut self) {
        for slot in self.abilities.iter_mut() {
            slot.turns_since_used = slot.turns_since_used.saturating_add(1);
        }
    }

    pub fn ability(&self, name: &str) -> Option<&AbilitySlot> {
        self.abilities.iter().find(|s| s.ability.name == name)
    }

    pub fn ability_mut(&mut self, name: &str) -> Option<&mut AbilitySlot> {
        self.abilities.iter_mut().find(|s| s.ability.name == name)
    }
}
