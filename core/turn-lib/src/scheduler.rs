//! 回合排程
//!
//! - ConstantAttribute: 開場依速度遞增排序，之後輪替佇列
//! - CTB: 依先攻預估值排序，行動越快的角色出現越多次
//! - SideBased: 兩個陣營輪流，陣營內依序行動，可切換角色
use crate::*;

#[derive(
    Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq, Display, EnumIter, EnumString,
)]
pub enum TurnPolicy {
    #[default]
    ConstantAttribute,
    #[serde(rename = "CTB")]
    #[strum(serialize = "CTB")]
    Ctb,
    SideBased,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum SchedulerState {
    #[default]
    Idle,
    Running,
    Halted,
}

/// 預覽佇列中的一格
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnOrderEntry {
    pub combatant: CombatantID,
    pub preview_initiative: Initiative,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub base_cost: i32,
    pub ability_cost: i32,
    pub preview_pool_count: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            base_cost: BASE_COST,
            ability_cost: ABILITY_COST,
            preview_pool_count: PREVIEW_POOL_COUNT,
        }
    }
}

/// 存活戰鬥者的排序快照
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    id: CombatantID,
    initiative: Initiative,
    speed: i32,
}

#[derive(Debug)]
pub struct TurnScheduler {
    policy: TurnPolicy,
    config: SchedulerConfig,
    team_a: Vec<Combatant>,
    team_b: Vec<Combatant>,
    /// 已提交的順序
    turn_order: Vec<TurnOrderEntry>,
    /// 目前顯示的預覽
    preview: Vec<TurnOrderEntry>,
    phase: Team,
    turn_index: usize,
    active: Option<CombatantID>,
    state: SchedulerState,
    events: EventBus<TurnEvent>,
}

impl TurnScheduler {
    pub fn new(
        policy: TurnPolicy,
        config: SchedulerConfig,
        team_a: Vec<Combatant>,
        team_b: Vec<Combatant>,
    ) -> Result<Self, Error> {
        let func = "TurnScheduler::new";
        if config.preview_pool_count == 0 {
            return Err(Error::InvalidParameter {
                func,
                reason: "preview_pool_count 必須大於 0".to_string(),
            });
        }
        let mut scheduler = Self {
            policy,
            config,
            team_a: vec![],
            team_b: vec![],
            turn_order: vec![],
            preview: vec![],
            phase: Team::A,
            turn_index: 0,
            active: None,
            state: SchedulerState::Idle,
            events: EventBus::default(),
        };
        for (team, roster) in [(Team::A, team_a), (Team::B, team_b)] {
            for combatant in roster {
                scheduler.insert(team, combatant, func)?;
            }
        }
        Ok(scheduler)
    }

    fn insert(
        &mut self,
        team: Team,
        mut combatant: Combatant,
        func: &'static str,
    ) -> Result<(), Error> {
        if self.combatant(combatant.id).is_some() {
            return Err(Error::DuplicateCombatant {
                func,
                id: combatant.id,
            });
        }
        combatant.team = team;
        combatant.is_active = false;
        match team {
            Team::A => self.team_a.push(combatant),
            Team::B => self.team_b.push(combatant),
        }
        Ok(())
    }

    pub fn policy(&self) -> TurnPolicy {
        self.policy
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// SideBased 目前行動的陣營
    pub fn phase(&self) -> Team {
        self.phase
    }

    pub fn turn_index(&self) -> usize {
        self.turn_index
    }

    pub fn active_id(&self) -> Option<CombatantID> {
        self.active
    }

    pub fn active(&self) -> Option<&Combatant> {
        self.active.and_then(|id| self.combatant(id))
    }

    pub fn active_mut(&mut self) -> Option<&mut Combatant> {
        let id = self.active?;
        self.combatant_mut(id)
    }

    pub fn team(&self, team: Team) -> &[Combatant] {
        match team {
            Team::A => &self.team_a,
            Team::B => &self.team_b,
        }
    }

    pub fn combatants(&self) -> impl Iterator<Item = &Combatant> {
        self.team_a.iter().chain(self.team_b.iter())
    }

    pub fn combatant(&self, id: CombatantID) -> Option<&Combatant> {
        self.combatants().find(|c| c.id == id)
    }

    pub fn combatant_mut(&mut self, id: CombatantID) -> Option<&mut Combatant> {
        self.team_a
            .iter_mut()
            .chain(self.team_b.iter_mut())
            .find(|c| c.id == id)
    }

    pub fn turn_order(&self) -> &[TurnOrderEntry] {
        &self.turn_order
    }

    pub fn preview(&self) -> &[TurnOrderEntry] {
        &self.preview
    }

    pub fn events(&self) -> &EventBus<TurnEvent> {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus<TurnEvent> {
        &mut self.events
    }

    pub fn has_alive(&self) -> bool {
        self.combatants().any(|c| c.is_alive)
    }

    pub fn team_has_alive(&self, team: Team) -> bool {
        self.team(team).iter().any(|c| c.is_alive)
    }

    fn alive_ids(&self, team: Team) -> Vec<CombatantID> {
        self.team(team)
            .iter()
            .filter(|c| c.is_alive)
            .map(|c| c.id)
            .collect()
    }

    /// 存活者，A 陣營在前
    fn alive_snapshot(&self) -> Vec<Snapshot> {
        self.combatants()
            .filter(|c| c.is_alive)
            .map(|c| Snapshot {
                id: c.id,
                initiative: c.initiative,
                speed: c.speed(),
            })
            .collect()
    }

    /// 開始關卡，決定第一位行動者
    pub fn start_level(&mut self) {
        if !self.has_alive() {
            self.halt();
            return;
        }
        self.state = SchedulerState::Running;
        match self.policy {
            TurnPolicy::SideBased => {
                self.phase = Team::A;
                self.turn_index = 0;
                self.start_next_side_turn();
            }
            TurnPolicy::ConstantAttribute | TurnPolicy::Ctb => {
                self.publish_order(true);
                if !self.begin_active_turn() {
                    self.end_turn();
                }
            }
        }
    }

    /// 結束目前行動者的回合並推進到下一位存活者
    pub fn end_turn(&mut self) {
        if self.state != SchedulerState::Running {
            return;
        }
        match self.policy {
            TurnPolicy::SideBased => self.end_side_turn(),
            TurnPolicy::ConstantAttribute | TurnPolicy::Ctb => self.end_ordered_turn(),
        }
    }

    fn end_ordered_turn(&mut self) {
        // 最多繞佇列與名單一圈
        let mut remaining = self.turn_order.len() + self.team_a.len() + self.team_b.len();
        loop {
            self.finalize_turn();
            self.publish_order(false);
            for c in self.team_a.iter_mut().chain(self.team_b.iter_mut()) {
                c.is_active = false;
            }
            if !self.has_alive() {
                self.halt();
                return;
            }
            if self.begin_active_turn() {
                return;
            }
            remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                log::warn!("找不到可行動的戰鬥者，停止排程");
                self.halt();
                return;
            }
        }
    }

    fn end_side_turn(&mut self) {
        let acted = self.active;
        self.finalize_turn();
        if let Some(c) = self.active_mut() {
            c.is_active = false;
        }
        // 以完整名單定位剛行動的角色，行動期間隊友倒下也不會跳過後面的人
        let roster = self.team(self.phase);
        let next = match acted.and_then(|id| roster.iter().position(|c| c.id == id)) {
            Some(pos) => roster[..=pos].iter().filter(|c| c.is_alive).count(),
            None => self.turn_index + 1,
        };
        self.turn_index = next;
        self.start_next_side_turn();
    }

    /// 選出 SideBased 下一位行動者；陣營輪完時換邊，對方已無存活者則停止
    fn start_next_side_turn(&mut self) {
        let mut remaining = 2 * (self.team_a.len() + self.team_b.len()) + 2;
        loop {
            remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                log::warn!("找不到可行動的戰鬥者，停止排程");
                self.halt();
                return;
            }

            let team = self.alive_ids(self.phase);
            if self.turn_index >= team.len() {
                let next = self.phase.other();
                if !self.team_has_alive(next) {
                    log::info!("陣營 {next} 已無存活者");
                    self.halt();
                    return;
                }
                self.phase = next;
                self.turn_index = 0;
                continue;
            }

            self.active = Some(team[self.turn_index]);
            if self.begin_active_turn() {
                return;
            }
            // 死於持續效果，存活名單縮短，同一個 index 即為下一位
        }
    }

    /// 啟動行動者的回合：結算效果、重置行動、推進技能冷卻
    fn begin_active_turn(&mut self) -> bool {
        let Some(id) = self.active else {
            return false;
        };
        // (開始行動, 這次結算效果時倒下)
        let (started, died) = match self.combatant_mut(id) {
            Some(c) if c.is_alive => {
                c.is_active = true;
                c.apply_effects();
                if c.is_alive {
                    c.start_turn();
                    c.tick_abilities();
                    (true, false)
                } else {
                    (false, true)
                }
            }
            _ => (false, false),
        };
        if started {
            log::debug!("{id} 開始行動");
            self.events.publish(TurnEvent::NewActiveCombatant(id));
        } else if died {
            self.events.publish(TurnEvent::CombatantDefeated(id));
        }
        started
    }

    /// 附加地形效果並推進先攻
    fn finalize_turn(&mut self) {
        let base_cost = self.config.base_cost;
        if let Some(c) = self.active_mut() {
            if !c.is_alive {
                return;
            }
            if let Some(effect) = c.tile_effect.clone() {
                c.attach_effect(effect);
            }
            c.update_initiative(base_cost);
        }
    }

    fn halt(&mut self) {
        if self.state == SchedulerState::Halted {
            return;
        }
        self.state = SchedulerState::Halted;
        self.active = None;
        for c in self.team_a.iter_mut().chain(self.team_b.iter_mut()) {
            c.is_active = false;
        }
        self.events.publish(TurnEvent::SchedulingHalted);
    }

    fn publish_order(&mut self, update_list_size: bool) {
        self.sort_turn_order(update_list_size);
        let ids = Self::ids(&self.turn_order);
        self.events.publish(TurnEvent::TurnOrderSet(ids));
    }

    fn ids(entries: &[TurnOrderEntry]) -> Vec<CombatantID> {
        entries.iter().map(|e| e.combatant).collect()
    }

    /// 重新計算已提交的順序與預覽；行動者為佇列開頭
    fn sort_turn_order(&mut self, update_list_size: bool) {
        let pool = self.config.preview_pool_count;
        let base_cost = self.config.base_cost;
        match self.policy {
            TurnPolicy::ConstantAttribute => {
                if update_list_size {
                    let combined = self.alive_snapshot();
                    let mut seeded = combined.clone();
                    seeded.sort_by_key(|s| s.speed);
                    let mut order: Vec<_> = seeded
                        .iter()
                        .map(|s| TurnOrderEntry {
                            combatant: s.id,
                            preview_initiative: s.initiative,
                        })
                        .collect();
                    let mut multiplier = 0;
                    while !combined.is_empty() && order.len() < pool {
                        for s in &combined {
                            order.push(TurnOrderEntry {
                                combatant: s.id,
                                preview_initiative: s.initiative * multiplier,
                            });
                        }
                        multiplier += 1;
                    }
                    self.turn_order = order;
                } else if !self.turn_order.is_empty() {
                    self.turn_order.rotate_left(1);
                }
            }
            TurnPolicy::Ctb => {
                // 保持名單順序，同分時 A 陣營在前
                let combined = self.alive_snapshot();
                let step = |s: &Snapshot| base_cost / s.speed;
                let mut order: Vec<_> = combined
                    .iter()
                    .map(|s| TurnOrderEntry {
                        combatant: s.id,
                        preview_initiative: s.initiative + step(s),
                    })
                    .collect();
                let mut multiplier = 2;
                while !combined.is_empty() && order.len() < pool {
                    for s in &combined {
                        order.push(TurnOrderEntry {
                            combatant: s.id,
                            preview_initiative: s.initiative + step(s) * multiplier,
                        });
                    }
                    multiplier += 1;
                }
                order.sort_by_key(|e| e.preview_initiative);
                self.turn_order = order;
            }
            TurnPolicy::SideBased => self.turn_order.clear(),
        }
        if self.policy != TurnPolicy::SideBased {
            self.active = self.turn_order.first().map(|e| e.combatant);
        }
        self.preview = self.turn_order.clone();
    }

    /// 預覽行動成本對順序的影響：行動者除了第一次出現外，其餘項目加上 `cost / speed`
    pub fn update_preview_for_action(&mut self, cost: i32) {
        let Some(id) = self.active else {
            return;
        };
        let Some(speed) = self.combatant(id).map(|c| c.speed()) else {
            return;
        };
        let mut updated = self.turn_order.clone();
        for entry in updated.iter_mut().filter(|e| e.combatant == id).skip(1) {
            entry.preview_initiative += cost / speed;
        }
        updated.sort_by_key(|e| e.preview_initiative);
        self.preview = updated;
        self.events
            .publish(TurnEvent::TurnPreviewSet(Self::ids(&self.preview)));
    }

    /// 提交預覽
    pub fn action_completed(&mut self) {
        self.turn_order = self.preview.clone();
        self.events
            .publish(TurnEvent::TurnOrderSet(Self::ids(&self.turn_order)));
    }

    /// 捨棄預覽，回到已提交的順序
    pub fn undo_preview(&mut self) {
        self.preview = self.turn_order.clone();
        self.events
            .publish(TurnEvent::TurnOrderSet(Self::ids(&self.turn_order)));
    }

    /// SideBased 時切換到同陣營下一位存活者；不會重新結算效果或冷卻
    pub fn switch_character(&mut self) -> Option<CombatantID> {
        if self.policy != TurnPolicy::SideBased || self.state != SchedulerState::Running {
            return None;
        }
        let team = self.alive_ids(self.phase);
        if team.len() <= 1 {
            return None;
        }
        if let Some(c) = self.active_mut() {
            c.is_active = false;
        }
        self.turn_index = (self.turn_index + 1) % team.len();
        let id = team[self.turn_index];
        self.active = Some(id);
        if let Some(c) = self.combatant_mut(id) {
            c.is_active = true;
            c.start_turn();
        }
        self.events.publish(TurnEvent::NewActiveCombatant(id));
        Some(id)
    }

    /// 關卡中加入新戰鬥者（A 陣營）
    ///
    /// 目前行動者不變；新的順序在下一次 `flush_events` 時送出。
    pub fn spawn_combatant(&mut self, combatant: Combatant) -> Result<(), Error> {
        let id = combatant.id;
        self.insert(Team::A, combatant, "TurnScheduler::spawn_combatant")?;
        if self.state != SchedulerState::Running {
            return Ok(());
        }
        let previous = self.active;
        self.sort_turn_order(true);
        if self.policy != TurnPolicy::SideBased {
            // 保留行動者，將它移到佇列開頭
            if let Some(active) = previous {
                if let Some(pos) = self.turn_order.iter().position(|e| e.combatant == active) {
                    let entry = self.turn_order.remove(pos);
                    self.turn_order.insert(0, entry);
                }
                self.preview = self.turn_order.clone();
            }
            self.active = previous;
        }
        log::debug!("{id} 加入戰鬥");
        self.events
            .defer(TurnEvent::TurnOrderSet(Self::ids(&self.turn_order)));
        Ok(())
    }

    /// 送出延後的事件
    pub fn flush_events(&mut self) -> usize {
        self.events.flush()
    }
}
