//! 關卡狀態
//!
//! 擁有地圖、座標轉換、戰鬥者位置、地形效果、噪音監聽者與回合排程，
//! 所有查詢與操作都透過這個物件進行，沒有全域狀態。

use crate::config::SessionConfig;
use crate::error::{Context, Error, LoadError, Result, SessionError};
use crate::registry::{Capability, CapabilityRegistry};
use grid_lib::{
    BoundaryEdge, Cell, Coord, CoverIndicator, GridMap, GridMapper, MAX_SEARCH_RADIUS,
    MoveableArea, NoiseHeard, NoiseListener, NoiseRegistry, NoiseSettings, Point, boundary_edges,
    cone_cells, cover_indicators, find_path, find_unexplored_area, has_line_of_sight, line_cells,
    Walkability, load_from_ascii, nearest_walkable, radius_cells,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use turn_lib::{
    Ability, AbilityName, AbilityShape, CastReport, Combatant, CombatantID, CombatantTemplate,
    Effect, EventBus, Team, TurnScheduler,
};

/// 關卡層的事件，回合相關事件在 `TurnScheduler` 的匯流排上
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    CombatantMoved {
        combatant: CombatantID,
        from: Cell,
        to: Cell,
        path: Vec<Cell>,
        sprinted: bool,
    },
    NoiseHeard(NoiseHeard),
    CombatantSpawned {
        combatant: CombatantID,
        cell: Cell,
    },
}

#[derive(Debug)]
pub struct Session {
    mapper: GridMapper,
    map: GridMap,
    abilities: BTreeMap<AbilityName, Ability>,
    scheduler: TurnScheduler,
    positions: BTreeMap<CombatantID, Cell>,
    tile_effects: BTreeMap<Cell, Effect>,
    noise: NoiseRegistry,
    default_noise: NoiseSettings,
    registry: CapabilityRegistry,
    events: EventBus<SessionEvent>,
}

/// 依 `cell` 或標記決定位置；同一個標記依序分配給不同的實體
fn resolve_cell<'a>(
    markers: &HashMap<String, Vec<Cell>>,
    usage: &mut HashMap<&'a str, usize>,
    marker: Option<&'a str>,
    cell: Option<Cell>,
) -> Result<Option<Cell>> {
    if let Some(cell) = cell {
        return Ok(Some(cell));
    }
    let Some(marker) = marker else {
        return Ok(None);
    };
    let index = usage.entry(marker).or_insert(0);
    let cell = markers
        .get(marker)
        .and_then(|cells| cells.get(*index))
        .copied()
        .ok_or_else(|| LoadError::MarkerNotFound {
            marker: marker.to_string(),
        })?;
    *index += 1;
    Ok(Some(cell))
}

fn invalid_placement(id: u64, cell: Cell, reason: &str) -> LoadError {
    LoadError::InvalidPlacement {
        id,
        x: cell.x,
        y: cell.y,
        reason: reason.to_string(),
    }
}

impl Session {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = SessionConfig::from_path(path)?;
        Self::from_config(&config).context(format!("載入場景 {}", path.display()))
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let mapper = GridMapper::new(config.grid.origin, config.grid.cell_size)?;
        let (map, markers) = load_from_ascii(&config.grid.map)?;
        let mut usage = HashMap::new();

        let mut abilities = BTreeMap::new();
        for ability in &config.abilities {
            if abilities
                .insert(ability.name.clone(), ability.clone())
                .is_some()
            {
                return Err(LoadError::DuplicateAbility {
                    name: ability.name.clone(),
                }
                .into());
            }
        }

        let mut tile_effects = BTreeMap::new();
        for entry in &config.tile_effects {
            let mut cells = entry.cells.clone();
            if let Some(marker) = &entry.marker {
                let marked = markers.get(marker).ok_or_else(|| LoadError::MarkerNotFound {
                    marker: marker.clone(),
                })?;
                cells.extend(marked);
            }
            for cell in cells {
                tile_effects.insert(cell, entry.effect.clone());
            }
        }

        let mut registry = CapabilityRegistry::default();
        let mut positions = BTreeMap::new();
        let (mut team_a, mut team_b) = (vec![], vec![]);
        for entry in &config.combatants {
            let id = entry.id;
            if registry.contains(id) {
                return Err(LoadError::DuplicateEntity { id }.into());
            }
            let cell = resolve_cell(&markers, &mut usage, entry.marker.as_deref(), entry.cell)?
                .ok_or_else(|| invalid_placement(id, Cell::default(), "沒有指定位置"))?;
            if !map.is_walkable(cell) {
                return Err(invalid_placement(id, cell, "不可通行").into());
            }
            if positions.values().any(|c| *c == cell) {
                return Err(invalid_placement(id, cell, "已被佔據").into());
            }

            let mut combatant = Combatant::from_template(id, entry.team, &entry.stats, &abilities)
                .map_err(Error::from)
                .context(format!("建立戰鬥者 {id}"))?;
            combatant.tile_effect = tile_effects.get(&cell).cloned();
            positions.insert(id, cell);
            registry.insert(id, Capability::Combatant);
            match entry.team {
                Team::A => {
                    registry.insert(id, Capability::Selectable);
                    team_a.push(combatant);
                }
                Team::B => team_b.push(combatant),
            }
        }

        let scheduler = TurnScheduler::new(
            config.scheduler.policy,
            config.scheduler.settings(),
            team_a,
            team_b,
        )?;

        config
            .noise
            .validate()
            .map_err(Error::from)
            .context("場景預設噪音參數")?;
        let mut noise = NoiseRegistry::default();
        for entry in &config.noise_listeners {
            let id = entry.id;
            let follows = registry.has(id, Capability::Combatant);
            if registry.has(id, Capability::NoiseListener) || (!follows && registry.contains(id)) {
                return Err(LoadError::DuplicateEntity { id }.into());
            }
            let explicit = resolve_cell(&markers, &mut usage, entry.marker.as_deref(), entry.cell)?;
            let cell = match (explicit, follows) {
                (None, true) => positions
                    .get(&id)
                    .copied()
                    .ok_or_else(|| invalid_placement(id, Cell::default(), "找不到戰鬥者"))?,
                (Some(cell), true) => {
                    return Err(invalid_placement(id, cell, "跟隨戰鬥者的監聽者不能指定位置").into());
                }
                (Some(cell), false) => cell,
                (None, false) => {
                    return Err(invalid_placement(id, Cell::default(), "沒有指定位置").into());
                }
            };
            if !map.contains(cell) {
                return Err(invalid_placement(id, cell, "超出地圖").into());
            }
            noise.register(
                cell,
                NoiseListener {
                    id,
                    threshold: entry.threshold,
                },
            )?;
            registry.insert(id, Capability::NoiseListener);
        }

        log::info!(
            "關卡載入完成：{}x{}，{} 個實體，{} 位戰鬥者，{} 個噪音監聽者",
            map.width,
            map.height,
            registry.len(),
            positions.len(),
            noise.len()
        );

        Ok(Self {
            mapper,
            map,
            abilities,
            scheduler,
            positions,
            tile_effects,
            noise,
            default_noise: config.noise,
            registry,
            events: EventBus::default(),
        })
    }

    pub fn mapper(&self) -> &GridMapper {
        &self.mapper
    }

    pub fn map(&self) -> &GridMap {
        &self.map
    }

    pub fn scheduler(&self) -> &TurnScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut TurnScheduler {
        &mut self.scheduler
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn noise(&self) -> &NoiseRegistry {
        &self.noise
    }

    pub fn events_mut(&mut self) -> &mut EventBus<SessionEvent> {
        &mut self.events
    }

    pub fn position_of(&self, id: CombatantID) -> Option<Cell> {
        self.positions.get(&id).copied()
    }

    pub fn tile_effect_at(&self, cell: Cell) -> Option<&Effect> {
        self.tile_effects.get(&cell)
    }

    /// 站在格子上的存活戰鬥者
    pub fn occupant_at(&self, cell: Cell) -> Option<CombatantID> {
        self.positions
            .iter()
            .filter(|(_, c)| **c == cell)
            .map(|(id, _)| *id)
            .find(|id| self.scheduler.combatant(*id).is_some_and(|c| c.is_alive))
    }

    /// 地圖可通行，且沒有其他存活戰鬥者佔據（行動者自己的位置可通行）
    pub fn walkable(&self, cell: Cell) -> bool {
        if !self.map.is_walkable(cell) {
            return false;
        }
        match self.occupant_at(cell) {
            None => true,
            Some(id) => Some(id) == self.scheduler.active_id(),
        }
    }

    fn active_position(&self) -> Result<(CombatantID, Cell)> {
        let id = self
            .scheduler
            .active_id()
            .ok_or(SessionError::NoActiveCombatant)?;
        let cell = self
            .position_of(id)
            .ok_or(SessionError::PositionNotFound { id })?;
        Ok((id, cell))
    }

    pub fn start(&mut self) {
        self.scheduler.start_level();
    }

    pub fn end_turn(&mut self) {
        self.scheduler.end_turn();
    }

    /// 送出所有延後的事件
    pub fn tick(&mut self) -> usize {
        self.events.flush() + self.scheduler.flush_events()
    }

    pub fn moveable_area(&self) -> Result<MoveableArea> {
        let (id, origin) = self.active_position()?;
        let combatant = self
            .scheduler
            .combatant(id)
            .ok_or(SessionError::NoActiveCombatant)?;
        Ok(MoveableArea::compute(
            origin,
            combatant.move_range,
            combatant.sprint_range,
            &|cell: Cell| self.walkable(cell),
        ))
    }

    /// 步行範圍與衝刺範圍的外框
    pub fn moveable_outline(&self) -> Result<(Vec<BoundaryEdge>, Vec<BoundaryEdge>)> {
        let area = self.moveable_area()?;
        let walk = boundary_edges(&area.walkable, &BTreeSet::new());
        let sprint = boundary_edges(&area.sprintable, &BTreeSet::new());
        Ok((walk, sprint))
    }

    /// 行動者沿 A* 路徑移動，回傳路徑（不含起點）
    pub fn move_active(&mut self, to: Cell) -> Result<Vec<Cell>> {
        let (id, from) = self.active_position()?;
        if from == to {
            return Ok(vec![]);
        }
        if self.scheduler.combatant(id).is_some_and(|c| c.has_moved) {
            return Err(SessionError::AlreadyMoved { id }.into());
        }
        let area = self.moveable_area()?;
        if !area.can_sprint_to(to) {
            return Err(SessionError::OutOfReach { x: to.x, y: to.y }.into());
        }
        let path = find_path(from, to, &|cell: Cell| self.walkable(cell))
            .ok_or(SessionError::NoPath { x: to.x, y: to.y })?;

        if self.registry.has(id, Capability::NoiseListener) {
            self.noise.move_listener(from, to)?;
        }
        let sprinted = !area.can_move_to(to);
        self.positions.insert(id, to);
        let tile_effect = self.tile_effects.get(&to).cloned();
        if let Some(combatant) = self.scheduler.combatant_mut(id) {
            combatant.has_moved = true;
            combatant.tile_effect = tile_effect;
        }

        log::debug!("{id} 移動 {from:?} -> {to:?}，{} 步", path.len());
        self.events.publish(SessionEvent::CombatantMoved {
            combatant: id,
            from,
            to,
            path: path.clone(),
            sprinted,
        });
        Ok(path)
    }

    /// 只有牆壁會遮擋視線
    pub fn line_of_sight(&self, from: Cell, to: Cell) -> bool {
        has_line_of_sight(from, to, &self.map)
    }

    pub fn cover_around_active(&self, range: Coord) -> Result<Vec<CoverIndicator>> {
        let (_, center) = self.active_position()?;
        Ok(cover_indicators(
            center,
            range,
            &|cell: Cell| self.walkable(cell),
            |cell| self.map.walls.contains(&cell),
        ))
    }

    /// 行動者移動範圍內最少造訪的位置
    pub fn unexplored_target(&self, recent: &[Cell]) -> Result<Option<Cell>> {
        let (id, origin) = self.active_position()?;
        let range = self
            .scheduler
            .combatant(id)
            .map_or(0.0, |c| c.move_range);
        Ok(find_unexplored_area(origin, range, recent, &|cell: Cell| {
            self.walkable(cell)
        }))
    }

    pub fn emit_noise(&mut self, origin: Cell, settings: NoiseSettings) -> Result<Vec<NoiseHeard>> {
        let heard = self.noise.emit(origin, settings)?;
        for notification in &heard {
            self.events.publish(SessionEvent::NoiseHeard(*notification));
        }
        Ok(heard)
    }

    /// 以場景預設參數發出噪音
    pub fn emit_default_noise(&mut self, origin: Cell) -> Result<Vec<NoiseHeard>> {
        self.emit_noise(origin, self.default_noise)
    }

    /// 技能瞄準 `target` 時影響的格子
    pub fn affected_cells(&self, ability: &Ability, target: Cell) -> Result<BTreeSet<Cell>> {
        let (_, origin) = self.active_position()?;
        let mut cells: BTreeSet<Cell> = match ability.shape {
            AbilityShape::Single => return Ok(BTreeSet::from([target])),
            AbilityShape::Radius { radius } => radius_cells(target, radius)
                .into_iter()
                .filter(|cell| self.map.contains(*cell))
                .collect(),
            AbilityShape::Cone { range, angle } => {
                let start = self.mapper.to_point(origin);
                let aim = self.mapper.to_point(target);
                let direction = Point::new(aim.x - start.x, aim.y - start.y);
                let reach = (range as f32 * self.mapper.cell_size).round() as Coord;
                cone_cells(&self.mapper, start, direction, reach, angle, &self.map)
            }
            AbilityShape::Line { length } => line_cells(origin, target, length)
                .into_iter()
                .filter(|cell| self.map.contains(*cell))
                .collect(),
        };
        if ability.include_origin {
            cells.insert(origin);
        } else {
            cells.remove(&origin);
        }
        Ok(cells)
    }

    /// 檢查射程與視線後，對範圍內的戰鬥者施放技能
    pub fn cast_ability_at(&mut self, name: &str, target: Cell) -> Result<CastReport> {
        let ability = self.scheduler.usable_ability(name)?;
        let (_, origin) = self.active_position()?;
        let distance = origin.distance(target);
        if distance > ability.range {
            return Err(SessionError::OutOfRange {
                ability: ability.name,
                distance,
                range: ability.range,
            }
            .into());
        }
        if !self.line_of_sight(origin, target) {
            return Err(SessionError::NoLineOfSight {
                x: target.x,
                y: target.y,
            }
            .into());
        }

        let cells = self.affected_cells(&ability, target)?;
        let candidates: Vec<CombatantID> = self
            .positions
            .iter()
            .filter(|(_, cell)| cells.contains(cell))
            .map(|(id, _)| *id)
            .collect();
        let report = self.scheduler.cast_ability(name, &candidates)?;
        for id in &report.defeated {
            self.remove_defeated(*id);
        }
        Ok(report)
    }

    /// 倒下的戰鬥者不能再被選取，也不再聽到噪音
    fn remove_defeated(&mut self, id: CombatantID) {
        self.registry.remove(id, Capability::Selectable);
        if self.registry.remove(id, Capability::NoiseListener) {
            if let Some(cell) = self.noise.position_of(id) {
                self.noise.unregister(cell);
            }
        }
    }

    /// 關卡中加入 A 陣營戰鬥者，位置被佔據時改放最近的空位
    ///
    /// 加入的事件在下一次 `tick` 送出。
    pub fn spawn_combatant(&mut self, stats: &CombatantTemplate, cell: Cell) -> Result<CombatantID> {
        let id = self.registry.next_id();
        let free = |c: Cell| self.map.is_walkable(c) && self.occupant_at(c).is_none();
        let cell = nearest_walkable(cell, &free, MAX_SEARCH_RADIUS)
            .ok_or_else(|| invalid_placement(id, cell, "附近沒有空位"))?;

        let mut combatant = Combatant::from_template(id, Team::A, stats, &self.abilities)?;
        combatant.tile_effect = self.tile_effects.get(&cell).cloned();
        self.scheduler.spawn_combatant(combatant)?;
        self.positions.insert(id, cell);
        self.registry.insert(id, Capability::Combatant);
        self.registry.insert(id, Capability::Selectable);
        self.events
            .defer(SessionEvent::CombatantSpawned { combatant: id, cell });
        Ok(id)
    }
}
