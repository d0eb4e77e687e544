//! 可移動範圍（步行／衝刺）與其外框
use crate::*;
use std::collections::BTreeSet;
use strum::IntoEnumIterator;

/// 最近可通行位置的最大搜尋半徑
pub const MAX_SEARCH_RADIUS: Coord = 10;

/// 單位本回合的可移動範圍
///
/// 衝刺範圍包含步行範圍。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveableArea {
    pub origin: Cell,
    pub walkable: BTreeSet<Cell>,
    pub sprintable: BTreeSet<Cell>,
}

impl MoveableArea {
    pub fn compute(
        origin: Cell,
        move_budget: f32,
        sprint_budget: f32,
        walkability: &impl Walkability,
    ) -> Self {
        let walkable = reachable_cells(origin, move_budget)
            .walkable_cells(walkability)
            .into_iter()
            .collect();
        let sprintable = reachable_cells(origin, sprint_budget)
            .walkable_cells(walkability)
            .into_iter()
            .collect();
        Self {
            origin,
            walkable,
            sprintable,
        }
    }

    pub fn can_move_to(&self, cell: Cell) -> bool {
        self.walkable.contains(&cell)
    }

    pub fn can_sprint_to(&self, cell: Cell) -> bool {
        self.sprintable.contains(&cell)
    }

    /// 只能衝刺到達的格子
    pub fn sprint_only(&self) -> BTreeSet<Cell> {
        self.sprintable.difference(&self.walkable).copied().collect()
    }
}

/// 範圍外框的一條邊：格子的某一側
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoundaryEdge {
    pub cell: Cell,
    pub side: Direction,
}

impl BoundaryEdge {
    /// 邊的兩端點（順時針）
    pub fn endpoints(&self, mapper: &GridMapper) -> (Point, Point) {
        let center = mapper.to_point(self.cell);
        let half = mapper.cell_size / 2.0;
        let top_left = Point::new(center.x - half, center.y + half);
        let top_right = Point::new(center.x + half, center.y + half);
        let bottom_left = Point::new(center.x - half, center.y - half);
        let bottom_right = Point::new(center.x + half, center.y - half);
        match self.side {
            Direction::Up => (top_left, top_right),
            Direction::Right => (top_right, bottom_right),
            Direction::Down => (bottom_right, bottom_left),
            Direction::Left => (bottom_left, top_left),
        }
    }
}

/// 計算格子集合的外框
///
/// 鄰格不在集合內、或在排除集合內的那一側即為外框。
pub fn boundary_edges(cells: &BTreeSet<Cell>, exclude: &BTreeSet<Cell>) -> Vec<BoundaryEdge> {
    let mut edges = Vec::new();
    for cell in cells {
        for side in Direction::iter() {
            let neighbor = side.step(*cell);
            if !cells.contains(&neighbor) || exclude.contains(&neighbor) {
                edges.push(BoundaryEdge { cell: *cell, side });
            }
        }
    }
    edges
}

/// 由近到遠以方形擴張搜尋最近的可通行格子
///
/// 起點可通行時直接回傳起點；半徑 `max_radius` 內找不到回傳 None。
pub fn nearest_walkable(
    start: Cell,
    walkability: &impl Walkability,
    max_radius: Coord,
) -> Option<Cell> {
    if walkability.is_walkable(start) {
        return Some(start);
    }
    for radius in 1..=max_radius {
        for x in -radius..=radius {
            for y in -radius..=radius {
                let cell = start.offset(x, y);
                if walkability.is_walkable(cell) {
                    return Some(cell);
                }
            }
        }
    }
    log::warn!("nearest_walkable: {start:?} 半徑 {max_radius} 內沒有可通行位置");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moveable_area() {
        let (map, markers) = load_from_ascii(
            r#"
. . . . .
. # . . .
. . S . .
. . . . .
            "#,
        )
        .unwrap();
        let origin = markers["S"][0];
        let area = MoveableArea::compute(origin, 1.0, 2.0, &map);
        assert_eq!(area.walkable.len(), 5);
        assert!(area.can_move_to(origin));
        assert!(area.can_move_to(Cell::new(2, 1)));
        assert!(!area.can_move_to(Cell::new(1, 1)));
        // 牆擋住
        assert!(!area.can_sprint_to(Cell::new(1, 1)));
        assert!(area.can_sprint_to(Cell::new(2, 0)));
        assert!(area.can_sprint_to(Cell::new(3, 3)));
        // 地圖外
        assert!(!area.can_sprint_to(Cell::new(2, 4)));
        assert!(area.sprint_only().iter().all(|cell| !area.can_move_to(*cell)));
    }

    #[test]
    fn test_boundary_edges() {
        let single = BTreeSet::from([Cell::new(0, 0)]);
        assert_eq!(boundary_edges(&single, &BTreeSet::new()).len(), 4);

        let pair = BTreeSet::from([Cell::new(0, 0), Cell::new(1, 0)]);
        let edges = boundary_edges(&pair, &BTreeSet::new());
        assert_eq!(edges.len(), 6);
        assert!(!edges.contains(&BoundaryEdge {
            cell: Cell::new(0, 0),
            side: Direction::Right
        }));

        // 排除的鄰格視為外框
        let exclude = BTreeSet::from([Cell::new(1, 0)]);
        assert_eq!(boundary_edges(&pair, &exclude).len(), 7);
    }

    #[test]
    fn test_boundary_edge_endpoints() {
        let mapper = GridMapper::new(Point::default(), 2.0).unwrap();
        let edge = BoundaryEdge {
            cell: Cell::new(1, 0),
            side: Direction::Up,
        };
        assert_eq!(
            edge.endpoints(&mapper),
            (Point::new(1.0, 1.0), Point::new(3.0, 1.0))
        );
    }

    #[test]
    fn test_nearest_walkable() {
        let walls: BlockedCells = [Cell::new(0, 0)].into_iter().collect();
        assert_eq!(
            nearest_walkable(Cell::new(0, 0), &walls, MAX_SEARCH_RADIUS),
            Some(Cell::new(-1, -1))
        );
        assert_eq!(
            nearest_walkable(Cell::new(3, 3), &walls, MAX_SEARCH_RADIUS),
            Some(Cell::new(3, 3))
        );
        assert_eq!(nearest_walkable(Cell::new(0, 0), &|_: Cell| false, 3), None);
    }
}
