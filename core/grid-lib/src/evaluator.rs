//! 位置評估（AI 巡邏用）
use crate::*;

/// 範圍內離最近造訪位置最遠的可通行格子
///
/// 沒有造訪紀錄時回傳排序後的第一格；範圍內沒有可通行格子時回傳 None。
pub fn find_unexplored_area(
    origin: Cell,
    range: f32,
    recent: &[Cell],
    walkability: &impl Walkability,
) -> Option<Cell> {
    let mut best: Option<(Cell, f32)> = None;
    for cell in reachable_cells(origin, range).walkable_cells(walkability) {
        let score = distance_from_recent(cell, recent);
        // 同分時保留先出現的格子
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((cell, score)),
        }
    }
    best.map(|(cell, _)| cell)
}

/// 與所有造訪位置的最小距離，沒有紀錄時為 f32::MAX
pub fn distance_from_recent(cell: Cell, recent: &[Cell]) -> f32 {
    recent
        .iter()
        .map(|r| cell.distance(*r))
        .fold(f32::MAX, f32::min)
}

/// 新位置是否比舊位置更接近目標
pub fn is_closer_to_target(previous: Cell, current: Cell, target: Cell) -> bool {
    current.distance(target) < previous.distance(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_unexplored_area() {
        let origin = Cell::new(0, 0);
        let recent = [Cell::new(1, 0), Cell::new(0, 0)];
        let cell = find_unexplored_area(origin, 1.0, &recent, &OpenGround).unwrap();
        assert_eq!(cell, Cell::new(-1, 0));

        let walls = |_: Cell| false;
        assert_eq!(find_unexplored_area(origin, 3.0, &recent, &walls), None);
    }

    #[test]
    fn test_find_unexplored_without_history() {
        let cell = find_unexplored_area(Cell::new(0, 0), 1.0, &[], &OpenGround);
        assert_eq!(cell, Some(Cell::new(-1, 0)));
    }

    #[test]
    fn test_is_closer_to_target() {
        let target = Cell::new(5, 5);
        assert!(is_closer_to_target(Cell::new(0, 0), Cell::new(1, 1), target));
        assert!(!is_closer_to_target(Cell::new(4, 4), Cell::new(0, 0), target));
    }
}
