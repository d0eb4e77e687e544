//! 本檔案僅收錄「有名且有固定公式」的演算法。
//! 例如：Dijkstra 可到達範圍、A* 路徑尋找、Bresenham 直線。
//! 專案自訂的範圍形狀與評估邏輯請放在 shape.rs / evaluator.rs。
use crate::*;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

/// 四個正向（上、右、下、左）
pub const CARDINAL_DIRECTIONS: [(Coord, Coord); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
/// 四個斜向（右上、右下、左下、左上）
pub const DIAGONAL_DIRECTIONS: [(Coord, Coord); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

/// 可到達範圍結果：每格記錄從起點出發的最小成本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachableSet {
    origin: Cell,
    costs: HashMap<Cell, MovementCost>,
}

impl ReachableSet {
    pub fn origin(&self) -> Cell {
        self.origin
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.costs.contains_key(&cell)
    }

    /// 到達該格的步數成本（正向 1、斜向 1.5）
    pub fn cost(&self, cell: Cell) -> Option<f32> {
        self.costs.get(&cell).copied().map(cost_to_steps)
    }

    pub fn raw_cost(&self, cell: Cell) -> Option<MovementCost> {
        self.costs.get(&cell).copied()
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// 排序後的所有格子
    pub fn cells(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self.costs.keys().copied().collect();
        cells.sort();
        cells
    }

    /// 可通行過濾在展開之後才做，展開本身不看地形
    pub fn walkable_cells(&self, walkability: &impl Walkability) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self
            .costs
            .keys()
            .copied()
            .filter(|cell| walkability.is_walkable(*cell))
            .collect();
        cells.sort();
        cells
    }
}

// https://github.com/TheAlgorithms/Rust/blob/master/src/graph/dijkstra.rs
/// 計算步數預算內可到達的所有格子
///
/// 8 方向展開：正向成本 1、斜向成本 1.5（不是 √2）。
/// - 超過預算的格子不收錄、也不再展開
/// - 不做可通行檢查，請對結果呼叫 `walkable_cells`
/// - 預算為 0 時只有起點，負預算回傳空集合
pub fn reachable_cells(origin: Cell, budget: f32) -> ReachableSet {
    let mut costs: HashMap<Cell, MovementCost> = HashMap::new();
    let Some(budget) = budget_to_cost(budget) else {
        return ReachableSet { origin, costs };
    };

    let mut queue: BinaryHeap<Reverse<(MovementCost, Cell)>> = BinaryHeap::new();
    costs.insert(origin, 0);
    queue.push(Reverse((0, origin)));

    while let Some(Reverse((cost, cell))) = queue.pop() {
        // 跳過過時的隊列項（已有更優路徑）
        if cost > costs.get(&cell).copied().unwrap_or(MovementCost::MAX) {
            continue;
        }

        let steps = CARDINAL_DIRECTIONS
            .iter()
            .map(|dir| (*dir, BASIC_MOVEMENT_COST))
            .chain(
                DIAGONAL_DIRECTIONS
                    .iter()
                    .map(|dir| (*dir, REACH_DIAGONAL_COST)),
            );
        for ((dx, dy), step_cost) in steps {
            let next = cell.offset(dx, dy);
            let new_cost = cost + step_cost;
            if new_cost > budget {
                continue;
            }
            let best_cost = costs.get(&next).copied().unwrap_or(MovementCost::MAX);
            if new_cost < best_cost {
                costs.insert(next, new_cost);
                queue.push(Reverse((new_cost, next)));
            }
        }
    }

    log::debug!(
        "reachable_cells: 起點 {origin:?} 預算 {budget} 共 {} 格",
        costs.len()
    );
    ReachableSet { origin, costs }
}

/// A* 開放集合的節點，F 小者優先，F 相同時 H 小者優先，再以加入順序決定
#[derive(Debug, Clone, Copy)]
struct OpenNode {
    f: f32,
    h: f32,
    seq: usize,
    cell: Cell,
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap 為最大堆，比較方向反轉
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.h.total_cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

/// A* 路徑搜尋，展開上限為 `DEFAULT_SEARCH_LIMIT`
pub fn find_path(start: Cell, goal: Cell, walkability: &impl Walkability) -> Option<Vec<Cell>> {
    find_path_with_limit(start, goal, walkability, DEFAULT_SEARCH_LIMIT)
}

/// A* 路徑搜尋
///
/// - 8 方向鄰居，正向成本 1、斜向成本 1.4
/// - 啟發函式為到終點的歐氏距離
/// - 鄰居必須可通行，起點本身不檢查
/// - 回傳的路徑不含起點、含終點；起點等於終點時回傳空路徑
/// - 開放集合耗盡或展開超過 `limit` 時回傳 None
pub fn find_path_with_limit(
    start: Cell,
    goal: Cell,
    walkability: &impl Walkability,
    limit: usize,
) -> Option<Vec<Cell>> {
    let mut open: BinaryHeap<OpenNode> = BinaryHeap::new();
    let mut closed: HashSet<Cell> = HashSet::new();
    let mut g_costs: HashMap<Cell, MovementCost> = HashMap::new();
    let mut parents: HashMap<Cell, Cell> = HashMap::new();
    let mut seq = 0;

    let start_h = start.distance(goal);
    g_costs.insert(start, 0);
    open.push(OpenNode {
        f: start_h,
        h: start_h,
        seq,
        cell: start,
    });

    let mut expanded = 0;
    while let Some(node) = open.pop() {
        if !closed.insert(node.cell) {
            continue;
        }
        if node.cell == goal {
            return Some(retrace_path(&parents, start, goal));
        }

        expanded += 1;
        if expanded > limit {
            log::warn!("find_path: {start:?} -> {goal:?} 展開超過 {limit} 格，放棄搜尋");
            return None;
        }

        let g = g_costs[&node.cell];
        for (dx, dy) in CARDINAL_DIRECTIONS.iter().chain(DIAGONAL_DIRECTIONS.iter()) {
            let next = node.cell.offset(*dx, *dy);
            if closed.contains(&next) || !walkability.is_walkable(next) {
                continue;
            }
            let step_cost = if node.cell.is_diagonal_to(next) {
                PATH_DIAGONAL_COST
            } else {
                BASIC_MOVEMENT_COST
            };
            let new_g = g + step_cost;
            if new_g < g_costs.get(&next).copied().unwrap_or(MovementCost::MAX) {
                g_costs.insert(next, new_g);
                parents.insert(next, node.cell);
                let h = next.distance(goal);
                seq += 1;
                open.push(OpenNode {
                    f: cost_to_steps(new_g) + h,
                    h,
                    seq,
                    cell: next,
                });
            }
        }
    }

    log::debug!("find_path: {start:?} -> {goal:?} 無路徑");
    None
}

// 從終點沿前驅回溯到起點後反轉
fn retrace_path(parents: &HashMap<Cell, Cell>, start: Cell, goal: Cell) -> Vec<Cell> {
    let mut path = Vec::new();
    let mut current = goal;
    while current != start {
        path.push(current);
        current = parents[&current];
    }
    path.reverse();
    path
}

/// 路徑的步數成本（正向 1、斜向 1.4）
pub fn path_cost(start: Cell, path: &[Cell]) -> f32 {
    let mut prev = start;
    let mut total = 0;
    for cell in path {
        total += if prev.is_diagonal_to(*cell) {
            PATH_DIAGONAL_COST
        } else {
            BASIC_MOVEMENT_COST
        };
        prev = *cell;
    }
    cost_to_steps(total)
}

/// Bresenham 直線，遇到 `is_valid` 為 false 的格子或走滿 `len` 格時停止
pub fn bresenham_line(from: Cell, to: Cell, len: usize, is_valid: impl Fn(Cell) -> bool) -> Vec<Cell> {
    let mut points = Vec::new();

    let dx = (to.x - from.x).abs();
    let dy = (to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };

    let mut err = dx - dy;
    let mut current = from;

    for _ in 0..len {
        if is_valid(current) {
            points.push(current);
        } else {
            break;
        }
        if current == to {
            break; // 到達目標
        }

        let e2 = err * 2;
        if e2 > -dy {
            err -= dy;
            current.x += sx;
        }
        if e2 < dx {
            err += dx;
            current.y += sy;
        }
    }
    points
}

/// 視線判定：沿 Bresenham 直線逐格檢查，終點本身不檢查
///
/// 起點等於終點時恆為 true。
pub fn has_line_of_sight(start: Cell, end: Cell, walkability: &impl Walkability) -> bool {
    let dx = (end.x - start.x).abs();
    let dy = (end.y - start.y).abs();
    let sx = if start.x < end.x { 1 } else { -1 };
    let sy = if start.y < end.y { 1 } else { -1 };

    let mut err = dx - dy;
    let mut current = start;

    while current != end {
        if !walkability.is_walkable(current) {
            return false;
        }

        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            current.x += sx;
        }
        if e2 < dx {
            err += dx;
            current.y += sy;
        }
    }
    true
}
