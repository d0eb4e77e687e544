//! 範圍形狀：錐形、圓形、方形鄰域、直線、凸包
use crate::*;
use std::collections::BTreeSet;

/// 錐形兩側射線的角度間隔（度）
pub const CONE_RAY_STEP_DEGREES: u32 = 5;

/// 錐形範圍
///
/// 中心射線從起點沿方向逐單位前進，兩側射線以 5 度為間隔展開到半角，
/// 每條射線在第一個失去視線（相對起點）的位置停止。
pub fn cone_cells(
    mapper: &GridMapper,
    start: Point,
    direction: Point,
    range: Coord,
    angle: f32,
    walkability: &impl Walkability,
) -> BTreeSet<Cell> {
    let mut cells = BTreeSet::new();
    let half_angle = angle * 0.5;
    let start_cell = mapper.to_cell(start);
    let dir = direction.normalized();

    for y in 0..range {
        let cell = mapper.to_cell(start.add(dir.scale(y as f32)));
        if has_line_of_sight(start_cell, cell, walkability) {
            cells.insert(cell);
        } else {
            break;
        }
    }

    let step = (mapper.cell_size as usize).max(1);
    let mut r = CONE_RAY_STEP_DEGREES;
    while r as f32 <= half_angle {
        let left_dir = dir.rotated(-(r as f32));
        let right_dir = dir.rotated(r as f32);
        let mut left_blocked = false;
        let mut right_blocked = false;

        for i in (1..=range).step_by(step) {
            if !left_blocked {
                let cell = mapper.to_cell(start.add(left_dir.scale(i as f32)));
                if has_line_of_sight(start_cell, cell, walkability) {
                    cells.insert(cell);
                } else {
                    left_blocked = true;
                }
            }
            if !right_blocked {
                let cell = mapper.to_cell(start.add(right_dir.scale(i as f32)));
                if has_line_of_sight(start_cell, cell, walkability) {
                    cells.insert(cell);
                } else {
                    right_blocked = true;
                }
            }
        }
        r += CONE_RAY_STEP_DEGREES;
    }

    cells
}

/// 歐氏距離 `radius` 內的所有格子（含中心）
pub fn radius_cells(center: Cell, radius: Coord) -> Vec<Cell> {
    let mut cells = Vec::new();
    for x in -radius..=radius {
        for y in -radius..=radius {
            if ((x * x + y * y) as f32).sqrt() <= radius as f32 {
                cells.push(center.offset(x, y));
            }
        }
    }
    cells
}

/// 方形鄰域（不含中心），不含斜向時排除 |x| == |y| 的格子
pub fn square_neighbors(origin: Cell, steps: Coord, include_diagonals: bool) -> Vec<Cell> {
    let mut cells = Vec::new();
    for x in -steps..=steps {
        for y in -steps..=steps {
            if x == 0 && y == 0 {
                continue;
            }
            if include_diagonals || x.abs() != y.abs() {
                cells.push(origin.offset(x, y));
            }
        }
    }
    cells
}

/// 從起點往目標方向延伸 `length` 格的直線（不含起點）
pub fn line_cells(start: Cell, toward: Cell, length: u32) -> Vec<Cell> {
    if start == toward || length == 0 {
        return Vec::new();
    }
    let dx = toward.x - start.x;
    let dy = toward.y - start.y;
    // 目標不夠遠時等比例延長，讓 Bresenham 走得滿 length 格
    let span = dx.abs().max(dy.abs());
    let scale = (length as Coord + span - 1) / span;
    let far = start.offset(dx * scale, dy * scale);
    bresenham_line(start, far, length as usize + 1, |_| true)
        .into_iter()
        .skip(1)
        .collect()
}

/// 凸包（Andrew monotone chain），共線點保留
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    if points.len() <= 1 {
        return points.to_vec();
    }

    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));

    let mut hull: Vec<Point> = Vec::new();

    // 下半部
    for point in &sorted {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], *point) < 0.0 {
            hull.pop();
        }
        hull.push(*point);
    }

    // 上半部
    let lower_count = hull.len();
    for point in sorted.iter().rev().skip(1) {
        while hull.len() > lower_count
            && cross(hull[hull.len() - 2], hull[hull.len() - 1], *point) < 0.0
        {
            hull.pop();
        }
        hull.push(*point);
    }

    // 最後一點與第一點重複
    hull.pop();
    hull
}

fn cross(o: Point, a: Point, b: Point) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}
