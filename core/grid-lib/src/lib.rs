//! 戰術網格核心：
//! - 網格座標（Cell）與連續座標（Point）的轉換
//! - 可到達範圍、A* 路徑、視線判定
//! - 錐形／圓形範圍、掩體探測、噪音傳播
//!
//! 可通行與否一律由呼叫端提供的 `Walkability` 回答，本 crate 不知道場景幾何。
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

mod algo;
mod area;
mod cover;
mod error;
mod evaluator;
mod loader;
mod mapper;
mod noise;
mod shape;
mod walkability;

pub use algo::*;
pub use area::*;
pub use cover::*;
pub use error::*;
pub use evaluator::*;
pub use loader::*;
pub use mapper::*;
pub use noise::*;
pub use shape::*;
pub use walkability::*;

pub type Coord = i32;
/// 移動成本，以 1/10 格為單位的定點數
pub type MovementCost = u32;
pub type ListenerID = u64;

/// 一格的基礎移動成本（定點數 1.0）
pub const BASIC_MOVEMENT_COST: MovementCost = 10;
/// 可到達範圍計算用的斜向成本（1.5 格）
pub const REACH_DIAGONAL_COST: MovementCost = 15;
/// 路徑搜尋用的斜向成本（1.4 格）
pub const PATH_DIAGONAL_COST: MovementCost = 14;
/// 網格無邊界，A* 最多展開的節點數
pub const DEFAULT_SEARCH_LIMIT: usize = 10_000;

#[derive(
    Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Cell {
    pub x: Coord,
    pub y: Coord,
}

impl Cell {
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: Coord, dy: Coord) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// 兩格中心的歐氏距離（以格為單位）
    pub fn distance(self, other: Cell) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_diagonal_to(self, other: Cell) -> bool {
        self.x != other.x && self.y != other.y
    }
}

/// 正向方向（上、右、下、左）
#[derive(
    Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter,
)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub fn offset(self) -> (Coord, Coord) {
        match self {
            Direction::Up => (0, 1),
            Direction::Right => (1, 0),
            Direction::Down => (0, -1),
            Direction::Left => (-1, 0),
        }
    }

    pub fn step(self, cell: Cell) -> Cell {
        let (dx, dy) = self.offset();
        cell.offset(dx, dy)
    }
}

/// 地面上的連續座標
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// 單位向量，零向量回傳零向量
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len == 0.0 {
            return Self::default();
        }
        Self {
            x: self.x / len,
            y: self.y / len,
        }
    }

    pub fn scale(self, factor: f32) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }

    pub fn add(self, other: Point) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    pub fn distance(self, other: Point) -> f32 {
        Point::new(self.x - other.x, self.y - other.y).length()
    }

    /// 繞垂直軸旋轉（角度，順時針為正）
    pub fn rotated(self, degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            x: self.x * cos + self.y * sin,
            y: -self.x * sin + self.y * cos,
        }
    }
}

/// 將步數預算轉成定點成本，負預算回傳 None
pub fn budget_to_cost(budget: f32) -> Option<MovementCost> {
    if budget < 0.0 || budget.is_nan() {
        return None;
    }
    // 1e-3 吸收 1.4 * 10 之類的浮點誤差
    Some((budget * BASIC_MOVEMENT_COST as f32 + 1e-3).floor() as MovementCost)
}

pub fn cost_to_steps(cost: MovementCost) -> f32 {
    cost as f32 / BASIC_MOVEMENT_COST as f32
}
