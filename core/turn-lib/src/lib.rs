//! 回合順序核心：
//! - 戰鬥者、持續效果、技能冷卻
//! - 三種回合排序策略（固定屬性輪替、CTB、陣營輪流）與預覽佇列
//! - 型別化的事件匯流排
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

mod ability;
mod combatant;
mod error;
mod events;
mod scheduler;

pub use ability::*;
pub use combatant::*;
pub use error::*;
pub use events::*;
pub use scheduler::*;

pub type CombatantID = u64;
/// 先攻時鐘，數值越小越早行動
pub type Initiative = i32;
pub type AbilityName = String;

/// 結束回合時推進的基礎成本
pub const BASE_COST: i32 = 100;
/// 施放技能時推進的成本
pub const ABILITY_COST: i32 = 50;
/// 預覽佇列至少維持的長度
pub const PREVIEW_POOL_COUNT: usize = 10;

/// 兩個陣營
#[derive(
    Debug,
    Deserialize,
    Serialize,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumIter,
    EnumString,
)]
pub enum Team {
    #[default]
    A,
    B,
}

impl Team {
    pub fn other(self) -> Self {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }
}
