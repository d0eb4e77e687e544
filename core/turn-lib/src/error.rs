// 回合邏輯錯誤型別，攜帶 function name 與 context
use crate::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("`{func}`: 參數錯誤: {reason}")]
    InvalidParameter { func: &'static str, reason: String },

    #[error("`{func}`: 戰鬥者 {id} 重複")]
    DuplicateCombatant { func: &'static str, id: CombatantID },

    #[error("`{func}`: 找不到戰鬥者 {id}")]
    CombatantNotFound { func: &'static str, id: CombatantID },

    #[error("`{func}`: 沒有行動中的戰鬥者")]
    NoActiveCombatant { func: &'static str },

    #[error("`{func}`: 戰鬥者 {combatant} 沒有技能 {ability}")]
    AbilityNotFound {
        func: &'static str,
        combatant: CombatantID,
        ability: AbilityName,
    },

    #[error("`{func}`: 技能 {ability} 冷卻中，還需 {remaining} 回合")]
    AbilityOnCooldown {
        func: &'static str,
        ability: AbilityName,
        remaining: u32,
    },

    #[error("`{func}`: 技能 {ability} 需要 {cost} 魔力，目前只有 {mana}")]
    NotEnoughMana {
        func: &'static str,
        ability: AbilityName,
        cost: i32,
        mana: i32,
    },

    #[error("`{func}`: 技能 {ability} 沒有合法目標")]
    NoValidTarget {
        func: &'static str,
        ability: AbilityName,
    },
}
