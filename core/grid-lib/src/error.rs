// 網格錯誤型別，攜帶 function name 與 context
use crate::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("`{func}`: 參數錯誤: {reason}")]
    InvalidParameter { func: &'static str, reason: String },

    #[error("`{func}`: 地圖解析失敗: {reason}")]
    MapParse { func: &'static str, reason: String },

    #[error("`{func}`: 位置 {cell:?} 已有噪音監聽者 {existing}")]
    ListenerExists {
        func: &'static str,
        cell: Cell,
        existing: ListenerID,
    },

    #[error("`{func}`: 位置 {cell:?} 沒有噪音監聽者")]
    NoListenerAt { func: &'static str, cell: Cell },
}
