//! 錯誤處理
//!
//! 地圖與回合層的錯誤直接包進 `ErrorKind`，呼叫端可逐層加上 context。

use grid_lib::Coord;
use thiserror::Error as ThisError;
use turn_lib::{AbilityName, CombatantID};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// 頂層錯誤，包含原始錯誤和 context 鏈
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    contexts: Vec<String>,
}

/// 錯誤種類
#[derive(Debug, ThisError)]
pub enum ErrorKind {
    #[error(transparent)]
    Grid(#[from] grid_lib::Error),
    #[error(transparent)]
    Turn(#[from] turn_lib::Error),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// 場景載入錯誤
#[derive(Debug, ThisError)]
pub enum LoadError {
    #[error("讀取 {path} 失敗: {reason}")]
    ReadError { path: String, reason: String },
    #[error("{format} 反序列化失敗: {reason}")]
    DeserializeError { format: String, reason: String },
    #[error("{format} 序列化失敗: {reason}")]
    SerializeError { format: String, reason: String },
    #[error("地圖上沒有足夠的標記 {marker}")]
    MarkerNotFound { marker: String },
    #[error("{id} 的位置 ({x}, {y}) 不合法: {reason}")]
    InvalidPlacement {
        id: u64,
        x: Coord,
        y: Coord,
        reason: String,
    },
    #[error("編號 {id} 重複")]
    DuplicateEntity { id: u64 },
    #[error("技能 {name} 重複定義")]
    DuplicateAbility { name: AbilityName },
}

/// 關卡操作錯誤
#[derive(Debug, ThisError)]
pub enum SessionError {
    #[error("沒有行動中的戰鬥者")]
    NoActiveCombatant,
    #[error("找不到戰鬥者 {id} 的位置")]
    PositionNotFound { id: CombatantID },
    #[error("戰鬥者 {id} 本回合已經移動過")]
    AlreadyMoved { id: CombatantID },
    #[error("({x}, {y}) 不在可移動範圍內")]
    OutOfReach { x: Coord, y: Coord },
    #[error("找不到到 ({x}, {y}) 的路徑")]
    NoPath { x: Coord, y: Coord },
    #[error("技能 {ability} 射程 {range}，目標距離 {distance}")]
    OutOfRange {
        ability: AbilityName,
        distance: f32,
        range: f32,
    },
    #[error("看不到目標 ({x}, {y})")]
    NoLineOfSight { x: Coord, y: Coord },
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// 添加錯誤上下文，自動記錄呼叫位置
    #[track_caller]
    pub fn context<C: Into<String>>(mut self, context: C) -> Self {
        let loc = std::panic::Location::caller();
        let msg = format!("{} [{}:{}]", context.into(), loc.file(), loc.line());
        self.contexts.push(msg);
        self
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        for ctx in &self.contexts {
            write!(f, "\n  {}", ctx)?;
        }
        Ok(())
    }
}

impl<E: Into<ErrorKind>> From<E> for Error {
    fn from(error: E) -> Self {
        Self {
            kind: error.into(),
            contexts: Vec::new(),
        }
    }
}

/// Result 擴展 trait，用於添加錯誤上下文
pub trait Context<T> {
    fn context<C: Into<String>>(self, context: C) -> Result<T>;
}

impl<T> Context<T> for Result<T> {
    #[track_caller]
    fn context<C: Into<String>>(self, context: C) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(e) => Err(e.context(context)),
        }
    }
}
