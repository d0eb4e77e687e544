//! 戰術關卡：組合地圖、噪音監聽、能力登記與回合排程
//!
//! 關卡狀態集中在 [`session::Session`]，由 TOML 場景檔建立。

pub mod config;
pub mod error;
pub mod registry;
pub mod session;

pub use config::*;
pub use error::{Context, Error, ErrorKind, LoadError, Result, SessionError};
pub use registry::*;
pub use session::*;
