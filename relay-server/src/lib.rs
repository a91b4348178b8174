//! 多房间广播中继
//!
//! 包含:
//! - 房间系统（每个房间一个转发任务）
//! - 接受连接与房间名握手
//! - 中继配置

pub mod config;
pub mod room;
pub mod server;

pub use config::RelayConfig;
pub use room::{MemberId, RoomRegistry};
pub use server::{split_handshake, RelayServer};
