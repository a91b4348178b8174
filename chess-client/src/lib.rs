//! 拓扑国际象棋客户端核心
//!
//! 包含:
//! - 中断驱动的事件循环（单一工作任务持有对局状态）
//! - 两段式点击缓冲和渲染协作者 trait
//! - 联机走子同步（直连或经中继）
//! - 客户端配置

pub mod config;
pub mod error;
pub mod event_loop;
pub mod input;
pub mod online;
pub mod session;

#[cfg(test)]
mod testing;

pub use config::{ClientConfig, OnlineConfig};
pub use error::{ClientError, Result};
pub use event_loop::{Interrupt, Interrupts, Mode, Seat, Worker};
pub use input::{ClickBuffer, ClickOutcome, Renderer, TileColour};
pub use online::{OnlineSession, PeerEndpoint};
pub use session::Game;
