//! 拓扑国际象棋共享协议库
//!
//! 包含:
//! - 拓扑棋盘（格子、方向向量、图块）和棋子
//! - 基于夹角的走法生成与将军校验
//! - 对局状态（试走 + 撤销日志）
//! - 矩形棋盘布局与标准开局
//! - 点对点消息 (PeerMessage)
//! - 传输层抽象 (Connector, Connection, Listener traits) 和帧编解码

mod constants;
mod error;
mod message;
mod moves;
mod piece;
mod setup;
mod state;
mod topology;
mod transport;

pub use constants::*;
pub use error::{ProtocolError, Result, RuleError};
pub use message::{check_board, check_seat, check_tile, PeerMessage};
pub use moves::{Effect, Move, MoveGenerator};
pub use piece::{Piece, Shape};
pub use setup::{standard_game, standard_topology, RectLayout};
pub use state::{GameState, MoveOutcome};
pub use topology::{Chart, Checker, Tile, TileId, Topology, Vector};
pub use transport::{
    Connection, Connector, Listener,
    TcpConnection, TcpConnector, TcpListener,
    FrameReader, FrameWriter,
};
