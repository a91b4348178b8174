//! 错误类型定义

use thiserror::Error;

use crate::topology::TileId;

/// 规则错误（走子被拒绝或拓扑构造失败）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// 格子不存在
    #[error("Unknown tile: {tile}")]
    UnknownTile { tile: TileId },

    /// 格子不能与自身相邻
    #[error("Tile {tile} cannot neighbour itself")]
    SelfNeighbor { tile: TileId },

    /// 起点没有棋子
    #[error("No piece on tile {tile}")]
    NoPiece { tile: TileId },

    /// 不是该棋子所属玩家的回合
    #[error("Not your turn: piece belongs to player {owner}, player {current} to move")]
    NotYourTurn { owner: usize, current: usize },

    /// 目标格不在棋子的走法中
    #[error("Illegal move: {from} -> {to}")]
    IllegalMove { from: TileId, to: TileId },

    /// 目标格被己方棋子占据
    #[error("Tile {tile} is occupied by an own piece")]
    OwnPiece { tile: TileId },

    /// 走法会导致己方王被将军
    #[error("Move would leave king in check")]
    KingInCheck,

    /// 无效的棋盘描述
    #[error("Invalid layout: {reason}")]
    InvalidLayout { reason: String },
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化错误（bincode）
    #[error("Bincode serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// 协议版本不匹配
    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u8, actual: u8 },

    /// 帧大小超限
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,

    /// 格子序号超出棋盘
    #[error("Tile index {index} out of range (board has {len} tiles)")]
    TileOutOfRange { index: usize, len: usize },

    /// 双方棋盘不一致
    #[error("Board mismatch: local has {local} tiles, remote has {remote}")]
    BoardMismatch { local: usize, remote: usize },

    /// 双方执同一方
    #[error("Seat conflict: both peers play as player {player}")]
    SeatConflict { player: usize },

    /// 房间名无效
    #[error("Invalid room name: {reason}")]
    InvalidRoomName { reason: String },

    /// 规则错误
    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
