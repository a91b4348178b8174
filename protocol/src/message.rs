//! 对局双方之间的消息

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};
use crate::topology::TileId;

/// 点对点消息
///
/// 每条消息独占一帧，格子用其在拓扑序列中的位置表示。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerMessage {
    /// 握手：本端玩家序号和棋盘格数
    Hello { player: usize, tiles: usize },
    /// 本端点击了一个格子
    Click { tile: TileId },
}

impl PeerMessage {
    pub fn click(tile: TileId) -> Self {
        PeerMessage::Click { tile }
    }
}

/// 校验收到的格子序号是否在本地棋盘范围内
pub fn check_tile(tile: TileId, len: usize) -> Result<TileId> {
    if tile.index() < len {
        Ok(tile)
    } else {
        Err(ProtocolError::TileOutOfRange {
            index: tile.index(),
            len,
        })
    }
}

/// 校验对端握手中的棋盘格数
pub fn check_board(remote_tiles: usize, local_tiles: usize) -> Result<()> {
    if remote_tiles == local_tiles {
        Ok(())
    } else {
        Err(ProtocolError::BoardMismatch {
            local: local_tiles,
            remote: remote_tiles,
        })
    }
}

/// 校验对端握手中的玩家序号，双方不能执同一方
pub fn check_seat(remote_player: usize, local_player: usize) -> Result<()> {
    if remote_player == local_player {
        Err(ProtocolError::SeatConflict {
            player: local_player,
        })
    } else {
        Ok(())
    }
}
