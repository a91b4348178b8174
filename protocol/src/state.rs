//! 对局状态
//!
//! 棋盘拓扑加回合计数。走子先在原地试走，检查己方王是否暴露，
//! 再按撤销日志还原，不复制整个棋盘。

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{DEFAULT_MOVE_LIMIT, DEFAULT_PLAYERS};
use crate::error::RuleError;
use crate::moves::{Effect, Move, MoveGenerator};
use crate::piece::{Piece, Shape};
use crate::topology::{Checker, TileId, Topology};

/// 成功走子的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// 实际执行的走法
    pub mv: Move,
    /// 被吃掉的棋子
    pub captured: Option<Piece>,
    /// 走子后的回合数
    pub turn: u32,
}

/// 撤销日志：按修改顺序记录格子原有的棋子
#[derive(Debug)]
struct UndoLog {
    pieces: Vec<(TileId, Option<Piece>)>,
    turn: u32,
}

/// 对局状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    topology: Topology,
    /// 已走的半回合数
    turn: u32,
    players: usize,
    /// 单个棋子枚举走法的上限
    limit: usize,
}

impl GameState {
    /// 从拓扑创建对局，回合从 0 开始
    pub fn new(topology: Topology) -> Self {
        let mut state = Self {
            topology,
            turn: 0,
            players: DEFAULT_PLAYERS,
            limit: DEFAULT_MOVE_LIMIT,
        };
        state.refresh_checks();
        state
    }

    pub fn with_players(mut self, players: usize) -> Self {
        self.players = players.max(1);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self.refresh_checks();
        self
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn players(&self) -> usize {
        self.players
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 当前走子的玩家
    pub fn current_player(&self) -> usize {
        self.turn as usize % self.players
    }

    /// 摆放或移除棋子（用于布局），随后重算将军表
    pub fn place(&mut self, tile: TileId, piece: Option<Piece>) -> Result<(), RuleError> {
        let slot = self
            .topology
            .tile_mut(tile)
            .ok_or(RuleError::UnknownTile { tile })?;
        slot.piece = piece;
        self.refresh_checks();
        Ok(())
    }

    /// 指定格上棋子的伪合法走法（至多 `limit` 个）
    pub fn candidate_moves(&self, from: TileId) -> Vec<Move> {
        match self.topology.piece(from) {
            Some(piece) => MoveGenerator::moves(&self.topology, from, piece, self.turn)
                .take(self.limit)
                .collect(),
            None => Vec::new(),
        }
    }

    /// 指定格上棋子的合法走法
    ///
    /// 需要可变引用以便试走，返回时状态不变。
    pub fn legal_moves(&mut self, from: TileId) -> Vec<Move> {
        let Some(piece) = self.topology.piece(from) else {
            return Vec::new();
        };

        let mut legal = Vec::new();
        for mv in self.candidate_moves(from) {
            let own_target = self
                .topology
                .piece(mv.to)
                .is_some_and(|target| target.owner == piece.owner);
            if !own_target && !self.exposes_king(&mv, piece.owner) {
                legal.push(mv);
            }
        }
        legal
    }

    /// 走子
    ///
    /// 只接受当前玩家的棋子、伪合法走法中存在的目标格、且走完后己方王
    /// 不被攻击。被拒绝时状态保持不变。
    pub fn apply_move(&mut self, from: TileId, to: TileId) -> Result<MoveOutcome, RuleError> {
        let piece = self
            .topology
            .tile(from)
            .ok_or(RuleError::UnknownTile { tile: from })?
            .piece
            .ok_or(RuleError::NoPiece { tile: from })?;
        if !self.topology.contains(to) {
            return Err(RuleError::UnknownTile { tile: to });
        }

        let current = self.current_player();
        if piece.owner != current {
            return Err(RuleError::NotYourTurn {
                owner: piece.owner,
                current,
            });
        }

        let candidates: Vec<Move> = self
            .candidate_moves(from)
            .into_iter()
            .filter(|mv| mv.to == to)
            .collect();
        if candidates.is_empty() {
            debug!("Rejected {} -> {}: not a candidate", from, to);
            return Err(RuleError::IllegalMove { from, to });
        }

        if self
            .topology
            .piece(to)
            .is_some_and(|target| target.owner == piece.owner)
        {
            return Err(RuleError::OwnPiece { tile: to });
        }

        for mv in candidates {
            if self.exposes_king(&mv, piece.owner) {
                debug!("Rejected {}: king exposed", mv);
                continue;
            }

            let (_, captured) = self.play(&mv);
            self.refresh_checks();
            debug!("Applied {} ({:?}), turn -> {}", mv, mv.effect, self.turn);
            return Ok(MoveOutcome {
                mv,
                captured,
                turn: self.turn,
            });
        }

        Err(RuleError::KingInCheck)
    }

    /// 玩家是否被将军（依据当前将军表）
    pub fn in_check(&self, player: usize) -> bool {
        self.king_tiles(player).into_iter().any(|tile| {
            self.topology
                .tile(tile)
                .is_some_and(|t| t.threatened_for(player))
        })
    }

    /// 玩家所有王所在的格子
    pub fn king_tiles(&self, player: usize) -> Vec<TileId> {
        self.topology
            .iter()
            .filter(|(_, tile)| {
                tile.piece
                    .is_some_and(|p| p.is(Shape::King) && p.owner == player)
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// 重算每个格子的将军表
    pub fn refresh_checks(&mut self) {
        let mut found: Vec<(TileId, Checker)> = Vec::new();

        for (from, tile) in self.topology.iter() {
            let Some(piece) = tile.piece else {
                continue;
            };
            for to in MoveGenerator::attacks(&self.topology, from, piece, self.turn).take(self.limit)
            {
                found.push((
                    to,
                    Checker {
                        from,
                        owner: piece.owner,
                    },
                ));
            }
        }

        for tile in self.topology.iter_mut() {
            tile.checks.clear();
        }
        for (to, checker) in found {
            if let Some(tile) = self.topology.tile_mut(to) {
                tile.checks.push(checker);
            }
        }
    }

    /// 试走后己方王是否会被攻击
    fn exposes_king(&mut self, mv: &Move, owner: usize) -> bool {
        let (log, _) = self.play(mv);
        let exposed = self.king_exposed(owner);
        self.revert(log);
        exposed
    }

    /// 直接枚举对手的攻击，不依赖将军表
    fn king_exposed(&self, owner: usize) -> bool {
        let kings = self.king_tiles(owner);
        if kings.is_empty() {
            return false;
        }

        self.topology
            .iter()
            .filter_map(|(id, tile)| tile.piece.filter(|p| p.owner != owner).map(|p| (id, p)))
            .any(|(from, piece)| {
                MoveGenerator::attacks(&self.topology, from, piece, self.turn)
                    .take(self.limit)
                    .any(|to| kings.contains(&to))
            })
    }

    /// 执行走法并返回撤销日志和被吃的棋子
    fn play(&mut self, mv: &Move) -> (UndoLog, Option<Piece>) {
        let turn = self.turn;
        let mut log = UndoLog {
            pieces: Vec::with_capacity(4),
            turn,
        };

        let mut piece = self.take(mv.from, &mut log);
        let mut captured = self.take(mv.to, &mut log);

        if let Some(p) = piece.as_mut() {
            if p.moved.is_none() {
                p.moved = Some(turn);
            }
            if mv.effect == Effect::DoubleStep {
                p.passant = Some(turn);
            }
        }

        match mv.effect {
            Effect::EnPassant { captured: tile } => {
                captured = self.take(tile, &mut log);
            }
            Effect::Castle { rook_from, rook_to } => {
                let mut rook = self.take(rook_from, &mut log);
                if let Some(r) = rook.as_mut() {
                    if r.moved.is_none() {
                        r.moved = Some(turn);
                    }
                }
                self.put(rook_to, rook, &mut log);
            }
            Effect::Step | Effect::Advance | Effect::DoubleStep => {}
        }

        self.put(mv.to, piece, &mut log);
        self.turn += 1;

        (log, captured)
    }

    fn revert(&mut self, log: UndoLog) {
        for (tile, piece) in log.pieces.into_iter().rev() {
            if let Some(slot) = self.topology.tile_mut(tile) {
                slot.piece = piece;
            }
        }
        self.turn = log.turn;
    }

    fn take(&mut self, tile: TileId, log: &mut UndoLog) -> Option<Piece> {
        let slot = self.topology.tile_mut(tile)?;
        log.pieces.push((tile, slot.piece));
        slot.piece.take()
    }

    fn put(&mut self, tile: TileId, piece: Option<Piece>, log: &mut UndoLog) {
        if let Some(slot) = self.topology.tile_mut(tile) {
            log.pieces.push((tile, slot.piece));
            slot.piece = piece;
        }
    }
}
