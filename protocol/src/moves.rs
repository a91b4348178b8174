//! 走法生成
//!
//! 每种棋子的走法都只由拓扑图推导：沿方向向量的夹角关系延伸，
//! 不做任何坐标运算。生成器是惰性的，调用方负责用 `take` 限制数量。

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::piece::{Piece, Shape};
use crate::topology::{TileId, Topology, Vector};

/// 角度参考方向
const EAST: Vector = Vector::new(1.0, 0.0);

/// 走法附带的变更
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// 普通移动，目标格有子则吃子
    Step,
    /// 兵直进一格（不能吃子）
    Advance,
    /// 兵首次直进两格
    DoubleStep,
    /// 吃过路兵，额外移除 `captured` 上的兵
    EnPassant { captured: TileId },
    /// 王车易位，车同时从 `rook_from` 移到 `rook_to`
    Castle { rook_from: TileId, rook_to: TileId },
}

/// 走法：目标格加上要执行的变更
///
/// 只对生成它的局面有效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: TileId,
    pub to: TileId,
    pub effect: Effect,
}

impl Move {
    pub fn new(from: TileId, to: TileId, effect: Effect) -> Self {
        Self { from, to, effect }
    }

    /// 此走法是否威胁目标格（用于将军表）
    pub fn threatens(&self) -> bool {
        matches!(self.effect, Effect::Step)
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// 滑行棋子允许的方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rays {
    All,
    Axes,
    Diagonals,
}

impl Rays {
    fn admits(self, topo: &Topology, vector: Vector) -> bool {
        match self {
            Rays::All => true,
            Rays::Axes => is_axis(topo, vector),
            Rays::Diagonals => {
                topo.is_angle(vector, EAST, 0.125) || topo.is_angle(vector, EAST, 0.375)
            }
        }
    }
}

/// 兵的斜前方：与前进方向夹角在 (0, 1/4) 圈之间
fn is_pawn_diagonal(topo: &Topology, vector: Vector, ahead: Vector) -> bool {
    let eps = topo.epsilon();
    let fraction = topo.turn_fraction(vector, ahead);
    fraction > eps && fraction < 0.25 - eps
}

fn is_axis(topo: &Topology, vector: Vector) -> bool {
    [0.0, 0.25, 0.5]
        .iter()
        .any(|&fraction| topo.is_angle(vector, EAST, fraction))
}

/// 玩家的前进方向：玩家 0 向 +y，其余向 -y
fn forward(owner: usize) -> Vector {
    Vector::new(0.0, if owner == 0 { 1.0 } else { -1.0 })
}

/// 滑行走法（后、车、象）
///
/// 广度优先：弹出一个格子就产出它，只有空格才继续沿反向（半圈）
/// 的出边延伸。有子的格子可以作为吃子目标，但射线到此为止。
struct Slide<'a> {
    topo: &'a Topology,
    origin: TileId,
    rays: Rays,
    /// 待访问的格子及进入它时的回指向量
    frontier: VecDeque<(TileId, Vector)>,
}

impl<'a> Slide<'a> {
    fn new(topo: &'a Topology, origin: TileId, rays: Rays) -> Self {
        let frontier = topo
            .neighbors(origin)
            .iter()
            .filter(|(_, out)| rays.admits(topo, *out))
            .map(|&(tile, out)| (tile, -out))
            .collect();

        Self {
            topo,
            origin,
            rays,
            frontier,
        }
    }
}

impl Iterator for Slide<'_> {
    type Item = Move;

    fn next(&mut self) -> Option<Move> {
        let topo = self.topo;
        let (tile, vec_in) = self.frontier.pop_front()?;

        if topo.piece(tile).is_none() {
            for &(next, vec_out) in topo.neighbors(tile) {
                if self.rays.admits(topo, vec_out) && topo.is_angle(vec_in, vec_out, 0.5) {
                    self.frontier.push_back((next, -vec_out));
                }
            }
        }

        Some(Move::new(self.origin, tile, Effect::Step))
    }
}

/// 走法生成器
pub struct MoveGenerator;

impl MoveGenerator {
    /// 生成 `from` 上棋子的伪合法走法（不考虑自身被将军）
    pub fn moves<'a>(
        topo: &'a Topology,
        from: TileId,
        piece: Piece,
        turn: u32,
    ) -> Box<dyn Iterator<Item = Move> + 'a> {
        match piece.shape {
            Shape::King => Box::new(
                Self::king_moves(topo, from, piece).chain(Self::castling(topo, from, piece)),
            ),
            Shape::Queen => Box::new(Slide::new(topo, from, Rays::All)),
            Shape::Rook => Box::new(Slide::new(topo, from, Rays::Axes)),
            Shape::Bishop => Box::new(Slide::new(topo, from, Rays::Diagonals)),
            Shape::Knight => Box::new(Self::knight_moves(topo, from).into_iter()),
            Shape::Pawn => Box::new(
                Self::pawn_moves(topo, from, piece)
                    .into_iter()
                    .chain(Self::en_passant(topo, from, piece, turn)),
            ),
        }
    }

    /// 棋子威胁的格子
    ///
    /// 王不过滤受攻击的格子，也不包括易位；兵威胁两个斜前方格，无论是否有子；
    /// 其他棋子只保留可吃子的走法。
    pub fn attacks<'a>(
        topo: &'a Topology,
        from: TileId,
        piece: Piece,
        turn: u32,
    ) -> Box<dyn Iterator<Item = TileId> + 'a> {
        match piece.shape {
            Shape::King => Box::new(topo.neighbors(from).iter().map(|&(tile, _)| tile)),
            Shape::Pawn => {
                let ahead = forward(piece.owner);
                Box::new(
                    topo.neighbors(from)
                        .iter()
                        .filter(move |&&(_, vector)| is_pawn_diagonal(topo, vector, ahead))
                        .map(|&(tile, _)| tile),
                )
            }
            _ => Box::new(
                Self::moves(topo, from, piece, turn)
                    .filter(|mv| mv.threatens())
                    .map(|mv| mv.to),
            ),
        }
    }

    /// 王：所有相邻格，去掉当前被对手攻击的格子
    fn king_moves<'a>(
        topo: &'a Topology,
        from: TileId,
        king: Piece,
    ) -> impl Iterator<Item = Move> + 'a {
        topo.neighbors(from)
            .iter()
            .filter(move |&&(to, _)| {
                !topo.tile(to).is_some_and(|tile| tile.threatened_for(king.owner))
            })
            .map(move |&(to, _)| Move::new(from, to, Effect::Step))
    }

    /// 王车易位
    fn castling(topo: &Topology, from: TileId, king: Piece) -> Vec<Move> {
        let mut moves = Vec::new();

        let Some(origin) = topo.tile(from) else {
            return moves;
        };
        if king.has_moved() || origin.threatened_for(king.owner) {
            return moves;
        }

        for &(first, vector) in topo.neighbors(from) {
            // 只沿直线易位
            if !is_axis(topo, vector) {
                continue;
            }
            let (path, blocker) = Self::walk(topo, first, -vector);

            let Some(rook_from) = blocker else {
                continue;
            };
            let Some(rook) = topo.piece(rook_from) else {
                continue;
            };
            if !rook.is(Shape::Rook) || rook.owner != king.owner || rook.has_moved() {
                continue;
            }
            if path.len() < 2 {
                continue;
            }

            // 王经过的两格都不能被攻击
            let crossed = path[0];
            let landing = path[1];
            let unsafe_path = [crossed, landing].iter().any(|&tile| {
                topo.tile(tile)
                    .is_some_and(|t| t.threatened_for(king.owner))
            });
            if unsafe_path {
                continue;
            }

            moves.push(Move::new(
                from,
                landing,
                Effect::Castle {
                    rook_from,
                    rook_to: crossed,
                },
            ));
        }

        moves
    }

    /// 从 `first` 开始沿直线延伸，返回途经的空格和遇到的第一个有子格
    fn walk(topo: &Topology, first: TileId, vec_in: Vector) -> (Vec<TileId>, Option<TileId>) {
        let mut empty = Vec::new();
        let mut current = first;
        let mut vec_in = vec_in;

        // 环形拓扑上最多绕一圈
        while empty.len() < topo.len() {
            if topo.piece(current).is_some() {
                return (empty, Some(current));
            }
            empty.push(current);

            let next = topo
                .neighbors(current)
                .iter()
                .find(|&&(_, out)| topo.is_angle(vec_in, out, 0.5));
            let Some(&(tile, out)) = next else {
                break;
            };
            current = tile;
            vec_in = -out;
        }

        (empty, None)
    }

    /// 马：直行一步、沿原方向再走一步、然后转四分之一圈
    fn knight_moves(topo: &Topology, from: TileId) -> Vec<Move> {
        let mut moves = Vec::new();

        for &(step1, out0) in topo.neighbors(from) {
            if !is_axis(topo, out0) {
                continue;
            }
            let in1 = -out0;

            for &(step2, out1) in topo.neighbors(step1) {
                if !topo.is_angle(in1, out1, 0.5) {
                    continue;
                }
                let in2 = -out1;

                for &(end, out2) in topo.neighbors(step2) {
                    if topo.is_angle(in2, out2, 0.25) {
                        moves.push(Move::new(from, end, Effect::Step));
                    }
                }
            }
        }

        moves
    }

    /// 兵：直进、首次两格、斜吃
    fn pawn_moves(topo: &Topology, from: TileId, pawn: Piece) -> Vec<Move> {
        let mut moves = Vec::new();
        let ahead = forward(pawn.owner);

        for &(to, vector) in topo.neighbors(from) {
            let occupied = topo.piece(to).is_some();

            if topo.is_angle(vector, ahead, 0.0) {
                if occupied {
                    continue;
                }
                moves.push(Move::new(from, to, Effect::Advance));

                if !pawn.has_moved() {
                    for &(beyond, out) in topo.neighbors(to) {
                        if topo.is_angle(-vector, out, 0.5) && topo.piece(beyond).is_none() {
                            moves.push(Move::new(from, beyond, Effect::DoubleStep));
                        }
                    }
                }
            } else if occupied && is_pawn_diagonal(topo, vector, ahead) {
                moves.push(Move::new(from, to, Effect::Step));
            }
        }

        moves
    }

    /// 吃过路兵：侧面的敌方兵上一步刚走了两格
    fn en_passant(topo: &Topology, from: TileId, pawn: Piece, turn: u32) -> Vec<Move> {
        let mut moves = Vec::new();
        let Some(previous) = turn.checked_sub(1) else {
            return moves;
        };
        let ahead = forward(pawn.owner);

        for &(side, vector) in topo.neighbors(from) {
            if !topo.is_angle(vector, ahead, 0.25) {
                continue;
            }
            let Some(passed) = topo.piece(side) else {
                continue;
            };
            if !passed.is(Shape::Pawn)
                || passed.owner == pawn.owner
                || passed.passant != Some(previous)
            {
                continue;
            }

            for &(target, out) in topo.neighbors(side) {
                if topo.is_angle(out, ahead, 0.0)
                    && topo.piece(target).is_none()
                    && topo.vector(from, target).is_some()
                {
                    moves.push(Move::new(from, target, Effect::EnPassant { captured: side }));
                }
            }
        }

        moves
    }
}
