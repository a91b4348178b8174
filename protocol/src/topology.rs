//! 拓扑棋盘
//!
//! 棋盘是一张无向图：格子之间以方向向量相连。所有走法规则都只依赖
//! 向量之间的夹角，因此同一套规则可以运行在非笛卡尔的棋盘上。

use std::f64::consts::TAU;
use std::ops::Neg;

use serde::{Deserialize, Serialize};

use crate::constants::ANGLE_EPSILON;
use crate::error::RuleError;
use crate::piece::Piece;

/// 方向向量（只表示方向，不带单位）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(&self, other: Vector) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl Neg for Vector {
    type Output = Vector;

    fn neg(self) -> Vector {
        Vector::new(-self.x, -self.y)
    }
}

/// 格子编号
///
/// 即格子在拓扑扁平序列中的位置，联机时双方靠它互相定位格子。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub usize);

impl TileId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 将军表中的一项：从 `from` 出发、属于 `owner` 的棋子能走到此格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checker {
    pub from: TileId,
    pub owner: usize,
}

/// 格子
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    /// 占据此格的棋子
    pub piece: Option<Piece>,
    /// 相邻格及指向它的方向向量（按添加顺序）
    neighbors: Vec<(TileId, Vector)>,
    /// 每步重新计算的将军表
    pub checks: Vec<Checker>,
}

impl Tile {
    pub fn neighbors(&self) -> &[(TileId, Vector)] {
        &self.neighbors
    }

    /// 指向相邻格 `other` 的向量
    pub fn vector_to(&self, other: TileId) -> Option<Vector> {
        self.neighbors
            .iter()
            .find(|(id, _)| *id == other)
            .map(|(_, v)| *v)
    }

    /// 是否被 `owner` 的对手攻击
    pub fn threatened_for(&self, owner: usize) -> bool {
        self.checks.iter().any(|c| c.owner != owner)
    }

    fn set_neighbor(&mut self, other: TileId, vector: Vector) {
        match self.neighbors.iter_mut().find(|(id, _)| *id == other) {
            Some(entry) => entry.1 = vector,
            None => self.neighbors.push((other, vector)),
        }
    }
}

/// 图块：仅供渲染使用的一组格子及其基准格
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chart {
    pub base: TileId,
    pub tiles: Vec<TileId>,
}

/// 拓扑：所有格子的有序序列加上渲染用的图块
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    tiles: Vec<Tile>,
    charts: Vec<Chart>,
    /// 角度比较容差
    epsilon: f64,
}

impl Topology {
    /// 创建含 `count` 个孤立空格的拓扑
    pub fn with_tiles(count: usize) -> Self {
        Self {
            tiles: vec![Tile::default(); count],
            charts: Vec::new(),
            epsilon: ANGLE_EPSILON,
        }
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, tile: TileId) -> bool {
        tile.0 < self.tiles.len()
    }

    pub fn tile(&self, tile: TileId) -> Option<&Tile> {
        self.tiles.get(tile.0)
    }

    pub fn tile_mut(&mut self, tile: TileId) -> Option<&mut Tile> {
        self.tiles.get_mut(tile.0)
    }

    /// 指定格上的棋子
    pub fn piece(&self, tile: TileId) -> Option<Piece> {
        self.tile(tile).and_then(|t| t.piece)
    }

    /// 遍历所有格子
    pub fn iter(&self) -> impl Iterator<Item = (TileId, &Tile)> {
        self.tiles.iter().enumerate().map(|(i, t)| (TileId(i), t))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut()
    }

    /// 相邻格列表，未知格返回空
    pub fn neighbors(&self, tile: TileId) -> &[(TileId, Vector)] {
        self.tile(tile).map(Tile::neighbors).unwrap_or(&[])
    }

    /// 从 `from` 指向相邻格 `to` 的向量
    pub fn vector(&self, from: TileId, to: TileId) -> Option<Vector> {
        self.tile(from).and_then(|t| t.vector_to(to))
    }

    /// 建立对称的相邻关系：a→b 为 `vector`，b→a 为 `-vector`
    pub fn add_neighbor(&mut self, a: TileId, b: TileId, vector: Vector) -> Result<(), RuleError> {
        if a == b {
            return Err(RuleError::SelfNeighbor { tile: a });
        }
        for tile in [a, b] {
            if !self.contains(tile) {
                return Err(RuleError::UnknownTile { tile });
            }
        }

        self.tiles[a.0].set_neighbor(b, vector);
        self.tiles[b.0].set_neighbor(a, -vector);
        Ok(())
    }

    /// 检查所有边是否满足对称性
    pub fn is_symmetric(&self) -> bool {
        self.iter().all(|(id, tile)| {
            tile.neighbors().iter().all(|&(other, v)| {
                self.vector(other, id)
                    .is_some_and(|back| back == -v)
            })
        })
    }

    /// 两个向量之间的无符号夹角（弧度）
    pub fn angle(&self, a: Vector, b: Vector) -> f64 {
        let cos = a.dot(b) / a.norm() / b.norm();
        cos.clamp(-1.0, 1.0).acos()
    }

    /// 夹角占整圈的比例
    pub fn turn_fraction(&self, a: Vector, b: Vector) -> f64 {
        self.angle(a, b) / TAU
    }

    /// 夹角是否等于整圈的 `fraction`（在容差范围内）
    pub fn is_angle(&self, a: Vector, b: Vector, fraction: f64) -> bool {
        (self.turn_fraction(a, b) - fraction).abs() < self.epsilon
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn add_chart(&mut self, chart: Chart) {
        self.charts.push(chart);
    }

    pub fn charts(&self) -> &[Chart] {
        &self.charts
    }

    /// 包含指定格的所有图块
    pub fn charts_of(&self, tile: TileId) -> impl Iterator<Item = &Chart> {
        self.charts.iter().filter(move |c| c.tiles.contains(&tile))
    }
}
