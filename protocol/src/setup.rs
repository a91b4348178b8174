//! 矩形棋盘布局与标准开局
//!
//! 矩形棋盘只是拓扑的一种：8 连通网格，格子编号为 `x * height + y`，
//! 整块棋盘是一个图块，基准格在中心。

use crate::error::RuleError;
use crate::piece::Piece;
use crate::state::GameState;
use crate::topology::{Chart, TileId, Topology, Vector};

/// 标准开局，第一行是最上方（玩家 1 一侧）
const STANDARD_ROWS: [&str; 8] = [
    "rnbqkbnr",
    "pppppppp",
    "........",
    "........",
    "........",
    "........",
    "PPPPPPPP",
    "RNBQKBNR",
];

/// 矩形网格布局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectLayout {
    pub width: usize,
    pub height: usize,
}

impl RectLayout {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// 8x8 国际象棋棋盘
    pub fn standard() -> Self {
        Self::new(crate::constants::STANDARD_SIZE, crate::constants::STANDARD_SIZE)
    }

    pub fn tile(&self, x: usize, y: usize) -> TileId {
        TileId(x * self.height + y)
    }

    pub fn coords(&self, tile: TileId) -> Option<(usize, usize)> {
        if tile.0 >= self.width * self.height {
            return None;
        }
        Some((tile.0 / self.height, tile.0 % self.height))
    }

    /// 代数记号（如 "e2"）对应的格子
    pub fn square(&self, name: &str) -> Option<TileId> {
        let mut chars = name.chars();
        let file = chars.next()?;
        let rank: usize = chars.as_str().parse().ok()?;
        if !file.is_ascii_lowercase() || rank == 0 {
            return None;
        }

        let x = (file as u8 - b'a') as usize;
        let y = rank - 1;
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.tile(x, y))
    }

    /// 格子的代数记号
    pub fn square_name(&self, tile: TileId) -> Option<String> {
        let (x, y) = self.coords(tile)?;
        let file = char::from(b'a'.checked_add(u8::try_from(x).ok()?)?);
        Some(format!("{}{}", file, y + 1))
    }

    /// 空棋盘拓扑
    pub fn topology(&self) -> Result<Topology, RuleError> {
        self.topology_with(|v| v)
    }

    /// 空棋盘拓扑，每条边的向量先经过 `map` 变换
    pub fn topology_with(&self, map: impl Fn(Vector) -> Vector) -> Result<Topology, RuleError> {
        let mut topo = Topology::with_tiles(self.width * self.height);

        for x in 0..self.width {
            for y in 0..self.height {
                let here = self.tile(x, y);

                // 每个格子只连向左、下、左下、右下，另一半由对称边补齐
                let mut edges = Vec::with_capacity(4);
                if x > 0 {
                    edges.push((self.tile(x - 1, y), Vector::new(-1.0, 0.0)));
                }
                if y > 0 {
                    edges.push((self.tile(x, y - 1), Vector::new(0.0, -1.0)));
                }
                if x > 0 && y > 0 {
                    edges.push((self.tile(x - 1, y - 1), Vector::new(-1.0, -1.0)));
                }
                if x + 1 < self.width && y > 0 {
                    edges.push((self.tile(x + 1, y - 1), Vector::new(1.0, -1.0)));
                }

                for (other, vector) in edges {
                    topo.add_neighbor(here, other, map(vector))?;
                }
            }
        }

        if !topo.is_empty() {
            topo.add_chart(Chart {
                base: self.tile(self.width / 2, self.height / 2),
                tiles: (0..topo.len()).map(TileId).collect(),
            });
        }

        Ok(topo)
    }

    /// 从字符行解析棋盘
    ///
    /// 第一行是最上方 (y = height - 1)；`.` 表示空格，大写为玩家 0，小写为玩家 1。
    pub fn parse<S: AsRef<str>>(&self, rows: &[S]) -> Result<Topology, RuleError> {
        if rows.len() != self.height {
            return Err(RuleError::InvalidLayout {
                reason: format!("expected {} rows, got {}", self.height, rows.len()),
            });
        }

        let mut topo = self.topology()?;
        for (row, line) in rows.iter().enumerate() {
            let line = line.as_ref();
            if line.chars().count() != self.width {
                return Err(RuleError::InvalidLayout {
                    reason: format!("row {} has {} columns", row, line.chars().count()),
                });
            }

            let y = self.height - 1 - row;
            for (x, c) in line.chars().enumerate() {
                if c == '.' {
                    continue;
                }
                let piece = Piece::from_char(c).ok_or_else(|| RuleError::InvalidLayout {
                    reason: format!("unknown piece '{}'", c),
                })?;
                if let Some(tile) = topo.tile_mut(self.tile(x, y)) {
                    tile.piece = Some(piece);
                }
            }
        }

        Ok(topo)
    }

    /// 将棋盘渲染为字符行（与 `parse` 相反）
    pub fn render(&self, topo: &Topology) -> Vec<String> {
        (0..self.height)
            .rev()
            .map(|y| {
                (0..self.width)
                    .map(|x| topo.piece(self.tile(x, y)).map_or('.', |p| p.to_char()))
                    .collect()
            })
            .collect()
    }
}

/// 标准开局的拓扑
pub fn standard_topology() -> Result<Topology, RuleError> {
    RectLayout::standard().parse(&STANDARD_ROWS)
}

/// 标准开局的对局
pub fn standard_game() -> Result<GameState, RuleError> {
    Ok(GameState::new(standard_topology()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::Shape;

    #[test]
    fn test_rect_topology() {
        let layout = RectLayout::new(3, 2);
        let topo = layout.topology().unwrap();

        assert_eq!(topo.len(), 6);
        assert!(topo.is_symmetric());
        // 角上 3 个邻居，中间 5 个
        assert_eq!(topo.neighbors(layout.tile(0, 0)).len(), 3);
        assert_eq!(topo.neighbors(layout.tile(1, 0)).len(), 5);
        assert_eq!(
            topo.vector(layout.tile(0, 0), layout.tile(1, 1)),
            Some(Vector::new(1.0, 1.0))
        );
        assert_eq!(topo.charts().len(), 1);
        assert_eq!(topo.charts()[0].base, layout.tile(1, 1));

        let lone = RectLayout::new(1, 1).topology().unwrap();
        assert_eq!(lone.len(), 1);
        assert!(lone.neighbors(TileId(0)).is_empty());
    }

    #[test]
    fn test_square_names() {
        let layout = RectLayout::standard();

        assert_eq!(layout.square("a1"), Some(TileId(0)));
        assert_eq!(layout.square("a2"), Some(TileId(1)));
        assert_eq!(layout.square("b1"), Some(TileId(8)));
        assert_eq!(layout.square("h8"), Some(TileId(63)));
        assert_eq!(layout.square("i1"), None);
        assert_eq!(layout.square("a9"), None);
        assert_eq!(layout.coords(TileId(12)), Some((1, 4)));
        assert_eq!(layout.square_name(TileId(12)).as_deref(), Some("b5"));
        assert_eq!(layout.square_name(TileId(64)), None);
    }

    #[test]
    fn test_standard_setup() {
        let layout = RectLayout::standard();
        let topo = standard_topology().unwrap();

        let king = topo.piece(layout.tile(4, 0)).unwrap();
        assert!(king.is(Shape::King));
        assert_eq!(king.owner, 0);

        let queen = topo.piece(layout.tile(3, 7)).unwrap();
        assert!(queen.is(Shape::Queen));
        assert_eq!(queen.owner, 1);

        for x in 0..8 {
            assert!(topo.piece(layout.tile(x, 1)).unwrap().is(Shape::Pawn));
            assert_eq!(topo.piece(layout.tile(x, 6)).unwrap().owner, 1);
        }
        assert_eq!(topo.iter().filter(|(_, t)| t.piece.is_some()).count(), 32);
        assert_eq!(layout.render(&topo), STANDARD_ROWS.to_vec());
    }

    #[test]
    fn test_parse_rejects_bad_rows() {
        let layout = RectLayout::new(2, 2);

        assert!(matches!(
            layout.parse(&["..", "..", ".."]),
            Err(RuleError::InvalidLayout { .. })
        ));
        assert!(matches!(layout.parse(&["...", ".."]), Err(RuleError::InvalidLayout { .. })));
        assert!(matches!(layout.parse(&["x.", ".."]), Err(RuleError::InvalidLayout { .. })));
    }
}
