//! 棋子定义

use serde::{Deserialize, Serialize};

/// 棋子形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

impl Shape {
    /// 获取棋子字母（玩家 0 大写，其余小写）
    pub fn to_char(&self, owner: usize) -> char {
        let c = match self {
            Shape::King => 'k',
            Shape::Queen => 'q',
            Shape::Rook => 'r',
            Shape::Bishop => 'b',
            Shape::Knight => 'n',
            Shape::Pawn => 'p',
        };
        if owner == 0 {
            c.to_ascii_uppercase()
        } else {
            c
        }
    }

    /// 从字母解析（大写为玩家 0，小写为玩家 1）
    pub fn from_char(c: char) -> Option<(Shape, usize)> {
        let owner = if c.is_ascii_uppercase() { 0 } else { 1 };
        let shape = match c.to_ascii_lowercase() {
            'k' => Shape::King,
            'q' => Shape::Queen,
            'r' => Shape::Rook,
            'b' => Shape::Bishop,
            'n' => Shape::Knight,
            'p' => Shape::Pawn,
            _ => return None,
        };
        Some((shape, owner))
    }
}

/// 棋子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub shape: Shape,
    /// 所属玩家序号
    pub owner: usize,
    /// 首次移动时的回合数
    pub moved: Option<u32>,
    /// 兵走两格时的回合数（仅下一步可被吃过路兵）
    pub passant: Option<u32>,
}

impl Piece {
    /// 创建未移动过的新棋子
    pub fn new(shape: Shape, owner: usize) -> Self {
        Self {
            shape,
            owner,
            moved: None,
            passant: None,
        }
    }

    pub fn is(&self, shape: Shape) -> bool {
        self.shape == shape
    }

    pub fn has_moved(&self) -> bool {
        self.moved.is_some()
    }

    pub fn to_char(&self) -> char {
        self.shape.to_char(self.owner)
    }

    pub fn from_char(c: char) -> Option<Piece> {
        Shape::from_char(c).map(|(shape, owner)| Piece::new(shape, owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piece_char() {
        assert_eq!(Piece::new(Shape::King, 0).to_char(), 'K');
        assert_eq!(Piece::new(Shape::Knight, 1).to_char(), 'n');

        assert_eq!(Piece::from_char('Q'), Some(Piece::new(Shape::Queen, 0)));
        assert_eq!(Piece::from_char('p'), Some(Piece::new(Shape::Pawn, 1)));
        assert_eq!(Piece::from_char('x'), None);
    }

    #[test]
    fn test_new_piece_unmoved() {
        let rook = Piece::new(Shape::Rook, 1);
        assert!(!rook.has_moved());
        assert!(rook.passant.is_none());
        assert!(rook.is(Shape::Rook));
    }
}
