//! 输入处理
//!
//! 两段式点击：第一次点击选中格子，第二次点击尝试走子。

use protocol::{GameState, MoveOutcome, RuleError, TileId};
use tracing::{info, warn};

/// 格子的显示状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileColour {
    Idle,
    Selected,
}

/// 渲染协作者
///
/// 由界面层实现；实现方负责把调用转交给持有显示表面的线程。
pub trait Renderer: Send {
    /// 改变格子颜色
    fn colour(&mut self, tile: TileId, colour: TileColour);

    /// 重绘整个棋盘
    fn draw(&mut self, state: &GameState);

    /// 走子被拒绝
    fn rejected(&mut self, from: TileId, to: TileId, error: &RuleError) {
        let _ = (from, to, error);
    }
}

/// 一次点击的结果
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// 选中了起点
    Selected(TileId),
    /// 走子成功
    Moved(MoveOutcome),
    /// 走子被拒绝，棋盘不变
    Rejected {
        from: TileId,
        to: TileId,
        error: RuleError,
    },
}

/// 点击缓冲
#[derive(Debug, Default)]
pub struct ClickBuffer {
    pending: Option<TileId>,
}

impl ClickBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前选中的格子
    pub fn pending(&self) -> Option<TileId> {
        self.pending
    }

    /// 处理一次点击
    ///
    /// 第二次点击无论成败都会清除选中并重绘。
    pub fn put<R: Renderer + ?Sized>(
        &mut self,
        state: &mut GameState,
        tile: TileId,
        renderer: &mut R,
    ) -> ClickOutcome {
        let Some(from) = self.pending.take() else {
            renderer.colour(tile, TileColour::Selected);
            self.pending = Some(tile);
            return ClickOutcome::Selected(tile);
        };

        renderer.colour(from, TileColour::Idle);
        let outcome = match state.apply_move(from, tile) {
            Ok(moved) => {
                info!("Move {} played, turn {}", moved.mv, moved.turn);
                ClickOutcome::Moved(moved)
            }
            Err(error) => {
                warn!("走子被拒绝 {} -> {}: {}", from, tile, error);
                renderer.rejected(from, tile, &error);
                ClickOutcome::Rejected {
                    from,
                    to: tile,
                    error,
                }
            }
        };
        renderer.draw(state);

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Frame, RecordingRenderer};
    use protocol::{standard_game, RectLayout};

    #[test]
    fn test_two_phase_click() {
        let layout = RectLayout::standard();
        let mut state = standard_game().unwrap();
        let mut buffer = ClickBuffer::new();
        let mut renderer = RecordingRenderer::default();
        let e2 = layout.square("e2").unwrap();
        let e4 = layout.square("e4").unwrap();

        assert_eq!(buffer.put(&mut state, e2, &mut renderer), ClickOutcome::Selected(e2));
        assert_eq!(buffer.pending(), Some(e2));
        assert_eq!(renderer.frames, vec![Frame::Colour(e2, TileColour::Selected)]);

        let outcome = buffer.put(&mut state, e4, &mut renderer);
        assert!(matches!(outcome, ClickOutcome::Moved(ref m) if m.mv.to == e4 && m.turn == 1));
        assert_eq!(buffer.pending(), None);
        assert_eq!(
            renderer.frames[1..],
            [Frame::Colour(e2, TileColour::Idle), Frame::Draw(1)]
        );
    }

    #[test]
    fn test_rejected_click_clears_selection() {
        let layout = RectLayout::standard();
        let mut state = standard_game().unwrap();
        let snapshot = state.clone();
        let mut buffer = ClickBuffer::new();
        let mut renderer = RecordingRenderer::default();
        let e2 = layout.square("e2").unwrap();
        let e5 = layout.square("e5").unwrap();

        buffer.put(&mut state, e2, &mut renderer);
        let outcome = buffer.put(&mut state, e5, &mut renderer);

        assert_eq!(
            outcome,
            ClickOutcome::Rejected {
                from: e2,
                to: e5,
                error: RuleError::IllegalMove { from: e2, to: e5 }
            }
        );
        assert_eq!(buffer.pending(), None);
        assert_eq!(state, snapshot);
        assert_eq!(
            renderer.frames[1..],
            [
                Frame::Colour(e2, TileColour::Idle),
                Frame::Rejected(e2, e5),
                Frame::Draw(0)
            ]
        );
    }
}
