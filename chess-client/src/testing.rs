//! 测试用渲染器

use protocol::{GameState, RuleError, TileId};
use tokio::sync::mpsc;

use crate::input::{Renderer, TileColour};

/// 渲染器收到的一次调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Colour(TileId, TileColour),
    /// 重绘时的回合数
    Draw(u32),
    Rejected(TileId, TileId),
}

/// 记录所有调用
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub frames: Vec<Frame>,
}

impl Renderer for RecordingRenderer {
    fn colour(&mut self, tile: TileId, colour: TileColour) {
        self.frames.push(Frame::Colour(tile, colour));
    }

    fn draw(&mut self, state: &GameState) {
        self.frames.push(Frame::Draw(state.turn()));
    }

    fn rejected(&mut self, from: TileId, to: TileId, _error: &RuleError) {
        self.frames.push(Frame::Rejected(from, to));
    }
}

/// 把调用转发到通道，供异步测试等待
pub struct ChannelRenderer(pub mpsc::UnboundedSender<Frame>);

impl ChannelRenderer {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }
}

impl Renderer for ChannelRenderer {
    fn colour(&mut self, tile: TileId, colour: TileColour) {
        let _ = self.0.send(Frame::Colour(tile, colour));
    }

    fn draw(&mut self, state: &GameState) {
        let _ = self.0.send(Frame::Draw(state.turn()));
    }

    fn rejected(&mut self, from: TileId, to: TileId, _error: &RuleError) {
        let _ = self.0.send(Frame::Rejected(from, to));
    }
}

/// 等待下一次重绘，返回当时的回合数
pub async fn next_draw(rx: &mut mpsc::UnboundedReceiver<Frame>) -> u32 {
    let wait = async {
        loop {
            match rx.recv().await {
                Some(Frame::Draw(turn)) => return turn,
                Some(_) => continue,
                None => panic!("renderer dropped"),
            }
        }
    };
    tokio::time::timeout(std::time::Duration::from_secs(5), wait)
        .await
        .expect("timed out waiting for redraw")
}
