//! 中断驱动的事件循环
//!
//! 唯一的工作任务持有对局状态，界面和网络只通过中断通道向它投递事件。

use protocol::{GameState, PeerMessage, TileId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::input::{ClickBuffer, ClickOutcome, Renderer};

/// 中断
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// 本地点击
    Click(TileId),
    /// 对端点击（由网络读取任务投递）
    Socket(TileId),
    /// 结束事件循环
    Exit,
}

/// 中断投递端，可以随意克隆
#[derive(Debug, Clone)]
pub struct Interrupts {
    tx: mpsc::Sender<Interrupt>,
}

impl Interrupts {
    pub async fn raise(&self, interrupt: Interrupt) -> Result<()> {
        self.tx
            .send(interrupt)
            .await
            .map_err(|_| ClientError::ChannelClosed)
    }

    /// 供非异步的界面线程使用，不能在运行时内部调用
    pub fn raise_blocking(&self, interrupt: Interrupt) -> Result<()> {
        self.tx
            .blocking_send(interrupt)
            .map_err(|_| ClientError::ChannelClosed)
    }

    pub async fn click(&self, tile: TileId) -> Result<()> {
        self.raise(Interrupt::Click(tile)).await
    }

    pub async fn exit(&self) -> Result<()> {
        self.raise(Interrupt::Exit).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// 创建有界中断通道
pub fn channel(capacity: usize) -> (Interrupts, mpsc::Receiver<Interrupt>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (Interrupts { tx }, rx)
}

/// 联机对局中本端的座位
#[derive(Debug, Clone)]
pub struct Seat {
    /// 本端执棋的玩家序号
    pub local_player: usize,
    /// 发往对端的消息
    pub outbound: mpsc::Sender<PeerMessage>,
}

/// 中断处理方式
#[derive(Debug, Clone)]
pub enum Mode {
    /// 本地对局，所有点击都直接处理
    Local,
    /// 联机对局
    Online(Seat),
}

/// 工作任务
pub struct Worker<R> {
    state: GameState,
    buffer: ClickBuffer,
    renderer: R,
    mode: Mode,
}

impl<R: Renderer> Worker<R> {
    pub fn new(state: GameState, renderer: R, mode: Mode) -> Self {
        Self {
            state,
            buffer: ClickBuffer::new(),
            renderer,
            mode,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// 处理一个点击类中断，被忽略时返回 `None`
    pub fn handle(&mut self, interrupt: Interrupt) -> Option<ClickOutcome> {
        let tile = match interrupt {
            Interrupt::Click(tile) | Interrupt::Socket(tile) => tile,
            Interrupt::Exit => return None,
        };
        if !self.state.topology().contains(tile) {
            warn!("Ignoring click on unknown tile {}", tile);
            return None;
        }

        let current = self.state.current_player();
        match (&self.mode, interrupt) {
            (Mode::Local, Interrupt::Click(_)) => {}
            (Mode::Local, _) => {
                debug!("本地对局忽略网络中断 {}", tile);
                return None;
            }
            (Mode::Online(seat), Interrupt::Click(_)) => {
                if current != seat.local_player {
                    debug!("Not our turn, click {} ignored", tile);
                    return None;
                }
                if let Err(e) = seat.outbound.try_send(PeerMessage::click(tile)) {
                    warn!("Failed to forward click {}: {}", tile, e);
                }
            }
            (Mode::Online(seat), _) => {
                // 自己的回合收到的网络点击是回声
                if current == seat.local_player {
                    debug!("Ignoring peer click {} on our turn", tile);
                    return None;
                }
            }
        }

        Some(self.buffer.put(&mut self.state, tile, &mut self.renderer))
    }

    /// 运行事件循环，直到收到 `Exit` 或通道关闭
    pub async fn run(mut self, mut rx: mpsc::Receiver<Interrupt>) -> GameState {
        info!("事件循环启动");
        while let Some(interrupt) = rx.recv().await {
            if interrupt == Interrupt::Exit {
                info!("Exit requested at turn {}", self.state.turn());
                break;
            }
            self.handle(interrupt);
        }
        self.state
    }
}

/// 在 tokio 运行时上启动工作任务
pub fn spawn<R>(
    state: GameState,
    renderer: R,
    mode: Mode,
    capacity: usize,
) -> (Interrupts, JoinHandle<GameState>)
where
    R: Renderer + 'static,
{
    let (interrupts, rx) = channel(capacity);
    let worker = Worker::new(state, renderer, mode);
    let handle = tokio::spawn(worker.run(rx));
    (interrupts, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{next_draw, ChannelRenderer, RecordingRenderer};
    use protocol::{standard_game, RectLayout};

    fn squares(names: &[&str]) -> Vec<TileId> {
        let layout = RectLayout::standard();
        names.iter().map(|n| layout.square(n).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_local_game_loop() {
        let (renderer, mut frames) = ChannelRenderer::new();
        let (interrupts, handle) = spawn(standard_game().unwrap(), renderer, Mode::Local, 8);

        for tile in squares(&["e2", "e4", "e7", "e5"]) {
            interrupts.click(tile).await.unwrap();
        }
        assert_eq!(next_draw(&mut frames).await, 1);
        assert_eq!(next_draw(&mut frames).await, 2);

        interrupts.exit().await.unwrap();
        let state = handle.await.unwrap();
        assert_eq!(state.turn(), 2);
        assert!(interrupts.is_closed());
        assert!(interrupts.click(TileId(0)).await.is_err());
    }

    #[tokio::test]
    async fn test_loop_ends_when_raisers_dropped() {
        let (interrupts, handle) = spawn(
            standard_game().unwrap(),
            RecordingRenderer::default(),
            Mode::Local,
            1,
        );
        drop(interrupts);

        let state = handle.await.unwrap();
        assert_eq!(state.turn(), 0);
    }

    #[test]
    fn test_local_mode_ignores_socket() {
        let mut worker = Worker::new(standard_game().unwrap(), RecordingRenderer::default(), Mode::Local);
        let e2 = squares(&["e2"])[0];

        assert_eq!(worker.handle(Interrupt::Socket(e2)), None);
        assert_eq!(worker.handle(Interrupt::Click(TileId(999))), None);
        assert_eq!(worker.handle(Interrupt::Click(e2)), Some(ClickOutcome::Selected(e2)));
    }

    #[test]
    fn test_online_turn_gating() {
        let (outbound, mut sent) = mpsc::channel(8);
        let seat = Seat {
            local_player: 1,
            outbound,
        };
        let mut worker = Worker::new(
            standard_game().unwrap(),
            RecordingRenderer::default(),
            Mode::Online(seat),
        );
        let tiles = squares(&["e2", "e4", "e7", "e5"]);

        // 对端（玩家 0）的回合：本地点击被忽略，不转发
        assert_eq!(worker.handle(Interrupt::Click(tiles[0])), None);
        assert!(sent.try_recv().is_err());

        // 对端走子
        worker.handle(Interrupt::Socket(tiles[0]));
        worker.handle(Interrupt::Socket(tiles[1]));
        assert_eq!(worker.state().turn(), 1);

        // 本端回合：网络点击视为回声
        assert_eq!(worker.handle(Interrupt::Socket(tiles[2])), None);

        worker.handle(Interrupt::Click(tiles[2]));
        worker.handle(Interrupt::Click(tiles[3]));
        assert_eq!(worker.state().turn(), 2);
        assert_eq!(sent.try_recv().unwrap(), PeerMessage::click(tiles[2]));
        assert_eq!(sent.try_recv().unwrap(), PeerMessage::click(tiles[3]));
    }
}
