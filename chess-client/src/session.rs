//! 对局会话
//!
//! 把对局状态、工作任务和（可选的）联机连接组装在一起。

use anyhow::Context;
use protocol::{standard_game, GameState, TcpConnection};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{ClientConfig, OnlineConfig};
use crate::error::Result;
use crate::event_loop::{self, Interrupts, Mode, Worker};
use crate::input::Renderer;
use crate::online::OnlineSession;

/// 运行中的对局
pub struct Game {
    interrupts: Interrupts,
    worker: JoinHandle<GameState>,
    online: Option<OnlineSession>,
}

impl Game {
    /// 本地对局
    pub fn local<R: Renderer + 'static>(state: GameState, renderer: R, capacity: usize) -> Self {
        let (interrupts, worker) = event_loop::spawn(state, renderer, Mode::Local, capacity);
        info!("Local game started");
        Self {
            interrupts,
            worker,
            online: None,
        }
    }

    /// 按配置连接对端后开始联机对局
    pub async fn online<R: Renderer + 'static>(
        state: GameState,
        renderer: R,
        config: &OnlineConfig,
        capacity: usize,
    ) -> anyhow::Result<Self> {
        let conn = config
            .endpoint
            .open()
            .await
            .with_context(|| format!("无法连接对端 {:?}", config.endpoint))?;
        Ok(Self::with_connection(
            state,
            renderer,
            conn,
            config.local_player,
            capacity,
        ))
    }

    /// 在已建立的连接上开始联机对局
    pub fn with_connection<R: Renderer + 'static>(
        state: GameState,
        renderer: R,
        conn: TcpConnection,
        local_player: usize,
        capacity: usize,
    ) -> Self {
        let (interrupts, rx) = event_loop::channel(capacity);
        let session = OnlineSession::start(
            conn,
            local_player,
            state.topology().len(),
            interrupts.clone(),
        );
        let worker = Worker::new(state, renderer, Mode::Online(session.seat()));
        let worker = tokio::spawn(worker.run(rx));
        info!("Online game started as player {}", local_player);

        Self {
            interrupts,
            worker,
            online: Some(session),
        }
    }

    /// 按配置开始标准开局
    pub async fn from_config<R: Renderer + 'static>(
        config: &ClientConfig,
        renderer: R,
    ) -> anyhow::Result<Self> {
        let state = standard_game()?.with_limit(config.move_limit);
        match &config.online {
            Some(online) => Self::online(state, renderer, online, config.interrupt_capacity).await,
            None => Ok(Self::local(state, renderer, config.interrupt_capacity)),
        }
    }

    /// 投递中断的句柄
    pub fn interrupts(&self) -> Interrupts {
        self.interrupts.clone()
    }

    /// 对端是否已断开
    pub fn is_disconnected(&self) -> bool {
        self.online
            .as_ref()
            .is_some_and(OnlineSession::is_disconnected)
    }

    /// 结束对局并返回最终状态
    pub async fn shutdown(self) -> Result<GameState> {
        // 工作任务可能已经退出，此时通道已关闭
        let _ = self.interrupts.exit().await;
        if let Some(session) = self.online {
            session.shutdown();
        }
        let state = self.worker.await?;
        info!("Game finished at turn {}", state.turn());
        Ok(state)
    }
}
