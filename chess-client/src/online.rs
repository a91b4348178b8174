//! 联机走子同步
//!
//! 每条连接一个读取任务和一个写入任务：读取任务把对端点击转成
//! `Interrupt::Socket`，写入任务把工作任务转发的本地点击编码成帧。

use protocol::{
    check_board, check_seat, check_tile, Connection, Connector, FrameReader, FrameWriter,
    Listener, PeerMessage, ProtocolError, TcpConnection, TcpConnector, TcpListener, INTERRUPT_CAPACITY,
    RELAY_READ_SIZE,
};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::event_loop::{Interrupt, Interrupts, Seat};

/// 对端地址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PeerEndpoint {
    /// 主动连接对端，可指定本地端口
    Connect {
        remote: String,
        #[serde(default)]
        local_port: Option<u16>,
    },
    /// 等待对端连入
    Listen { addr: String },
    /// 经中继服务器的房间转发
    Relay { server: String, room: String },
}

impl PeerEndpoint {
    /// 建立到对端的连接
    pub async fn open(&self) -> protocol::Result<TcpConnection> {
        match self {
            PeerEndpoint::Connect { remote, local_port } => {
                let connector = match local_port {
                    Some(port) => TcpConnector::with_local_port(*port),
                    None => TcpConnector::new(),
                };
                let conn = connector.connect(remote).await?;
                info!("Connected to peer {}", remote);
                Ok(conn)
            }
            PeerEndpoint::Listen { addr } => {
                let mut listener = TcpListener::bind(addr).await?;
                info!("等待对端连接: {:?}", listener.local_addr());
                let conn = listener.accept().await?;
                info!("Peer connected from {:?}", conn.peer_addr());
                Ok(conn)
            }
            PeerEndpoint::Relay { server, room } => {
                validate_room(room)?;
                let mut stream = TcpConnector::new().open(server).await?;
                stream.write_all(format!("{}\n", room).as_bytes()).await?;
                info!("Joined room '{}' on relay {}", room, server);
                TcpConnection::from_stream(stream)
            }
        }
    }
}

/// 房间名必须非空、不含换行，并且能在中继的一次读取内读完
fn validate_room(room: &str) -> protocol::Result<()> {
    let reason = if room.is_empty() {
        "empty"
    } else if room.contains('\n') {
        "contains a newline"
    } else if room.len() >= RELAY_READ_SIZE {
        "too long"
    } else {
        return Ok(());
    };
    Err(ProtocolError::InvalidRoomName {
        reason: reason.to_string(),
    })
}

/// 一条联机连接上的读写任务
pub struct OnlineSession {
    local_player: usize,
    outbound: mpsc::Sender<PeerMessage>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl OnlineSession {
    /// 在已建立的连接上启动读写任务
    pub fn start(
        conn: TcpConnection,
        local_player: usize,
        tiles: usize,
        interrupts: Interrupts,
    ) -> Self {
        let (reader, writer) = conn.split();
        let (outbound, rx) = mpsc::channel(INTERRUPT_CAPACITY);
        let hello = PeerMessage::Hello {
            player: local_player,
            tiles,
        };

        let writer = tokio::spawn(write_loop(writer, rx, hello.clone()));
        let reader = tokio::spawn(read_loop(
            reader,
            local_player,
            tiles,
            interrupts,
            outbound.clone(),
            hello,
        ));

        Self {
            local_player,
            outbound,
            reader,
            writer,
        }
    }

    /// 工作任务使用的座位
    pub fn seat(&self) -> Seat {
        Seat {
            local_player: self.local_player,
            outbound: self.outbound.clone(),
        }
    }

    /// 读取任务是否已经结束（断线）
    pub fn is_disconnected(&self) -> bool {
        self.reader.is_finished()
    }

    /// 关闭连接
    pub fn shutdown(self) {
        self.reader.abort();
        self.writer.abort();
        debug!("Online session closed");
    }
}

async fn write_loop(
    mut writer: FrameWriter<OwnedWriteHalf>,
    mut rx: mpsc::Receiver<PeerMessage>,
    hello: PeerMessage,
) {
    if let Err(e) = writer.send(&hello).await {
        error!("Failed to send hello: {}", e);
        return;
    }

    while let Some(msg) = rx.recv().await {
        if let Err(e) = writer.send(&msg).await {
            error!("发送失败: {}", e);
            break;
        }
    }
}

async fn read_loop(
    mut reader: FrameReader<OwnedReadHalf>,
    local_player: usize,
    tiles: usize,
    interrupts: Interrupts,
    outbound: mpsc::Sender<PeerMessage>,
    hello: PeerMessage,
) {
    let mut greeted = false;

    loop {
        let msg: PeerMessage = match reader.recv().await {
            Ok(msg) => msg,
            Err(ProtocolError::ConnectionClosed) => {
                warn!("Peer disconnected");
                break;
            }
            Err(e) => {
                error!("Peer read failed: {}", e);
                break;
            }
        };

        match msg {
            PeerMessage::Hello {
                player,
                tiles: remote,
            } => {
                if let Err(e) = check_board(remote, tiles).and(check_seat(player, local_player)) {
                    error!("对端握手无效: {}", e);
                    break;
                }
                info!("对端加入，玩家 {}", player);

                // 经中继时先进房间的一方收不到后来者之前的握手，回应一次
                if !greeted {
                    greeted = true;
                    let _ = outbound.try_send(hello.clone());
                }
            }
            PeerMessage::Click { tile } => {
                let tile = match check_tile(tile, tiles) {
                    Ok(tile) => tile,
                    Err(e) => {
                        warn!("Dropping peer click: {}", e);
                        continue;
                    }
                };
                if interrupts.raise(Interrupt::Socket(tile)).await.is_err() {
                    debug!("Worker gone, stopping reader");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Game;
    use crate::testing::{next_draw, ChannelRenderer};
    use protocol::{standard_game, RectLayout};

    #[test]
    fn test_validate_room() {
        assert!(validate_room("lobby").is_ok());
        assert!(validate_room("").is_err());
        assert!(validate_room("a\nb").is_err());
        assert!(validate_room(&"x".repeat(RELAY_READ_SIZE)).is_err());
    }

    #[test]
    fn test_endpoint_config_format() {
        let endpoint: PeerEndpoint =
            serde_json::from_str(r#"{"kind":"connect","remote":"10.0.0.2:9527"}"#).unwrap();
        assert_eq!(
            endpoint,
            PeerEndpoint::Connect {
                remote: "10.0.0.2:9527".to_string(),
                local_port: None
            }
        );

        let endpoint: PeerEndpoint =
            serde_json::from_str(r#"{"kind":"relay","server":"relay:50002","room":"club"}"#)
                .unwrap();
        assert!(matches!(endpoint, PeerEndpoint::Relay { ref room, .. } if room == "club"));
    }

    #[tokio::test]
    async fn test_peers_stay_in_sync() {
        let layout = RectLayout::standard();
        let mut listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });
        let white_conn = PeerEndpoint::Connect {
            remote: addr,
            local_port: None,
        }
        .open()
        .await
        .unwrap();
        let black_conn = accept.await.unwrap();

        let (white_renderer, mut white_frames) = ChannelRenderer::new();
        let (black_renderer, mut black_frames) = ChannelRenderer::new();
        let white = Game::with_connection(standard_game().unwrap(), white_renderer, white_conn, 0, 8);
        let black = Game::with_connection(standard_game().unwrap(), black_renderer, black_conn, 1, 8);

        let click = |game: &Game, square: &str| {
            let interrupts = game.interrupts();
            let tile = layout.square(square).unwrap();
            async move { interrupts.click(tile).await.unwrap() }
        };

        click(&white, "e2").await;
        click(&white, "e4").await;
        assert_eq!(next_draw(&mut white_frames).await, 1);
        assert_eq!(next_draw(&mut black_frames).await, 1);

        // 轮到黑方
        click(&black, "d7").await;
        click(&black, "d5").await;
        assert_eq!(next_draw(&mut white_frames).await, 2);
        assert_eq!(next_draw(&mut black_frames).await, 2);

        let white_state = white.shutdown().await.unwrap();
        let black_state = black.shutdown().await.unwrap();
        assert_eq!(white_state, black_state);
        assert_eq!(white_state.turn(), 2);
    }

    #[tokio::test]
    async fn test_same_seat_disconnects() {
        let mut listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });
        let first_conn = TcpConnector::new().connect(&addr).await.unwrap();
        let second_conn = accept.await.unwrap();

        let (first_interrupts, mut first_rx) = crate::event_loop::channel(4);
        let (second_interrupts, _second_rx) = crate::event_loop::channel(4);
        // 双方都配置成玩家 0
        let first = OnlineSession::start(first_conn, 0, 64, first_interrupts);
        let second = OnlineSession::start(second_conn, 0, 64, second_interrupts);

        let closed = async {
            while !(first.is_disconnected() && second.is_disconnected()) {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(std::time::Duration::from_secs(5), closed)
            .await
            .expect("seat conflict not detected");

        // 冲突后对端点击不会进入中断通道
        assert!(first_rx.try_recv().is_err());
        first.shutdown();
        second.shutdown();
    }

    #[tokio::test]
    async fn test_peers_through_relay() {
        let layout = RectLayout::standard();
        let relay = relay_server::RelayServer::bind("127.0.0.1:0").await.unwrap();
        let server = relay.local_addr().unwrap().to_string();
        let registry = relay.registry();
        let relay_task = tokio::spawn(relay.run());

        let endpoint = PeerEndpoint::Relay {
            server,
            room: "club".to_string(),
        };
        let mut conns = Vec::new();
        for expected in 1..=2 {
            conns.push(endpoint.open().await.unwrap());
            let joined = async {
                while registry.member_count("club").await != expected {
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                }
            };
            tokio::time::timeout(std::time::Duration::from_secs(5), joined)
                .await
                .unwrap();
        }
        let black_conn = conns.pop().unwrap();
        let white_conn = conns.pop().unwrap();

        let (white_renderer, mut white_frames) = ChannelRenderer::new();
        let (black_renderer, mut black_frames) = ChannelRenderer::new();
        let white = Game::with_connection(standard_game().unwrap(), white_renderer, white_conn, 0, 8);
        let black = Game::with_connection(standard_game().unwrap(), black_renderer, black_conn, 1, 8);

        let interrupts = white.interrupts();
        interrupts.click(layout.square("g1").unwrap()).await.unwrap();
        interrupts.click(layout.square("f3").unwrap()).await.unwrap();
        assert_eq!(next_draw(&mut white_frames).await, 1);
        assert_eq!(next_draw(&mut black_frames).await, 1);

        let white_state = white.shutdown().await.unwrap();
        let black_state = black.shutdown().await.unwrap();
        assert_eq!(white_state, black_state);
        relay_task.abort();
    }
}
