//! 中继服务器主逻辑

use std::net::SocketAddr;

use protocol::{ProtocolError, RELAY_READ_SIZE};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::room::RoomRegistry;

/// 多房间广播中继
pub struct RelayServer {
    listener: TcpListener,
    registry: RoomRegistry,
}

impl RelayServer {
    /// 绑定监听地址
    pub async fn bind(addr: &str) -> protocol::Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(ProtocolError::Io)?;
        Ok(Self {
            listener,
            registry: RoomRegistry::new(),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }

    pub fn registry(&self) -> RoomRegistry {
        self.registry.clone()
    }

    /// 接受连接直到任务被取消
    pub async fn run(self) -> protocol::Result<()> {
        info!("Relay listening on {:?}", self.local_addr());

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Accept failed: {}", e);
                    continue;
                }
            };
            debug!("新连接: {}", peer);

            let registry = self.registry.clone();
            tokio::spawn(handshake(stream, peer, registry));
        }
    }
}

/// 读取房间名并加入房间
async fn handshake(mut stream: TcpStream, peer: SocketAddr, registry: RoomRegistry) {
    let mut buf = vec![0u8; RELAY_READ_SIZE];
    let n = match stream.read(&mut buf).await {
        Ok(0) => {
            debug!("{} closed before naming a room", peer);
            return;
        }
        Ok(n) => n,
        Err(e) => {
            warn!("Handshake read from {} failed: {}", peer, e);
            return;
        }
    };

    let (room, first) = split_handshake(&buf[..n]);
    if room.is_empty() {
        warn!("{} sent an empty room name", peer);
        return;
    }

    let id = registry.join(&room, stream, first);
    info!("{} joined room '{}' as member {}", peer, room, id);
}

/// 拆分首次读取的数据：换行之前是房间名，之后的部分作为首条转发数据
///
/// 没有换行时整段都是房间名。
pub fn split_handshake(bytes: &[u8]) -> (String, Vec<u8>) {
    let (name, rest) = match bytes.iter().position(|&b| b == b'\n') {
        Some(i) => (&bytes[..i], bytes[i + 1..].to_vec()),
        None => (bytes, Vec::new()),
    };
    let name = String::from_utf8_lossy(name);
    (name.trim_end_matches('\r').to_string(), rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    async fn start() -> (SocketAddr, RoomRegistry, tokio::task::JoinHandle<protocol::Result<()>>) {
        let server = RelayServer::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let registry = server.registry();
        let handle = tokio::spawn(server.run());
        (addr, registry, handle)
    }

    async fn join(
        addr: SocketAddr,
        registry: &RoomRegistry,
        room: &str,
        expected: usize,
    ) -> TcpStream {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(format!("{}\n", room).as_bytes()).await.unwrap();

        let wait = async {
            while registry.member_count(room).await != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("join not registered");
        stream
    }

    #[test]
    fn test_split_handshake() {
        assert_eq!(split_handshake(b"lobby"), ("lobby".to_string(), Vec::new()));
        assert_eq!(split_handshake(b"lobby\n"), ("lobby".to_string(), Vec::new()));
        assert_eq!(split_handshake(b"lobby\r\nhi"), ("lobby".to_string(), b"hi".to_vec()));
        assert_eq!(split_handshake(b"\nhi"), (String::new(), b"hi".to_vec()));
    }

    #[tokio::test]
    async fn test_relay_end_to_end() {
        let (addr, registry, handle) = start().await;

        let mut a = join(addr, &registry, "lobby", 1).await;
        let mut b = join(addr, &registry, "lobby", 2).await;
        let mut c = join(addr, &registry, "other", 1).await;

        b.write_all(b"d7d5").await.unwrap();
        let mut buf = [0u8; 16];
        let n = tokio::time::timeout(Duration::from_secs(5), a.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], b"d7d5");

        assert!(tokio::time::timeout(Duration::from_millis(100), c.read(&mut buf))
            .await
            .is_err());

        handle.abort();
    }

    #[tokio::test]
    async fn test_empty_room_name_rejected() {
        let (addr, registry, handle) = start().await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"\n").await.unwrap();

        // 服务器直接关闭连接
        let mut buf = [0u8; 4];
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .unwrap()
            .unwrap_or(0);
        assert_eq!(n, 0);
        assert_eq!(registry.room_count(), 0);

        handle.abort();
    }
}
