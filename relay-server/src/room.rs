//! 房间系统
//!
//! 每个房间是一个独立任务，持有所有成员的写入端；每个成员有一个读取
//! 任务，把读到的字节原样交给房间任务转发给其他成员。房间在第一个成员
//! 加入时创建，最后一个成员离开后注销。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use protocol::RELAY_READ_SIZE;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 成员 ID
pub type MemberId = u64;

/// 房间任务的命令
enum RoomCommand {
    /// 新成员加入，`first` 是握手时随房间名一起读到的数据
    Join {
        id: MemberId,
        stream: TcpStream,
        first: Vec<u8>,
    },
    /// 成员发来的数据
    Payload { from: MemberId, bytes: Vec<u8> },
    /// 成员断开
    Left { id: MemberId },
    /// 查询成员数
    Count(oneshot::Sender<usize>),
}

type RoomTable = HashMap<String, mpsc::UnboundedSender<RoomCommand>>;

/// 房间成员
struct Member {
    writer: OwnedWriteHalf,
    reader: JoinHandle<()>,
}

/// 房间注册表
#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<Mutex<RoomTable>>,
    next_id: Arc<AtomicU64>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RoomTable> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 把连接加入房间，房间不存在时创建
    pub fn join(&self, room: &str, stream: TcpStream, first: Vec<u8>) -> MemberId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut command = RoomCommand::Join { id, stream, first };

        let mut rooms = self.lock();
        if let Some(tx) = rooms.get(room) {
            match tx.send(command) {
                Ok(()) => return id,
                // 房间任务已退出，重新创建
                Err(mpsc::error::SendError(returned)) => command = returned,
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(command);
        rooms.insert(room.to_string(), tx.clone());
        info!("房间创建: '{}'", room);

        tokio::spawn(run_room(room.to_string(), tx, rx, self.clone()));
        id
    }

    /// 当前房间数
    pub fn room_count(&self) -> usize {
        self.lock().len()
    }

    pub fn contains(&self, room: &str) -> bool {
        self.lock().contains_key(room)
    }

    /// 房间成员数，房间不存在时为 0
    pub async fn member_count(&self, room: &str) -> usize {
        let (reply, rx) = oneshot::channel();
        let sent = self
            .lock()
            .get(room)
            .is_some_and(|tx| tx.send(RoomCommand::Count(reply)).is_ok());
        if !sent {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

/// 房间任务
async fn run_room(
    name: String,
    tx: mpsc::UnboundedSender<RoomCommand>,
    mut rx: mpsc::UnboundedReceiver<RoomCommand>,
    registry: RoomRegistry,
) {
    let mut members: HashMap<MemberId, Member> = HashMap::new();
    let mut pending: Option<RoomCommand> = None;

    loop {
        let command = match pending.take() {
            Some(command) => command,
            None => match rx.recv().await {
                Some(command) => command,
                None => break,
            },
        };

        match command {
            RoomCommand::Join { id, stream, first } => {
                let (reader, writer) = stream.into_split();
                let reader = tokio::spawn(read_member(id, reader, tx.clone()));
                members.insert(id, Member { writer, reader });
                info!("Member {} joined room '{}' ({} members)", id, name, members.len());

                if !first.is_empty() {
                    broadcast(&name, &mut members, id, &first).await;
                }
            }
            RoomCommand::Payload { from, bytes } => {
                broadcast(&name, &mut members, from, &bytes).await;
            }
            RoomCommand::Left { id } => {
                if remove_member(&mut members, id) {
                    info!("Member {} left room '{}' ({} members)", id, name, members.len());
                }
            }
            RoomCommand::Count(reply) => {
                let _ = reply.send(members.len());
            }
        }

        if members.is_empty() {
            // 加入命令在持锁时发送，持锁检查队列即可避免丢失新成员
            let next = {
                let mut rooms = registry.lock();
                match rx.try_recv() {
                    Ok(command) => Some(command),
                    Err(_) => {
                        rooms.remove(&name);
                        None
                    }
                }
            };
            match next {
                Some(command) => pending = Some(command),
                None => break,
            }
        }
    }

    info!("房间关闭: '{}'", name);
}

/// 把数据原样转发给除发送者外的所有成员，写入失败的成员被移除
async fn broadcast(
    name: &str,
    members: &mut HashMap<MemberId, Member>,
    from: MemberId,
    bytes: &[u8],
) {
    let mut failed = Vec::new();

    for (&id, member) in members.iter_mut() {
        if id == from {
            continue;
        }
        if let Err(e) = member.writer.write_all(bytes).await {
            warn!("Write to member {} in room '{}' failed: {}", id, name, e);
            failed.push(id);
        }
    }

    for id in failed {
        remove_member(members, id);
    }
    debug!("Relayed {} bytes from member {} in room '{}'", bytes.len(), from, name);
}

fn remove_member(members: &mut HashMap<MemberId, Member>, id: MemberId) -> bool {
    match members.remove(&id) {
        Some(member) => {
            member.reader.abort();
            true
        }
        None => false,
    }
}

/// 成员读取任务
async fn read_member(
    id: MemberId,
    mut reader: OwnedReadHalf,
    tx: mpsc::UnboundedSender<RoomCommand>,
) {
    let mut buf = vec![0u8; RELAY_READ_SIZE];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let payload = RoomCommand::Payload {
                    from: id,
                    bytes: buf[..n].to_vec(),
                };
                if tx.send(payload).is_err() {
                    return;
                }
            }
            Err(e) => {
                debug!("Member {} read error: {}", id, e);
                break;
            }
        }
    }

    let _ = tx.send(RoomCommand::Left { id });
}
