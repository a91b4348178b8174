//! 协议常量定义

use std::time::Duration;

/// 协议版本号
pub const PROTOCOL_VERSION: u8 = 1;

/// 标准棋盘边长
pub const STANDARD_SIZE: usize = 8;

/// 默认玩家数
pub const DEFAULT_PLAYERS: usize = 2;

/// 单个棋子枚举走法的上限（防止环形拓扑上无限遍历）
pub const DEFAULT_MOVE_LIMIT: usize = 100;

/// 角度比较容差（以整圈的分数计）
pub const ANGLE_EPSILON: f64 = 1e-5;

/// 消息帧最大大小
pub const MAX_FRAME_SIZE: usize = 65536;

/// 广播中继默认端口
pub const RELAY_PORT: u16 = 50002;

/// 点对点对局默认端口
pub const PEER_PORT: u16 = 9527;

/// 中继单次读取的字节数（同时也是房间名的最大长度）
pub const RELAY_READ_SIZE: usize = 1024;

/// 中断通道默认容量
pub const INTERRUPT_CAPACITY: usize = 64;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);
