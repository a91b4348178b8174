//! 客户端错误类型

use protocol::ProtocolError;
use thiserror::Error;

/// 客户端错误
#[derive(Error, Debug)]
pub enum ClientError {
    /// 中断通道已关闭（工作任务已退出）
    #[error("Interrupt channel closed")]
    ChannelClosed,

    /// 工作任务异常结束
    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    /// 协议错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// 客户端操作结果类型
pub type Result<T> = std::result::Result<T, ClientError>;
