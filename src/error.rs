//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use std::time::Duration;
use thiserror::Error;

/// Structured failure kinds a remote collaborator may attach to its errors.
///
/// When a collaborator cannot supply one, classification falls back to
/// matching the message text (see [`crate::classify`]).
///
/// 远程协作方可以附加在错误上的结构化失败类型。
/// 协作方无法提供时，分类会退回到匹配消息文本。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The remote service is stopped or stopping.
    /// 远程服务已停止或正在停止。
    Stopped,
    /// The remote service could not be reached.
    /// 无法访问远程服务。
    Unavailable,
    /// The caller is not allowed to perform the call.
    /// 调用方无权执行该调用。
    Unauthorized,
    /// The remote service has not finished its own initialization.
    /// 远程服务尚未完成自身初始化。
    Initializing,
    /// Anything else.
    /// 其他错误。
    Other,
}

/// An error returned by the remote-service client or its factory.
///
/// 由远程服务客户端或其工厂返回的错误。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RemoteError {
    /// Structured kind, if the collaborator supplied one.
    pub kind: Option<RemoteErrorKind>,
    /// Human readable message, kept verbatim for diagnostics.
    pub message: String,
}

impl RemoteError {
    /// Creates an error carrying only a message.
    /// 创建只带消息的错误。
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: None,
            message: message.into(),
        }
    }

    /// Creates an error with a structured kind.
    /// 创建带结构化类型的错误。
    pub fn with_kind(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            message: message.into(),
        }
    }
}

/// The normalized failure of one connection attempt, as stored in the
/// connection state.
///
/// 一次连接尝试的规范化失败，保存在连接状态中。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// The client factory failed to produce a client.
    /// 客户端工厂未能生成客户端。
    #[error("Failed to create the service client: {0}")]
    Construction(RemoteError),

    /// The liveness probe against a freshly created client failed.
    /// 对新创建客户端的存活探测失败。
    #[error("Health check failed: {0}")]
    HealthCheck(RemoteError),

    /// The privileged initialization failed in a way that usually clears up
    /// after the service settles. The message asks the user to refresh.
    ///
    /// 特权初始化以通常会在服务稳定后自行消失的方式失败。消息提示用户刷新页面。
    #[error("The service is still starting up. Please refresh the page and try again.")]
    InitializationPending(RemoteError),

    /// The privileged initialization failed for any other reason.
    /// 特权初始化因其他原因失败。
    #[error("Failed to initialize access control: {0}")]
    Initialization(RemoteError),

    /// Construction, probe and initialization did not settle in time.
    /// 构建、探测和初始化未能按时完成。
    #[error("Connection timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),
}

impl ConnectError {
    /// Returns the remote error underneath, if any.
    /// 返回底层的远程错误（如果有）。
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Construction(e)
            | Self::HealthCheck(e)
            | Self::InitializationPending(e)
            | Self::Initialization(e) => Some(e),
            Self::Timeout(_) => None,
        }
    }
}

/// The primary error type for operations on the lifecycle manager handle.
///
/// 生命周期管理器句柄操作的主要错误类型。
#[derive(Debug, Error)]
pub enum Error {
    /// The lifecycle task is gone; the manager was disposed or panicked.
    /// 生命周期任务已不存在；管理器已被释放或发生恐慌。
    #[error("Internal channel is broken")]
    ChannelClosed,

    /// The manager has been disposed.
    /// 管理器已被释放。
    #[error("Connection manager has been disposed")]
    Disposed,
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;
