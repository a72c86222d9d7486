//! Defines the connection state published to the rest of the application.
//!
//! 定义发布给应用其余部分的连接状态。

use crate::error::ConnectError;
use std::{fmt, sync::Arc};

/// Coarse connection status the UI branches on.
///
/// 界面据以分支的粗粒度连接状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Nothing attempted yet.
    /// 尚未进行任何尝试。
    Idle,
    /// An attempt is in flight.
    /// 有一次尝试正在进行。
    Connecting,
    /// A health-checked client is available.
    /// 已有通过健康检查的客户端可用。
    Ready,
    /// The last attempt failed.
    /// 上一次尝试失败。
    Error,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the lifecycle currently is. Carrying the client and the error inside
/// the variants keeps "ready ⇔ client, no error" and "error ⇔ error, no
/// client" true by construction.
///
/// 生命周期当前所处的阶段。
pub(crate) enum Phase<C> {
    Idle,
    Connecting,
    Ready(Arc<C>),
    Failed(ConnectError),
}

impl<C> Clone for Phase<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Idle => Self::Idle,
            Self::Connecting => Self::Connecting,
            Self::Ready(client) => Self::Ready(client.clone()),
            Self::Failed(error) => Self::Failed(error.clone()),
        }
    }
}

impl<C> Phase<C> {
    fn status(&self) -> ConnectionStatus {
        match self {
            Self::Idle => ConnectionStatus::Idle,
            Self::Connecting => ConnectionStatus::Connecting,
            Self::Ready(_) => ConnectionStatus::Ready,
            Self::Failed(_) => ConnectionStatus::Error,
        }
    }
}

/// An immutable view of the connection state.
///
/// 连接状态的不可变视图。
pub struct ConnectionSnapshot<C> {
    pub(crate) phase: Phase<C>,
    pub(crate) retry_count: u32,
    pub(crate) next_retry_in_seconds: Option<u64>,
    pub(crate) attempt: u64,
}

impl<C> ConnectionSnapshot<C> {
    pub(crate) fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            retry_count: 0,
            next_retry_in_seconds: None,
            attempt: 0,
        }
    }

    /// The health-checked client, present only when ready.
    /// 通过健康检查的客户端，仅在就绪时存在。
    pub fn client(&self) -> Option<Arc<C>> {
        match &self.phase {
            Phase::Ready(client) => Some(client.clone()),
            _ => None,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.phase.status()
    }

    /// The failure of the last attempt, present only in the error state.
    /// 上一次尝试的失败，仅在错误状态下存在。
    pub fn last_error(&self) -> Option<&ConnectError> {
        match &self.phase {
            Phase::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self.phase, Phase::Connecting)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.phase, Phase::Ready(_))
    }

    pub fn has_error(&self) -> bool {
        matches!(self.phase, Phase::Failed(_))
    }

    /// Automatic retries made since the last manual retry, identity change or
    /// successful connect.
    ///
    /// 自上次手动重试、身份变化或成功连接以来的自动重试次数。
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Seconds until the pending automatic retry fires, if one is scheduled.
    /// 距离挂起的自动重试触发还剩的秒数（如果已安排）。
    pub fn next_retry_in_seconds(&self) -> Option<u64> {
        self.next_retry_in_seconds
    }

    /// Number of the most recent attempt; 0 before the first one.
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// True when the state will not change without outside input: ready, or
    /// failed with no automatic retry pending.
    ///
    /// 在没有外部输入时状态不会再变化：已就绪，或失败且没有挂起的自动重试。
    pub fn is_settled(&self) -> bool {
        match self.phase {
            Phase::Ready(_) => true,
            Phase::Failed(_) => self.next_retry_in_seconds.is_none(),
            Phase::Idle | Phase::Connecting => false,
        }
    }
}

impl<C> Clone for ConnectionSnapshot<C> {
    fn clone(&self) -> Self {
        Self {
            phase: self.phase.clone(),
            retry_count: self.retry_count,
            next_retry_in_seconds: self.next_retry_in_seconds,
            attempt: self.attempt,
        }
    }
}

impl<C> fmt::Debug for ConnectionSnapshot<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSnapshot")
            .field("status", &self.status())
            .field("last_error", &self.last_error())
            .field("retry_count", &self.retry_count)
            .field("next_retry_in_seconds", &self.next_retry_in_seconds)
            .field("attempt", &self.attempt)
            .finish()
    }
}
