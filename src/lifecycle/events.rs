//! 生命周期事件，用于诊断和界面提示。
//! Lifecycle events, for diagnostics and UI hints.

use crate::error::ConnectError;
use std::time::Duration;

/// Why a connection attempt was started.
///
/// 启动连接尝试的原因。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptTrigger {
    /// First attempt after the manager started.
    Initial,
    /// The caller identity changed.
    IdentityChanged,
    /// The user asked for a retry.
    Manual,
    /// The retry scheduler fired.
    Automatic,
}

/// Lifecycle event types.
///
/// 生命周期事件类型。
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// The identity used for new sessions changed.
    /// 用于新会话的身份发生了变化。
    IdentityChanged { authenticated: bool },
    /// An attempt started.
    /// 一次尝试已开始。
    AttemptStarted {
        attempt: u64,
        trigger: AttemptTrigger,
        retry_count: u32,
    },
    /// An attempt produced a ready client.
    /// 一次尝试产生了就绪的客户端。
    Connected { attempt: u64 },
    /// An attempt failed.
    /// 一次尝试失败。
    Failed {
        attempt: u64,
        error: ConnectError,
        will_retry: bool,
    },
    /// An attempt settled after the identity it was made for had changed; its
    /// outcome was dropped.
    ///
    /// 一次尝试在其对应身份变化后才完成；其结果被丢弃。
    AttemptDiscarded { attempt: u64 },
    /// An automatic retry was scheduled.
    /// 已安排一次自动重试。
    RetryScheduled { delay: Duration, retry_count: u32 },
    /// The countdown to the pending retry changed.
    /// 挂起重试的倒计时发生了变化。
    RetryCountdown { seconds: u64 },
    /// A pending automatic retry was cancelled.
    /// 挂起的自动重试被取消。
    RetryCancelled,
    /// The manager was disposed.
    /// 管理器已被释放。
    Disposed,
}
