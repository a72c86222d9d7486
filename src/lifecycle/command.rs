//! Commands sent from the public handle to the lifecycle actor.

use crate::error::ConnectError;
use tokio::sync::oneshot;

/// Commands sent to the `LifecycleActor`.
///
/// 发送到 `LifecycleActor` 的命令。
#[derive(Debug)]
pub(crate) enum LifecycleCommand {
    /// Manual retry: reset the retry counter and connect now, unless an
    /// attempt is already in flight.
    /// 手动重试：重置重试计数器并立即连接，除非已有尝试正在进行。
    Retry,
    /// Clear all timers and stop the actor.
    /// 清除所有计时器并停止 actor。
    Dispose { response_tx: oneshot::Sender<()> },
}

/// The settled result of a spawned attempt, tagged with its attempt number.
///
/// 已完成的派生尝试的结果，带有其尝试编号。
pub(crate) struct AttemptOutcome<C> {
    pub(crate) attempt: u64,
    pub(crate) result: Result<C, ConnectError>,
}
