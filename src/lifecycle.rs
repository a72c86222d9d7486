//! 连接生命周期管理器：创建并维护一个通过健康检查的远程服务客户端。
//! Connection lifecycle manager: produces and maintains a single health-checked
//! remote-service client.
//!
//! The state machine is `idle → connecting → ready | error`. From `error` an
//! automatic or manual retry re-enters `connecting`; from `ready` only an
//! identity change does. At most one attempt is in flight at any time.
//!
//! 状态机为 `idle → connecting → ready | error`。从 `error` 出发，自动或手动重试
//! 会重新进入 `connecting`；从 `ready` 出发，只有身份变化才会。任意时刻最多只有
//! 一次尝试在进行。

mod actor;
mod attempt;
mod command;
mod countdown;
pub mod events;
mod handle;
pub mod state;

pub use events::{AttemptTrigger, LifecycleEvent};
pub use handle::{ConnectionManager, ConnectionManagerBuilder};
pub use state::{ConnectionSnapshot, ConnectionStatus};
