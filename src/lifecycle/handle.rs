//! The user-facing handle to the lifecycle actor.

use super::{
    actor::LifecycleActor,
    command::LifecycleCommand,
    events::LifecycleEvent,
    state::{ConnectionSnapshot, ConnectionStatus},
};
use crate::{
    cache::QueryCache,
    client::{ClientFactory, RemoteClient},
    config::Config,
    error::{ConnectError, Error, Result},
    identity::IdentityState,
    secret::{NoSecret, SecretSource},
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// A handle to the connection lifecycle actor.
///
/// Cloning the handle is cheap; the actor stops once it is disposed or every
/// handle has been dropped.
///
/// 连接生命周期 actor 的句柄。
///
/// 克隆句柄的开销很小；actor 在被释放或所有句柄都被丢弃后停止。
pub struct ConnectionManager<C: RemoteClient> {
    command_tx: mpsc::Sender<LifecycleCommand>,
    state_rx: watch::Receiver<ConnectionSnapshot<C>>,
    events_tx: broadcast::Sender<LifecycleEvent>,
}

impl<C: RemoteClient> Clone for ConnectionManager<C> {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            state_rx: self.state_rx.clone(),
            events_tx: self.events_tx.clone(),
        }
    }
}

impl<C: RemoteClient> std::fmt::Debug for ConnectionManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &*self.state_rx.borrow())
            .finish()
    }
}

impl<C: RemoteClient> ConnectionManager<C> {
    /// Starts configuring a manager around `factory`.
    ///
    /// 开始围绕 `factory` 配置管理器。
    pub fn builder<F>(factory: F) -> ConnectionManagerBuilder<F>
    where
        F: ClientFactory<Client = C>,
    {
        ConnectionManagerBuilder::new(factory)
    }

    /// A copy of the current state.
    /// 当前状态的副本。
    pub fn snapshot(&self) -> ConnectionSnapshot<C> {
        self.state_rx.borrow().clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state_rx.borrow().status()
    }

    /// The ready client, if any.
    /// 就绪的客户端（如果有）。
    pub fn client(&self) -> Option<Arc<C>> {
        self.state_rx.borrow().client()
    }

    pub fn last_error(&self) -> Option<ConnectError> {
        self.state_rx.borrow().last_error().cloned()
    }

    /// A receiver that observes every published state.
    /// 观察每个已发布状态的接收器。
    pub fn subscribe(&self) -> watch::Receiver<ConnectionSnapshot<C>> {
        self.state_rx.clone()
    }

    /// Subscribes to lifecycle events from now on.
    /// 订阅从现在开始的生命周期事件。
    pub fn events(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events_tx.subscribe()
    }

    /// Requests a manual retry. Ignored while an attempt is in flight;
    /// otherwise resets the retry counter and connects immediately, cancelling
    /// any pending automatic retry.
    ///
    /// 请求手动重试。尝试进行中时被忽略；否则重置重试计数器并立即连接，
    /// 同时取消任何挂起的自动重试。
    pub async fn retry(&self) -> Result<()> {
        self.command_tx
            .send(LifecycleCommand::Retry)
            .await
            .map_err(|_| Error::Disposed)
    }

    /// Waits for the first state satisfying `predicate`, starting with the
    /// current one.
    ///
    /// 等待第一个满足 `predicate` 的状态，从当前状态开始检查。
    pub async fn wait_until(
        &self,
        mut predicate: impl FnMut(&ConnectionSnapshot<C>) -> bool,
    ) -> Result<ConnectionSnapshot<C>> {
        let mut rx = self.state_rx.clone();
        let snapshot = rx
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .map_err(|_| Error::Disposed)?;
        Ok(snapshot.clone())
    }

    /// Waits until the manager is ready, or failed with no automatic retry
    /// pending.
    ///
    /// 等待管理器就绪，或失败且没有挂起的自动重试。
    pub async fn wait_settled(&self) -> Result<ConnectionSnapshot<C>> {
        self.wait_until(ConnectionSnapshot::is_settled).await
    }

    /// Clears all timers and stops the actor. Returns once the actor has
    /// stopped. Other handles keep observing the last published state.
    ///
    /// 清除所有计时器并停止 actor。在 actor 停止后返回。
    /// 其他句柄仍可观察到最后发布的状态。
    pub async fn dispose(&self) -> Result<()> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(LifecycleCommand::Dispose { response_tx })
            .await
            .map_err(|_| Error::Disposed)?;
        response_rx.await.map_err(|_| Error::ChannelClosed)
    }
}

/// Configures and starts a [`ConnectionManager`].
///
/// 配置并启动 [`ConnectionManager`]。
pub struct ConnectionManagerBuilder<F: ClientFactory> {
    factory: F,
    identity_rx: Option<watch::Receiver<IdentityState>>,
    cache: Option<Arc<dyn QueryCache>>,
    secret: Arc<dyn SecretSource>,
    config: Config,
}

impl<F: ClientFactory> ConnectionManagerBuilder<F> {
    fn new(factory: F) -> Self {
        Self {
            factory,
            identity_rx: None,
            cache: None,
            secret: Arc::new(NoSecret),
            config: Config::default(),
        }
    }

    /// Follows the given identity feed. Without one the manager connects
    /// anonymously once and never reconnects on its own.
    ///
    /// 跟随给定的身份来源。没有身份来源时，管理器只匿名连接一次。
    pub fn identity(mut self, identity_rx: watch::Receiver<IdentityState>) -> Self {
        self.identity_rx = Some(identity_rx);
        self
    }

    /// Cache invalidated after every successful connect.
    /// 每次成功连接后失效的缓存。
    pub fn cache(mut self, cache: impl QueryCache) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    pub fn secret(mut self, secret: impl SecretSource) -> Self {
        self.secret = Arc::new(secret);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Spawns the lifecycle actor and returns its handle. The first attempt
    /// starts as soon as the identity provider has settled.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// 派生生命周期 actor 并返回其句柄。身份提供者稳定后立即开始第一次尝试。
    /// 必须在 tokio 运行时内调用。
    pub fn start(self) -> ConnectionManager<F::Client> {
        let identity_rx = self
            .identity_rx
            .unwrap_or_else(|| watch::channel(IdentityState::anonymous()).1);
        let (command_tx, command_rx) = mpsc::channel(32);
        let (state_tx, state_rx) = watch::channel(ConnectionSnapshot::idle());
        let (events_tx, _) = broadcast::channel(self.config.connection.event_capacity.max(1));

        let actor = LifecycleActor::new(
            Arc::new(self.factory),
            self.cache,
            self.secret,
            Arc::new(self.config),
            identity_rx,
            state_tx,
            events_tx.clone(),
            command_rx,
        );
        tokio::spawn(actor.run());

        ConnectionManager {
            command_tx,
            state_rx,
            events_tx,
        }
    }
}
