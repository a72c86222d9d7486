//! The actor that owns the connection state.
//!
//! 拥有连接状态的 actor。

use super::{
    attempt::run_attempt,
    command::{AttemptOutcome, LifecycleCommand},
    countdown::RetryCountdown,
    events::{AttemptTrigger, LifecycleEvent},
    state::{ConnectionSnapshot, Phase},
};
use crate::{
    backoff::RetryPolicy,
    cache::QueryCache,
    classify::should_auto_retry,
    client::ClientFactory,
    config::Config,
    error::ConnectError,
    identity::{Identity, IdentityState},
    secret::SecretSource,
};
use std::sync::Arc;
use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, info, trace, warn};

/// The attempt currently in flight.
struct InFlight {
    attempt: u64,
    /// Set when the identity changed after the attempt started.
    /// 尝试开始后身份发生变化时置位。
    stale: bool,
    task: JoinHandle<()>,
}

/// The actor that owns the connection state, the in-flight guard and the retry
/// timer.
///
/// It runs in a dedicated task and processes commands from the public
/// `ConnectionManager` handle, identity changes, settled attempts and the retry
/// deadline.
///
/// 拥有连接状态、进行中保护标志和重试计时器的 actor。
///
/// 它在专用任务中运行，处理来自公共 `ConnectionManager` 句柄的命令、身份变化、
/// 已完成的尝试以及重试截止时间。
pub(crate) struct LifecycleActor<F: ClientFactory> {
    factory: Arc<F>,
    cache: Option<Arc<dyn QueryCache>>,
    secret: Arc<dyn SecretSource>,
    config: Arc<Config>,
    policy: RetryPolicy,
    identity_rx: watch::Receiver<IdentityState>,
    state_tx: watch::Sender<ConnectionSnapshot<F::Client>>,
    events_tx: broadcast::Sender<LifecycleEvent>,
    command_rx: mpsc::Receiver<LifecycleCommand>,
    outcome_tx: mpsc::Sender<AttemptOutcome<F::Client>>,
    outcome_rx: mpsc::Receiver<AttemptOutcome<F::Client>>,

    /// `None` until the identity provider has settled for the first time.
    /// 在身份提供者首次稳定之前为 `None`。
    session: Option<Option<Identity>>,
    phase: Phase<F::Client>,
    in_flight: Option<InFlight>,
    pending_retry: Option<RetryCountdown>,
    retry_count: u32,
    last_attempt: u64,
}

impl<F: ClientFactory> LifecycleActor<F> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        factory: Arc<F>,
        cache: Option<Arc<dyn QueryCache>>,
        secret: Arc<dyn SecretSource>,
        config: Arc<Config>,
        identity_rx: watch::Receiver<IdentityState>,
        state_tx: watch::Sender<ConnectionSnapshot<F::Client>>,
        events_tx: broadcast::Sender<LifecycleEvent>,
        command_rx: mpsc::Receiver<LifecycleCommand>,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::channel(8);
        let policy = RetryPolicy::new(&config.retry);
        Self {
            factory,
            cache,
            secret,
            config,
            policy,
            identity_rx,
            state_tx,
            events_tx,
            command_rx,
            outcome_tx,
            outcome_rx,
            session: None,
            phase: Phase::Idle,
            in_flight: None,
            pending_retry: None,
            retry_count: 0,
            last_attempt: 0,
        }
    }

    /// Runs the actor's main event loop until disposed or every handle is gone.
    ///
    /// 运行 actor 的主事件循环，直到被释放或所有句柄都被丢弃。
    pub(crate) async fn run(mut self) {
        let initial = self.identity_rx.borrow_and_update().clone();
        self.apply_identity(initial);

        let mut identity_open = true;
        loop {
            let retry_wake = self
                .pending_retry
                .as_ref()
                .map(|countdown| countdown.next_wake(Instant::now()));

            tokio::select! {
                // 1. Commands from the public handle.
                // 1. 来自公共句柄的命令。
                command = self.command_rx.recv() => match command {
                    Some(LifecycleCommand::Retry) => self.manual_retry(),
                    Some(LifecycleCommand::Dispose { response_tx }) => {
                        self.dispose();
                        let _ = response_tx.send(());
                        break;
                    }
                    None => {
                        self.dispose();
                        break;
                    }
                },
                // 2. Settled attempts.
                // 2. 已完成的尝试。
                Some(outcome) = self.outcome_rx.recv() => self.handle_outcome(outcome),
                // 3. Identity changes.
                // 3. 身份变化。
                changed = self.identity_rx.changed(), if identity_open => {
                    if changed.is_err() {
                        debug!("Identity provider dropped; keeping the current identity");
                        identity_open = false;
                    } else {
                        let state = self.identity_rx.borrow_and_update().clone();
                        self.apply_identity(state);
                    }
                }
                // 4. Countdown ticks and the retry deadline.
                // 4. 倒计时刻度和重试截止时间。
                _ = tokio::time::sleep_until(retry_wake.unwrap_or_else(Instant::now)),
                    if retry_wake.is_some() => self.on_retry_timer(),
            }
        }
    }

    fn apply_identity(&mut self, state: IdentityState) {
        if state.initializing {
            debug!("Identity provider still initializing; not connecting yet");
            return;
        }
        let identity = state.authenticated_identity().cloned();
        if self.session.as_ref() == Some(&identity) {
            trace!("Identity notification without change; ignoring");
            return;
        }

        let trigger = if self.session.is_none() {
            AttemptTrigger::Initial
        } else {
            self.emit(LifecycleEvent::IdentityChanged {
                authenticated: identity.is_some(),
            });
            AttemptTrigger::IdentityChanged
        };
        info!(
            authenticated = identity.is_some(),
            ?trigger,
            "Starting connection session"
        );
        self.session = Some(identity);
        self.retry_count = 0;
        self.cancel_retry();

        match self.in_flight.as_mut() {
            Some(in_flight) => {
                debug!(
                    attempt = in_flight.attempt,
                    "Identity changed during an attempt; it will be replaced once it settles"
                );
                in_flight.stale = true;
            }
            None => self.start_attempt(trigger),
        }
    }

    fn manual_retry(&mut self) {
        if let Some(in_flight) = &self.in_flight {
            debug!(
                attempt = in_flight.attempt,
                "Manual retry ignored; an attempt is already in flight"
            );
            return;
        }
        if self.session.is_none() {
            debug!("Manual retry ignored; identity provider has not settled");
            return;
        }
        self.retry_count = 0;
        self.start_attempt(AttemptTrigger::Manual);
    }

    /// Starts an attempt unless one is in flight. Pending retry timers are
    /// cleared first.
    ///
    /// 除非已有尝试正在进行，否则开始一次尝试。会先清除挂起的重试计时器。
    fn start_attempt(&mut self, trigger: AttemptTrigger) {
        if self.in_flight.is_some() {
            trace!(?trigger, "Attempt already in flight; not starting another");
            return;
        }
        self.cancel_retry();

        self.last_attempt += 1;
        let attempt = self.last_attempt;
        let identity = self.session.clone().flatten();
        let factory = self.factory.clone();
        let secret = self.secret.clone();
        let timeout = self.config.connection.connect_timeout;
        let outcome_tx = self.outcome_tx.clone();

        let task = tokio::spawn(async move {
            let result = run_attempt(&*factory, identity.as_ref(), &*secret, timeout).await;
            let _ = outcome_tx.send(AttemptOutcome { attempt, result }).await;
        });
        self.in_flight = Some(InFlight {
            attempt,
            stale: false,
            task,
        });

        debug!(attempt, ?trigger, retry_count = self.retry_count, "Connection attempt started");
        self.phase = Phase::Connecting;
        self.publish();
        self.emit(LifecycleEvent::AttemptStarted {
            attempt,
            trigger,
            retry_count: self.retry_count,
        });
    }

    fn handle_outcome(&mut self, outcome: AttemptOutcome<F::Client>) {
        let current = self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.attempt == outcome.attempt);
        if !current {
            trace!(attempt = outcome.attempt, "Outcome of an abandoned attempt; dropping");
            return;
        }
        let Some(in_flight) = self.in_flight.take() else {
            return;
        };

        if in_flight.stale {
            debug!(attempt = outcome.attempt, "Discarding outcome made for a previous identity");
            self.emit(LifecycleEvent::AttemptDiscarded {
                attempt: outcome.attempt,
            });
            self.start_attempt(AttemptTrigger::IdentityChanged);
            return;
        }

        match outcome.result {
            Ok(client) => self.on_connected(outcome.attempt, client),
            Err(error) => self.on_failed(outcome.attempt, error),
        }
    }

    fn on_connected(&mut self, attempt: u64, client: F::Client) {
        info!(attempt, retries = self.retry_count, "Connected to the service");
        self.retry_count = 0;
        self.phase = Phase::Ready(Arc::new(client));
        self.publish();
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
        self.emit(LifecycleEvent::Connected { attempt });
    }

    fn on_failed(&mut self, attempt: u64, error: ConnectError) {
        let will_retry = should_auto_retry(&error) && self.policy.allows(self.retry_count);
        warn!(
            attempt,
            retry_count = self.retry_count,
            will_retry,
            error = %error,
            "Connection attempt failed"
        );
        self.phase = Phase::Failed(error.clone());

        if will_retry {
            let delay = self.policy.delay_for(self.retry_count);
            let mut countdown = RetryCountdown::new(
                Instant::now(),
                delay,
                self.config.retry.countdown_tick,
            );
            let seconds = countdown.remaining(Instant::now());
            countdown.publish(seconds);
            self.pending_retry = Some(countdown);
            self.publish();
            self.emit(LifecycleEvent::Failed {
                attempt,
                error,
                will_retry,
            });
            debug!(
                delay_ms = delay.as_millis() as u64,
                retry_count = self.retry_count,
                "Automatic retry scheduled"
            );
            self.emit(LifecycleEvent::RetryScheduled {
                delay,
                retry_count: self.retry_count,
            });
            self.emit(LifecycleEvent::RetryCountdown { seconds });
        } else {
            if self.retry_count >= self.policy.max_retries() {
                info!(
                    retry_count = self.retry_count,
                    "Automatic retries exhausted; waiting for a manual retry"
                );
            }
            self.publish();
            self.emit(LifecycleEvent::Failed {
                attempt,
                error,
                will_retry,
            });
        }
    }

    fn on_retry_timer(&mut self) {
        let now = Instant::now();
        let Some(countdown) = self.pending_retry.as_mut() else {
            return;
        };
        let seconds = countdown.remaining(now);
        let changed = countdown.publish(seconds);
        let due = countdown.is_due(now);

        if changed {
            self.publish();
            self.emit(LifecycleEvent::RetryCountdown { seconds });
        }
        if due {
            self.pending_retry = None;
            self.retry_count += 1;
            self.start_attempt(AttemptTrigger::Automatic);
        }
    }

    fn cancel_retry(&mut self) {
        if self.pending_retry.take().is_some() {
            debug!("Pending automatic retry cancelled");
            self.publish();
            self.emit(LifecycleEvent::RetryCancelled);
        }
    }

    fn dispose(&mut self) {
        self.cancel_retry();
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.task.abort();
        }
        info!("Connection manager disposed");
        self.emit(LifecycleEvent::Disposed);
    }

    fn publish(&self) {
        let next_retry_in_seconds = self
            .pending_retry
            .as_ref()
            .map(|countdown| countdown.remaining(Instant::now()));
        self.state_tx.send_replace(ConnectionSnapshot {
            phase: self.phase.clone(),
            retry_count: self.retry_count,
            next_retry_in_seconds,
            attempt: self.last_attempt,
        });
    }

    fn emit(&self, event: LifecycleEvent) {
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }
}
