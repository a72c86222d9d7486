//! tests/common/harness.rs
#![allow(dead_code)]

use async_trait::async_trait;
use journal_link::{
    ClientFactory, Config, LifecycleEvent, RemoteClient, RemoteError, cache::QueryCache,
    identity::Identity,
};
use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex, Once,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::sync::broadcast;
use tracing_subscriber::fmt::format::FmtSpan;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "journal_link=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_test_writer()
            .init();
    });
}

/// Default configuration with an event buffer large enough that slow test
/// readers never lag.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.connection.event_capacity = 1024;
    config
}

/// How one connection attempt behaves.
#[derive(Debug, Clone)]
pub struct Script {
    pub create_delay: Duration,
    pub create: Result<(), RemoteError>,
    pub probe: Result<(), RemoteError>,
    pub init: Result<(), RemoteError>,
}

impl Script {
    pub fn ok() -> Self {
        Self {
            create_delay: Duration::ZERO,
            create: Ok(()),
            probe: Ok(()),
            init: Ok(()),
        }
    }

    pub fn probe_err(message: &str) -> Self {
        Self {
            probe: Err(RemoteError::new(message)),
            ..Self::ok()
        }
    }

    pub fn init_err(message: &str) -> Self {
        Self {
            init: Err(RemoteError::new(message)),
            ..Self::ok()
        }
    }

    pub fn create_err(error: RemoteError) -> Self {
        Self {
            create: Err(error),
            ..Self::ok()
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }
}

/// Everything the scripted doubles observed.
#[derive(Debug, Default)]
pub struct CallLog {
    creates: AtomicUsize,
    active_creates: AtomicUsize,
    max_active_creates: AtomicUsize,
    probes: AtomicUsize,
    identities: Mutex<Vec<Option<String>>>,
    init_tokens: Mutex<Vec<Option<String>>>,
}

impl CallLog {
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn max_active_creates(&self) -> usize {
        self.max_active_creates.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn identities(&self) -> Vec<Option<String>> {
        self.identities.lock().unwrap().clone()
    }

    pub fn init_tokens(&self) -> Vec<Option<String>> {
        self.init_tokens.lock().unwrap().clone()
    }
}

pub struct FakeClient {
    script: Script,
    log: Arc<CallLog>,
}

#[async_trait]
impl RemoteClient for FakeClient {
    async fn health_check(&self) -> Result<(), RemoteError> {
        self.log.probes.fetch_add(1, Ordering::SeqCst);
        self.script.probe.clone()
    }

    async fn initialize_access(&self, token: Option<&str>) -> Result<(), RemoteError> {
        self.log
            .init_tokens
            .lock()
            .unwrap()
            .push(token.map(str::to_string));
        self.script.init.clone()
    }
}

/// Hands out scripted clients, one script per attempt. Once the queue is
/// empty every further attempt follows `fallback`.
pub struct ScriptedFactory {
    scripts: Mutex<VecDeque<Script>>,
    fallback: Script,
    log: Arc<CallLog>,
}

impl ScriptedFactory {
    pub fn new(scripts: Vec<Script>) -> (Self, Arc<CallLog>) {
        Self::with_fallback(scripts, Script::ok())
    }

    pub fn with_fallback(scripts: Vec<Script>, fallback: Script) -> (Self, Arc<CallLog>) {
        let log = Arc::new(CallLog::default());
        let factory = Self {
            scripts: Mutex::new(scripts.into()),
            fallback,
            log: log.clone(),
        };
        (factory, log)
    }
}

#[async_trait]
impl ClientFactory for ScriptedFactory {
    type Client = FakeClient;

    async fn create(&self, identity: Option<&Identity>) -> Result<FakeClient, RemoteError> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        self.log.creates.fetch_add(1, Ordering::SeqCst);
        self.log
            .identities
            .lock()
            .unwrap()
            .push(identity.map(|id| id.principal().to_string()));
        let active = self.log.active_creates.fetch_add(1, Ordering::SeqCst) + 1;
        self.log
            .max_active_creates
            .fetch_max(active, Ordering::SeqCst);

        tokio::time::sleep(script.create_delay).await;

        self.log.active_creates.fetch_sub(1, Ordering::SeqCst);
        script.create.clone()?;
        Ok(FakeClient {
            script,
            log: self.log.clone(),
        })
    }
}

/// A query cache that only counts invalidations.
#[derive(Debug, Default)]
pub struct CountingCache {
    invalidations: AtomicUsize,
}

impl CountingCache {
    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

impl QueryCache for CountingCache {
    fn invalidate_all(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Receives events until one matches `stop`, returning all of them.
pub async fn collect_until(
    rx: &mut broadcast::Receiver<LifecycleEvent>,
    mut stop: impl FnMut(&LifecycleEvent) -> bool,
) -> Vec<LifecycleEvent> {
    let mut events = Vec::new();
    loop {
        let event = rx.recv().await.expect("event stream lagged or closed");
        let done = stop(&event);
        events.push(event);
        if done {
            return events;
        }
    }
}

pub fn user(principal: &str) -> Identity {
    Identity::new(principal)
}
