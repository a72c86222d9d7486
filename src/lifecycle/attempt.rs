//! 单次连接尝试：构建客户端、健康检查、可选的特权初始化，整体受超时约束。
//! One connection attempt: construct the client, health check it, optionally
//! run the privileged initialization, all bounded by a single timeout.

use crate::{
    classify::wrap_init_failure,
    client::{ClientFactory, RemoteClient},
    error::ConnectError,
    identity::Identity,
    secret::SecretSource,
};
use std::time::Duration;
use tracing::{debug, trace};

/// Runs construction → probe → (if authenticated) initialization.
///
/// When `timeout` elapses first the chain is dropped and a timeout error is
/// returned; nothing the chain would have produced afterwards is observed.
///
/// 依次执行构建 → 探测 →（已认证时）初始化。
/// 若先超时，则丢弃该链并返回超时错误；之后该链可能产生的任何结果都不会被观察到。
pub(crate) async fn run_attempt<F: ClientFactory>(
    factory: &F,
    identity: Option<&Identity>,
    secret: &dyn SecretSource,
    timeout: Duration,
) -> Result<F::Client, ConnectError> {
    let chain = async {
        let client = factory
            .create(identity)
            .await
            .map_err(ConnectError::Construction)?;
        trace!(authenticated = identity.is_some(), "Client constructed");

        client
            .health_check()
            .await
            .map_err(ConnectError::HealthCheck)?;
        trace!("Health check passed");

        if identity.is_some() {
            let token = secret.secret();
            debug!(with_token = token.is_some(), "Initializing access");
            client
                .initialize_access(token.as_deref())
                .await
                .map_err(wrap_init_failure)?;
        }
        Ok(client)
    };

    match tokio::time::timeout(timeout, chain).await {
        Ok(result) => result,
        Err(_) => Err(ConnectError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::RemoteError, secret::StaticSecret};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Calls {
        probes: usize,
        inits: Vec<Option<String>>,
    }

    struct FakeClient {
        calls: Arc<Mutex<Calls>>,
        probe: Result<(), RemoteError>,
        init: Result<(), RemoteError>,
    }

    #[async_trait]
    impl RemoteClient for FakeClient {
        async fn health_check(&self) -> Result<(), RemoteError> {
            self.calls.lock().unwrap().probes += 1;
            self.probe.clone()
        }

        async fn initialize_access(&self, token: Option<&str>) -> Result<(), RemoteError> {
            self.calls
                .lock()
                .unwrap()
                .inits
                .push(token.map(str::to_string));
            self.init.clone()
        }
    }

    struct FakeFactory {
        calls: Arc<Mutex<Calls>>,
        delay: Duration,
        probe: Result<(), RemoteError>,
        init: Result<(), RemoteError>,
    }

    impl FakeFactory {
        fn ok() -> Self {
            Self {
                calls: Arc::default(),
                delay: Duration::ZERO,
                probe: Ok(()),
                init: Ok(()),
            }
        }
    }

    #[async_trait]
    impl ClientFactory for FakeFactory {
        type Client = FakeClient;

        async fn create(&self, _identity: Option<&Identity>) -> Result<FakeClient, RemoteError> {
            tokio::time::sleep(self.delay).await;
            Ok(FakeClient {
                calls: self.calls.clone(),
                probe: self.probe.clone(),
                init: self.init.clone(),
            })
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(30);

    #[tokio::test(start_paused = true)]
    async fn test_anonymous_attempt_skips_initialization() {
        let factory = FakeFactory::ok();
        let result = run_attempt(&factory, None, &StaticSecret::new("tok"), TIMEOUT).await;

        assert!(result.is_ok());
        let calls = factory.calls.lock().unwrap();
        assert_eq!(calls.probes, 1);
        assert!(calls.inits.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_authenticated_attempt_passes_token() {
        let factory = FakeFactory::ok();
        let identity = Identity::new("user-1");
        let result =
            run_attempt(&factory, Some(&identity), &StaticSecret::new("tok"), TIMEOUT).await;

        assert!(result.is_ok());
        assert_eq!(
            factory.calls.lock().unwrap().inits,
            vec![Some("tok".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_failure_skips_initialization() {
        let factory = FakeFactory {
            probe: Err(RemoteError::new("replica unreachable")),
            ..FakeFactory::ok()
        };
        let identity = Identity::new("user-1");
        let result =
            run_attempt(&factory, Some(&identity), &StaticSecret::new("tok"), TIMEOUT).await;

        assert!(matches!(result, Err(ConnectError::HealthCheck(_))));
        assert!(factory.calls.lock().unwrap().inits.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_construction_times_out() {
        let factory = FakeFactory {
            delay: Duration::from_secs(31),
            ..FakeFactory::ok()
        };
        let started = tokio::time::Instant::now();
        let result = run_attempt(&factory, None, &StaticSecret::new(""), TIMEOUT).await;

        assert_eq!(result.err(), Some(ConnectError::Timeout(TIMEOUT)));
        assert_eq!(started.elapsed(), TIMEOUT);
        assert_eq!(factory.calls.lock().unwrap().probes, 0);
    }
}
