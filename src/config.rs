//! 定义了连接生命周期的可配置参数。
//! Defines configurable parameters for the connection lifecycle.

use std::time::Duration;
use tracing::warn;

/// A structure containing all configurable parameters for the lifecycle manager.
///
/// 包含生命周期管理器所有可配置参数的结构体。
#[derive(Debug, Clone)]
pub struct Config {
    /// Parameters for a single connection attempt.
    /// 单次连接尝试的参数。
    pub connection: ConnectionConfig,

    /// Automatic retry parameters.
    /// 自动重试参数。
    pub retry: RetryConfig,

    /// Where the privileged initialization token is looked up.
    /// 特权初始化令牌的查找位置。
    pub secret: SecretConfig,
}

/// Parameters for a single connection attempt.
///
/// 单次连接尝试的参数。
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Upper bound for client construction, health check and initialization
    /// taken together. When it elapses the attempt is abandoned.
    ///
    /// 客户端构建、健康检查和初始化合计的时间上限。超时后放弃本次尝试。
    pub connect_timeout: Duration,
    /// Capacity of the lifecycle event broadcast channel.
    /// 生命周期事件广播通道的容量。
    pub event_capacity: usize,
}

/// Automatic retry parameters.
///
/// 自动重试参数。
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay before the first automatic retry.
    /// 第一次自动重试前的延迟。
    pub base_delay: Duration,
    /// The delay never grows beyond this value.
    /// 延迟不会超过此值。
    pub max_delay: Duration,
    /// Growth factor applied per retry already attempted.
    /// 每次已尝试重试所应用的增长因子。
    pub multiplier: f64,
    /// Maximum number of automatic retries before manual intervention is needed.
    /// 需要手动干预之前的最大自动重试次数。
    pub max_retries: u32,
    /// Period of the countdown published while a retry is pending.
    /// 重试挂起期间发布倒计时的周期。
    pub countdown_tick: Duration,
}

/// Names under which the optional admin token is looked up.
///
/// 查找可选管理员令牌所使用的名称。
#[derive(Debug, Clone)]
pub struct SecretConfig {
    /// Environment variable consulted by `EnvSecret`.
    pub env_var: String,
    /// URL query/fragment parameter consulted by `UrlParamSecret`.
    pub url_param: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            retry: RetryConfig::default(),
            secret: SecretConfig::default(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            event_capacity: 64,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(15),
            multiplier: 1.5,
            max_retries: 8,
            countdown_tick: Duration::from_secs(1),
        }
    }
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            env_var: "JOURNAL_ADMIN_TOKEN".to_string(),
            url_param: "caffeineAdminToken".to_string(),
        }
    }
}

impl Config {
    /// Builds the default configuration and overlays values found in the
    /// process environment. Unparseable values are logged and ignored.
    ///
    /// 构建默认配置并叠加进程环境中的值。无法解析的值会被记录并忽略。
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup.
    ///
    /// 从任意键查找函数应用覆盖值。
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(ms) = parse_override(&lookup, "JOURNAL_CONNECT_TIMEOUT_MS") {
            self.connection.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_override(&lookup, "JOURNAL_RETRY_BASE_MS") {
            self.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_override(&lookup, "JOURNAL_RETRY_MAX_MS") {
            self.retry.max_delay = Duration::from_millis(ms);
        }
        if let Some(limit) = parse_override(&lookup, "JOURNAL_RETRY_LIMIT") {
            self.retry.max_retries = u32::try_from(limit).unwrap_or(u32::MAX);
        }
        self
    }
}

fn parse_override(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, value = %raw, error = %e, "Ignoring invalid configuration override");
            None
        }
    }
}
