//! 特权初始化所需的可选带外密钥来源。
//! Sources for the optional out-of-band secret passed to the privileged
//! initialization call.

use crate::config::SecretConfig;
use std::sync::Arc;
use tracing::trace;
use url::Url;

/// Supplies the optional admin token.
///
/// Empty values count as absent.
///
/// 提供可选的管理员令牌。空值视为不存在。
pub trait SecretSource: Send + Sync + 'static {
    fn secret(&self) -> Option<String>;
}

impl<T: SecretSource + ?Sized> SecretSource for Arc<T> {
    fn secret(&self) -> Option<String> {
        (**self).secret()
    }
}

impl<T: SecretSource + ?Sized> SecretSource for Box<T> {
    fn secret(&self) -> Option<String> {
        (**self).secret()
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Never yields a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSecret;

impl SecretSource for NoSecret {
    fn secret(&self) -> Option<String> {
        None
    }
}

/// A fixed token, mostly useful in tests.
#[derive(Debug, Clone)]
pub struct StaticSecret(Option<String>);

impl StaticSecret {
    pub fn new(token: impl Into<String>) -> Self {
        Self(non_empty(token.into()))
    }
}

impl SecretSource for StaticSecret {
    fn secret(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Reads the token from an environment variable each time it is asked.
///
/// 每次请求时从环境变量读取令牌。
#[derive(Debug, Clone)]
pub struct EnvSecret {
    var: String,
}

impl EnvSecret {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn from_config(config: &SecretConfig) -> Self {
        Self::new(config.env_var.clone())
    }
}

impl SecretSource for EnvSecret {
    fn secret(&self) -> Option<String> {
        let value = std::env::var(&self.var).ok().and_then(non_empty);
        trace!(var = %self.var, found = value.is_some(), "Looked up admin token in environment");
        value
    }
}

/// Reads the token from a parameter of the page URL. The query string is
/// checked first, then the fragment (`#param=value&...`).
///
/// 从页面 URL 的参数中读取令牌。先检查查询字符串，再检查片段。
#[derive(Debug, Clone)]
pub struct UrlParamSecret {
    url: Option<Url>,
    param: String,
}

impl UrlParamSecret {
    /// An unparseable URL yields a source that never finds a token.
    /// 无法解析的 URL 会得到一个永远找不到令牌的来源。
    pub fn new(url: &str, param: impl Into<String>) -> Self {
        let param = param.into();
        let url = match Url::parse(url) {
            Ok(url) => Some(url),
            Err(e) => {
                trace!(error = %e, "Page URL could not be parsed; no admin token available");
                None
            }
        };
        Self { url, param }
    }

    pub fn from_config(url: &str, config: &SecretConfig) -> Self {
        Self::new(url, config.url_param.clone())
    }

    fn find_in_pairs<'a>(
        mut pairs: impl Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>,
        param: &str,
    ) -> Option<String> {
        pairs
            .find(|(key, _)| key == param)
            .and_then(|(_, value)| non_empty(value.into_owned()))
    }
}

impl SecretSource for UrlParamSecret {
    fn secret(&self) -> Option<String> {
        let url = self.url.as_ref()?;
        Self::find_in_pairs(url.query_pairs(), &self.param).or_else(|| {
            let fragment = url.fragment()?;
            Self::find_in_pairs(url::form_urlencoded::parse(fragment.as_bytes()), &self.param)
        })
    }
}

/// Tries each source in order and returns the first token found.
///
/// 依次尝试每个来源并返回找到的第一个令牌。
#[derive(Default)]
pub struct ChainedSecret {
    sources: Vec<Box<dyn SecretSource>>,
}

impl ChainedSecret {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl SecretSource) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl std::fmt::Debug for ChainedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainedSecret")
            .field("sources_count", &self.sources.len())
            .finish()
    }
}

impl SecretSource for ChainedSecret {
    fn secret(&self) -> Option<String> {
        self.sources.iter().find_map(|source| source.secret())
    }
}
