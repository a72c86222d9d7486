//! Traits for abstracting over the generated remote-service client.
//!
//! 对生成的远程服务客户端进行抽象的 trait。
use crate::{error::RemoteError, identity::Identity};
use async_trait::async_trait;

/// The part of the remote-service client the lifecycle manager relies on.
///
/// Real clients expose the full domain surface (trades, mistakes, profile,
/// subscription and admin calls) on top of this; the manager only needs the
/// liveness probe and the one-time privileged initialization.
///
/// 生命周期管理器所依赖的远程服务客户端部分。
///
/// 实际客户端在此之上提供完整的业务接口；管理器只需要存活探测和一次性特权初始化。
#[async_trait]
pub trait RemoteClient: Send + Sync + 'static {
    /// A cheap call proving the service is reachable and responsive.
    /// 证明服务可达且有响应的廉价调用。
    async fn health_check(&self) -> Result<(), RemoteError>;

    /// One-time setup required before an authenticated session can use the
    /// service. `token` is the optional out-of-band admin secret.
    ///
    /// 已认证会话使用服务前所需的一次性设置。`token` 是可选的带外管理员密钥。
    async fn initialize_access(&self, token: Option<&str>) -> Result<(), RemoteError>;
}

/// Creates remote-service clients.
///
/// 创建远程服务客户端。
#[async_trait]
pub trait ClientFactory: Send + Sync + 'static {
    type Client: RemoteClient;

    /// Creates a client acting as `identity`, or anonymously when `None`.
    /// 创建以 `identity` 身份行事的客户端，为 `None` 时匿名创建。
    async fn create(&self, identity: Option<&Identity>) -> Result<Self::Client, RemoteError>;
}
