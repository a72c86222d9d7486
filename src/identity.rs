//! 调用方身份以及身份提供者。
//! Caller identity and the identity provider.

use std::fmt;
use tokio::sync::watch;

/// The textual principal of an anonymous caller.
pub const ANONYMOUS_PRINCIPAL: &str = "2vxsx-fae";

/// An authenticated (or anonymous) caller identity.
///
/// 已认证（或匿名）的调用方身份。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    principal: String,
}

impl Identity {
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
        }
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Anonymous identities are treated as unauthenticated.
    /// 匿名身份被视为未认证。
    pub fn is_anonymous(&self) -> bool {
        self.principal == ANONYMOUS_PRINCIPAL
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.principal)
    }
}

/// What the identity provider currently knows about the caller.
///
/// 身份提供者当前掌握的调用方信息。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityState {
    /// The caller identity, if logged in.
    pub identity: Option<Identity>,
    /// True while the provider is still restoring a previous session.
    /// 提供者仍在恢复先前会话时为真。
    pub initializing: bool,
}

impl IdentityState {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            initializing: false,
        }
    }

    pub fn initializing() -> Self {
        Self {
            identity: None,
            initializing: true,
        }
    }

    /// The identity to act as, or `None` when unauthenticated.
    /// 用于行事的身份；未认证时为 `None`。
    pub fn authenticated_identity(&self) -> Option<&Identity> {
        self.identity.as_ref().filter(|id| !id.is_anonymous())
    }
}

/// Publishes identity changes to the lifecycle manager.
///
/// 向生命周期管理器发布身份变化。
#[derive(Debug, Clone)]
pub struct IdentityProvider {
    tx: watch::Sender<IdentityState>,
}

impl IdentityProvider {
    pub fn new(initial: IdentityState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Replaces the current state. Watchers are woken only when the state
    /// actually differs.
    ///
    /// 替换当前状态。只有在状态确实变化时才唤醒观察者。
    pub fn set(&self, state: IdentityState) {
        self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    pub fn log_in(&self, identity: Identity) {
        self.set(IdentityState::authenticated(identity));
    }

    pub fn log_out(&self) {
        self.set(IdentityState::anonymous());
    }

    pub fn current(&self) -> IdentityState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<IdentityState> {
        self.tx.subscribe()
    }
}

impl Default for IdentityProvider {
    fn default() -> Self {
        Self::new(IdentityState::anonymous())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_principal_is_unauthenticated() {
        let state = IdentityState::authenticated(Identity::new(ANONYMOUS_PRINCIPAL));
        assert!(state.authenticated_identity().is_none());

        let state = IdentityState::authenticated(Identity::new("aaaaa-aa"));
        assert_eq!(
            state.authenticated_identity().map(Identity::principal),
            Some("aaaaa-aa")
        );
    }

    #[tokio::test]
    async fn test_provider_only_notifies_on_change() {
        let provider = IdentityProvider::default();
        let mut rx = provider.subscribe();

        provider.log_out();
        assert!(!rx.has_changed().unwrap());

        provider.log_in(Identity::new("user-1"));
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        provider.log_in(Identity::new("user-1"));
        assert!(!rx.has_changed().unwrap());
    }
}
