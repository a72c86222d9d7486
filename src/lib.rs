#![deny(clippy::expect_used, clippy::unwrap_used)]

//! The root of the trading-journal connection library.
//! 交易日志连接库的根。
//!
//! [`ConnectionManager`] owns the remote-service client: it creates it, health
//! checks it, runs the one-time privileged initialization for authenticated
//! callers, and recovers from transient startup failures with bounded
//! exponential-backoff retries.

pub mod backoff;
pub mod cache;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod secret;

pub use client::{ClientFactory, RemoteClient};
pub use config::Config;
pub use error::{ConnectError, Error, RemoteError, RemoteErrorKind, Result};
pub use lifecycle::{ConnectionManager, ConnectionSnapshot, ConnectionStatus, LifecycleEvent};
