//! 连接失败的分类，供界面展示以及自动重试判定使用。
//! Classification of connection failures for presentation and the
//! auto-retry decision.
//!
//! Structured [`RemoteErrorKind`]s are preferred. When a collaborator does not
//! supply one, the message text is matched against a fixed set of markers. The
//! markers are a compatibility shim for services that only report
//! human-readable text and are kept exactly as listed here.
//!
//! 优先使用结构化的 [`RemoteErrorKind`]。协作方未提供时，会将消息文本与一组固定
//! 标记进行匹配。这些标记是针对只报告人类可读文本的服务的兼容垫片。

use crate::error::{ConnectError, RemoteError, RemoteErrorKind};

const STOPPED_MARKERS: &[&str] = &["is stopped", "stopped", "unavailable"];
const PROBE_MARKERS: &[&str] = &["health check failed"];
const TIMEOUT_MARKERS: &[&str] = &["timed out", "timeout"];
const INITIALIZING_MARKERS: &[&str] = &["initializing", "starting up", "refresh the page"];

/// Markers in a privileged-initialization failure that indicate the service is
/// still settling, which is reported as [`ConnectError::InitializationPending`].
///
/// 特权初始化失败中表示服务仍在稳定过程中的标记。
const INIT_PENDING_MARKERS: &[&str] = &["stopping", "access", "initialization"];

/// Coarse failure classes the UI branches on.
///
/// 界面据以分支的粗粒度失败类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The remote service is stopped or unavailable.
    Stopped,
    /// The liveness probe failed.
    ProbeFailed,
    /// The attempt timed out.
    TimedOut,
    /// The service is still initializing.
    Initializing,
    /// Anything else; shown with its raw message.
    Other,
}

impl ErrorClass {
    /// Short, user-facing copy for the class. `Other` has none because the raw
    /// message is shown instead.
    ///
    /// 该类别面向用户的简短文案。`Other` 没有文案，直接显示原始消息。
    pub fn user_message(self) -> Option<&'static str> {
        match self {
            Self::Stopped => Some(
                "The service is temporarily unavailable. We will keep trying to reconnect automatically.",
            ),
            Self::ProbeFailed => {
                Some("Could not reach the service. Retrying automatically.")
            }
            Self::TimedOut => Some("The connection timed out. Please try again."),
            Self::Initializing => {
                Some("The service is still starting up. Please refresh the page in a moment.")
            }
            Self::Other => None,
        }
    }
}

/// Classifies a stored connection failure.
///
/// 对保存的连接失败进行分类。
pub fn classify(error: &ConnectError) -> ErrorClass {
    if let Some(class) = error.remote().and_then(|e| e.kind).and_then(class_of_kind) {
        return class;
    }
    // A stopped service outranks the variant.
    let text = error.to_string().to_lowercase();
    if contains_any(&text, STOPPED_MARKERS) {
        return ErrorClass::Stopped;
    }
    match error {
        ConnectError::HealthCheck(_) => ErrorClass::ProbeFailed,
        ConnectError::Timeout(_) => ErrorClass::TimedOut,
        ConnectError::InitializationPending(_) => ErrorClass::Initializing,
        _ => classify_text(&text),
    }
}

/// Classifies free-form failure text using only the substring markers.
///
/// 仅使用子串标记对自由格式的失败文本进行分类。
pub fn classify_text(text: &str) -> ErrorClass {
    let text = text.to_lowercase();
    if contains_any(&text, STOPPED_MARKERS) {
        ErrorClass::Stopped
    } else if contains_any(&text, PROBE_MARKERS) {
        ErrorClass::ProbeFailed
    } else if contains_any(&text, TIMEOUT_MARKERS) {
        ErrorClass::TimedOut
    } else if contains_any(&text, INITIALIZING_MARKERS) {
        ErrorClass::Initializing
    } else {
        ErrorClass::Other
    }
}

/// Whether the lifecycle manager should schedule an automatic retry for
/// this failure. Only stopped/unavailable services and failed health
/// checks qualify. A failed health check is retried whatever its kind.
///
/// 生命周期管理器是否应为此失败安排自动重试。健康检查失败无论类型都会重试。
pub fn should_auto_retry(error: &ConnectError) -> bool {
    matches!(error, ConnectError::HealthCheck(_))
        || matches!(classify(error), ErrorClass::Stopped | ErrorClass::ProbeFailed)
}

/// Wraps a failed privileged initialization, rewriting transient failures
/// into a message that suggests refreshing.
///
/// 包装失败的特权初始化，将暂时性失败改写为建议刷新的消息。
pub fn wrap_init_failure(error: RemoteError) -> ConnectError {
    let pending = match error.kind {
        Some(RemoteErrorKind::Initializing | RemoteErrorKind::Unauthorized) => true,
        Some(RemoteErrorKind::Stopped | RemoteErrorKind::Unavailable) => false,
        Some(RemoteErrorKind::Other) | None => {
            contains_any(&error.message.to_lowercase(), INIT_PENDING_MARKERS)
        }
    };
    if pending {
        ConnectError::InitializationPending(error)
    } else {
        ConnectError::Initialization(error)
    }
}

fn class_of_kind(kind: RemoteErrorKind) -> Option<ErrorClass> {
    match kind {
        RemoteErrorKind::Stopped | RemoteErrorKind::Unavailable => Some(ErrorClass::Stopped),
        RemoteErrorKind::Initializing => Some(ErrorClass::Initializing),
        RemoteErrorKind::Unauthorized | RemoteErrorKind::Other => None,
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
