//! Unified error handling for meshchatd.
//!
//! Domain failures become structured `status=error` replies; their `Display`
//! text is the description the client sees. Transport failures stay on the
//! caller's side and are only ever logged.

use meshchat_proto::ProtocolError;
use thiserror::Error;

// ============================================================================
// Service Errors (request handling)
// ============================================================================

/// Domain errors produced while handling a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("username required")]
    UsernameRequired,

    #[error("user already exists")]
    UserExists,

    #[error("channel name required")]
    ChannelNameRequired,

    #[error("channel already exists")]
    ChannelExists,

    #[error("channel does not exist")]
    NoSuchChannel,

    #[error("user does not exist")]
    NoSuchUser,

    #[error("service not recognized")]
    UnknownService,

    #[error("name required")]
    NameRequired,

    #[error("server not registered")]
    NotRegistered,
}

impl ServiceError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UsernameRequired => "username_required",
            Self::UserExists => "user_exists",
            Self::ChannelNameRequired => "channel_name_required",
            Self::ChannelExists => "channel_exists",
            Self::NoSuchChannel => "no_such_channel",
            Self::NoSuchUser => "no_such_user",
            Self::UnknownService => "unknown_service",
            Self::NameRequired => "name_required",
            Self::NotRegistered => "not_registered",
        }
    }
}

/// Result type for request handlers.
pub type ServiceResult<T> = Result<T, ServiceError>;

// ============================================================================
// Client Errors (talking to another component)
// ============================================================================

/// Failures while sending a request to a service and awaiting its reply.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The in-process request loop has stopped.
    #[error("service request loop is closed")]
    Closed,

    /// The remote end hung up before replying.
    #[error("connection closed by peer")]
    Disconnected,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ClientError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Disconnected => "disconnected",
            Self::Io(_) => "io",
            Self::Protocol(e) => e.error_code(),
        }
    }
}
