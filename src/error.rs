//! Typed failures raised by the gateway pipeline.

use thiserror::Error;

/// Failure surfaced to the caller when a gate rejects a request.
///
/// Token validation failures are deliberately collapsed into a single
/// `Unauthenticated` variant at the pipeline boundary so callers cannot
/// distinguish a bad signature from an expired token. The fine-grained
/// [`TokenError`] stays internal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    /// The per-route request ceiling was reached. Expected traffic shaping,
    /// not an error condition.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Username/password authentication failed. Uniform for unknown user,
    /// wrong password, and disabled account.
    #[error("incorrect username or password")]
    InvalidCredentials,

    /// Bearer token missing or failed validation.
    #[error("could not validate credentials")]
    Unauthenticated,

    /// The authenticated caller lacks the required roles or permissions.
    #[error("operation not permitted")]
    PermissionDenied,

    /// A business handler failed. The message carries only the operation
    /// name; internal detail stays in the security event log.
    #[error("operation failed: {operation}")]
    Handler { operation: String },
}

/// Why a bearer token failed validation. Logged, never surfaced.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The string does not have the expected segment structure.
    #[error("malformed token")]
    Malformed,

    /// The signature does not verify against the server secret.
    #[error("bad token signature")]
    BadSignature,

    /// The token is past its expiry.
    #[error("expired token")]
    Expired,
}
