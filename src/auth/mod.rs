pub mod identity;
pub mod permission;
pub mod token;

use thiserror::Error;

pub use identity::{Identity, SessionUser, TokenMessage, ADMINISTRATOR_ROLE};
pub use permission::{authorize, Permission, RequiredPermissions, SELF_PERMISSION};
pub use token::{decode_claims_unverified, Claims, TokenCodec, TokenError, UnverifiedClaims};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("permission denied")]
    PermissionDenied,

    /// A component ran without the request data an earlier middleware should have attached.
    #[error("missing request context: {0}")]
    ContextMissing(&'static str),
}
