pub mod authenticate;
pub mod authorize;
pub mod chain;
pub mod common;

pub use authenticate::{authenticate, TOKEN_HEADER};
pub use authorize::{Authorize, AuthorizeLayer};
pub use chain::Chain;
