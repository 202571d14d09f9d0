//! Tenant-bound authentication for brandhub.

pub mod guard;
pub mod jwt;
pub mod options;
pub mod password;

pub use guard::{authenticate, authorize_tenant, require_admin};
pub use jwt::{Claims, InvalidToken, SigningError, TokenIssuer, TokenPair, TokenType};
pub use options::{AuthOptions, JwtAlgorithm, JwtOptions};
pub use password::PasswordHasher;
