//! Authentication: signed identity tokens, password hashing and the
//! request gate that turns a bearer header into an [`Identity`].

pub mod gate;
pub mod password;
pub mod token;

pub use gate::{AuthUser, GateError, Learner, Provider};
pub use password::{hash_password, verify_password, PasswordError};
pub use token::{Identity, TokenError, TokenService};
