//! Token-issuing domain: identifiers, secrets, claims, signing, and client authentication.

pub mod claims;
pub mod credential;
pub mod id;
pub mod secret;
pub mod token;

pub use claims::*;
pub use credential::*;
pub use id::*;
pub use secret::*;
pub use token::*;
