//! Transport-level types shared by the HTTP layer and its tests: the
//! response envelope every endpoint returns and the credential service
//! used to hash passwords and sign bearer tokens.

pub mod credentials;
mod envelope;

pub use credentials::{Claims, CredentialError, TokenService};
pub use envelope::{Envelope, Status};
