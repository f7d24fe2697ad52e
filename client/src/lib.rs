//! Typed client for the Gather HTTP API.
//!
//! Every call returns `Result<T, ClientError>`; callers tell a soft pending
//! state apart from a failure with [`ClientError::is_not_assigned`].

pub mod api;
pub mod credentials;
pub mod error;
pub mod validation;
pub mod view;

pub use api::ApiClient;
pub use credentials::{CredentialStore, MemoryCredentialStore, AUTH_TOKEN_KEY};
pub use error::ClientError;
