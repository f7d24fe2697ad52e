pub mod auth;
pub mod codes;
pub mod config;
pub mod error;
pub mod mailer;
pub mod models;
pub mod store;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
