pub mod error;
pub mod geocode;
pub mod handlers;
pub mod membership;
pub mod models;
pub mod projection;
pub mod publisher;
pub mod routes;

#[cfg(test)]
mod tests;
