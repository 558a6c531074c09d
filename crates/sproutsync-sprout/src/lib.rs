//! Client for the Sprout Social v1 analytics API.

pub mod client;
pub mod error;
pub mod normalize;
pub(crate) mod retry;
pub mod types;

pub use client::SproutClient;
pub use error::SproutError;
