//! Google Drive and Sheets as the engine's document store, plus the OAuth2
//! refresh-token credential provider.

pub mod client;
mod drive;
pub mod error;
pub mod oauth;
mod sheets;
pub mod types;

pub use client::GoogleStore;
pub use error::GoogleError;
pub use oauth::OAuthRefreshProvider;
