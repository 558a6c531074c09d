//! Domain types and configuration shared by every sproutsync crate.

pub mod app_config;
pub mod config;
pub mod documents;
pub mod error;
pub mod network;
pub mod profiles;

pub use app_config::{AppConfig, Environment, TitleMatch};
pub use config::{load_app_config, load_app_config_from_env};
pub use documents::{DocumentEntry, DocumentTitle, TargetDocument, SPREADSHEET_MIME_TYPE};
pub use error::ConfigError;
pub use network::{NetworkMapping, NetworkType};
pub use profiles::{AnalyticsDataPoint, DateRange, Group, GroupId, Profile, ProfileId};
