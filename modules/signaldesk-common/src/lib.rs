pub mod config;
pub mod error;
pub mod organization;
pub mod types;

pub use config::{Config, SelectionConfig, TierCaps};
pub use error::SignalDeskError;
pub use organization::*;
pub use types::*;
