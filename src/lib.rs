//! tabdash: a three-tab dashboard over the penguins and wine datasets.
//!
//! The crate loads both datasets once, renders each tab as a serializable
//! [`view::ViewTree`], and recomputes charts and other outputs when a control
//! changes through the rules in [`bindings`]. [`server`] exposes sessions over
//! a JSON API.

pub mod api_call;
pub mod bindings;
pub mod charts;
pub mod config;
pub mod error;
pub mod loader;
pub mod server;
pub mod session;
mod source;
pub mod table;
pub mod upload;
pub mod view;

pub use tabdash_cli as cli;

pub use cli::Args;
pub use config::{AppConfig, ConfigManager};
pub use error::{DashError, Result};
pub use loader::Datasets;
pub use session::{Session, SessionSettings};
pub use view::{ComponentId, TabId};

/// Application name used for the config directory and other app-specific paths
pub const APP_NAME: &str = "tabdash";
