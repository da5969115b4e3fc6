pub mod animation;
pub mod app;
pub mod config;
pub mod downloads;
pub mod errors;
pub mod github;
pub mod handlers;
pub mod models;
pub mod sink;
pub mod stats;
pub mod state;
pub mod tasks;
pub mod ui;

#[cfg(test)]
mod testing;

pub use app::router;
pub use config::{load_config, resolve_config_path, SiteConfig};
pub use state::AppState;
