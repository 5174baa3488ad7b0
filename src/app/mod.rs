//! Application-level modules for the document browser.

mod app_state;
mod application_coordinator;
mod preferences;
mod settings_coordinator;

pub use app_state::AppState;
pub use application_coordinator::ApplicationCoordinator;
pub use preferences::{Preferences, StrategyChoice};
pub use settings_coordinator::SettingsCoordinator;
