pub mod app_state;
pub mod catalog;
pub mod channels;
pub mod config;
pub mod http;
pub mod loader;
pub mod logging;

pub use app_state::AppState;
pub use http::build_router;
