pub mod api;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod relay;

pub use api::*;
pub use config::*;
pub use models::*;
pub use pipeline::*;
pub use relay::run_relay;
