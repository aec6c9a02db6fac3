pub mod client;
pub mod files_api;
pub mod relay;
pub mod server;

pub use client::{Client, ClientRegistry};
pub use relay::Relay;
pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
