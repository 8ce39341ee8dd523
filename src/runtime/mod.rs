//! Runtime: application object, dispatcher and the HTTP server around it.

mod app;
mod config;
mod dispatcher;
mod server;

pub use app::App;
pub use config::ServerConfig;
pub use dispatcher::Dispatcher;
pub use server::Server;
