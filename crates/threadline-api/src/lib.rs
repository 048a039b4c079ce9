pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod storage;

pub use routes::router;
pub use state::AppState;
