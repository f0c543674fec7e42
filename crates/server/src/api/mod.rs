pub mod downloads;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod search;
pub mod ws;

pub use routes::create_router;
