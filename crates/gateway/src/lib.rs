//! Rabbit Hole web gateway
//!
//! Serves the explorer page, the session forms behind it, a small JSON API
//! and the operational endpoints.

pub mod handlers;
pub mod middleware;
pub mod render;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
