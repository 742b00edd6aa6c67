// API module
//
// Thin HTTP layer over the node: request/response marshaling only

pub mod handlers;
pub mod routes;

// Re-export main components for easier access
pub use routes::configure_routes;
