use actix_web::web;

use super::handlers;

/// Configures the node's HTTP routes
///
/// # Arguments
///
/// * `cfg` - The service configuration
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/transactions/new", web::post().to(handlers::new_transaction))
        .route("/transactions/get", web::get().to(handlers::get_pending_transactions))
        .route("/chain", web::get().to(handlers::get_chain))
        .route("/update", web::get().to(handlers::update_chain))
        .route("/validate", web::get().to(handlers::validate_chain))
        .route("/nodes/register", web::post().to(handlers::register_nodes))
        .route("/node", web::get().to(handlers::node_info));
}
