use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use log::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use ledger_node::api;
use ledger_node::blockchain;
use ledger_node::config::Config;
use ledger_node::node::{self, Node};

/// Runs a ledger node
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, short)]
    port: Option<u16>,

    /// Peer address as host:port, may be repeated
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Leading hex zeros required of a proof of work
    #[arg(long)]
    difficulty: Option<usize>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = Config::load(self.config.as_deref()).context("Failed to load configuration")?;

        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(difficulty) = self.difficulty {
            config.mining.difficulty = difficulty;
        }
        config.peers.extend(self.peers);

        config.validate()?;
        Ok(config)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::new_transaction,
        api::handlers::get_chain,
        api::handlers::get_pending_transactions,
        api::handlers::update_chain,
        api::handlers::validate_chain,
        api::handlers::register_nodes,
        api::handlers::node_info
    ),
    components(
        schemas(
            blockchain::Block,
            blockchain::Transaction,
            blockchain::crypto::Address,
            blockchain::crypto::DigitalSignature,
            node::ChainSnapshot,
            api::handlers::TransactionForm,
            api::handlers::PendingResponse,
            api::handlers::RegisterNodesRequest,
            api::handlers::RegisterNodesResponse,
            api::handlers::NodeInfoResponse
        )
    ),
    tags(
        (name = "ledger", description = "Ledger node endpoints")
    ),
    info(
        title = "Ledger Node API",
        version = "0.1.0",
        description = "Proof-of-work ledger node",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Cli::parse().into_config()?;
    let node = Arc::new(Node::from_config(&config)?);

    info!(
        "Node {} starting with difficulty {} and {} peer(s)",
        node.id(),
        config.mining.difficulty,
        config.peers.len()
    );

    if config.sync.interval_secs > 0 {
        info!("Reconciling with peers every {}s", config.sync.interval_secs);
        node::spawn_periodic_reconciliation(Arc::clone(&node), Duration::from_secs(config.sync.interval_secs));
    }

    let data = web::Data::from(node);
    let bind = (config.server.host.clone(), config.server.port);

    info!("Starting HTTP server at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let openapi = ApiDoc::openapi();

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(data.clone())
            .configure(api::configure_routes)
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi))
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
