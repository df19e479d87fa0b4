//! neXSim Server Binary
//!
//! Starts the HTTP server over the configured graph database.
//!
//! ## Usage
//!
//! ```bash
//! NEO4J_DB_URI=http://localhost:7474 \
//! NEO4J_DB_USER=neo4j \
//! NEO4J_DB_PWD=secret \
//! cargo run --bin nexsim-server
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use nexsim::graph::{GraphStore, HttpGraphStore};
use nexsim::http::{start_http_server, AppState};
use nexsim::model::PredicateStyle;
use nexsim::Config;

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone()));

    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration ({e}), using defaults");
        Config::default()
    });

    init_tracing(&config);

    if config.graph.password.is_empty() {
        warn!("Graph database password is empty; set NEO4J_DB_PWD or [graph] password");
    }

    let style = PredicateStyle::new(config.predicates.upper);
    let graph = GraphStore::Http(HttpGraphStore::new(&config.graph, style)?);

    info!(
        graph_uri = %config.graph.uri,
        upper_predicates = config.predicates.upper,
        "starting nexsim server"
    );

    let state = Arc::new(AppState::new(graph, config));
    start_http_server(state)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    Ok(())
}
