//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - config.toml (default configuration)
//! - config.local.toml (git-ignored local overrides)
//! - Environment variables (NEXSIM_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # config.toml
//! [graph]
//! uri = "http://localhost:7474"
//! user = "neo4j"
//! database = "neo4j"
//!
//! [predicates]
//! upper = false
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! NEXSIM_GRAPH__URI=http://graph:7474
//! NEXSIM_HTTP__PORT=8080
//! ```
//!
//! The deployment variables of the original service are honored as
//! aliases: `NEO4J_DB_URI`, `NEO4J_DB_USER`, `NEO4J_DB_PWD`, and
//! `PREDICATES_UPPER`.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub predicates: PredicateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Graph database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Base URI of the graph database HTTP endpoint
    #[serde(default = "default_graph_uri")]
    pub uri: String,

    #[serde(default = "default_graph_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Database name on the server
    #[serde(default = "default_graph_database")]
    pub database: String,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request deadline in seconds; an expired deadline aborts the
    /// pipeline with no partial output
    #[serde(default = "default_deadline_secs")]
    pub request_deadline_secs: u64,

    /// Explicit CORS origins; empty means same-origin only
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Dev-mode opt-in: allow any origin
    #[serde(default)]
    pub cors_allow_all: bool,
}

/// Predicate spelling selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredicateConfig {
    /// Use upper-case taxonomic predicate names (IS_A, PART_OF, ...)
    #[serde(default)]
    pub upper: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_graph_uri() -> String {
    "http://localhost:7474".to_string()
}
fn default_graph_user() -> String {
    "neo4j".to_string()
}
fn default_graph_database() -> String {
    "neo4j".to_string()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_deadline_secs() -> u64 {
    60
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

/// Map one legacy environment variable onto a nested config key
fn env_alias(variable: &'static str, key: &'static str) -> Env {
    Env::raw().only(&[variable]).map(move |_| key.into()).split(".")
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. config.toml (base configuration)
    /// 2. config.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (NEXSIM_* prefix)
    /// 4. Legacy deployment variables (NEO4J_DB_*, PREDICATES_UPPER)
    pub fn load() -> Result<Self, figment::Error> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file path
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed("NEXSIM_").split("__"))
            .merge(env_alias("NEO4J_DB_URI", "graph.uri"))
            .merge(env_alias("NEO4J_DB_USER", "graph.user"))
            .merge(env_alias("NEO4J_DB_PWD", "graph.password"))
            .merge(env_alias("PREDICATES_UPPER", "predicates.upper"))
            .extract()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            graph: GraphConfig::default(),
            http: HttpConfig::default(),
            predicates: PredicateConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            uri: default_graph_uri(),
            user: default_graph_user(),
            password: String::new(),
            database: default_graph_database(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            host: default_host(),
            port: default_port(),
            request_deadline_secs: default_deadline_secs(),
            cors_origins: Vec::new(),
            cors_allow_all: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
