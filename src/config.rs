//! Server configuration from environment variables

use crate::ws::connection::DEFAULT_OUTBOUND_CAPACITY;
use axum::http::HeaderValue;
use std::path::PathBuf;
use tower_http::cors::{AllowOrigin, CorsLayer};

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory for the file store (None = in-memory store)
    pub data_dir: Option<PathBuf>,
    /// Per-connection outbound queue size
    pub outbound_capacity: usize,
    /// CORS origins (empty = permissive)
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            data_dir: None,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = non_empty_var("COLLAB_HOST").unwrap_or(defaults.host);
        let port = parsed_var("COLLAB_PORT").unwrap_or(defaults.port);
        let data_dir = non_empty_var("COLLAB_DATA_DIR").map(PathBuf::from);

        let outbound_capacity = match parsed_var::<usize>("COLLAB_OUTBOUND_CAPACITY") {
            Some(0) => {
                tracing::warn!("COLLAB_OUTBOUND_CAPACITY must be at least 1, using 1");
                1
            }
            Some(n) => n,
            None => defaults.outbound_capacity,
        };

        let allowed_origins = non_empty_var("COLLAB_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            host,
            port,
            data_dir,
            outbound_capacity,
            allowed_origins,
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cors_layer(&self) -> CorsLayer {
        if self.allowed_origins.is_empty() {
            return CorsLayer::permissive();
        }

        let origins: Vec<HeaderValue> = self
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = non_empty_var(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid value for {}: {:?}, using default", key, raw);
            None
        }
    }
}
