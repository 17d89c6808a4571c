//! CLI command implementations.

pub mod openapi;
pub mod routes;
pub mod serve;
pub mod token;

use autoroute::prelude::{ServerConfig, load_dotenv};

/// Server settings from `.env` and the environment, with command-line
/// overrides applied on top.
pub fn server_config(host: Option<String>, port: Option<u16>) -> Result<ServerConfig, String> {
    load_dotenv();
    let mut config = ServerConfig::from_env().map_err(|e| e.to_string())?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    Ok(config)
}
