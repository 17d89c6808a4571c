//! Implementation of the `autoroute serve` command.

use autoroute::prelude::{AuthConfig, TracingConfig};
use colored::Colorize;

use crate::catalog;
use crate::colors;

pub struct ServeConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Serve without authentication.
    pub insecure: bool,
    pub introspection: bool,
    pub json_logs: bool,
}

/// Execute the `serve` command.
pub fn execute(config: ServeConfig) -> Result<(), String> {
    let server = super::server_config(config.host, config.port)?;

    let mut app = catalog::app(&server)
        .with_introspection(config.introspection)
        .with_tracing(TracingConfig::new().json(config.json_logs));

    if config.insecure {
        println!(
            "  {} {}",
            "WARN".custom_color(colors::yellow()).bold(),
            "authentication disabled; every route is open".custom_color(colors::subtext())
        );
    } else {
        let auth = AuthConfig::from_env()
            .map_err(|e| format!("{} (set JWT_SECRET or pass --insecure)", e))?;
        app = app.with_auth(auth);
    }

    let dispatcher = app.build().map_err(|e| e.to_string())?;
    let addr = server.addr();

    println!();
    println!(
        "  {} {} {}",
        "autoroute".custom_color(colors::mauve()).bold(),
        "serving on".custom_color(colors::subtext()),
        format!("http://{}", addr).bold()
    );
    println!(
        "  {} {} endpoints, API description at {}",
        "INFO".custom_color(colors::blue()).bold(),
        dispatcher.endpoints().len(),
        autoroute::app::OPENAPI_PATH.cyan()
    );
    println!();

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start runtime: {}", e))?;
    runtime
        .block_on(autoroute::server::serve(&addr, dispatcher))
        .map_err(|e| format!("Server error: {}", e))
}
