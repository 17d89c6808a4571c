//! Implementation of the `autoroute routes` command.

use autoroute::introspection::RouteInfo;
use colored::Colorize;

use crate::catalog;
use crate::colors;

/// Execute the `routes` command.
pub fn execute(json: bool) -> Result<(), String> {
    let server = super::server_config(None, None)?;
    let dispatcher = catalog::app(&server).build().map_err(|e| e.to_string())?;
    let mut routes = dispatcher.routes();
    routes.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.method.cmp(&b.method)));

    if json {
        let rendered = serde_json::to_string_pretty(&routes)
            .map_err(|e| format!("Failed to serialize routes: {}", e))?;
        println!("{}", rendered);
        return Ok(());
    }

    println!();
    for route in &routes {
        println!("  {}", format_route(route));
    }
    println!();
    println!(
        "  {} {} routes",
        "INFO".custom_color(colors::blue()).bold(),
        routes.len()
    );
    Ok(())
}

fn format_route(route: &RouteInfo) -> String {
    let access = match (&route.permission, route.public) {
        (_, true) => "public".custom_color(colors::green()).to_string(),
        (Some(permission), false) => permission.custom_color(colors::yellow()).to_string(),
        (None, false) => "authenticated".custom_color(colors::subtext()).to_string(),
    };
    format!(
        "{} {:<32} {:<36} {}",
        colors::verb(&route.method),
        route.path,
        route.handler_name.custom_color(colors::subtext()),
        access
    )
}
