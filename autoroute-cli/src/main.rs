//! autoroute CLI - hosts the sample catalog application.

mod catalog;
mod colors;
mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;

#[derive(Parser)]
#[command(name = "autoroute")]
#[command(author, version, about = "Serve and inspect the autoroute catalog application", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Display version information
    Version,
    /// Serve the catalog API
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,
        /// Host to bind to
        #[arg(long, env = "HOST")]
        host: Option<String>,
        /// Serve without authentication
        #[arg(long)]
        insecure: bool,
        /// Serve the route list at /__autoroute/routes
        #[arg(long)]
        introspection: bool,
        /// Emit JSON log lines
        #[arg(long)]
        json_logs: bool,
    },
    /// List every route the catalog exposes
    Routes {
        /// Print the routes as JSON
        #[arg(long)]
        json: bool,
    },
    /// API description tools
    Openapi {
        #[command(subcommand)]
        command: OpenapiCommands,
    },
    /// Print a development token signed with JWT_SECRET
    Token {
        /// Subject of the token
        #[arg(long, default_value = "developer")]
        subject: String,
        /// Permission to grant (repeatable)
        #[arg(short, long = "permission")]
        permissions: Vec<String>,
        /// Grant every catalog permission
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
enum OpenapiCommands {
    /// Export the API description to stdout or a file
    Export {
        /// Output file path (stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Version) => {
            print_version();
            Ok(())
        }
        Some(Commands::Serve {
            port,
            host,
            insecure,
            introspection,
            json_logs,
        }) => commands::serve::execute(commands::serve::ServeConfig {
            host,
            port,
            insecure,
            introspection,
            json_logs,
        }),
        Some(Commands::Routes { json }) => commands::routes::execute(json),
        Some(Commands::Openapi { command }) => match command {
            OpenapiCommands::Export { output } => commands::openapi::export(output),
        },
        Some(Commands::Token {
            subject,
            permissions,
            all,
        }) => commands::token::execute(commands::token::TokenConfig {
            subject,
            permissions,
            all,
        }),
        None => {
            print_banner();
            println!();
            println!("Run {} for usage information.", "autoroute --help".cyan());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!();
    println!(
        "{}",
        "  ╭─────────────────────────────────────╮".bright_magenta()
    );
    println!(
        "{}{}{}",
        "  │".bright_magenta(),
        "            autoroute CLI            ".bold(),
        "│".bright_magenta()
    );
    println!(
        "{}",
        "  ╰─────────────────────────────────────╯".bright_magenta()
    );
}

fn print_version() {
    println!("autoroute-cli {}", env!("CARGO_PKG_VERSION"));
}
