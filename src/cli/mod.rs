pub mod client;
pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "bffctl")]
#[command(about = "bffctl - Command-line client for the console BFF gateway")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, env = "BFF_URL", help = "Gateway URL (defaults to the saved one)")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Log in and save the session cookies")]
    Login {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password (BFF_PASSWORD, or prompted if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Log out and forget the saved session")]
    Logout,

    #[command(about = "Show the current token's user and expiry")]
    Whoami,

    #[command(about = "Call any gateway route with the saved session")]
    Call {
        #[arg(help = "HTTP method")]
        method: String,
        #[arg(help = "Path, e.g. /api/identity/me")]
        path: String,
        #[arg(long, short, help = "JSON request body")]
        data: Option<String>,
    },

    #[command(about = "Gateway health and configured services")]
    Status,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let server = cli.server.as_deref();

    match cli.command {
        Commands::Login { email, password } => commands::auth::login(server, email, password, output_format).await,
        Commands::Logout => commands::auth::logout(server, output_format).await,
        Commands::Whoami => commands::auth::whoami(server, output_format).await,
        Commands::Call { method, path, data } => commands::call::call(server, method, path, data, output_format).await,
        Commands::Status => commands::call::status(server, output_format).await,
    }
}
