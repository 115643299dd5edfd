//! Command-line client for the clinic backend.
//!
//! ```text
//!   clinic-client [--config FILE] [--location PATH] <command>
//!
//!   --location defaults to the login page for `login` and `watch`, `/` otherwise
//!
//!   csrf                         fetch (or reuse) the CSRF token
//!   send <METHOD> <PATH> [-d]    send one request through session recovery
//!   login <EMAIL>                email/password login (password from CLINIC_PASSWORD)
//!   logout                       server logout and local state cleanup
//!   refresh                      silent session refresh
//!   whoami                       fetch and print the signed-in profile
//!   watch                        keep the session alive until Ctrl+C
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::Method;
use serde_json::Value;

use clinic_client::config::{load_config, ClientConfig, RouteConfig};
use clinic_client::observability::{init_logging, init_metrics};
use clinic_client::session::KeepAlive;
use clinic_client::{ApiClient, ApiRequest, ApiResponse, AuthService, HeadlessNavigator};

#[derive(Parser)]
#[command(name = "clinic-client")]
#[command(about = "Authenticated client for the clinic backend", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulated navigation location used for public-route decisions.
    /// Defaults to the login page for `login` and `watch`, `/` otherwise.
    #[arg(short, long)]
    location: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the CSRF token, reusing a cached one
    Csrf,
    /// Send a request with CSRF and session recovery
    Send {
        method: String,
        path: String,
        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,
    },
    /// Log in with email and password
    Login {
        email: String,
        #[arg(long, env = "CLINIC_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log out and clear local session state
    Logout,
    /// Silently refresh the session
    Refresh,
    /// Print the signed-in user's profile
    Whoami,
    /// Keep the session alive until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };

    init_logging(&config.observability);

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let location = start_location(&cli.command, cli.location.as_deref(), &config.routes);
    let navigator = Arc::new(HeadlessNavigator::new(location.clone()));
    let client = Arc::new(
        ApiClient::builder(config)
            .navigator(navigator.clone())
            .build()?,
    );
    let auth = AuthService::new(client.clone());

    tracing::info!(
        location = %location,
        base_url = %client.config().api.base_url,
        "clinic-client starting"
    );

    match cli.command {
        Commands::Csrf => {
            let fetch = client.fetch_csrf_token().await;
            match fetch.token() {
                Some(token) => println!("{token}"),
                None => eprintln!("CSRF token unavailable; continuing without token"),
            }
        }
        Commands::Send { method, path, data } => {
            let method = Method::from_bytes(method.to_uppercase().as_bytes())?;
            let mut request = ApiRequest::new(method, path);
            if let Some(data) = data {
                request = request.with_body(serde_json::from_str(&data)?);
            }
            client.fetch_csrf_token().await;
            let response = client.send(request).await?;
            print_response(&response)?;
        }
        Commands::Login { email, password } => {
            let outcome = auth.login(&email, &password).await?;
            println!(
                "{} (role: {})",
                outcome.message,
                outcome.role.as_deref().unwrap_or("unknown")
            );
        }
        Commands::Logout => {
            auth.logout(true).await;
            println!("Logged out");
        }
        Commands::Refresh => {
            if client.refresh_session().await {
                println!("Session refreshed");
            } else {
                eprintln!("Session refresh denied");
                std::process::exit(1);
            }
        }
        Commands::Whoami => {
            let profile = auth.fetch_profile().await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Commands::Watch => {
            let Some(keepalive) = KeepAlive::from_config(client.clone()) else {
                eprintln!("Keep-alive is disabled; set session.keepalive_enabled = true");
                std::process::exit(2);
            };
            match auth.initialize().await {
                Some(user) => tracing::info!(user_id = ?user.id, "Session active"),
                None => tracing::warn!("No authenticated user; keep-alive will retry"),
            }
            let handle = keepalive.spawn();
            shutdown_signal().await;
            handle.stop().await;
        }
    }

    // Let a scheduled login redirect complete before exiting
    let grace = Duration::from_millis(client.config().session.redirect_grace_ms);
    tokio::time::sleep(grace).await;
    for redirect in navigator.redirects() {
        tracing::info!(to = %redirect, "Navigation redirected");
    }

    Ok(())
}

/// Where the simulated user starts. Signing in happens from the login page,
/// so a rejected login is never treated as an expired session.
fn start_location(command: &Commands, explicit: Option<&str>, routes: &RouteConfig) -> String {
    if let Some(location) = explicit {
        return location.to_string();
    }
    match command {
        Commands::Login { .. } | Commands::Watch => routes.login_path.clone(),
        _ => "/".to_string(),
    }
}

fn print_response(response: &ApiResponse) -> Result<(), Box<dyn std::error::Error>> {
    match response.json::<Value>() {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", response.text()),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
