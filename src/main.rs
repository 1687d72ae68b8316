use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use ncconnect::{
    AuthorizationResponse, ClientConfig, Environment, NcConnectProvider, OAuthClient, OAuthError,
    ProviderSettings,
};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    name = "ncconnect",
    version,
    about = "Drive an NcConnect login from the terminal and print the results as JSON."
)]
struct Cli {
    /// JSON file with client_id, client_secret, redirect, logout_redirect, force_dev
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, env = "NCCONNECT_CLIENT_ID", global = true)]
    client_id: Option<String>,

    #[arg(long, env = "NCCONNECT_CLIENT_SECRET", global = true, hide_env_values = true)]
    client_secret: Option<String>,

    #[arg(long, env = "NCCONNECT_REDIRECT", global = true)]
    redirect: Option<String>,

    #[arg(long, env = "NCCONNECT_LOGOUT_REDIRECT", global = true)]
    logout_redirect: Option<String>,

    /// Use the development endpoints even in production
    #[arg(long, env = "NCCONNECT_FORCE_DEV", global = true)]
    force_dev: bool,

    /// Application environment; only "production" selects production endpoints
    #[arg(long, env = "APP_ENV", default_value = "local", global = true)]
    app_env: String,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 10, global = true)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a fresh authorization URL with its state and nonce
    Authorize {
        /// Open the URL in the default browser
        #[arg(long)]
        open: bool,
    },
    /// Complete a login from the callback URL the browser landed on
    Callback {
        #[arg(long)]
        url: String,
        #[arg(long)]
        expected_state: String,
    },
    /// Fetch and map the user behind an access token
    Userinfo {
        #[arg(long)]
        access_token: String,
    },
    /// Print the provider logout URL
    Logout {
        #[arg(long)]
        id_token_hint: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), OAuthError> {
    init_tracing();
    let cli = Cli::parse();
    let config = client_config(&cli)?;
    debug!(environment = %config.environment, force_dev = config.force_dev, "loaded configuration");
    let client = OAuthClient::new(NcConnectProvider::new(), config)?;

    match cli.command {
        Command::Authorize { open } => {
            let auth = client.authorization_request()?;
            if open {
                if let Err(err) = webbrowser::open(&auth.authorization_url) {
                    eprintln!("Failed to open browser automatically: {err}");
                }
            }
            print_json(&auth)
        }
        Command::Callback {
            url,
            expected_state,
        } => {
            let response = AuthorizationResponse::from_url(&url)?;
            let state = response.state.as_deref().unwrap_or_default();
            let profile = client
                .authenticate(&response.code, state, &expected_state)
                .await?;
            print_json(&profile)
        }
        Command::Userinfo { access_token } => {
            let profile = client.user_from_token(&access_token).await?;
            print_json(&profile)
        }
        Command::Logout { id_token_hint } => {
            println!("{}", client.logout_url(&id_token_hint)?);
            Ok(())
        }
    }
}

fn client_config(cli: &Cli) -> Result<ClientConfig, OAuthError> {
    let settings = match &cli.config {
        Some(path) => ProviderSettings::from_json(&std::fs::read_to_string(path)?)?,
        None => {
            let settings = ProviderSettings {
                client_id: required_flag(&cli.client_id, "--client-id")?,
                client_secret: required_flag(&cli.client_secret, "--client-secret")?,
                redirect: required_flag(&cli.redirect, "--redirect")?,
                logout_redirect: cli.logout_redirect.clone(),
                force_dev: cli.force_dev,
            };
            settings.validate()?;
            settings
        }
    };

    Ok(settings
        .into_client_config(Environment::from_app_env(&cli.app_env))
        .with_timeout(Duration::from_secs(cli.timeout)))
}

fn required_flag(value: &Option<String>, flag: &str) -> Result<String, OAuthError> {
    value
        .clone()
        .ok_or_else(|| OAuthError::InvalidConfig(format!("{flag} is required without --config")))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), OAuthError> {
    let output = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{output}");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
