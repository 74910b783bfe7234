//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::auth::RefreshRotation;
use crate::db::{Database, StoreGate};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use url::Url;

const MIN_SECRET_LENGTH: usize = 32;

pub const ACCESS_SECRET_ENV: &str = "ACCESS_TOKEN_SECRET";
pub const REFRESH_SECRET_ENV: &str = "REFRESH_TOKEN_SECRET";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// Deployment environment. Decides the session cookie policy.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Food Hive",
    about = "Catalog and orders backend with cookie-based JWT sessions"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "foodhive.db")]
    pub database: String,

    /// Deployment environment. Production sets cross-site, Secure cookies
    #[arg(short, long, env = "APP_ENV", value_enum, default_value = "development")]
    pub environment: Environment,

    /// Origin allowed to send credentialed cross-origin requests (repeatable)
    #[arg(long = "allowed-origin", env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Also issue a fresh refresh cookie on every /refresh
    #[arg(long, env = "ROTATE_REFRESH_TOKENS")]
    pub rotate_refresh_tokens: bool,

    /// Path to file containing the access token secret. Prefer ACCESS_TOKEN_SECRET instead
    #[arg(long)]
    pub access_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer REFRESH_TOKEN_SECRET instead
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format. Filtered by RUST_LOG, default `info`.
pub fn init_logging(format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Compact => tracing_subscriber::fmt()
            .compact()
            .with_env_filter(filter)
            .init(),
    }
}

/// Load one signing secret from an environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_secret(env_var: &str, secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var(env_var) {
        // Clear the environment variable to prevent leaking
        // SAFETY: called during startup before any task reads the environment.
        unsafe { std::env::remove_var(env_var) };
        secret
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            "{} is required. Set the environment variable (recommended) or pass a secret file",
            env_var
        );
        return None;
    };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            "{} is shorter than {} characters. Use a longer secret",
            env_var, MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Load the access and refresh secrets. They must differ: one key must not
/// be able to forge the other token class.
pub fn load_signing_secrets(
    access_secret_file: Option<&str>,
    refresh_secret_file: Option<&str>,
) -> Option<(String, String)> {
    let access = load_secret(ACCESS_SECRET_ENV, access_secret_file)?;
    let refresh = load_secret(REFRESH_SECRET_ENV, refresh_secret_file)?;

    if access == refresh {
        error!(
            "{} and {} must be different secrets",
            ACCESS_SECRET_ENV, REFRESH_SECRET_ENV
        );
        return None;
    }

    Some((access, refresh))
}

/// Parse allowed CORS origins into their serialized `scheme://host[:port]` form.
/// Production origins must use HTTPS, since cookies there are `Secure`.
/// Returns None and logs an error if any origin is invalid.
pub fn validate_allowed_origins(origins: &[String], environment: Environment) -> Option<Vec<String>> {
    let mut validated = Vec::with_capacity(origins.len());

    for origin in origins.iter().map(|o| o.trim()).filter(|o| !o.is_empty()) {
        let url = match Url::parse(origin) {
            Ok(url) => url,
            Err(e) => {
                error!(origin = %origin, error = %e, "Invalid allowed origin URL");
                return None;
            }
        };

        if environment.is_production() && url.scheme() != "https" {
            error!(origin = %origin, "Allowed origins must use HTTPS in production");
            return None;
        }

        validated.push(url.origin().ascii_serialization());
    }

    Some(validated)
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    store: StoreGate,
    access_secret: String,
    refresh_secret: String,
    environment: Environment,
    allowed_origins: Vec<String>,
    rotate_refresh_tokens: bool,
) -> ServerConfig {
    let refresh_rotation = if rotate_refresh_tokens {
        RefreshRotation::Reissue
    } else {
        RefreshRotation::Disabled
    };

    ServerConfig {
        store,
        access_secret: access_secret.into_bytes(),
        refresh_secret: refresh_secret.into_bytes(),
        is_production: environment.is_production(),
        allowed_origins,
        refresh_rotation,
    }
}

/// Open the database and confirm it answers, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    let db = match Database::open(path).await {
        Ok(db) => db,
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            return None;
        }
    };

    if let Err(e) = db.ping().await {
        error!(path = %path, error = %e, "Database did not respond");
        return None;
    }

    info!(path = %path, "Database opened");
    Some(db)
}
