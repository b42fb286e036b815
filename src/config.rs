use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: String,
    pub database_url: String,

    /// Endpoint of the generative-AI enrichment service.
    pub ai_api_url: String,

    /// Credential for the enrichment service, injected into the client at
    /// construction rather than read from the environment at call time.
    pub ai_api_key: String,

    /// Upper bound on a single enrichment call, in seconds.
    pub ai_timeout_secs: u64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Accessible course platform API")]
pub struct Args {
    /// Host to bind to (overrides EDUACCESS_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides EDUACCESS_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploaded payloads are stored (overrides EDUACCESS_UPLOAD_DIR)
    #[arg(long)]
    pub upload_dir: Option<String>,

    /// Database URL (overrides EDUACCESS_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Enrichment service endpoint (overrides EDUACCESS_AI_API_URL)
    #[arg(long)]
    pub ai_api_url: Option<String>,

    /// Enrichment service API key (overrides EDUACCESS_AI_API_KEY)
    #[arg(long)]
    pub ai_api_key: Option<String>,

    /// Enrichment call timeout in seconds (overrides EDUACCESS_AI_TIMEOUT_SECS)
    #[arg(long)]
    pub ai_timeout_secs: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("EDUACCESS_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("EDUACCESS_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing EDUACCESS_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading EDUACCESS_PORT"),
        };
        let env_upload =
            env::var("EDUACCESS_UPLOAD_DIR").unwrap_or_else(|_| "./data/uploads".into());
        let env_db = env::var("EDUACCESS_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/eduaccess.db".into());
        let env_ai_url = env::var("EDUACCESS_AI_API_URL").unwrap_or_else(|_| {
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
                .into()
        });
        let env_ai_key = env::var("EDUACCESS_AI_API_KEY").unwrap_or_default();
        let env_ai_timeout = match env::var("EDUACCESS_AI_TIMEOUT_SECS") {
            Ok(value) => value
                .parse::<u64>()
                .with_context(|| format!("parsing EDUACCESS_AI_TIMEOUT_SECS value `{}`", value))?,
            Err(env::VarError::NotPresent) => 60,
            Err(err) => return Err(err).context("reading EDUACCESS_AI_TIMEOUT_SECS"),
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            upload_dir: args.upload_dir.unwrap_or(env_upload),
            database_url: args.database_url.unwrap_or(env_db),
            ai_api_url: args.ai_api_url.unwrap_or(env_ai_url),
            ai_api_key: args.ai_api_key.unwrap_or(env_ai_key),
            ai_timeout_secs: args.ai_timeout_secs.unwrap_or(env_ai_timeout),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
