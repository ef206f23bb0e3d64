use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::{Confirm, Input};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Command;

/// Path prefix of every backend endpoint
const API_PREFIX: &str = "/api/v1";

/// Catalog Admin - command-line client for the product catalog API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Base URL of the catalog backend
    #[arg(short = 'b', long, env = "CATALOG_BACKEND_URL", default_value = "http://localhost:5000")]
    pub backend_url: String,

    /// Path to the SQLite file holding the session
    #[arg(short = 's', long, env = "CATALOG_SESSION_DB")]
    pub session_db: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,

    /// Upper bound for one token refresh call, in seconds
    #[arg(long, env = "TOKEN_REFRESH_TIMEOUT", default_value = "15")]
    pub refresh_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Backend
    pub backend_url: String,
    pub api_base: String,

    // Session storage
    pub session_db: PathBuf,

    // Timeouts (seconds)
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,
    pub token_refresh_timeout: u64,

    pub log_level: String,
}

impl Config {
    /// Build the configuration from parsed arguments (CLI > ENV > defaults).
    /// `.env` must already be loaded for its values to count as ENV.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let backend_url = args.backend_url.trim().trim_end_matches('/').to_string();

        let session_db = match args.session_db.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(path) => expand_tilde(path.trim()),
            None => default_session_db().context(
                "Could not determine a data directory; set CATALOG_SESSION_DB or pass --session-db",
            )?,
        };

        Ok(Config {
            api_base: format!("{}{}", backend_url, API_PREFIX),
            backend_url,
            session_db,
            http_connect_timeout: std::env::var("HTTP_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            http_request_timeout: args.http_timeout,
            token_refresh_timeout: args.refresh_timeout,
            log_level: args.log_level.clone(),
        })
    }

    /// Load `.env`, parse the command line and build the configuration
    pub fn load() -> Result<(Self, Command)> {
        dotenvy::dotenv().ok();
        let args = CliArgs::parse();
        let config = Self::from_args(&args)?;
        Ok((config, args.command))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.backend_url.starts_with("http://") || self.backend_url.starts_with("https://")) {
            anyhow::bail!(
                "CATALOG_BACKEND_URL must start with http:// or https://, got: {}",
                self.backend_url
            );
        }
        if self.http_connect_timeout == 0 || self.http_request_timeout == 0 || self.token_refresh_timeout == 0 {
            anyhow::bail!("Timeouts must be greater than zero");
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http_connect_timeout)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http_request_timeout)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.token_refresh_timeout)
    }
}

fn default_session_db() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("catalog-admin").join("session.sqlite3"))
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

// === Interactive Setup ===

/// Ask for the backend settings and optionally write them to `.env`
pub fn run_interactive_setup(current: &Config) -> Result<()> {
    println!();
    println!("Catalog Admin setup");
    println!();

    let backend_url: String = Input::new()
        .with_prompt("Catalog backend URL (CATALOG_BACKEND_URL)")
        .default(current.backend_url.clone())
        .interact_text()
        .context("Failed to read CATALOG_BACKEND_URL")?;

    let backend_url = backend_url.trim().trim_end_matches('/').to_string();
    if !(backend_url.starts_with("http://") || backend_url.starts_with("https://")) {
        anyhow::bail!("Backend URL must start with http:// or https://");
    }

    let session_db: String = Input::new()
        .with_prompt("Session database path (CATALOG_SESSION_DB)")
        .default(current.session_db.display().to_string())
        .interact_text()
        .context("Failed to read CATALOG_SESSION_DB")?;

    println!();
    let save_to_env = Confirm::new()
        .with_prompt("Save configuration to .env file?")
        .default(true)
        .interact()
        .context("Failed to read save confirmation")?;

    if save_to_env {
        save_env_file(Path::new(".env"), &backend_url, &session_db)?;
        println!("Configuration saved to .env file");
    }

    Ok(())
}

fn env_file_content(backend_url: &str, session_db: &str) -> String {
    format!(
        r#"# Catalog Admin configuration
# Generated by `catalog-admin setup`

# Catalog backend (the API lives under /api/v1)
CATALOG_BACKEND_URL={}

# Where the login session is kept
CATALOG_SESSION_DB={}

# Logging (trace, debug, info, warn, error)
LOG_LEVEL=warn

# Timeouts in seconds
HTTP_REQUEST_TIMEOUT=30
HTTP_CONNECT_TIMEOUT=10
TOKEN_REFRESH_TIMEOUT=15
"#,
        backend_url, session_db,
    )
}

fn save_env_file(path: &Path, backend_url: &str, session_db: &str) -> Result<()> {
    let mut file = std::fs::File::create(path).context("Failed to create .env file")?;
    file.write_all(env_file_content(backend_url, session_db).as_bytes())
        .context("Failed to write .env file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        let mut argv = vec!["catalog-admin"];
        argv.extend_from_slice(args);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_api_base_from_backend_url() {
        let args = parse(&["--backend-url", "https://shop.example.com/", "--session-db", "/tmp/s.db", "whoami"]);
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.backend_url, "https://shop.example.com");
        assert_eq!(config.api_base, "https://shop.example.com/api/v1");
        assert_eq!(config.session_db, PathBuf::from("/tmp/s.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_timeouts() {
        let args = parse(&["--http-timeout", "5", "--refresh-timeout", "2", "--session-db", "/tmp/s.db", "whoami"]);
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.refresh_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let args = parse(&["--backend-url", "ftp://shop", "--session-db", "/tmp/s.db", "whoami"]);
        let config = Config::from_args(&args).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let args = parse(&["--refresh-timeout", "0", "--session-db", "/tmp/s.db", "whoami"]);
        let config = Config::from_args(&args).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(CliArgs::try_parse_from(["catalog-admin"]).is_err());
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/catalog/session.sqlite3");
        assert!(path.to_string_lossy().contains("catalog/session.sqlite3"));
        assert!(!path.to_string_lossy().starts_with('~'));

        assert_eq!(expand_tilde("/absolute/path"), PathBuf::from("/absolute/path"));
        assert_eq!(expand_tilde("~"), PathBuf::from("~"));
    }

    #[test]
    fn test_env_file_content() {
        let content = env_file_content("http://localhost:5000", "/tmp/s.db");
        assert!(content.contains("CATALOG_BACKEND_URL=http://localhost:5000\n"));
        assert!(content.contains("CATALOG_SESSION_DB=/tmp/s.db\n"));
    }
}
