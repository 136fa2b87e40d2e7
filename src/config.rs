//! Application configuration.
//!
//! Values are resolved with priority: config.toml > environment (.env) > default.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::paths;

// ==================== Server Configuration ====================

/// Server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Default server port
pub const SERVER_PORT: u16 = 3000;

// ==================== Attempt Configuration ====================

/// Quiz attempts are dropped after this many hours without activity
pub const ATTEMPT_EXPIRY_HOURS: i64 = 6;

/// Probability threshold for attempt cleanup (0-255, lower = less frequent)
/// Value of 25 means ~10% chance (25/256) on each attempt access
pub const ATTEMPT_CLEANUP_THRESHOLD: u8 = 25;

/// Buffered progress events per subscriber before the oldest are dropped
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

// ==================== AI Configuration ====================

pub const DEFAULT_AI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_AI_MODEL: &str = "gpt-3.5-turbo";

/// Upper bound on a single AI call before the local fallback is used
pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 20;

/// A zero timeout would fail every AI call before it starts
pub const MIN_AI_TIMEOUT_SECS: u64 = 1;

// ==================== Config file ====================

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
  server: Option<ServerSection>,
  database: Option<DatabaseSection>,
  ai: Option<AiSection>,
  demo: Option<DemoSection>,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
  addr: Option<String>,
  port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct DatabaseSection {
  path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AiSection {
  enabled: Option<bool>,
  endpoint: Option<String>,
  model: Option<String>,
  api_key: Option<String>,
  timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DemoSection {
  seed: Option<bool>,
}

// ==================== Resolved configuration ====================

#[derive(Debug, Clone)]
pub struct AiConfig {
  pub enabled: bool,
  pub endpoint: String,
  pub model: String,
  pub api_key: Option<String>,
  pub timeout_secs: u64,
}

impl AiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_addr: String,
  pub server_port: u16,
  pub database_path: PathBuf,
  pub ai: AiConfig,
  pub seed_demo: bool,
}

impl AppConfig {
  /// Full address to bind the HTTP listener to
  pub fn bind_addr(&self) -> String {
    format!("{}:{}", self.server_addr, self.server_port)
  }
}

/// Load configuration from config.toml and the environment
pub fn load() -> AppConfig {
  // Load .env file if present
  let _ = dotenvy::dotenv();

  let contents = std::fs::read_to_string("config.toml").ok();
  resolve(contents.as_deref(), |key| std::env::var(key).ok())
}

/// Resolve configuration from optional config.toml contents and an
/// environment lookup
pub fn resolve(contents: Option<&str>, env: impl Fn(&str) -> Option<String>) -> AppConfig {
  let file = match contents.map(toml::from_str::<FileConfig>) {
    Some(Ok(file)) => file,
    Some(Err(e)) => {
      tracing::warn!("Ignoring invalid config.toml: {}", e);
      FileConfig::default()
    }
    None => FileConfig::default(),
  };

  let server = file.server.unwrap_or(ServerSection {
    addr: None,
    port: None,
  });
  let ai = file.ai.unwrap_or(AiSection {
    enabled: None,
    endpoint: None,
    model: None,
    api_key: None,
    timeout_secs: None,
  });

  let database_path = match file.database.and_then(|db| db.path) {
    Some(path) => {
      tracing::info!("Using database from config.toml: {}", path);
      PathBuf::from(path)
    }
    None => match env("DATABASE_PATH") {
      Some(path) => {
        tracing::info!("Using database from DATABASE_PATH env: {}", path);
        PathBuf::from(path)
      }
      None => PathBuf::from(paths::app_db_path()),
    },
  };

  let api_key = ai
    .api_key
    .or_else(|| env("OPENAI_API_KEY"))
    .filter(|key| !key.trim().is_empty());

  let mut timeout_secs = ai
    .timeout_secs
    .or_else(|| env("AI_TIMEOUT_SECS").and_then(|s| s.parse().ok()))
    .unwrap_or(DEFAULT_AI_TIMEOUT_SECS);
  if timeout_secs < MIN_AI_TIMEOUT_SECS {
    tracing::warn!(
      "AI timeout of {}s is too short, using {}s",
      timeout_secs,
      MIN_AI_TIMEOUT_SECS
    );
    timeout_secs = MIN_AI_TIMEOUT_SECS;
  }

  AppConfig {
    server_addr: server.addr.unwrap_or_else(|| SERVER_ADDR.to_string()),
    server_port: server
      .port
      .or_else(|| env("PORT").and_then(|p| p.parse().ok()))
      .unwrap_or(SERVER_PORT),
    database_path,
    ai: AiConfig {
      enabled: ai.enabled.unwrap_or(true),
      endpoint: ai
        .endpoint
        .or_else(|| env("AI_ENDPOINT"))
        .unwrap_or_else(|| DEFAULT_AI_ENDPOINT.to_string()),
      model: ai
        .model
        .or_else(|| env("AI_MODEL"))
        .unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
      api_key,
      timeout_secs,
    },
    seed_demo: file
      .demo
      .and_then(|d| d.seed)
      .or_else(|| env("SEED_DEMO").map(|v| v == "1" || v.eq_ignore_ascii_case("true")))
      .unwrap_or(false),
  }
}
