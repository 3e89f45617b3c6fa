use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub football: FootballConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible endpoint; `/v1` is appended when missing
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_model() -> String {
    "gpt-5".to_string()
}

fn default_llm_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Deserialize)]
pub struct FootballConfig {
    #[serde(default = "default_football_url")]
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_football_timeout")]
    pub timeout_secs: u64,
}

fn default_football_url() -> String {
    "https://v3.football.api-sports.io".to_string()
}

fn default_football_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Server-side cap on a single statement
    #[serde(default = "default_session_timeout_ms")]
    pub statement_timeout_ms: u64,
    #[serde(default = "default_session_timeout_ms")]
    pub idle_in_transaction_timeout_ms: u64,
    #[serde(default = "default_application_name")]
    pub application_name: String,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_session_timeout_ms() -> u64 {
    30_000
}

fn default_application_name() -> String {
    "fixture-analyst".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Competitions evaluated by the batch run
    #[serde(default, deserialize_with = "deserialize_league_ids")]
    pub league_ids: Vec<i64>,
    /// Maximum model calls in one report's tool loop
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    /// Wall-clock budget for one report's tool loop
    #[serde(default = "default_report_deadline")]
    pub report_deadline_secs: u64,
    /// Budget for report generation plus decision extraction of one fixture
    #[serde(default = "default_fixture_timeout")]
    pub fixture_timeout_secs: u64,
    /// Wall-clock budget for one batch run; unstarted fixtures wait for the next run
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,
    /// Total upsert attempts per fixture (2 = one retry)
    #[serde(default = "default_persist_attempts")]
    pub persist_max_attempts: u32,
    #[serde(default = "default_persist_backoff")]
    pub persist_backoff_ms: u64,
    #[serde(default = "default_schedule_interval")]
    pub schedule_interval_secs: u64,
}

fn default_max_tool_rounds() -> u32 {
    8
}

fn default_report_deadline() -> u64 {
    300
}

fn default_fixture_timeout() -> u64 {
    600
}

fn default_run_timeout() -> u64 {
    6 * 3600
}

fn default_persist_attempts() -> u32 {
    2
}

fn default_persist_backoff() -> u64 {
    500
}

fn default_schedule_interval() -> u64 {
    86_400
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            league_ids: Vec::new(),
            max_tool_rounds: default_max_tool_rounds(),
            report_deadline_secs: default_report_deadline(),
            fixture_timeout_secs: default_fixture_timeout(),
            run_timeout_secs: default_run_timeout(),
            persist_max_attempts: default_persist_attempts(),
            persist_backoff_ms: default_persist_backoff(),
            schedule_interval_secs: default_schedule_interval(),
        }
    }
}

impl PipelineConfig {
    pub fn report_deadline(&self) -> Duration {
        Duration::from_secs(self.report_deadline_secs)
    }

    pub fn fixture_timeout(&self) -> Duration {
        Duration::from_secs(self.fixture_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    pub fn persist_backoff(&self) -> Duration {
        Duration::from_millis(self.persist_backoff_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Parse a comma separated competition list, skipping entries that are not integers.
pub fn parse_league_ids(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse::<i64>().ok())
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LeagueIdsRepr {
    List(Vec<serde_json::Value>),
    Text(String),
    Single(i64),
}

fn deserialize_league_ids<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let ids = match LeagueIdsRepr::deserialize(deserializer)? {
        LeagueIdsRepr::Text(raw) => parse_league_ids(&raw),
        LeagueIdsRepr::Single(id) => vec![id],
        LeagueIdsRepr::List(values) => values
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::Number(n) => n.as_i64(),
                serde_json::Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .collect(),
    };
    Ok(ids)
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("server.port", 8000)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("ANALYST_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (ANALYST__LLM__API_KEY, etc.)
            .add_source(
                Environment::with_prefix("ANALYST")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.llm.base_url.trim().is_empty() {
            errors.push("llm.base_url must not be empty".to_string());
        }
        if self.llm.model.trim().is_empty() {
            errors.push("llm.model must not be empty".to_string());
        }
        if self.llm.timeout_secs == 0 {
            errors.push("llm.timeout_secs must be positive".to_string());
        }
        if self.football.base_url.trim().is_empty() {
            errors.push("football.base_url must not be empty".to_string());
        }
        if self.pipeline.max_tool_rounds == 0 {
            errors.push("pipeline.max_tool_rounds must be at least 1".to_string());
        }
        if self.pipeline.persist_max_attempts == 0 {
            errors.push("pipeline.persist_max_attempts must be at least 1".to_string());
        }
        if self.pipeline.report_deadline_secs == 0 {
            errors.push("pipeline.report_deadline_secs must be positive".to_string());
        }
        if self.pipeline.run_timeout_secs < self.pipeline.fixture_timeout_secs {
            errors.push(
                "pipeline.run_timeout_secs should not be shorter than fixture_timeout_secs"
                    .to_string(),
            );
        }
        if self.pipeline.schedule_interval_secs == 0 {
            errors.push("pipeline.schedule_interval_secs must be positive".to_string());
        }
        if self.pipeline.fixture_timeout_secs < self.pipeline.report_deadline_secs {
            errors.push(
                "pipeline.fixture_timeout_secs should not be shorter than report_deadline_secs"
                    .to_string(),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig {
            llm: LlmConfig {
                base_url: "https://llm.example.com".to_string(),
                api_key: "k".to_string(),
                model: default_model(),
                timeout_secs: 120,
                temperature: None,
            },
            football: FootballConfig {
                base_url: default_football_url(),
                api_key: "k".to_string(),
                timeout_secs: 30,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/analyst".to_string(),
                connect_timeout_secs: 10,
                statement_timeout_ms: 30_000,
                idle_in_transaction_timeout_ms: 30_000,
                application_name: default_application_name(),
            },
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
        }
    }

    #[test]
    fn test_parse_league_ids_is_lenient() {
        assert_eq!(parse_league_ids("39, 140,x,,78 "), vec![39, 140, 78]);
        assert!(parse_league_ids("").is_empty());
    }

    #[test]
    fn test_league_ids_from_string_or_list() {
        let cfg: PipelineConfig = serde_json::from_str(r#"{"league_ids": "39,61"}"#).unwrap();
        assert_eq!(cfg.league_ids, vec![39, 61]);

        let cfg: PipelineConfig =
            serde_json::from_str(r#"{"league_ids": [39, "61", "bad"]}"#).unwrap();
        assert_eq!(cfg.league_ids, vec![39, 61]);

        let cfg: PipelineConfig = serde_json::from_str(r#"{"league_ids": 39}"#).unwrap();
        assert_eq!(cfg.league_ids, vec![39]);
        assert_eq!(cfg.max_tool_rounds, 8);
        assert_eq!(cfg.persist_max_attempts, 2);
    }

    #[test]
    fn test_validate() {
        assert!(sample().validate().is_ok());

        let mut cfg = sample();
        cfg.pipeline.max_tool_rounds = 0;
        cfg.pipeline.persist_max_attempts = 0;
        let errors = cfg.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_validate_rejects_zero_schedule_interval() {
        let mut cfg = sample();
        cfg.pipeline.schedule_interval_secs = 0;
        let errors = cfg.validate().unwrap_err();
        assert_eq!(errors, vec!["pipeline.schedule_interval_secs must be positive".to_string()]);
    }

    #[test]
    fn test_validate_run_timeout_covers_one_fixture() {
        let mut cfg = sample();
        cfg.pipeline.run_timeout_secs = cfg.pipeline.fixture_timeout_secs - 1;
        assert_eq!(cfg.validate().unwrap_err().len(), 1);

        cfg.pipeline.run_timeout_secs = cfg.pipeline.fixture_timeout_secs;
        assert!(cfg.validate().is_ok());
    }
}
