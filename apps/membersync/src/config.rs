use secrecy::SecretString;

/// Default guardrail threshold (minimum trusted snapshot size).
pub const DEFAULT_GUARDRAIL_THRESHOLD: usize = 5;
/// Default cycle interval in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 3600;
/// Default mapping store location.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://membersync.db?mode=rwc";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Read `MEMBERSYNC_LOG_FORMAT`; anything but `json` means text.
    pub fn from_reader<F>(reader: F) -> Self
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        match reader("MEMBERSYNC_LOG_FORMAT") {
            Ok(v) if v.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Membership source credentials.
#[derive(Debug, Clone)]
pub struct RosterSettings {
    pub url: String,
    pub api_id: String,
    pub api_hash: SecretString,
    pub group: String,
}

/// Directory credentials.
#[derive(Debug, Clone)]
pub struct JellyfinSettings {
    pub url: String,
    pub api_key: SecretString,
}

/// Settings needed by every command: where the mapping store lives.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub database_url: String,
}

impl StoreSettings {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load from a custom variable reader.
    pub fn from_reader<F>(reader: F) -> Self
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        Self {
            database_url: reader("DATABASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
        }
    }
}

/// Complete configuration for running sync cycles.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub roster: RosterSettings,
    pub jellyfin: JellyfinSettings,
    pub store: StoreSettings,
    /// Minimum snapshot size the engine trusts.
    pub guardrail_threshold: usize,
    /// Seconds between cycle starts.
    pub interval_secs: u64,
    /// Reserved account names, never provisioned or mutated.
    pub excluded_accounts: Vec<String>,
    /// Per-request timeout for both adapters.
    pub http_timeout_secs: u64,
    /// Directory mutations in flight at once.
    pub mutation_concurrency: usize,
    /// Compute and report without mutating.
    pub dry_run: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    ///
    /// This allows tests to supply variables without mutating process-global
    /// environment state.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let roster = RosterSettings {
            url: required(&reader, "ROSTER_URL", None)?,
            api_id: required(&reader, "ROSTER_API_ID", Some("TELEGRAM_API_ID"))?,
            api_hash: SecretString::new(required(
                &reader,
                "ROSTER_API_HASH",
                Some("TELEGRAM_API_HASH"),
            )?),
            group: required(&reader, "ROSTER_GROUP", Some("TELEGRAM_CHANNEL"))?,
        };

        let jellyfin = JellyfinSettings {
            url: required(&reader, "JELLYFIN_URL", None)?,
            api_key: SecretString::new(required(&reader, "JELLYFIN_API_KEY", None)?),
        };

        let guardrail_threshold =
            positive::<usize, _>(&reader, "GUARDRAIL_THRESHOLD", DEFAULT_GUARDRAIL_THRESHOLD)?;
        let interval_secs = positive::<u64, _>(&reader, "SCRIPT_INTERVAL", DEFAULT_INTERVAL_SECS)?;
        let http_timeout_secs = positive::<u64, _>(&reader, "HTTP_TIMEOUT_SECS", 30)?;
        let mutation_concurrency = positive::<usize, _>(&reader, "MUTATION_CONCURRENCY", 1)?;

        let excluded_accounts = reader("EXCLUDED_ACCOUNTS")
            .unwrap_or_else(|_| "root".to_string())
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        let dry_run = match reader("DRY_RUN") {
            Ok(raw) => parse_bool(&raw)
                .ok_or_else(|| ConfigError::InvalidValue("DRY_RUN".into(), raw.clone()))?,
            Err(_) => false,
        };

        Ok(Self {
            roster,
            jellyfin,
            store: StoreSettings::from_reader(&reader),
            guardrail_threshold,
            interval_secs,
            excluded_accounts,
            http_timeout_secs,
            mutation_concurrency,
            dry_run,
        })
    }
}

fn required<F>(reader: &F, key: &str, alias: Option<&str>) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    reader(key)
        .or_else(|e| match alias {
            Some(alias) => reader(alias),
            None => Err(e),
        })
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
}

fn positive<T, F>(reader: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + From<u8>,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let Ok(raw) = reader(key) else {
        return Ok(default);
    };
    let value = raw
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.into(), e.to_string()))?;
    if value < T::from(1u8) {
        return Err(ConfigError::InvalidValue(
            key.into(),
            "must be at least 1".to_string(),
        ));
    }
    Ok(value)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}
