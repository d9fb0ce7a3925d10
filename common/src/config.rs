//! Service configuration.
//!
//! Configuration is read once at startup from environment variables (an
//! optional `.env` file is merged in first) and passed explicitly to the
//! components that need it.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};

use crate::errors::{AppError, AppResult};

/// Connection string used when `DATABASE_URL` is not set. Development only.
pub const DEFAULT_CONNECTION_STRING: &str = "Server=localhost;User=root;Password=your_password;";

/// The single browser origin allowed to make cross-origin calls by default.
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Reads `LOG_FORMAT` from the process environment.
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub service_name: String,
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub cors_allowed_origin: String,
    pub log_format: LogFormat,
}

/// Settings for the catalog database.
#[derive(Clone)]
pub struct DatabaseConfig {
    /// Either a `mysql://` URL or a `Key=Value;...` connection string.
    pub connection_string: String,
    /// Whether `connection_string` is the built-in fallback.
    pub is_fallback: bool,
    pub connect_timeout_secs: u64,
    pub max_connections: u32,
}

// The connection string usually carries a password.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("connection_string", &"<redacted>")
            .field("is_fallback", &self.is_fallback)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl AppConfig {
    /// Loads configuration for a service from the process environment.
    pub fn load_with_service(service_name: &str, default_port: u16) -> Self {
        Self::from_lookup(service_name, default_port, |key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(service_name: &str, default_port: u16, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let (connection_string, is_fallback) = match non_empty("DATABASE_URL") {
            Some(value) => (value, false),
            None => (DEFAULT_CONNECTION_STRING.to_string(), true),
        };

        Self {
            service_name: service_name.to_string(),
            host: non_empty("SERVER_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: non_empty("SERVER_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default_port),
            database: DatabaseConfig {
                connection_string,
                is_fallback,
                connect_timeout_secs: non_empty("DB_CONNECT_TIMEOUT_SECS")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
                max_connections: non_empty("DB_MAX_CONNECTIONS")
                    .and_then(|v| v.trim().parse().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            },
            cors_allowed_origin: non_empty("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            log_format: LogFormat::parse(lookup("LOG_FORMAT").as_deref()),
        }
    }
}

impl DatabaseConfig {
    /// Parses the connection string into driver options.
    pub fn connect_options(&self) -> AppResult<MySqlConnectOptions> {
        parse_connection_string(&self.connection_string)
    }
}

/// Parses a MySQL connection string.
///
/// Accepts a `mysql://` (or `mariadb://`) URL, or the semicolon separated
/// form used by most MySQL client libraries:
/// `Server=db;Port=3306;User=app;Password=secret;Database=shop;`.
/// Keys are case-insensitive; unknown keys are ignored. A value wrapped in
/// single or double quotes may contain `;`, and a doubled quote inside it
/// stands for one quote character: `Password="a;b""c"` is `a;b"c`.
pub fn parse_connection_string(raw: &str) -> AppResult<MySqlConnectOptions> {
    let raw = raw.trim();
    if raw.starts_with("mysql://") || raw.starts_with("mariadb://") {
        return MySqlConnectOptions::from_str(raw)
            .map_err(|e| AppError::Configuration(format!("invalid database url: {}", e)));
    }
    Ok(KeyValueSettings::parse(raw)?.into_options())
}

/// Fields recognised in a `Key=Value;...` connection string.
#[derive(Default)]
struct KeyValueSettings {
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    database: Option<String>,
    ssl_mode: Option<MySqlSslMode>,
}

impl KeyValueSettings {
    fn parse(raw: &str) -> AppResult<Self> {
        let mut settings = Self::default();
        for (key, value) in split_pairs(raw)? {
            let value = value.as_str();
            match key.as_str() {
                "server" | "host" | "data source" | "datasource" | "address" | "addr" => {
                    settings.host = Some(value.to_string())
                }
                "port" => {
                    let port = value.parse::<u16>().map_err(|_| {
                        AppError::Configuration(format!(
                            "invalid port in connection string: {}",
                            value
                        ))
                    })?;
                    settings.port = Some(port);
                }
                "user" | "uid" | "user id" | "userid" | "username" | "user name" => {
                    settings.username = Some(value.to_string())
                }
                "password" | "pwd" => settings.password = Some(value.to_string()),
                "database" | "initial catalog" => settings.database = Some(value.to_string()),
                "sslmode" | "ssl mode" | "ssl-mode" => settings.ssl_mode = Some(parse_ssl_mode(value)?),
                _ => tracing::debug!(key = %key, "ignoring unsupported connection string option"),
            }
        }
        Ok(settings)
    }

    fn into_options(self) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new();
        if let Some(host) = &self.host {
            options = options.host(host);
        }
        if let Some(port) = self.port {
            options = options.port(port);
        }
        if let Some(username) = &self.username {
            options = options.username(username);
        }
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        if let Some(database) = &self.database {
            options = options.database(database);
        }
        if let Some(ssl_mode) = self.ssl_mode {
            options = options.ssl_mode(ssl_mode);
        }
        options
    }
}

/// One `Key=Value` segment while it is being scanned.
#[derive(Default)]
struct Segment {
    key: String,
    value: String,
    seen_eq: bool,
    quoted: bool,
}

impl Segment {
    fn finish(self, index: usize) -> AppResult<Option<(String, String)>> {
        if !self.seen_eq {
            if self.key.trim().is_empty() {
                return Ok(None);
            }
            // Never echo the segment itself, it may be the password.
            return Err(AppError::Configuration(format!(
                "connection string segment {} is not a Key=Value pair",
                index
            )));
        }
        let value = if self.quoted {
            self.value
        } else {
            self.value.trim().to_string()
        };
        Ok(Some((self.key.trim().to_ascii_lowercase(), value)))
    }
}

/// Splits `Key=Value;...` into lower-cased keys and values, honouring
/// quoted values.
fn split_pairs(raw: &str) -> AppResult<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    let mut segment = Segment::default();
    let mut index = 1;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ';' => {
                if let Some(pair) = std::mem::take(&mut segment).finish(index)? {
                    pairs.push(pair);
                }
                index += 1;
            }
            '=' if !segment.seen_eq => segment.seen_eq = true,
            '"' | '\'' if segment.seen_eq && !segment.quoted && segment.value.trim().is_empty() => {
                segment.value.clear();
                segment.quoted = true;
                loop {
                    match chars.next() {
                        Some(ch) if ch == c && chars.peek() == Some(&c) => {
                            chars.next();
                            segment.value.push(c);
                        }
                        Some(ch) if ch == c => break,
                        Some(ch) => segment.value.push(ch),
                        None => {
                            return Err(AppError::Configuration(format!(
                                "unterminated quoted value in connection string segment {}",
                                index
                            )))
                        }
                    }
                }
            }
            _ if segment.quoted => {
                if !c.is_whitespace() {
                    return Err(AppError::Configuration(format!(
                        "unexpected text after quoted value in connection string segment {}",
                        index
                    )));
                }
            }
            _ if segment.seen_eq => segment.value.push(c),
            _ => segment.key.push(c),
        }
    }
    if let Some(pair) = segment.finish(index)? {
        pairs.push(pair);
    }
    Ok(pairs)
}

fn parse_ssl_mode(value: &str) -> AppResult<MySqlSslMode> {
    match value.to_ascii_lowercase().replace(['_', '-'], "").as_str() {
        "none" | "disabled" => Ok(MySqlSslMode::Disabled),
        "preferred" => Ok(MySqlSslMode::Preferred),
        "required" => Ok(MySqlSslMode::Required),
        "verifyca" => Ok(MySqlSslMode::VerifyCa),
        "verifyfull" | "verifyidentity" => Ok(MySqlSslMode::VerifyIdentity),
        other => Err(AppError::Configuration(format!("unknown ssl mode: {}", other))),
    }
}

/// Loads a `.env` file (best-effort, no error if missing).
///
/// Variables already present in the environment win over the file.
pub fn load_dotenv(path: &Path) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };
    for (key, value) in parse_dotenv(&content) {
        if std::env::var(&key).is_err() {
            std::env::set_var(key, value);
        }
    }
}

fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let key = key.trim().trim_start_matches("export ").trim();
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            (key.to_string(), value.to_string())
        })
        .filter(|(key, _)| !key.is_empty())
        .collect()
}
