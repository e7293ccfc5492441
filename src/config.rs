use std::env;

/// Port used when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 8000;

/// ConfigError
///
/// Raised by `AppConfig::load` when the environment cannot produce a usable
/// configuration. Always fatal: the process must not start serving.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("No {0} specified.")]
    Missing(&'static str),
    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Env
///
/// Runtime context. Only affects the log output format.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// AppConfig
///
/// The whole configuration of the service, read once at startup and handed to
/// the components that need it (the rating store and the verifier client).
/// Nothing below `main` reads the environment.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Address to bind to. Empty means every interface.
    pub host: String,
    pub port: u16,
    // Endpoint of the external authentication service.
    pub verifier_uri: String,
    // Store connection string (Postgres).
    pub db_url: String,
    // Database the repository binds to, overriding any database in `db_url`.
    pub db_name: String,
    // Table holding one row per (game_id, user_id).
    pub ratings_table: String,
    pub env: Env,
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    /// `ConfigError::Missing` when `VERIFIER_URI`, `DATABASE_URL`,
    /// `DATABASE_NAME` or `RATINGS_TABLE` is unset or empty;
    /// `ConfigError::Invalid` when `PORT` is not a port number or the table name
    /// is not a plain SQL identifier.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match optional("APP_ENV").as_deref() {
            Some("production") => Env::Production,
            _ => Env::Local,
        };

        let port = match optional("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let ratings_table = required("RATINGS_TABLE")?;
        if !is_identifier(&ratings_table) {
            return Err(ConfigError::Invalid {
                name: "RATINGS_TABLE",
                reason: format!("{ratings_table:?} is not a valid table name"),
            });
        }

        Ok(Self {
            host: optional("HOST").unwrap_or_default(),
            port,
            verifier_uri: required("VERIFIER_URI")?,
            db_url: required("DATABASE_URL")?,
            db_name: required("DATABASE_NAME")?,
            ratings_table,
            env,
        })
    }

    /// bind_address
    ///
    /// `host:port` for the listener, with an empty host meaning all interfaces.
    pub fn bind_address(&self) -> String {
        let host = if self.host.is_empty() {
            "0.0.0.0"
        } else {
            self.host.as_str()
        };
        format!("{}:{}", host, self.port)
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

// The table name is spliced into SQL text, so only bare identifiers pass.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
