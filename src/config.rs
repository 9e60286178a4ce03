//! Configuration types.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default trailing window, in days.
pub const DEFAULT_WINDOW_DAYS: i64 = 10;

/// Longest accepted window, in days (about a century).
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Telegram account credentials and session location.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Account username; also names the session file.
    pub username: String,
    pub phone: String,
    pub api_id: i32,
    pub api_hash: SecretString,
    /// Directory holding `<username>.session`.
    pub session_dir: PathBuf,
}

impl TelegramConfig {
    /// Path of the persisted session, reused across runs.
    pub fn session_file(&self) -> PathBuf {
        self.session_dir.join(format!("{}.session", self.username))
    }
}

/// SMTP relay settings for the completion notice.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
        }
    }
}

/// Everything a scrape run needs, built once at startup.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub telegram: TelegramConfig,
    /// Workbook whose first column lists the channels.
    pub channels_path: PathBuf,
    /// Destination spreadsheet, addressed by name.
    pub spreadsheet_name: String,
    /// Google service-account key (JSON).
    pub service_account_path: PathBuf,
    /// Workbook holding `Sender`, `App password`, `Receiver`.
    pub email_creds_path: PathBuf,
    pub window_days: i64,
    pub smtp: SmtpConfig,
}

impl ScraperConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };
        let path_or = |key: &str, default: &str| {
            PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()))
        };

        let api_id = required("TELEGRAM_API_ID")?;
        let api_id: i32 = api_id.parse().map_err(|e| ConfigError::InvalidValue {
            key: "TELEGRAM_API_ID".into(),
            message: format!("{e}"),
        })?;

        let telegram = TelegramConfig {
            username: required("TELEGRAM_USERNAME")?,
            phone: required("TELEGRAM_PHONE")?,
            api_id,
            api_hash: SecretString::from(required("TELEGRAM_API_HASH")?),
            session_dir: path_or("SCRAPER_SESSION_DIR", "."),
        };

        let window_days = match lookup("SCRAPER_WINDOW_DAYS") {
            Some(raw) => {
                let days: i64 = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                    key: "SCRAPER_WINDOW_DAYS".into(),
                    message: format!("{e}"),
                })?;
                if !(1..=MAX_WINDOW_DAYS).contains(&days) {
                    return Err(ConfigError::InvalidValue {
                        key: "SCRAPER_WINDOW_DAYS".into(),
                        message: format!("must be between 1 and {MAX_WINDOW_DAYS}"),
                    });
                }
                days
            }
            None => DEFAULT_WINDOW_DAYS,
        };

        let mut smtp = SmtpConfig::default();
        if let Some(host) = lookup("SCRAPER_SMTP_HOST") {
            smtp.host = host;
        }
        if let Some(port) = lookup("SCRAPER_SMTP_PORT") {
            smtp.port = port.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "SCRAPER_SMTP_PORT".into(),
                message: format!("{e}"),
            })?;
        }

        Ok(Self {
            telegram,
            channels_path: path_or("SCRAPER_CHANNELS_PATH", "channels.xlsx"),
            spreadsheet_name: required("SCRAPER_SPREADSHEET")?,
            service_account_path: path_or("GOOGLE_SERVICE_ACCOUNT_PATH", "service_account.json"),
            email_creds_path: path_or("SCRAPER_EMAIL_CREDS_PATH", "email_credentials.xlsx"),
            window_days,
            smtp,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("TELEGRAM_USERNAME", "scraper"),
            ("TELEGRAM_PHONE", "+10000000000"),
            ("TELEGRAM_API_ID", "12345"),
            ("TELEGRAM_API_HASH", "abcdef"),
            ("SCRAPER_SPREADSHEET", "Channel Digest"),
        ])
    }

    fn load(env: &HashMap<&str, &str>) -> Result<ScraperConfig, ConfigError> {
        ScraperConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_applied() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.window_days, 10);
        assert_eq!(config.smtp.host, "smtp.gmail.com");
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.channels_path, PathBuf::from("channels.xlsx"));
        assert_eq!(config.email_creds_path, PathBuf::from("email_credentials.xlsx"));
        assert_eq!(config.telegram.api_id, 12345);
        assert_eq!(config.telegram.api_hash.expose_secret(), "abcdef");
        assert_eq!(config.telegram.session_file(), PathBuf::from("./scraper.session"));
    }

    #[test]
    fn missing_required_var() {
        let mut env = base_env();
        env.remove("SCRAPER_SPREADSHEET");
        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(k) if k == "SCRAPER_SPREADSHEET"));
    }

    #[test]
    fn blank_required_var_is_missing() {
        let mut env = base_env();
        env.insert("TELEGRAM_PHONE", "   ");
        assert!(matches!(load(&env), Err(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn invalid_api_id() {
        let mut env = base_env();
        env.insert("TELEGRAM_API_ID", "not-a-number");
        assert!(matches!(
            load(&env),
            Err(ConfigError::InvalidValue { key, .. }) if key == "TELEGRAM_API_ID"
        ));
    }

    #[test]
    fn window_days_override_and_bounds() {
        let mut env = base_env();
        env.insert("SCRAPER_WINDOW_DAYS", "3");
        assert_eq!(load(&env).unwrap().window_days, 3);

        env.insert("SCRAPER_WINDOW_DAYS", "0");
        assert!(load(&env).is_err());
    }

    #[test]
    fn oversized_window_is_rejected() {
        let mut env = base_env();
        env.insert("SCRAPER_WINDOW_DAYS", "1000000000");
        let err = load(&env).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "SCRAPER_WINDOW_DAYS"
        ));

        env.insert("SCRAPER_WINDOW_DAYS", "36500");
        assert_eq!(load(&env).unwrap().window_days, MAX_WINDOW_DAYS);
    }

    #[test]
    fn smtp_overrides() {
        let mut env = base_env();
        env.insert("SCRAPER_SMTP_HOST", "smtp.example.com");
        env.insert("SCRAPER_SMTP_PORT", "2525");
        let config = load(&env).unwrap();
        assert_eq!(config.smtp.host, "smtp.example.com");
        assert_eq!(config.smtp.port, 2525);
    }
}
