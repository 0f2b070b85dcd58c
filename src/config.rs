use std::path::PathBuf;

use anyhow::Context;

/// How a dashboard visit writes the synthetic series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesMode {
    /// Every visit adds another 168 rows.
    Append,
    /// Every visit replaces the owner's rows with a fresh 168.
    Replace,
}

impl std::str::FromStr for SeriesMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(SeriesMode::Append),
            "replace" => Ok(SeriesMode::Replace),
            other => anyhow::bail!("unknown SERIES_MODE {:?} (expected append or replace)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_minutes: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub plots_dir: PathBuf,
    pub series_mode: SeriesMode,
    pub session: SessionConfig,
}

const MIN_SECRET_LEN: usize = 16;

impl AppConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let secret = std::env::var("SECRET_KEY").context("SECRET_KEY must be set")?;
        anyhow::ensure!(
            secret.len() >= MIN_SECRET_LEN,
            "SECRET_KEY must be at least {} bytes",
            MIN_SECRET_LEN
        );

        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = match std::env::var("APP_PORT") {
            Ok(v) => v
                .parse::<u16>()
                .with_context(|| format!("APP_PORT {:?} is not a port number", v))?,
            Err(_) => 8080,
        };

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:wattboard.db?mode=rwc".into());
        let plots_dir = std::env::var("PLOTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("static/plots"));
        let series_mode = match std::env::var("SERIES_MODE") {
            Ok(v) => v.parse()?,
            Err(_) => SeriesMode::Append,
        };

        let session = SessionConfig {
            secret,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "wattboard".into()),
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 12),
            cookie_secure: std::env::var("COOKIE_SECURE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        };

        Ok(Self {
            host,
            port,
            database_url,
            plots_dir,
            series_mode,
            session,
        })
    }

    /// Config for tests: in-memory database, throwaway secret.
    pub fn for_tests(plots_dir: impl Into<PathBuf>) -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: "sqlite::memory:".into(),
            plots_dir: plots_dir.into(),
            series_mode: SeriesMode::Append,
            session: SessionConfig {
                secret: "test-secret-key-0123456789".into(),
                issuer: "wattboard-test".into(),
                ttl_minutes: 5,
                cookie_secure: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_mode_parses_case_insensitively() {
        assert_eq!("append".parse::<SeriesMode>().unwrap(), SeriesMode::Append);
        assert_eq!(" Replace ".parse::<SeriesMode>().unwrap(), SeriesMode::Replace);
        assert!("window".parse::<SeriesMode>().is_err());
    }

    #[test]
    fn test_config_uses_memory_database() {
        let cfg = AppConfig::for_tests("/tmp/plots");
        assert_eq!(cfg.database_url, "sqlite::memory:");
        assert_eq!(cfg.series_mode, SeriesMode::Append);
        assert!(cfg.session.secret.len() >= MIN_SECRET_LEN);
    }

    #[test]
    fn listen_addr_joins_host_and_port() {
        let mut cfg = AppConfig::for_tests("/tmp/plots");
        cfg.host = "0.0.0.0".into();
        cfg.port = 8080;
        assert_eq!(cfg.listen_addr(), "0.0.0.0:8080");
        assert!(cfg.listen_addr().parse::<std::net::SocketAddr>().is_ok());
    }
}
