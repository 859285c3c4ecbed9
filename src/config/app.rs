use std::{env, net::SocketAddr, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Public origin used when building links that go out by email.
    pub base_url: String,
    pub mail_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("PORT", 8080u16)?;
        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://localhost:{}", port));
        let mail_timeout = Duration::from_secs(parse_var("MAIL_TIMEOUT_SECS", 10u64)?);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            mail_timeout,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self
            .host
            .parse::<std::net::IpAddr>()
            .map_err(|_| ConfigError::Invalid {
                key: "HOST",
                value: self.host.clone(),
            })?;
        Ok(SocketAddr::from((ip, self.port)))
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}
