use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use restward_core::AppError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    pub frontend_url: String,
    pub seed_demo: bool,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_host = lookup("API_HOST")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = match lookup("API_PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|error| AppError::Validation(format!("invalid API_PORT: {error}")))?,
            None => 3001,
        };
        let frontend_url =
            lookup("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_owned());
        let seed_demo = match lookup("API_SEED_DEMO") {
            Some(value) => parse_flag("API_SEED_DEMO", value.as_str())?,
            None => true,
        };

        Ok(Self {
            api_host,
            api_port,
            frontend_url,
            seed_demo,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_flag(name: &str, value: &str) -> Result<bool, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::Validation(format!(
            "{name} must be a boolean flag, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::ApiConfig;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ApiConfig, restward_core::AppError> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        ApiConfig::from_lookup(|name| values.get(name).cloned())
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = config_from(&[]).unwrap_or_else(|_| unreachable!());

        assert_eq!(config.api_host, "127.0.0.1");
        assert_eq!(config.api_port, 3001);
        assert!(config.seed_demo);
        assert!(config.socket_address().is_ok());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(config_from(&[("API_PORT", "eighty")]).is_err());
        assert!(config_from(&[("API_SEED_DEMO", "maybe")]).is_err());

        let config =
            config_from(&[("API_HOST", "not-an-ip")]).unwrap_or_else(|_| unreachable!());
        assert!(config.socket_address().is_err());
    }

    #[test]
    fn seed_flag_can_be_disabled() {
        let config = config_from(&[("API_SEED_DEMO", "false"), ("API_PORT", "8080")])
            .unwrap_or_else(|_| unreachable!());

        assert!(!config.seed_demo);
        assert_eq!(config.api_port, 8080);
    }
}
