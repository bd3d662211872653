use anyhow::{anyhow, Context, Result};
use reqwest::Url;
use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_GATEWAY_URL: &str = "https://api-preprod.phonepe.com/apis/pg-sandbox";
pub const DEFAULT_BOOKING_SUCCESS_URL: &str = "http://localhost:5173/payment-tpfc/booking-success";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub redirect: RedirectConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    /// Empty means any origin
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Clone)]
pub struct GatewayConfig {
    pub merchant_id: String,
    pub salt_key: String,
    pub salt_index: String,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RedirectConfig {
    /// Public base URL of this service; the callback path is joined onto it
    pub public_base_url: String,
    /// Front-end page the payer lands on after the callback
    pub booking_success_url: String,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("merchant_id", &self.merchant_id)
            .field("salt_key", &"<redacted>")
            .field("salt_index", &self.salt_index)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let server = ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|s| split_list(&s))
                .unwrap_or_default(),
            environment,
        };

        let gateway = GatewayConfig {
            merchant_id: env::var("MERCHANT_ID").context("MERCHANT_ID not set")?,
            salt_key: env::var("SALT_KEY").context("SALT_KEY not set")?,
            salt_index: env::var("SALT_INDEX").context("SALT_INDEX not set")?,
            base_url: env::var("PHONEPE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string()),
            timeout: Duration::from_secs(
                env::var("PHONEPE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("PHONEPE_TIMEOUT_SECS must be a valid number")?,
            ),
        };

        // Only development may fall back to the local front-end
        let booking_success_url = match env::var("BOOKING_SUCCESS_URL") {
            Ok(url) => url,
            Err(_) if server.environment == "development" => {
                DEFAULT_BOOKING_SUCCESS_URL.to_string()
            }
            Err(_) => {
                return Err(anyhow!(
                    "BOOKING_SUCCESS_URL must be set outside development"
                ))
            }
        };

        let redirect = RedirectConfig {
            public_base_url: env::var("BASE_URL").context("BASE_URL not set")?,
            booking_success_url,
        };

        let config = Config {
            server,
            gateway,
            redirect,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port < 1024 {
            return Err(anyhow!(
                "Port must be at least 1024, got {}",
                self.server.port
            ));
        }

        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        if self.gateway.merchant_id.trim().is_empty() {
            return Err(anyhow!("MERCHANT_ID cannot be empty"));
        }

        if self.gateway.salt_key.trim().is_empty() {
            return Err(anyhow!("SALT_KEY cannot be empty"));
        }

        if self.gateway.salt_index.trim().is_empty() {
            return Err(anyhow!("SALT_INDEX cannot be empty"));
        }

        if self.gateway.timeout.is_zero() {
            return Err(anyhow!("PHONEPE_TIMEOUT_SECS must be greater than 0"));
        }

        Url::parse(&self.gateway.base_url).context("PHONEPE_BASE_URL must be a valid URL")?;
        Url::parse(&self.redirect.public_base_url).context("BASE_URL must be a valid URL")?;
        Url::parse(&self.redirect.booking_success_url)
            .context("BOOKING_SUCCESS_URL must be a valid URL")?;

        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
            environment: "development".to_string(),
            cors_allowed_origins: Vec::new(),
        },
        gateway: GatewayConfig {
            merchant_id: "MERCHANTUAT".to_string(),
            salt_key: "test-salt-key".to_string(),
            salt_index: "1".to_string(),
            base_url: DEFAULT_GATEWAY_URL.to_string(),
            timeout: Duration::from_secs(30),
        },
        redirect: RedirectConfig {
            public_base_url: "https://api.tpfc.test/".to_string(),
            booking_success_url: "https://tpfc.test/payment-tpfc/booking-success".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_rejects_privileged_port() {
        let mut config = test_config();
        config.server.port = 80;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_environment() {
        let mut config = test_config();
        config.server.environment = "qa".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_salt() {
        let mut config = test_config();
        config.gateway.salt_key = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut config = test_config();
        config.gateway.timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_relative_success_url() {
        let mut config = test_config();
        config.redirect.booking_success_url = "/booking-success".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_salt_key() {
        let rendered = format!("{:?}", test_config().gateway);
        assert!(!rendered.contains("test-salt-key"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("https://a.test, ,https://b.test"),
            vec!["https://a.test".to_string(), "https://b.test".to_string()]
        );
    }
}
