use std::time::Duration;

use thiserror::Error;

use crate::alert::Thresholds;

/// Everything the node needs to run one wake cycle, collected in one place and
/// validated before any hardware is touched. The firmware fills this in from
/// compile-time environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    pub wifi_ssid: String,
    pub wifi_password: String,

    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,

    pub temperature_topic: String,
    pub humidity_topic: String,

    pub thresholds: Thresholds,

    /// Recipient for the messaging webhook, e.g. "+1234567898765".
    pub phone_number: String,
    pub api_key: String,

    pub sleep_duration: Duration,
    pub connect_attempts: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing configuration value: {0}")]
    Missing(&'static str),
    #[error("alert trigger threshold must lie above the reset threshold")]
    ThresholdOrder,
    #[error("sleep duration must be non-zero")]
    ZeroSleep,
    #[error("connect attempt limit must be non-zero")]
    ZeroAttempts,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("wifi ssid", &self.wifi_ssid),
            ("broker host", &self.broker_host),
            ("temperature topic", &self.temperature_topic),
            ("humidity topic", &self.humidity_topic),
            ("phone number", &self.phone_number),
            ("api key", &self.api_key),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }

        if !(self.thresholds.trigger > self.thresholds.reset) {
            return Err(ConfigError::ThresholdOrder);
        }
        if self.sleep_duration.is_zero() {
            return Err(ConfigError::ZeroSleep);
        }
        if self.connect_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }

        Ok(())
    }

    /// Broker address in the URL form the MQTT client expects.
    pub fn broker_url(&self) -> String {
        format!("mqtt://{}:{}", self.broker_host, self.broker_port)
    }
}

/// Applies one compile-time override, keeping the fallback when the variable
/// is unset or does not parse.
pub fn parse_override<T: std::str::FromStr>(value: Option<&str>, fallback: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(fallback)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            broker_host: String::new(),
            broker_port: 1883,
            client_id: "humiwatch-esp32".into(),
            temperature_topic: "your/mqtt/topic/temperature".into(),
            humidity_topic: "your/mqtt/topic/humidity".into(),
            thresholds: Thresholds::default(),
            phone_number: String::new(),
            api_key: String::new(),
            sleep_duration: Duration::from_secs(60),
            connect_attempts: 6,
        }
    }
}
