use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delays for the simulated sign-in and checkout flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_login_delay_ms")]
    pub login_delay_ms: u64,
    #[serde(default = "default_payment_delay_ms")]
    pub payment_delay_ms: u64,
}

fn default_login_delay_ms() -> u64 {
    1500
}

fn default_payment_delay_ms() -> u64 {
    2000
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_delay_ms: default_login_delay_ms(),
            payment_delay_ms: default_payment_delay_ms(),
        }
    }
}

impl AuthConfig {
    pub fn login_delay(&self) -> Duration {
        Duration::from_millis(self.login_delay_ms)
    }

    pub fn payment_delay(&self) -> Duration {
        Duration::from_millis(self.payment_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let a = AuthConfig::default();
        assert_eq!(a.login_delay(), Duration::from_millis(1500));
        assert_eq!(a.payment_delay(), Duration::from_millis(2000));
    }

    #[test]
    fn serde_roundtrip_zero_delays() {
        let a: AuthConfig = toml::from_str("login_delay_ms = 0\npayment_delay_ms = 0\n").unwrap();
        let back: AuthConfig = toml::from_str(&toml::to_string(&a).unwrap()).unwrap();
        assert_eq!(back.login_delay(), Duration::ZERO);
        assert_eq!(back.payment_delay(), Duration::ZERO);
    }
}
