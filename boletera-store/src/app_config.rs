use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// How long a seat hold survives before reverting to Available
    #[serde(default = "default_hold_seconds")]
    pub seat_hold_seconds: u64,

    /// Interval of the background expiry sweep
    #[serde(default = "default_sweep_seconds")]
    pub sweep_interval_seconds: u64,
}

fn default_hold_seconds() -> u64 {
    600
}

fn default_sweep_seconds() -> u64 {
    60
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            seat_hold_seconds: default_hold_seconds(),
            sweep_interval_seconds: default_sweep_seconds(),
        }
    }
}

impl BusinessRules {
    pub fn hold_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.seat_hold_seconds as i64)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `BOLETERA__BUSINESS_RULES__SEAT_HOLD_SECONDS=300`
            .add_source(config::Environment::with_prefix("BOLETERA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let rules = BusinessRules::default();
        assert_eq!(rules.hold_duration(), chrono::Duration::minutes(10));
        assert_eq!(rules.sweep_interval(), std::time::Duration::from_secs(60));
    }
}
