//! Configuration management for flightdesk.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::flights::NewFlight;
use crate::users::PasswordPolicy;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "flightdesk";

/// Default users file name.
const USERS_FILE_NAME: &str = "users.txt";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLIGHTDESK_`)
/// 2. TOML config file at `~/.config/flightdesk/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Airline branding.
    pub airline: AirlineConfig,
    /// Initial flight schedule.
    pub schedule: ScheduleConfig,
    /// Access keys for privileged roles.
    pub access: AccessConfig,
    /// Credential policy.
    pub policy: PolicyConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the users file.
    /// Defaults to `~/.local/share/flightdesk/users.txt`
    pub users_file: Option<PathBuf>,
}

/// Airline branding shown in the console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirlineConfig {
    /// Airline name used in greetings.
    pub name: String,
    /// Currency code printed next to fares.
    pub currency: String,
}

/// Flights loaded at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Load `flights` into the index at startup.
    pub seed_flights: bool,
    /// Flights to schedule, ids assigned in order from 1.
    pub flights: Vec<NewFlight>,
}

/// Keys required to register as staff or admin.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Key for the staff role.
    #[serde(deserialize_with = "access_key")]
    pub staff_key: String,
    /// Key for the admin role.
    #[serde(deserialize_with = "access_key")]
    pub admin_key: String,
}

/// Accept a key written as a number, as figment reads `FLIGHTDESK_ACCESS__STAFF_KEY=4321`.
///
/// Leading zeros are lost on that path; quote the value to keep them.
fn access_key<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct KeyVisitor;

    impl de::Visitor<'_> for KeyVisitor {
        type Value = String;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("an access key string or number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<String, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(KeyVisitor)
}

/// Credential policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Minimum password length in characters.
    pub min_password_length: usize,
}

impl Default for AirlineConfig {
    fn default() -> Self {
        Self {
            name: "GIKI Airlines".to_string(),
            currency: "PKR".to_string(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            seed_flights: true,
            flights: default_flights(),
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            staff_key: "0000".to_string(),
            admin_key: "1234".to_string(),
        }
    }
}

impl std::fmt::Debug for AccessConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessConfig")
            .field("staff_key", &"[REDACTED]")
            .field("admin_key", &"[REDACTED]")
            .finish()
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_password_length: PasswordPolicy::default().min_length,
        }
    }
}

/// The three flights every fresh install starts with.
fn default_flights() -> Vec<NewFlight> {
    let day = NaiveDate::from_ymd_opt(2024, 12, 15).unwrap_or_default();
    let at = |hour| NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default();
    vec![
        NewFlight {
            origin: "Lahore".to_string(),
            destination: "Islamabad".to_string(),
            date: day,
            time: at(8),
            fare: Decimal::new(18400, 0),
            seats: 50,
        },
        NewFlight {
            origin: "Islamabad".to_string(),
            destination: "Karachi".to_string(),
            date: day,
            time: at(12),
            fare: Decimal::new(45150, 0),
            seats: 60,
        },
        NewFlight {
            origin: "Karachi".to_string(),
            destination: "Lahore".to_string(),
            date: day,
            time: at(16),
            fare: Decimal::new(67120, 0),
            seats: 40,
        },
    ]
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file at `config_path`, or the default path (if exists)
    /// 3. Environment variables (prefixed with `FLIGHTDESK_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FLIGHTDESK_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.access.staff_key.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "access.staff_key must not be empty".to_string(),
            });
        }

        if self.access.admin_key.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "access.admin_key must not be empty".to_string(),
            });
        }

        if self.policy.min_password_length == 0 {
            return Err(Error::ConfigValidation {
                message: "policy.min_password_length must be greater than 0".to_string(),
            });
        }

        // Validate seed flights
        for (n, flight) in self.schedule.flights.iter().enumerate() {
            if let Err(e) = flight.validate() {
                return Err(Error::ConfigValidation {
                    message: format!("schedule.flights[{n}]: {e}"),
                });
            }
        }

        Ok(())
    }

    /// Get the users file path, resolving defaults if not set.
    #[must_use]
    pub fn users_file(&self) -> PathBuf {
        self.storage
            .users_file
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(USERS_FILE_NAME))
    }

    /// Get the password policy.
    #[must_use]
    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy {
            min_length: self.policy.min_password_length,
        }
    }

    /// Get the flights to seed the index with (empty if seeding is off).
    #[must_use]
    pub fn seed_flights(&self) -> &[NewFlight] {
        if self.schedule.seed_flights {
            &self.schedule.flights
        } else {
            &[]
        }
    }
}
