//! Store selection and lifecycle policy, read from the environment.
//!
//! | variable | default | meaning |
//! |----------|---------|---------|
//! | `USE_PERSISTENT_STORES` | `false` | Postgres when `true`, in-memory otherwise |
//! | `DATABASE_URL` | none | required when persistent |
//! | `DATABASE_MAX_CONNECTIONS` | `5` | Postgres pool size |
//! | `SEAT_POLICY` | `enforced` | `enforced` or `advisory` license seat ceiling |

use thiserror::Error;

use stockroom_assets::SeatPolicy;

use crate::lifecycle::LifecyclePolicy;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")]
    MissingDatabaseUrl,

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Postgres { database_url: String, max_connections: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub policy: LifecyclePolicy,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset and blank values take the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let persistent = match get("USE_PERSISTENT_STORES") {
            Some(raw) => raw.to_ascii_lowercase().parse::<bool>().map_err(|e| ConfigError::Invalid {
                key: "USE_PERSISTENT_STORES",
                value: raw,
                reason: e.to_string(),
            })?,
            None => false,
        };

        let backend = if persistent {
            let database_url = get("DATABASE_URL").ok_or(ConfigError::MissingDatabaseUrl)?;
            let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
                Some(raw) => match raw.parse::<u32>() {
                    Ok(n) if n > 0 => n,
                    Ok(_) => {
                        return Err(ConfigError::Invalid {
                            key: "DATABASE_MAX_CONNECTIONS",
                            value: raw,
                            reason: "must be at least 1".to_string(),
                        });
                    }
                    Err(e) => {
                        return Err(ConfigError::Invalid {
                            key: "DATABASE_MAX_CONNECTIONS",
                            value: raw,
                            reason: e.to_string(),
                        });
                    }
                },
                None => DEFAULT_MAX_CONNECTIONS,
            };
            StoreBackend::Postgres {
                database_url,
                max_connections,
            }
        } else {
            StoreBackend::InMemory
        };

        let seat_policy = match get("SEAT_POLICY") {
            Some(raw) => raw.parse::<SeatPolicy>().map_err(|e| ConfigError::Invalid {
                key: "SEAT_POLICY",
                value: raw,
                reason: e.to_string(),
            })?,
            None => SeatPolicy::default(),
        };

        Ok(Self {
            backend,
            policy: LifecyclePolicy { seat_policy },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<StoreConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StoreConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_to_in_memory_with_enforced_seats() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.backend, StoreBackend::InMemory);
        assert_eq!(cfg.policy.seat_policy, SeatPolicy::Enforced);
    }

    #[test]
    fn persistent_requires_database_url() {
        assert_eq!(
            config(&[("USE_PERSISTENT_STORES", "true")]).unwrap_err(),
            ConfigError::MissingDatabaseUrl
        );
        let cfg = config(&[
            ("USE_PERSISTENT_STORES", "TRUE"),
            ("DATABASE_URL", "postgres://localhost/stockroom"),
        ])
        .unwrap();
        assert_eq!(
            cfg.backend,
            StoreBackend::Postgres {
                database_url: "postgres://localhost/stockroom".into(),
                max_connections: 5,
            }
        );
    }

    #[test]
    fn database_url_ignored_when_not_persistent() {
        let cfg = config(&[("DATABASE_URL", "postgres://localhost/stockroom")]).unwrap();
        assert_eq!(cfg.backend, StoreBackend::InMemory);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        match config(&[("USE_PERSISTENT_STORES", "sometimes")]).unwrap_err() {
            ConfigError::Invalid { key, .. } => assert_eq!(key, "USE_PERSISTENT_STORES"),
            other => panic!("unexpected {other:?}"),
        }
        match config(&[("SEAT_POLICY", "strict")]).unwrap_err() {
            ConfigError::Invalid { key, .. } => assert_eq!(key, "SEAT_POLICY"),
            other => panic!("unexpected {other:?}"),
        }
        let zero_pool = config(&[
            ("USE_PERSISTENT_STORES", "true"),
            ("DATABASE_URL", "postgres://db"),
            ("DATABASE_MAX_CONNECTIONS", "0"),
        ]);
        assert!(matches!(
            zero_pool,
            Err(ConfigError::Invalid {
                key: "DATABASE_MAX_CONNECTIONS",
                ..
            })
        ));
    }

    #[test]
    fn advisory_seat_policy() {
        let cfg = config(&[("SEAT_POLICY", "advisory")]).unwrap();
        assert_eq!(cfg.policy.seat_policy, SeatPolicy::Advisory);
    }
}
