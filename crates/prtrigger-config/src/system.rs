//! System configuration parsing.

use crate::node::{parse_non_negative, parse_string};
use crate::{ConfigError, ConfigResult};
use kdl::KdlNode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:3000";

/// Headroom a claim must keep over the CI call it covers, for the mirror
/// and user lookups around it.
pub const CLAIM_TIMEOUT_MARGIN: Duration = Duration::from_secs(30);

/// Node-wide configuration from the `server` block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Address the HTTP server binds to.
    pub listen: String,
    /// Name this node claims jobs under. Generated when absent.
    pub node_id: Option<String>,
    /// PostgreSQL connection string. In-memory single-node mode when absent.
    pub database_url: Option<String>,
    /// Idle sleep between worker ticks.
    pub poll_interval: Duration,
    /// Claims older than this are assumed to belong to a crashed node.
    pub claim_timeout: Duration,
    /// Upper bound on a single CI trigger call.
    pub trigger_timeout: Duration,
    /// Shared secret for webhook signatures. Signatures are not checked when absent.
    pub webhook_secret: Option<String>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            node_id: None,
            database_url: None,
            poll_interval: Duration::from_millis(1000),
            claim_timeout: Duration::from_secs(300),
            trigger_timeout: Duration::from_secs(30),
            webhook_secret: None,
        }
    }
}

pub(crate) fn parse_system_node(node: &KdlNode) -> ConfigResult<SystemConfig> {
    let mut config = SystemConfig::default();

    let Some(children) = node.children() else {
        return Ok(config);
    };

    for child in children.nodes() {
        match child.name().value() {
            "listen" => config.listen = parse_string(child)?,
            "node-id" => config.node_id = Some(parse_string(child)?),
            "database-url" => config.database_url = Some(parse_string(child)?),
            "poll-interval-ms" => {
                config.poll_interval = Duration::from_millis(parse_non_negative(child)?)
            }
            "claim-timeout-secs" => {
                config.claim_timeout = Duration::from_secs(parse_non_negative(child)?)
            }
            "trigger-timeout-secs" => {
                let secs = parse_non_negative(child)?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        field: "trigger-timeout-secs".to_string(),
                        message: "must be greater than zero".to_string(),
                    });
                }
                config.trigger_timeout = Duration::from_secs(secs);
            }
            "webhook-secret" => config.webhook_secret = Some(parse_string(child)?),
            _ => {}
        }
    }

    // A claim that expires while its trigger is still running gets released
    // and run a second time by another node.
    let min_claim = config.trigger_timeout + CLAIM_TIMEOUT_MARGIN;
    if config.claim_timeout < min_claim {
        return Err(ConfigError::InvalidValue {
            field: "claim-timeout-secs".to_string(),
            message: format!(
                "must be at least {}s (trigger-timeout-secs plus {}s)",
                min_claim.as_secs(),
                CLAIM_TIMEOUT_MARGIN.as_secs()
            ),
        });
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_system_config(kdl: &str) -> ConfigResult<SystemConfig> {
        crate::parse_config(kdl).map(|config| config.server)
    }

    #[test]
    fn test_parse_server_block() {
        let kdl = r#"
            server {
                database-url "postgres://localhost/prtrigger"
                poll-interval-ms 250
                claim-timeout-secs 60
                trigger-timeout-secs 10
            }
        "#;

        let config = parse_system_config(kdl).unwrap();
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/prtrigger")
        );
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.claim_timeout, Duration::from_secs(60));
        assert_eq!(config.trigger_timeout, Duration::from_secs(10));
        assert!(config.webhook_secret.is_none());
    }

    #[test]
    fn test_zero_trigger_timeout_is_rejected() {
        let kdl = r#"
            server {
                trigger-timeout-secs 0
            }
        "#;
        assert!(matches!(
            parse_system_config(kdl).unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_claim_timeout_must_outlast_trigger_timeout() {
        for kdl in [
            "server { claim-timeout-secs 0; }",
            "server { claim-timeout-secs 30; }",
            "server { claim-timeout-secs 70; trigger-timeout-secs 60; }",
        ] {
            assert!(
                matches!(
                    parse_system_config(kdl),
                    Err(ConfigError::InvalidValue { field, .. }) if field == "claim-timeout-secs"
                ),
                "accepted: {kdl}"
            );
        }

        let config = parse_system_config("server { claim-timeout-secs 90; trigger-timeout-secs 60; }")
            .unwrap();
        assert_eq!(config.claim_timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_defaults_keep_claim_headroom() {
        let config = parse_system_config("server").unwrap();
        assert!(config.claim_timeout >= config.trigger_timeout + CLAIM_TIMEOUT_MARGIN);
    }

    #[test]
    fn test_negative_interval_is_rejected() {
        let kdl = r#"
            server {
                poll-interval-ms -5
            }
        "#;
        assert!(matches!(
            parse_system_config(kdl).unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
    }
}
