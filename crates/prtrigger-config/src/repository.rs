//! Per-repository configuration parsing.

use crate::node::{get_first_string_arg, parse_flag, parse_non_negative, parse_string};
use crate::{ConfigError, ConfigResult};
use chrono::Duration;
use kdl::KdlNode;
use prtrigger_core::RepositorySettings;
use prtrigger_core::settings::{DEFAULT_DEBOUNCE_SECS, MAX_DEBOUNCE_SECS};
use serde::{Deserialize, Serialize};

/// A `repository "<slug>" { ... }` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub slug: String,
    pub project: Option<String>,
    pub trigger_on_create: bool,
    pub trigger_on_update: bool,
    pub trigger_on_reopen: bool,
    /// New pull requests start with automatic builds suppressed.
    pub disable_automatic_build: bool,
    pub debounce_delay_secs: i64,
    /// CI base URLs, used round-robin.
    pub ci_servers: Vec<String>,
    /// CI job started for each pull request build.
    pub build_job: Option<String>,
    pub token: Option<String>,
}

impl RepositoryConfig {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            project: None,
            trigger_on_create: false,
            trigger_on_update: false,
            trigger_on_reopen: false,
            disable_automatic_build: false,
            debounce_delay_secs: DEFAULT_DEBOUNCE_SECS,
            ci_servers: Vec::new(),
            build_job: None,
            token: None,
        }
    }

    /// The flags the scheduler reads. The delay is clamped into
    /// `0..=MAX_DEBOUNCE_SECS`.
    pub fn settings(&self) -> RepositorySettings {
        RepositorySettings {
            trigger_on_create: self.trigger_on_create,
            trigger_on_update: self.trigger_on_update,
            trigger_on_reopen: self.trigger_on_reopen,
            disable_automatic_build_by_default: self.disable_automatic_build,
            debounce_delay: Duration::seconds(
                self.debounce_delay_secs.clamp(0, MAX_DEBOUNCE_SECS),
            ),
        }
    }
}

pub(crate) fn parse_repository(node: &KdlNode) -> ConfigResult<RepositoryConfig> {
    let slug = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("repository slug".to_string()))?;

    let mut repo = RepositoryConfig::new(slug);

    let Some(children) = node.children() else {
        return Ok(repo);
    };

    for child in children.nodes() {
        match child.name().value() {
            "project" => repo.project = Some(parse_string(child)?),
            "trigger-on-create" => repo.trigger_on_create = parse_flag(child)?,
            "trigger-on-update" => repo.trigger_on_update = parse_flag(child)?,
            "trigger-on-reopen" => repo.trigger_on_reopen = parse_flag(child)?,
            "disable-automatic-build" => repo.disable_automatic_build = parse_flag(child)?,
            "debounce-delay" => {
                let secs = parse_non_negative(child)?;
                repo.debounce_delay_secs = i64::try_from(secs)
                    .ok()
                    .filter(|s| *s <= MAX_DEBOUNCE_SECS)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        field: "debounce-delay".to_string(),
                        message: format!("must be at most {MAX_DEBOUNCE_SECS} seconds"),
                    })?;
            }
            "ci-server" => repo.ci_servers.push(parse_string(child)?),
            "build-job" => repo.build_job = Some(parse_string(child)?),
            "token" => repo.token = Some(parse_string(child)?),
            _ => {}
        }
    }

    Ok(repo)
}
