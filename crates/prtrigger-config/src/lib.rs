//! KDL configuration parsing for the pull-request build trigger scheduler.
//!
//! A single file holds:
//! - the `server` block (system configuration)
//! - one `repository "<slug>"` block per repository (trigger flags,
//!   debounce delay, CI servers)

pub mod error;
mod node;
pub mod repository;
pub mod settings;
pub mod system;

pub use error::{ConfigError, ConfigResult};
pub use repository::RepositoryConfig;
pub use settings::StaticSettings;
pub use system::SystemConfig;

use kdl::KdlDocument;
use std::collections::HashSet;
use std::path::Path;

/// A parsed configuration file.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: SystemConfig,
    pub repositories: Vec<RepositoryConfig>,
}

impl Config {
    pub fn repository(&self, slug: &str) -> Option<&RepositoryConfig> {
        self.repositories.iter().find(|r| r.slug == slug)
    }
}

/// Parse a configuration document from KDL text.
pub fn parse_config(kdl: &str) -> ConfigResult<Config> {
    let doc: KdlDocument = kdl.parse()?;

    let mut server = None;
    let mut repositories: Vec<RepositoryConfig> = Vec::new();
    let mut seen = HashSet::new();

    for node in doc.nodes() {
        match node.name().value() {
            "server" => {
                if server.is_some() {
                    return Err(ConfigError::Duplicate("server block".to_string()));
                }
                server = Some(system::parse_system_node(node)?);
            }
            "repository" => {
                let repo = repository::parse_repository(node)?;
                if !seen.insert(repo.slug.clone()) {
                    return Err(ConfigError::Duplicate(format!("repository '{}'", repo.slug)));
                }
                repositories.push(repo);
            }
            _ => {} // Ignore unknown nodes
        }
    }

    Ok(Config {
        server: server.unwrap_or_default(),
        repositories,
    })
}

/// Read and parse a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}
