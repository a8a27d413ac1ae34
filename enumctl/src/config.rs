//! Optional JSON config-file loading (§6 Config surface), merged with CLI
//! flags to build the engine's [`engine::EngineConfig`].
//!
//! Mirrors the pack's `DNSServerList` JSON load/save idiom: a plain
//! `serde`-derived struct, loaded with `serde_json::from_str` and mapped
//! into `CliError` on failure.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CliError, ConfigErrorStruct, Result};

/// On-disk config file shape. Every field is optional so a config file can
/// set as little or as much as the operator wants; CLI flags win over
/// whatever the file sets (see [`FileConfig::merge_into`]).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub root_domains: Option<Vec<String>>,
    pub disabled_sources: Option<Vec<String>>,
    pub active_mode: Option<bool>,
    pub resolvers: Option<Vec<String>>,
    pub blacklist: Option<Vec<String>>,
    pub name_blacklist: Option<Vec<String>>,
    pub sem_max_dns_queries: Option<usize>,
    pub include_unresolvable: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| CliError::Config(ConfigErrorStruct::new(path.display().to_string(), e.to_string())))
    }

    /// Apply every field this file sets onto `cfg`, unless the CLI already
    /// set a non-empty override (CLI flags take precedence, §6).
    pub fn merge_into(self, cfg: &mut engine::EngineConfig) {
        if cfg.root_domains.is_empty() {
            if let Some(roots) = self.root_domains {
                cfg.root_domains = roots.into_iter().map(|d| d.trim_end_matches('.').to_ascii_lowercase()).collect();
            }
        }
        if cfg.disabled_sources.is_empty() {
            if let Some(sources) = self.disabled_sources {
                cfg.disabled_sources = sources.into_iter().collect();
            }
        }
        if !cfg.active_mode {
            if let Some(active) = self.active_mode {
                cfg.active_mode = active;
            }
        }
        if cfg.resolvers.is_empty() {
            if let Some(resolvers) = self.resolvers {
                cfg.resolvers = resolvers;
            }
        }
        if cfg.blacklist.is_empty() {
            if let Some(nets) = self.blacklist {
                cfg.blacklist = nets.iter().filter_map(|s| s.parse().ok()).collect();
            }
        }
        if cfg.name_blacklist.is_empty() {
            if let Some(names) = self.name_blacklist {
                cfg.name_blacklist = names;
            }
        }
        if let Some(sem) = self.sem_max_dns_queries {
            cfg.sem_max_dns_queries = sem;
        }
        if !cfg.include_unresolvable {
            if let Some(include) = self.include_unresolvable {
                cfg.include_unresolvable = include;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_supplied_roots_are_not_overridden_by_the_file() {
        let mut cfg = engine::EngineConfig::new(vec!["cli-example.com".to_string()]);
        let file = FileConfig {
            root_domains: Some(vec!["file-example.com".to_string()]),
            ..Default::default()
        };
        file.merge_into(&mut cfg);
        assert_eq!(cfg.root_domains, vec!["cli-example.com".to_string()]);
    }

    #[test]
    fn file_fills_in_fields_the_cli_left_empty() {
        let mut cfg = engine::EngineConfig::new(vec!["example.com".to_string()]);
        let file = FileConfig {
            active_mode: Some(true),
            sem_max_dns_queries: Some(500),
            ..Default::default()
        };
        file.merge_into(&mut cfg);
        assert!(cfg.active_mode);
        assert_eq!(cfg.sem_max_dns_queries, 500);
    }
}
