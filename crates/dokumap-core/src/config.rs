//! Site scan configuration.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::grammar::Grammar;

/// Configuration for loading one wiki.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct SiteConfig {
    /// Wiki installation directory (the one holding `data/`).
    pub root: PathBuf,

    /// Data directory, when it is not `<root>/data`.
    #[builder(default)]
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Suffix of current page files.
    #[builder(default = "\".txt\".to_string()")]
    #[serde(default = "default_page_suffix")]
    pub page_suffix: String,

    /// Compression suffix of page history files.
    #[builder(default = "\".gz\".to_string()")]
    #[serde(default = "default_archive_suffix")]
    pub archive_suffix: String,

    /// Entry names skipped in every tree.
    #[builder(default = "vec![\"_dummy\".to_string()]")]
    #[serde(default = "default_ignored_entries")]
    pub ignored_entries: Vec<String>,

    /// Additional entry names skipped in the meta tree.
    #[builder(default = "vec![\"_htcookiesalt\".to_string()]")]
    #[serde(default = "default_meta_ignored_entries")]
    pub meta_ignored_entries: Vec<String>,

    /// Entry suffixes skipped in the meta tree.
    #[builder(default = "vec![\".trimmed\".to_string()]")]
    #[serde(default = "default_meta_ignored_suffixes")]
    pub meta_ignored_suffixes: Vec<String>,
}

fn default_page_suffix() -> String {
    ".txt".to_string()
}

fn default_archive_suffix() -> String {
    ".gz".to_string()
}

fn default_ignored_entries() -> Vec<String> {
    vec!["_dummy".to_string()]
}

fn default_meta_ignored_entries() -> Vec<String> {
    vec!["_htcookiesalt".to_string()]
}

fn default_meta_ignored_suffixes() -> Vec<String> {
    vec![".trimmed".to_string()]
}

impl SiteConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            None => return Err("Root path is required".to_string()),
            _ => {}
        }
        if let Some(ref suffix) = self.page_suffix {
            if suffix.is_empty() {
                return Err("Page suffix cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl SiteConfig {
    /// Create a new site config builder.
    pub fn builder() -> SiteConfigBuilder {
        SiteConfigBuilder::default()
    }

    /// Create a config with DokuWiki defaults for the wiki at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            data_dir: None,
            page_suffix: default_page_suffix(),
            archive_suffix: default_archive_suffix(),
            ignored_entries: default_ignored_entries(),
            meta_ignored_entries: default_meta_ignored_entries(),
            meta_ignored_suffixes: default_meta_ignored_suffixes(),
        }
    }

    /// Directory holding the five source trees.
    pub fn data_path(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| self.root.join("data"))
    }

    /// Filename grammar for this layout.
    pub fn grammar(&self) -> Grammar {
        Grammar::new(self.page_suffix.clone(), &self.archive_suffix)
    }

    /// Check if an entry is skipped in every tree.
    pub fn should_ignore(&self, name: &str) -> bool {
        self.ignored_entries.iter().any(|ignored| ignored == name)
    }

    /// Check if an entry is skipped in the meta tree.
    pub fn should_ignore_meta(&self, name: &str) -> bool {
        self.should_ignore(name)
            || self.meta_ignored_entries.iter().any(|ignored| ignored == name)
            || self
                .meta_ignored_suffixes
                .iter()
                .any(|suffix| name.ends_with(suffix.as_str()))
    }
}
