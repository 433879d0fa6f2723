//! Configuration management for the catalog ingestion pipeline.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings. Keyword tables live here too so
//! that every component receives them explicitly at construction.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable consulted when no index token is configured
pub const INDEX_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory settings
    pub data: DataConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Catalog backend settings
    pub catalog: CatalogConfig,

    /// Repository index settings
    pub index: IndexConfig,

    /// Run settings
    pub ingest: IngestConfig,

    /// Filter keyword tables
    pub filter: FilterConfig,

    /// Enrichment tables
    pub enrich: EnrichConfig,

    /// Localization tables and templates
    pub localize: LocalizeConfig,
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root data directory path
    pub root_dir: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log directory path (relative to data directory or absolute)
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// Which catalog implementation a run reads from and writes to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CatalogBackend {
    Sqlite,
    Http,
}

/// Catalog backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Backend used for both the read and the write interface
    pub backend: CatalogBackend,

    /// SQLite file path (relative to data directory or absolute)
    pub database_path: String,

    /// Base URL of the catalog REST API (http backend)
    pub base_url: String,

    /// Bearer token for the catalog REST API
    pub token: Option<String>,

    /// Page size used while loading the existing catalog
    pub page_size: u32,
}

/// Repository index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// REST API base URL
    pub base_url: String,

    /// Root for raw file content, used to resolve images
    pub raw_base_url: String,

    /// Bearer token (falls back to the GITHUB_TOKEN environment variable)
    pub token: Option<String>,

    /// User agent sent with every request
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Search queries, issued in order
    pub queries: Vec<String>,

    /// Pages fetched per query
    pub pages_per_query: u32,

    /// Items per search page (the index caps this at 100)
    pub page_size: u32,

    /// Minimum interval between two outbound calls, in milliseconds
    pub min_interval_ms: u64,

    /// Extended pause applied after the index reports a rate limit
    pub rate_limit_cooldown_secs: u64,

    /// Candidates below this popularity are rejected
    pub min_popularity: i64,

    /// Maximum number of ranked candidates processed per run
    pub max_candidates: usize,

    /// Produce secondary-language fields by substitution
    pub localization_enabled: bool,

    /// Image used when no candidate image could be verified
    pub fallback_image_url: String,

    /// Maximum number of image probes per run
    pub probe_budget: usize,

    /// Owners whose repositories are flagged official
    pub official_owners: Vec<String>,

    /// Human-readable name of the kind of entry being catalogued
    pub kind: String,
}

/// Filter keyword tables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Phrases that admit a candidate without a positive keyword
    pub strong_positive: Vec<String>,

    /// At least one of these must appear for ordinary candidates
    pub positive: Vec<String>,

    /// Any of these rejects the candidate, even official ones
    pub negative: Vec<String>,
}

/// A keyword mapped to a derived value (tag or category)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordRule {
    pub keyword: String,
    pub value: String,
}

impl KeywordRule {
    pub fn new(keyword: &str, value: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            value: value.to_string(),
        }
    }
}

/// Enrichment tables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    /// Tags present on every entry, in order
    pub baseline_tags: Vec<String>,

    /// Keyword to tag table
    pub tag_rules: Vec<KeywordRule>,

    /// First category of every entry
    pub baseline_category: String,

    /// Keyword to category table
    pub category_rules: Vec<KeywordRule>,

    /// Conventional image paths probed against the repository root
    pub image_suffixes: Vec<String>,

    /// Descriptions longer than this are truncated
    pub max_description_chars: usize,
}

/// A whole-word substitution used by the localizer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Substitution {
    pub from: String,
    pub to: String,
}

impl Substitution {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Localization tables and templates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizeConfig {
    /// Name of the entry kind in the target language
    pub kind_alt: String,

    /// If none of these appear in a localized description, the kind prefix is added
    pub kind_markers: Vec<String>,

    /// Prefix template; `{kind}` is replaced by `kind_alt`
    pub kind_prefix_template: String,

    /// Used when there is no source description; `{name}` and `{kind}` are replaced
    pub fallback_template: String,

    /// Ordered whole-word substitutions (longer phrases first)
    pub dictionary: Vec<Substitution>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root_dir: "data".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            default_level: "info".to_string(),
            console: true,
            file: true,
            json_format: false,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            backend: CatalogBackend::Sqlite,
            database_path: "catalog.db".to_string(),
            base_url: "http://localhost:8080/api".to_string(),
            token: None,
            page_size: 100,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com".to_string(),
            raw_base_url: "https://raw.githubusercontent.com".to_string(),
            token: None,
            user_agent: "catalog-ingest/0.1.0".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            queries: vec![
                "mcp server".to_string(),
                "topic:mcp-server".to_string(),
                "topic:model-context-protocol".to_string(),
                "model context protocol server".to_string(),
            ],
            pages_per_query: 1,
            page_size: 50,
            min_interval_ms: 800,
            rate_limit_cooldown_secs: 60,
            min_popularity: 2,
            max_candidates: 100,
            localization_enabled: true,
            fallback_image_url: "https://placehold.co/400x400?text=MCP".to_string(),
            probe_budget: 300,
            official_owners: vec![
                "modelcontextprotocol".to_string(),
                "anthropics".to_string(),
            ],
            kind: "MCP server".to_string(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        let words = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            strong_positive: words(&[
                "mcp-server",
                "mcp server",
                "model context protocol server",
                "modelcontextprotocol",
            ]),
            positive: words(&["mcp", "model context protocol", "model-context-protocol"]),
            negative: words(&[
                "mcp-client",
                "mcp client",
                "tutorial",
                "template",
                "boilerplate",
                "starter kit",
                "awesome-mcp",
                "awesome list",
                "course",
                "documentation site",
            ]),
        }
    }
}

impl Default for EnrichConfig {
    fn default() -> Self {
        let tags = [
            ("database", "database"),
            ("postgres", "database"),
            ("sqlite", "database"),
            ("mysql", "database"),
            ("github", "github"),
            ("git", "git"),
            ("browser", "browser"),
            ("playwright", "browser"),
            ("search", "search"),
            ("filesystem", "filesystem"),
            ("file system", "filesystem"),
            ("slack", "communication"),
            ("email", "communication"),
            ("aws", "cloud"),
            ("kubernetes", "cloud"),
            ("docker", "docker"),
            ("python", "python"),
            ("typescript", "typescript"),
            ("rust", "rust"),
            ("llm", "ai"),
            ("openai", "ai"),
        ];
        let categories = [
            ("database", "Databases"),
            ("postgres", "Databases"),
            ("sqlite", "Databases"),
            ("github", "Developer Tools"),
            ("git", "Developer Tools"),
            ("browser", "Browser Automation"),
            ("playwright", "Browser Automation"),
            ("search", "Search"),
            ("filesystem", "File Systems"),
            ("file system", "File Systems"),
            ("slack", "Communication"),
            ("email", "Communication"),
            ("aws", "Cloud Platforms"),
            ("kubernetes", "Cloud Platforms"),
            ("llm", "AI & ML"),
        ];
        Self {
            baseline_tags: vec!["mcp".to_string(), "mcp-server".to_string()],
            tag_rules: tags.iter().map(|(k, v)| KeywordRule::new(k, v)).collect(),
            baseline_category: "MCP Servers".to_string(),
            category_rules: categories.iter().map(|(k, v)| KeywordRule::new(k, v)).collect(),
            image_suffixes: vec![
                "logo.png".to_string(),
                "logo.svg".to_string(),
                "icon.png".to_string(),
                "assets/logo.png".to_string(),
                "docs/logo.png".to_string(),
                ".github/logo.png".to_string(),
            ],
            max_description_chars: 500,
        }
    }
}

impl Default for LocalizeConfig {
    fn default() -> Self {
        let dictionary = [
            ("model context protocol", "模型上下文协议"),
            ("mcp server", "MCP 服务器"),
            ("file system", "文件系统"),
            ("server", "服务器"),
            ("servers", "服务器"),
            ("database", "数据库"),
            ("databases", "数据库"),
            ("search", "搜索"),
            ("tool", "工具"),
            ("tools", "工具"),
            ("browser", "浏览器"),
            ("automation", "自动化"),
            ("integration", "集成"),
            ("access", "访问"),
            ("query", "查询"),
            ("files", "文件"),
            ("file", "文件"),
            ("management", "管理"),
            ("for", "用于"),
        ];
        Self {
            kind_alt: "MCP 服务器".to_string(),
            kind_markers: vec![
                "MCP 服务器".to_string(),
                "MCP服务器".to_string(),
                "服务器".to_string(),
            ],
            kind_prefix_template: "{kind}：".to_string(),
            fallback_template: "{name}：一个{kind}".to_string(),
            dictionary: dictionary
                .iter()
                .map(|(from, to)| Substitution::new(from, to))
                .collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            logging: LoggingConfig::default(),
            catalog: CatalogConfig::default(),
            index: IndexConfig::default(),
            ingest: IngestConfig::default(),
            filter: FilterConfig::default(),
            enrich: EnrichConfig::default(),
            localize: LocalizeConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration saved successfully"
        );

        Ok(())
    }

    /// Get the absolute path for the data directory
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.root_dir)
    }

    /// Get the absolute path for the catalog database file
    pub fn database_path(&self) -> PathBuf {
        self.resolve(&self.catalog.database_path)
    }

    /// Get the absolute path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        self.resolve(&self.logging.log_dir)
    }

    /// Token for the repository index, from the file or the environment
    pub fn index_token(&self) -> Option<String> {
        self.index
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var(INDEX_TOKEN_ENV).ok().filter(|t| !t.is_empty()))
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir().join(path)
        }
    }
}
