//! Secondary-language rendering of names and descriptions.
//!
//! Rendering is dictionary substitution plus a templated kind phrase. The
//! output is never empty: a missing description is replaced by the fallback
//! template, which always contains the entry name.

use anyhow::{Context, Result};
use regex::Regex;
use shared::config::LocalizeConfig;
use shared::LocalizedFields;
use tracing::debug;

/// Produces [`LocalizedFields`] for an entry
pub struct Localizer {
    enabled: bool,
    /// Compiled substitutions, longest phrase first
    dictionary: Vec<(Regex, String)>,
    kind_alt: String,
    kind_markers: Vec<String>,
    kind_prefix: String,
    fallback_template: String,
}

impl Localizer {
    pub fn new(config: &LocalizeConfig, enabled: bool) -> Result<Self> {
        let mut entries: Vec<_> = config
            .dictionary
            .iter()
            .filter(|s| !s.from.trim().is_empty())
            .collect();
        // Stable, so equal-length phrases keep their configured order
        entries.sort_by_key(|s| std::cmp::Reverse(s.from.trim().chars().count()));

        let dictionary = entries
            .into_iter()
            .map(|s| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(s.from.trim()));
                Regex::new(&pattern)
                    .map(|re| (re, s.to.clone()))
                    .with_context(|| format!("Invalid dictionary phrase: {}", s.from))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            enabled,
            dictionary,
            kind_prefix: config.kind_prefix_template.replace("{kind}", &config.kind_alt),
            kind_alt: config.kind_alt.clone(),
            kind_markers: config.kind_markers.clone(),
            fallback_template: config.fallback_template.clone(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Render the name and description of an entry
    pub fn localize(&self, name: &str, description: &str) -> LocalizedFields {
        let description = description.trim();

        if !self.enabled {
            let description_alt = if description.is_empty() {
                self.fallback(name)
            } else {
                description.to_string()
            };
            return LocalizedFields {
                name_alt: non_empty_or(name.to_string(), name),
                description_alt,
            };
        }

        let name_alt = non_empty_or(capitalize_first(&self.substitute(name)), name);

        let description_alt = if description.is_empty() {
            debug!(name = %name, "Empty description, using fallback template");
            self.fallback(name)
        } else {
            let translated = self.substitute(description);
            let translated = if self.signals_kind(&translated) {
                translated
            } else {
                format!("{}{}", self.kind_prefix, translated)
            };
            capitalize_first(&translated)
        };

        LocalizedFields {
            name_alt,
            description_alt,
        }
    }

    /// Apply every dictionary substitution in order
    pub fn substitute(&self, text: &str) -> String {
        let mut out = text.trim().to_string();
        for (pattern, replacement) in &self.dictionary {
            out = pattern
                .replace_all(&out, regex::NoExpand(replacement))
                .into_owned();
        }
        out
    }

    fn signals_kind(&self, text: &str) -> bool {
        self.kind_markers.iter().any(|m| !m.is_empty() && text.contains(m.as_str()))
    }

    /// The template is capitalized before the name goes in; the name is kept verbatim
    fn fallback(&self, name: &str) -> String {
        let name = if name.trim().is_empty() { "?" } else { name.trim() };
        let text = self.fallback_template.replace("{kind}", &self.kind_alt);
        capitalize_first(&text).replace("{name}", name)
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::config::Substitution;

    fn localizer(enabled: bool) -> Localizer {
        Localizer::new(&LocalizeConfig::default(), enabled).unwrap()
    }

    #[test]
    fn test_empty_description_uses_fallback_with_name() {
        let fields = localizer(true).localize("acme-tool", "");
        assert!(!fields.description_alt.is_empty());
        assert!(fields.description_alt.contains("acme-tool"));
        assert_eq!(fields.description_alt, "acme-tool：一个MCP 服务器");
    }

    #[test]
    fn test_fallback_template_is_capitalized() {
        let config = LocalizeConfig {
            kind_alt: "mcp server".to_string(),
            fallback_template: "{kind} named {name}".to_string(),
            ..LocalizeConfig::default()
        };
        let fields = Localizer::new(&config, true).unwrap().localize("acme-tool", "");
        assert_eq!(fields.description_alt, "Mcp server named acme-tool");

        let config = LocalizeConfig {
            fallback_template: "an entry called {name}".to_string(),
            ..LocalizeConfig::default()
        };
        let fields = Localizer::new(&config, true).unwrap().localize("acme-tool", " ");
        assert_eq!(fields.description_alt, "An entry called acme-tool");
    }

    #[test]
    fn test_longer_phrases_win() {
        let fields = localizer(true).localize("tool", "An MCP server for database access");
        // "mcp server" is replaced before "server", so the kind marker is present
        assert_eq!(fields.description_alt, "An MCP 服务器 用于 数据库 访问");
        assert_eq!(fields.name_alt, "工具");
    }

    #[test]
    fn test_kind_prefix_added_when_missing() {
        let fields = localizer(true).localize("acme", "query github issues");
        assert_eq!(fields.description_alt, "MCP 服务器：查询 github issues");
    }

    #[test]
    fn test_whole_word_matching() {
        let l = localizer(true);
        assert_eq!(l.substitute("Toolkit for FILES"), "Toolkit 用于 文件");
    }

    #[test]
    fn test_capitalizes_first_letter() {
        let config = LocalizeConfig {
            dictionary: vec![Substitution::new("x", "y")],
            kind_markers: vec!["server".to_string()],
            ..LocalizeConfig::default()
        };
        let l = Localizer::new(&config, true).unwrap();
        let fields = l.localize("acme", "a small server");
        assert_eq!(fields.description_alt, "A small server");
        assert_eq!(fields.name_alt, "Acme");
    }

    #[test]
    fn test_disabled_copies_fields() {
        let l = localizer(false);
        let fields = l.localize("acme-tool", "A database server");
        assert_eq!(fields.name_alt, "acme-tool");
        assert_eq!(fields.description_alt, "A database server");

        let fields = l.localize("acme-tool", "  ");
        assert!(fields.description_alt.contains("acme-tool"));
    }
}
