//! Pattern tables for field extraction.
//!
//! Each heuristic is an ordered list of [`ExtractionRule`]s; the first rule
//! that yields a value wins. Tables are plain data so they can be replaced
//! or tested one rule at a time.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use shared::config::KeywordRule;

/// Turns a match into a value; `None` lets the next match or rule try
pub type Extractor = fn(&Captures<'_>) -> Option<String>;

/// A named pattern with its extractor
pub struct ExtractionRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub extract: Extractor,
}

impl ExtractionRule {
    /// Build a rule from a pattern known to be valid
    pub fn new(name: &'static str, pattern: &str, extract: Extractor) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("invalid rule {name}: {e}")),
            extract,
        }
    }

    /// First value this rule extracts from `text`
    pub fn first(&self, text: &str) -> Option<String> {
        self.pattern
            .captures_iter(text)
            .find_map(|caps| (self.extract)(&caps))
    }

    /// Every value this rule extracts from `text`, in order
    pub fn all(&self, text: &str) -> Vec<String> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| (self.extract)(&caps))
            .collect()
    }
}

/// Evaluate rules in order, returning the winning rule name and value
pub fn first_match<'a>(rules: &'a [ExtractionRule], text: &str) -> Option<(&'a str, String)> {
    rules
        .iter()
        .find_map(|rule| rule.first(text).map(|value| (rule.name, value)))
}

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static MARKDOWN_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").unwrap());
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[a-zA-Z][^>]*>").unwrap());
static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

fn capture_command(caps: &Captures<'_>) -> Option<String> {
    let command = collapse_whitespace(caps.get(1)?.as_str());
    let command = command.trim_end_matches(['`', '"', '\'', ',', ';']).trim();
    (!command.is_empty()).then(|| command.to_string())
}

fn capture_url(caps: &Captures<'_>) -> Option<String> {
    let url = caps.get(1)?.as_str().trim_end_matches(['.', ',', ')', ';', '`']);
    (!url.is_empty()).then(|| url.to_string())
}

/// Installer invocations, highest priority first
pub fn install_rules() -> Vec<ExtractionRule> {
    vec![
        ExtractionRule::new(
            "npx",
            r"\b(npx\s+(?:-y\s+|--yes\s+)?@?[\w.\-]+(?:/[\w.\-]+)?(?:@[\w.^~\-]+)?)",
            capture_command,
        ),
        ExtractionRule::new("uvx", r"\b(uvx\s+[\w.\-\[\]]+)", capture_command),
        ExtractionRule::new(
            "pip",
            r"\b(pip3?\s+install\s+(?:-U\s+)?[\w.\-\[\]]+(?:[=<>~]=?[\w.]+)?)",
            capture_command,
        ),
        ExtractionRule::new(
            "npm",
            r"\b(npm\s+(?:install|i)\s+(?:-g\s+|--global\s+)?@?[\w.\-]+(?:/[\w.\-]+)?)",
            capture_command,
        ),
        ExtractionRule::new(
            "cargo",
            r"\b(cargo\s+install\s+(?:--locked\s+)?[\w\-]+)",
            capture_command,
        ),
        ExtractionRule::new("go", r"\b(go\s+install\s+[\w./\-]+(?:@[\w.\-]+)?)", capture_command),
        ExtractionRule::new("docker", r"\b(docker\s+run\s+[^\n`]+)", capture_command),
        ExtractionRule::new("brew", r"\b(brew\s+install\s+[\w/@.\-]+)", capture_command),
    ]
}

/// Documentation links: anchored markdown links, then bare URLs
pub fn docs_rules() -> Vec<ExtractionRule> {
    vec![
        ExtractionRule::new(
            "docs_link",
            r"(?i)\[[^\]]*\b(?:documentation|docs)\b[^\]]*\]\((https?://[^)\s]+)\)",
            capture_url,
        ),
        ExtractionRule::new(
            "docs_bare_url",
            r#"(?i)(https?://[^\s)\]>"'`]*docs[^\s)\]>"'`]*)"#,
            capture_url,
        ),
    ]
}

/// Demo links: anchored markdown links, then bare URLs
pub fn demo_rules() -> Vec<ExtractionRule> {
    vec![
        ExtractionRule::new(
            "demo_link",
            r"(?i)\[[^\]]*\b(?:demo|live demo|playground)\b[^\]]*\]\((https?://[^)\s]+)\)",
            capture_url,
        ),
        ExtractionRule::new(
            "demo_bare_url",
            r#"(?i)(https?://[^\s)\]>"'`]*demo[^\s)\]>"'`]*)"#,
            capture_url,
        ),
    ]
}

/// Image references: markdown images, html tags, bare image URLs
pub fn image_rules() -> Vec<ExtractionRule> {
    vec![
        ExtractionRule::new(
            "markdown_image",
            r#"!\[[^\]]*\]\(\s*([^)\s]+)(?:\s+"[^"]*")?\s*\)"#,
            capture_url,
        ),
        ExtractionRule::new("html_image", r#"(?i)<img[^>]+src=["']([^"']+)["']"#, capture_url),
        ExtractionRule::new(
            "bare_image_url",
            r#"(?i)(https?://[^\s)\]>"'`]+\.(?:png|jpe?g|gif|svg|webp))"#,
            capture_url,
        ),
    ]
}

/// Every rule table the enricher consults
pub struct RuleSet {
    pub install: Vec<ExtractionRule>,
    pub docs: Vec<ExtractionRule>,
    pub demo: Vec<ExtractionRule>,
    pub images: Vec<ExtractionRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            install: install_rules(),
            docs: docs_rules(),
            demo: demo_rules(),
            images: image_rules(),
        }
    }
}

/// Inputs available to the description heuristics
pub struct DescriptionInput<'a> {
    pub short_description: Option<&'a str>,
    pub text: &'a str,
}

pub type DescriptionSource = fn(&DescriptionInput<'_>) -> Option<String>;

/// Description heuristics, in priority order
pub const DESCRIPTION_SOURCES: &[(&str, DescriptionSource)] = &[
    ("short_description", from_short_description),
    ("heading_paragraph", from_heading_paragraph),
];

fn from_short_description(input: &DescriptionInput<'_>) -> Option<String> {
    input
        .short_description
        .map(collapse_whitespace)
        .filter(|d| !d.is_empty())
}

fn from_heading_paragraph(input: &DescriptionInput<'_>) -> Option<String> {
    heading_paragraph(input.text)
}

const MIN_PARAGRAPH_CHARS: usize = 20;

fn is_decoration(line: &str) -> bool {
    line.starts_with("![")
        || line.starts_with("[![")
        || line.starts_with('<')
        || line.starts_with('|')
        || line.starts_with("---")
        || line.starts_with("===")
        || line.starts_with("- ")
        || line.starts_with("* ")
        || line.starts_with('>')
}

/// First prose paragraph following a markdown heading
pub fn heading_paragraph(text: &str) -> Option<String> {
    fn take(paragraph: &mut Vec<&str>) -> Option<String> {
        let cleaned = strip_markdown(&paragraph.join(" "));
        paragraph.clear();
        (cleaned.chars().count() >= MIN_PARAGRAPH_CHARS).then_some(cleaned)
    }

    let mut seen_heading = false;
    let mut in_code = false;
    let mut paragraph: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();

        if line.starts_with("```") || line.starts_with("~~~") {
            in_code = !in_code;
            if let Some(found) = take(&mut paragraph) {
                return Some(found);
            }
            continue;
        }
        if in_code {
            continue;
        }

        let boundary = line.is_empty() || line.starts_with('#') || is_decoration(line);
        if boundary {
            if let Some(found) = take(&mut paragraph) {
                return Some(found);
            }
            if line.starts_with('#') {
                seen_heading = true;
            }
            continue;
        }

        if seen_heading {
            paragraph.push(line);
        }
    }

    take(&mut paragraph)
}

/// Drop inline markdown: links keep their text, emphasis and code marks go
pub fn strip_markdown(text: &str) -> String {
    let text = MARKDOWN_LINK.replace_all(text, "$1");
    let text = HTML_TAG.replace_all(&text, "");
    let text = text.replace("**", "").replace("__", "").replace('`', "");
    collapse_whitespace(&text)
}

/// Cut `text` to at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut cut: String = text.chars().take(keep).collect();
    cut.truncate(cut.trim_end().len());
    cut.push_str("...");
    cut
}

/// URL-safe identifier derived from a name
pub fn slugify(name: &str) -> String {
    let lower = name.to_lowercase();
    NON_ALNUM
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

/// Keywords compiled to whole-word, case-insensitive patterns
pub struct KeywordTable {
    entries: Vec<(Regex, String)>,
}

impl KeywordTable {
    pub fn new(rules: &[KeywordRule]) -> Result<Self, regex::Error> {
        let entries = rules
            .iter()
            .filter(|r| !r.keyword.trim().is_empty())
            .map(|r| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(r.keyword.trim()));
                Regex::new(&pattern).map(|re| (re, r.value.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// Value of the first keyword, in table order, that occurs in `text`
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(pattern, _)| pattern.is_match(text))
            .map(|(_, value)| value.as_str())
    }

    /// Values whose keyword occurs in `text`, in table order, without repeats
    pub fn matches(&self, text: &str) -> Vec<String> {
        let mut values: Vec<String> = Vec::new();
        for (pattern, value) in &self.entries {
            if pattern.is_match(text) && !values.contains(value) {
                values.push(value.clone());
            }
        }
        values
    }
}
