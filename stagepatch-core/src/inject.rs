//! Constant injection
//!
//! Build-time rewriting of literal values in generated sources: build dates,
//! remote config links and URL lists baked into TypeScript and C# files.
//!
//! A rule's pattern has exactly two capture groups, the text before and after
//! the value. Every match is replaced by `prefix + value + suffix`. Values are
//! supplied by the caller; rules without a supplied value are skipped.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use regex::{Captures, Regex, RegexBuilder};
use serde::Deserialize;

/// Names of the built-in rule sets
pub const PRESETS: [&str; 3] = ["check-status", "fe2in", "script-date"];

/// Placeholder replaced by the value in a rule template
const VALUE_PLACEHOLDER: &str = "{value}";

/// Validation applied to a rule's value
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ValueKind {
    #[default]
    Text,
    /// `YYYY-MM-DD`
    Date,
}

/// One rule as written in a rules file
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    /// Name the value is supplied under
    pub name: String,
    /// Regex with two capture groups (prefix, suffix)
    pub pattern: String,
    #[serde(default)]
    pub kind: ValueKind,
    /// Let `.` match newlines
    #[serde(default)]
    pub multiline: bool,
    /// Text inserted between the groups, `{value}` is substituted
    #[serde(default)]
    pub template: Option<String>,
}

/// A rules file: a list of `[[rule]]` tables
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RuleSetConfig {
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleConfig>,
}

impl RuleSetConfig {
    /// Built-in rule set by name
    pub fn preset(name: &str) -> Option<Self> {
        let rules = match name {
            // CheckStatus.ts in the Cocos project
            "check-status" => vec![
                rule("bdate", r"(private\s+bdate\s*=\s*')[^']+(';)", ValueKind::Date),
                rule(
                    "link-config",
                    r#"(public static LINK_CONFIG\s*=\s*")[^"]+(";)"#,
                    ValueKind::Text,
                ),
            ],
            // FE2In.cs in the Unity project
            "fe2in" => vec![
                rule("bdate", r#"(private\s+string\s+bdate\s*=\s*")[^"]*(")"#, ValueKind::Date),
                RuleConfig {
                    multiline: true,
                    template: Some("\n        {value}    ".to_string()),
                    ..rule(
                        "cf-urls",
                        r"(private\s+List<string>\s+cfUrls\s*=\s*new\s+List<string>\s*\(\)\s*\{)[^}]+(\};)",
                        ValueKind::Text,
                    )
                },
            ],
            // Any quoted ISO date
            "script-date" => vec![rule("date", r#"(")\d{4}-\d{2}-\d{2}(")"#, ValueKind::Date)],
            _ => return None,
        };
        Some(Self { rules })
    }
}

fn rule(name: &str, pattern: &str, kind: ValueKind) -> RuleConfig {
    RuleConfig {
        name: name.to_string(),
        pattern: pattern.to_string(),
        kind,
        multiline: false,
        template: None,
    }
}

/// A compiled rule
#[derive(Debug, Clone)]
pub struct InjectionRule {
    name: String,
    regex: Regex,
    kind: ValueKind,
    template: Option<String>,
}

impl InjectionRule {
    pub fn new(config: &RuleConfig) -> Result<Self> {
        let regex = RegexBuilder::new(&config.pattern)
            .dot_matches_new_line(config.multiline)
            .build()
            .with_context(|| format!("Invalid pattern for rule '{}'", config.name))?;

        // Group 0 is the whole match
        if regex.captures_len() != 3 {
            bail!(
                "Rule '{}' must have exactly two capture groups (prefix, suffix), found {}",
                config.name,
                regex.captures_len() - 1
            );
        }

        Ok(Self {
            name: config.name.clone(),
            regex,
            kind: config.kind,
            template: config.template.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, value: &str) -> Result<()> {
        if self.kind == ValueKind::Date {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{}' for rule '{}'. Use YYYY-MM-DD", value, self.name)
            })?;
        }
        Ok(())
    }

    fn render(&self, value: &str) -> String {
        match &self.template {
            Some(template) => template.replace(VALUE_PLACEHOLDER, value),
            None => value.to_string(),
        }
    }

    /// Replace every match in `source`, returning the new text and match count
    pub fn apply(&self, source: &str, value: &str) -> (String, usize) {
        let rendered = self.render(value);
        let mut count = 0;
        let result = self.regex.replace_all(source, |caps: &Captures<'_>| {
            count += 1;
            let prefix = caps.get(1).map_or("", |m| m.as_str());
            let suffix = caps.get(2).map_or("", |m| m.as_str());
            format!("{}{}{}", prefix, rendered, suffix)
        });
        (result.into_owned(), count)
    }
}

/// Match count of one applied rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub name: String,
    pub replacements: usize,
}

/// Result of injecting values into a source string
#[derive(Debug, Clone)]
pub struct InjectionResult {
    /// The transformed source
    pub source: String,
    /// One entry per rule that had a value, in rule order
    pub outcomes: Vec<RuleOutcome>,
}

impl InjectionResult {
    pub fn total_replacements(&self) -> usize {
        self.outcomes.iter().map(|o| o.replacements).sum()
    }

    /// Rules that had a value but matched nothing
    pub fn unmatched(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.replacements == 0)
            .map(|o| o.name.as_str())
            .collect()
    }
}

/// Result of injecting into a file
#[derive(Debug, Clone)]
pub struct InjectionReport {
    pub outcomes: Vec<RuleOutcome>,
    /// Whether the file content changed and was written back
    pub written: bool,
}

/// An ordered set of compiled rules
#[derive(Debug, Clone)]
pub struct Injector {
    rules: Vec<InjectionRule>,
}

impl Injector {
    pub fn new(config: &RuleSetConfig) -> Result<Self> {
        let rules = config
            .rules
            .iter()
            .map(InjectionRule::new)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Create an injector from a built-in preset
    pub fn from_preset(name: &str) -> Result<Self> {
        let config = RuleSetConfig::preset(name).with_context(|| {
            format!("Unknown preset '{}'. Available: {}", name, PRESETS.join(", "))
        })?;
        Self::new(&config)
    }

    /// Load rules from a TOML file
    pub fn from_config_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules file: {}", path.display()))?;
        let config: RuleSetConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse rules file: {}", path.display()))?;
        Self::new(&config)
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Apply every rule that has a value in `values`.
    ///
    /// All values are validated before anything is replaced. A value whose
    /// name matches no rule is an error, as is supplying no usable value.
    pub fn inject(&self, source: &str, values: &HashMap<String, String>) -> Result<InjectionResult> {
        for name in values.keys() {
            if !self.rules.iter().any(|r| r.name() == name.as_str()) {
                bail!(
                    "No rule named '{}'. Available: {}",
                    name,
                    self.rule_names().join(", ")
                );
            }
        }

        let active: Vec<(&InjectionRule, &str)> = self
            .rules
            .iter()
            .filter_map(|rule| values.get(rule.name()).map(|v| (rule, v.as_str())))
            .collect();
        if active.is_empty() {
            bail!("No values supplied. Rules: {}", self.rule_names().join(", "));
        }
        for (rule, value) in &active {
            rule.validate(value)?;
        }

        let mut result = source.to_string();
        let mut outcomes = Vec::with_capacity(active.len());
        for (rule, value) in active {
            let (next, replacements) = rule.apply(&result, value);
            result = next;
            outcomes.push(RuleOutcome {
                name: rule.name().to_string(),
                replacements,
            });
        }

        Ok(InjectionResult {
            source: result,
            outcomes,
        })
    }

    /// Inject into a file, writing it back only if the content changed
    pub fn inject_file(&self, path: &Path, values: &HashMap<String, String>) -> Result<InjectionReport> {
        if !path.is_file() {
            bail!("File not found at: {}", path.display());
        }
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let result = self.inject(&source, values)?;
        for name in result.unmatched() {
            tracing::warn!("Rule '{}' matched nothing in {}", name, path.display());
        }

        let written = result.source != source;
        if written {
            fs::write(path, &result.source)
                .with_context(|| format!("Failed to write file: {}", path.display()))?;
            tracing::info!(
                "Injected {} value(s) into {}",
                result.total_replacements(),
                path.display()
            );
        }

        Ok(InjectionReport {
            outcomes: result.outcomes,
            written,
        })
    }
}
