use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::call::{find_top_level, is_number, split_top_level, unquote};
use crate::format_number;

/// Keys routed to the metadata section in the flat header form.
pub const METADATA_KEYS: &[&str] = &[
    "type",
    "title",
    "instructions",
    "difficulty",
    "category",
    "tags",
    "explanation",
    "hints",
];

/// Keys routed to the config section in the flat header form.
pub const CONFIG_KEYS: &[&str] = &["variation", "style", "time", "limit", "shuffle", "lives"];

pub const DIFFICULTIES: &[&str] = &["easy", "medium", "hard"];

pub const CATEGORIES: &[&str] = &[
    "vocabulary",
    "grammar",
    "reading",
    "listening",
    "spelling",
    "writing",
    "general",
];

/// A coerced field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Coerce raw field text: quoted → string, numeric → number,
    /// true/false → bool, `[a, b]` → list, else verbatim.
    pub fn coerce(raw: &str) -> FieldValue {
        let raw = raw.trim();
        if let Some(s) = unquote(raw) {
            return FieldValue::String(s);
        }
        if is_number(raw) {
            if let Ok(n) = raw.parse::<f64>() {
                return FieldValue::Number(n);
            }
        }
        if raw.eq_ignore_ascii_case("true") {
            return FieldValue::Bool(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return FieldValue::Bool(false);
        }
        if let Some(inner) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            return FieldValue::List(split_list(inner));
        }
        FieldValue::String(raw.to_string())
    }

    pub fn as_text(&self) -> String {
        self.to_string()
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::String(s) => match s.to_ascii_lowercase().as_str() {
                "yes" | "on" => Some(true),
                "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Lists stay lists; plain strings split on commas.
    pub fn into_list(self) -> Vec<String> {
        match self {
            FieldValue::List(items) => items,
            FieldValue::String(s) => split_list(&s),
            other => vec![other.to_string()],
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", format_number(*n)),
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::List(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

/// A `key = value` entry from a metadata or config section.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Lower-cased key.
    pub key: String,
    pub value: FieldValue,
}

/// Split section text into fields. Fields are separated by newlines or
/// top-level commas; each splits at its first `=` or `:`. A comma-separated
/// piece without a key continues the previous field's value, so
/// `tags = a, b` stays one field.
/// Entries that cannot be attached to any key are returned as the second element.
pub fn parse_fields(text: &str) -> (Vec<Field>, Vec<String>) {
    let mut raw: Vec<(String, String)> = Vec::new();
    let mut malformed = Vec::new();

    for line in text.lines() {
        let mut line_has_field = false;
        for (entry, _) in split_top_level(line, ',') {
            if entry.is_empty() {
                continue;
            }
            let key = find_top_level(&entry, &['=', ':'])
                .map(|pos| (entry[..pos].trim().to_ascii_lowercase(), pos))
                .filter(|(key, _)| is_field_key(key));
            match key {
                Some((key, pos)) => {
                    raw.push((key, entry[pos + 1..].trim().to_string()));
                    line_has_field = true;
                }
                None if line_has_field => {
                    if let Some((_, value)) = raw.last_mut() {
                        value.push_str(", ");
                        value.push_str(&entry);
                    }
                }
                None => malformed.push(entry),
            }
        }
    }

    let fields = raw
        .into_iter()
        .map(|(key, value)| Field {
            key,
            value: FieldValue::coerce(&value),
        })
        .collect();
    (fields, malformed)
}

fn is_field_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Exercise metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Raw type tag or alias; checked against the type registry later.
    pub exercise_type: Option<String>,
    pub title: Option<String>,
    pub instructions: Option<String>,
    pub difficulty: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub explanation: Option<String>,
    pub hints: Vec<String>,
    /// Free-form extension keys.
    pub extra: BTreeMap<String, FieldValue>,
}

impl Metadata {
    pub fn from_fields(fields: Vec<Field>) -> Self {
        let mut meta = Metadata::default();
        for Field { key, value } in fields {
            match key.as_str() {
                "type" => meta.exercise_type = Some(value.as_text().to_ascii_lowercase()),
                "title" => meta.title = Some(value.as_text()),
                "instructions" => meta.instructions = Some(value.as_text()),
                "difficulty" => meta.difficulty = Some(value.as_text().to_ascii_lowercase()),
                "category" => meta.category = Some(value.as_text().to_ascii_lowercase()),
                "tags" => meta.tags.extend(value.into_list()),
                "explanation" => meta.explanation = Some(value.as_text()),
                "hints" | "hint" => meta.hints.extend(value.into_list()),
                _ => {
                    meta.extra.insert(key, value);
                }
            }
        }
        meta
    }

    /// Messages for values outside the closed difficulty/category sets.
    /// These are reported, never rejected.
    pub fn unrecognized_values(&self) -> Vec<String> {
        let mut notes = Vec::new();
        if let Some(d) = &self.difficulty {
            if !DIFFICULTIES.contains(&d.as_str()) {
                notes.push(format!(
                    "unrecognized difficulty '{}' (expected one of: {})",
                    d,
                    DIFFICULTIES.join(", ")
                ));
            }
        }
        if let Some(c) = &self.category {
            if !CATEGORIES.contains(&c.as_str()) {
                notes.push(format!(
                    "unrecognized category '{}' (expected one of: {})",
                    c,
                    CATEGORIES.join(", ")
                ));
            }
        }
        notes
    }
}

/// Exercise configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub variation: Option<String>,
    pub style: Option<String>,
    /// Time limit in seconds.
    pub time: Option<f64>,
    pub limit: Option<f64>,
    pub shuffle: Option<bool>,
    pub lives: Option<f64>,
    pub extra: BTreeMap<String, FieldValue>,
}

impl Config {
    /// Build from fields; values of the wrong kind are kept in `extra` and
    /// reported in the returned messages.
    pub fn from_fields(fields: Vec<Field>) -> (Self, Vec<String>) {
        let mut config = Config::default();
        let mut notes = Vec::new();
        for Field { key, value } in fields {
            match key.as_str() {
                "variation" => config.variation = Some(value.as_text().to_ascii_lowercase()),
                "style" => config.style = Some(value.as_text()),
                "time" | "limit" | "lives" => match value.as_number() {
                    Some(n) => match key.as_str() {
                        "time" => config.time = Some(n),
                        "limit" => config.limit = Some(n),
                        _ => config.lives = Some(n),
                    },
                    None => {
                        notes.push(format!("config '{}' expects a number, got '{}'", key, value));
                        config.extra.insert(key, value);
                    }
                },
                "shuffle" => match value.as_bool() {
                    Some(b) => config.shuffle = Some(b),
                    None => {
                        notes.push(format!("config 'shuffle' expects true or false, got '{}'", value));
                        config.extra.insert(key, value);
                    }
                },
                _ => {
                    config.extra.insert(key, value);
                }
            }
        }
        (config, notes)
    }
}

fn split_list(text: &str) -> Vec<String> {
    split_top_level(text, ',')
        .into_iter()
        .map(|(item, _)| unquote(&item).unwrap_or(item))
        .filter(|item| !item.is_empty())
        .collect()
}
