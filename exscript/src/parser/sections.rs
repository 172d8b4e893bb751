use crate::block::{ExerciseBlock, SourceLine};
use crate::fields::{CONFIG_KEYS, METADATA_KEYS};
use crate::is_comment;

/// The three sections of a block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockSections {
    /// Accumulated `@metadata(...)` body and flat metadata header fields.
    pub metadata: String,
    /// Accumulated `@config(...)` body and flat config header fields.
    pub config: String,
    /// Everything else, comments included.
    pub content: Vec<SourceLine>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Metadata,
    Config,
}

/// Split a block into metadata text, config text and content lines.
pub fn classify(block: &ExerciseBlock) -> BlockSections {
    let mut sections = BlockSections::default();
    let mut mode: Option<Section> = None;
    let mut in_header = true;

    for line in &block.lines {
        let trimmed = line.trimmed();

        if let Some(section) = mode {
            match trimmed.strip_suffix(')') {
                Some(last) => {
                    sections.push(section, last);
                    mode = None;
                }
                None => sections.push(section, trimmed),
            }
            continue;
        }

        if trimmed.is_empty() {
            continue;
        }

        if let Some((section, rest)) = open_decorator(trimmed) {
            match rest.trim_end().strip_suffix(')') {
                Some(inner) => sections.push(section, inner),
                None => {
                    sections.push(section, rest);
                    mode = Some(section);
                }
            }
            continue;
        }

        if in_header && !is_comment(trimmed) {
            if let Some(section) = header_section(trimmed) {
                sections.push(section, trimmed);
                continue;
            }
            in_header = false;
        }

        sections.content.push(line.clone());
    }

    sections
}

impl BlockSections {
    fn push(&mut self, section: Section, text: &str) {
        let target = match section {
            Section::Metadata => &mut self.metadata,
            Section::Config => &mut self.config,
        };
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !target.is_empty() {
            target.push('\n');
        }
        target.push_str(text);
    }
}

/// Recognize `@metadata(` / `@config(` (case-insensitive) and return the rest.
fn open_decorator(trimmed: &str) -> Option<(Section, &str)> {
    for (prefix, section) in [("@metadata(", Section::Metadata), ("@config(", Section::Config)] {
        if trimmed.len() >= prefix.len()
            && trimmed.is_char_boundary(prefix.len())
            && trimmed[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            return Some((section, &trimmed[prefix.len()..]));
        }
    }
    None
}

/// Flat header fields use `key: value` or `key = value` with a recognized
/// key. The `=` form needs a lower-case key so that matching pairs such as
/// `Time = Tiempo` stay content.
fn header_section(trimmed: &str) -> Option<Section> {
    let pos = trimmed.find([':', '='])?;
    let (key, rest) = (&trimmed[..pos], &trimmed[pos + 1..]);
    if rest.starts_with([':', '=']) {
        return None;
    }
    let key = key.trim();
    if trimmed[pos..].starts_with('=') && key.chars().any(|c| c.is_ascii_uppercase()) {
        return None;
    }
    let key = key.to_ascii_lowercase();
    if METADATA_KEYS.contains(&key.as_str()) {
        Some(Section::Metadata)
    } else if CONFIG_KEYS.contains(&key.as_str()) {
        Some(Section::Config)
    } else {
        None
    }
}
