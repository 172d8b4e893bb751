//! Selector: pick `[target]` words in a sentence (`on-text`), or target
//! regions of an image (`image`).

use exscript::annotation::{Annotation, AnnotationKind};
use exscript::call::{Param, find_bare_calls, quote_argument};
use serde::{Deserialize, Serialize};

use crate::content::ContentLine;
use crate::error::{ContentError, RegistryError};
use crate::registry::{Grammar, TypeDescriptor, VariationDescriptor, VariationGrammar};
use crate::types::{ExerciseContent, mismatch, text_lines};
use crate::validation::ValidationResult;

pub const TAG: &str = "selector";
pub const ON_TEXT: &str = "on-text";
pub const IMAGE: &str = "image";

const MAX_SENTENCES: usize = 30;
const MAX_AREAS: usize = 30;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorContent {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sentences: Vec<SelectorSentence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorSentence {
    /// Display text with the brackets removed.
    pub text: String,
    pub words: Vec<SelectorWord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorWord {
    pub index: usize,
    pub text: String,
    pub is_target: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSelection {
    pub url: String,
    pub areas: Vec<ImageArea>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageArea {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub is_target: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

pub fn descriptor() -> Result<TypeDescriptor, RegistryError> {
    TypeDescriptor::builder(TAG)
        .display_name("Selector")
        .priority(10)
        .default_instructions("Select the correct words.")
        .alias("select")
        .alias("highlight")
        .grammar(Selector)
        .variation(VariationDescriptor::new(ON_TEXT, "Select in text"))
        .variation(VariationDescriptor::new(IMAGE, "Select on image").with_grammar(ImageSelector))
        .default_variation(ON_TEXT)
        .detect_variation(detect_variation)
        .build()
}

/// An `area(...)` call. A bare `@img` is only an illustration and does not
/// make a block an image selector.
fn has_area(text: &str) -> bool {
    find_bare_calls(text, &["area"]).is_ok_and(|calls| !calls.is_empty())
}

/// A `[word]` with non-empty inner text, on a line with neither `=` nor `|`.
fn is_text_line(text: &str) -> bool {
    if text.contains('=') || text.contains('|') {
        return false;
    }
    text.split('[')
        .skip(1)
        .any(|rest| rest.split_once(']').is_some_and(|(inner, _)| !inner.trim().is_empty()))
}

fn detect_variation(lines: &[ContentLine]) -> Option<&'static str> {
    if lines.iter().any(|l| has_area(&l.text)) {
        Some(IMAGE)
    } else {
        Some(ON_TEXT)
    }
}

/// Split a line into words; bracketed words are targets. A bracket may span
/// several words: `[big cat]` marks both.
pub fn parse_sentence(text: &str) -> SelectorSentence {
    let mut words = Vec::new();
    let mut in_brackets = false;
    for token in text.split_whitespace() {
        let mut word = String::with_capacity(token.len());
        let mut target = in_brackets;
        for c in token.chars() {
            match c {
                '[' => {
                    in_brackets = true;
                    target = true;
                }
                ']' => in_brackets = false,
                _ => word.push(c),
            }
        }
        if word.is_empty() {
            continue;
        }
        words.push(SelectorWord {
            index: words.len(),
            text: word,
            is_target: target,
        });
    }
    let text = words.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ");
    SelectorSentence { text, words }
}

fn render_sentence(sentence: &SelectorSentence) -> String {
    sentence
        .words
        .iter()
        .map(|w| if w.is_target { format!("[{}]", w.text) } else { w.text.clone() })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `http(s)://`, `/`-rooted, or an inline image.
pub fn is_valid_url(url: &str) -> bool {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) => !host.is_empty() && !url.contains(char::is_whitespace),
        None => (url.starts_with('/') && url.len() > 1) || url.starts_with("data:image/"),
    }
}

fn selector_of(content: &ExerciseContent) -> Result<&SelectorContent, ContentError> {
    match content {
        ExerciseContent::Selector(c) => Ok(c),
        _ => Err(mismatch(TAG)),
    }
}

struct Selector;

impl Grammar for Selector {
    fn detect(&self, lines: &[ContentLine]) -> bool {
        lines.iter().any(|l| has_area(&l.text) || is_text_line(&l.text))
    }

    fn parse(&self, lines: &[ContentLine]) -> Result<ExerciseContent, ContentError> {
        let sentences: Vec<SelectorSentence> = text_lines(lines).map(|l| parse_sentence(&l.text)).collect();
        if sentences.is_empty() {
            return Err(ContentError::NoContent(TAG.to_string()));
        }
        Ok(ExerciseContent::Selector(SelectorContent {
            sentences,
            ..SelectorContent::default()
        }))
    }

    fn validate(&self, content: &ExerciseContent) -> ValidationResult {
        let content = match selector_of(content) {
            Ok(c) => c,
            Err(e) => return ValidationResult::failed(e.to_string()),
        };
        let mut result = ValidationResult::new();
        result.count("selector exercise", content.sentences.len(), 1, MAX_SENTENCES);
        if !content.sentences.iter().any(|s| s.words.iter().any(|w| w.is_target)) {
            result.error("mark at least one target word with [brackets]");
        }
        for (i, sentence) in content.sentences.iter().enumerate() {
            if sentence.words.is_empty() {
                result.error(format!("sentence {} has no words", i + 1));
            }
        }
        result
    }

    fn serialize(&self, content: &ExerciseContent) -> Result<Vec<String>, ContentError> {
        Ok(selector_of(content)?.sentences.iter().map(render_sentence).collect())
    }
}

struct ImageSelector;

impl ImageSelector {
    fn area(call: &exscript::call::FunctionCall, line: usize) -> Result<ImageArea, ContentError> {
        let number = |i: usize, name: &str| match call.positional(i) {
            Some(Param::Number(n)) => Ok(*n),
            other => Err(ContentError::line(
                line,
                format!(
                    "area(): argument {} ({}) must be a number, got {}",
                    i + 1,
                    name,
                    other.map_or("nothing", |p| p.type_name())
                ),
            )),
        };
        let is_target = match call.positional(4) {
            Some(Param::Bool(b)) => *b,
            None => false,
            Some(other) => {
                return Err(ContentError::line(
                    line,
                    format!("area(): argument 5 (isTarget) must be true or false, got {}", other.type_name()),
                ));
            }
        };
        Ok(ImageArea {
            x: number(0, "x")?,
            y: number(1, "y")?,
            width: number(2, "width")?,
            height: number(3, "height")?,
            is_target,
            label: call.positional(5).map(|p| p.to_string()),
        })
    }
}

impl VariationGrammar for ImageSelector {
    fn parse(&self, lines: &[ContentLine]) -> Option<Result<ExerciseContent, ContentError>> {
        let url = lines
            .iter()
            .find_map(|l| l.annotation(AnnotationKind::Image))
            .map(|a| a.text.clone());
        let Some(url) = url else {
            return Some(Err(ContentError::NoContent("image selector @img(url)".to_string())));
        };

        let mut areas = Vec::new();
        for line in lines {
            let calls = match find_bare_calls(&line.text, &["area"]) {
                Ok(calls) => calls,
                Err(e) => return Some(Err(ContentError::line(line.line, e.message))),
            };
            for call in calls {
                match ImageSelector::area(&call, line.line) {
                    Ok(area) => areas.push(area),
                    Err(e) => return Some(Err(e)),
                }
            }
        }

        Some(Ok(ExerciseContent::Selector(SelectorContent {
            sentences: Vec::new(),
            image: Some(ImageSelection { url, areas }),
            variation: None,
        })))
    }

    fn validate(&self, content: &ExerciseContent) -> Option<ValidationResult> {
        let content = match selector_of(content) {
            Ok(c) => c,
            Err(e) => return Some(ValidationResult::failed(e.to_string())),
        };
        let mut result = ValidationResult::new();
        let Some(image) = &content.image else {
            result.error("image selector has no image");
            return Some(result);
        };
        if !is_valid_url(&image.url) {
            result.error(format!("'{}' is not a valid image URL", image.url));
        }
        result.count("image selector areas", image.areas.len(), 1, MAX_AREAS);
        if !image.areas.iter().any(|a| a.is_target) {
            result.error("mark at least one area as a target");
        }
        for (i, area) in image.areas.iter().enumerate() {
            if area.x < 0.0 || area.y < 0.0 {
                result.error(format!("area {} starts at a negative position", i + 1));
            }
            if area.width <= 0.0 || area.height <= 0.0 {
                result.error(format!("area {} must have a positive size", i + 1));
            }
        }
        Some(result)
    }

    fn serialize(&self, content: &ExerciseContent) -> Option<Result<Vec<String>, ContentError>> {
        let image = match selector_of(content) {
            Ok(SelectorContent { image: Some(image), .. }) => image,
            Ok(_) => return Some(Err(ContentError::NoContent("image selector image".to_string()))),
            Err(e) => return Some(Err(e)),
        };
        let mut lines = vec![Annotation::new(AnnotationKind::Image, image.url.clone()).to_decorator()];
        for area in &image.areas {
            let mut args = vec![
                area.x.to_string(),
                area.y.to_string(),
                area.width.to_string(),
                area.height.to_string(),
                area.is_target.to_string(),
            ];
            if let Some(label) = &area.label {
                args.push(quote_argument(label));
            }
            lines.push(format!("area({})", args.join(", ")));
        }
        Some(Ok(lines))
    }
}
