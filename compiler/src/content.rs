use std::ops::Range;

use exscript::annotation::{Annotation, AnnotationKind, extract_annotations};
use exscript::block::SourceLine;
use exscript::call::{CallError, VarExpr, find_bare_calls, parse_param, parse_var_definition};
use exscript::is_comment;

use crate::error::FunctionError;
use crate::functions::CallContext;
use crate::value::Value;

/// A content line after call resolution and annotation extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentLine {
    /// Resolved text with annotation decorators removed, trimmed.
    pub text: String,
    pub annotations: Vec<Annotation>,
    /// 1-based script line, 0 when synthesized.
    pub line: usize,
}

impl ContentLine {
    /// A synthesized line whose annotations are extracted syntactically.
    pub fn from_text(text: &str) -> Result<Self, CallError> {
        let (text, annotations) = extract_annotations(text)?;
        Ok(ContentLine {
            text: text.trim().to_string(),
            annotations,
            line: 0,
        })
    }

    pub fn annotation(&self, kind: AnnotationKind) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.kind == kind)
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// Build content lines from plain text lines, e.g. serialized content.
pub fn lines_from_text<S: AsRef<str>>(lines: &[S]) -> Result<Vec<ContentLine>, CallError> {
    lines
        .iter()
        .filter(|l| !l.as_ref().trim().is_empty())
        .map(|l| ContentLine::from_text(l.as_ref()))
        .collect()
}

/// Output of the content processor for one block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedContent {
    pub lines: Vec<ContentLine>,
    /// From `HINT(...)` lines, in order.
    pub hints: Vec<String>,
    /// From the last `EXPLANATION(...)` line.
    pub explanation: Option<String>,
}

impl ProcessedContent {
    /// Lines with text, excluding annotation-only lines.
    pub fn text_lines(&self) -> impl Iterator<Item = &ContentLine> {
        self.lines.iter().filter(|l| !l.is_blank())
    }

    pub fn annotations(&self) -> Vec<Annotation> {
        self.lines.iter().flat_map(|l| l.annotations.iter().cloned()).collect()
    }
}

/// A resolution failure located on a script line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineError {
    pub line: usize,
    pub span: Range<usize>,
    pub error: FunctionError,
}

/// Resolve calls and variables in a block's content lines.
///
/// Comments and blank lines are dropped. `@var name = expr` lines bind
/// variables and produce no output; `HINT(...)` and `EXPLANATION(...)`
/// lines are collected separately. The first failure aborts the block.
pub fn process_content(
    lines: &[SourceLine],
    ctx: &mut CallContext<'_>,
) -> Result<ProcessedContent, LineError> {
    let mut out = ProcessedContent::default();

    for source in lines {
        let trimmed = source.trimmed();
        if trimmed.is_empty() || is_comment(trimmed) {
            continue;
        }
        let fail = |error: FunctionError| LineError {
            line: source.number,
            span: source.span.clone(),
            error,
        };

        if let Some(definition) = parse_var_definition(trimmed) {
            let definition = definition.map_err(|e| fail(e.into()))?;
            match definition.expr {
                VarExpr::Call(call) => ctx.vars.define_deferred(&definition.name, call),
                VarExpr::Literal(raw) => {
                    let resolved = ctx.resolve_text(&raw).map_err(fail)?;
                    let value = parse_param(&resolved)
                        .map(|p| Value::from_literal(&p))
                        .unwrap_or(Value::Text(resolved));
                    ctx.vars.define_literal(&definition.name, value);
                }
            }
            continue;
        }

        if let Some((marker, text)) = global_marker(trimmed).map_err(|e| fail(e.into()))? {
            let text = ctx.resolve_text(&text).map_err(fail)?;
            match marker {
                Marker::Hint => out.hints.push(text),
                Marker::Explanation => out.explanation = Some(text),
            }
            continue;
        }

        let resolved = ctx.resolve_text(trimmed).map_err(fail)?;
        let (text, annotations) = extract_annotations(&resolved).map_err(|e| fail(e.into()))?;
        let text = text.trim().to_string();
        if text.is_empty() && annotations.is_empty() {
            continue;
        }
        out.lines.push(ContentLine {
            text,
            annotations,
            line: source.number,
        });
    }

    Ok(out)
}

enum Marker {
    Hint,
    Explanation,
}

/// A line that is exactly `HINT(text)` or `EXPLANATION(text)`.
fn global_marker(trimmed: &str) -> Result<Option<(Marker, String)>, CallError> {
    let marker = if trimmed.starts_with("HINT(") {
        Marker::Hint
    } else if trimmed.starts_with("EXPLANATION(") {
        Marker::Explanation
    } else {
        return Ok(None);
    };
    let calls = find_bare_calls(trimmed, &["HINT", "EXPLANATION"])?;
    match calls.first() {
        Some(call) if call.span == (0..trimmed.len()) => {
            let inner = &trimmed[call.name.len() + 1..trimmed.len() - 1];
            let text = exscript::call::unquote(inner).unwrap_or_else(|| inner.trim().to_string());
            Ok(Some((marker, text)))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::VariableTable;
    use crate::functions::{FunctionRegistry, builtins};
    use crate::random::SequenceRandom;
    use crate::words::WordLibrary;
    use exscript::parser::Parser;

    fn process(body: &str) -> Result<ProcessedContent, LineError> {
        let outline = Parser::new(format!("{{\n{}\n}}", body), 0).parse();
        let mut functions = FunctionRegistry::new();
        builtins::install(&mut functions).unwrap();
        let words = WordLibrary::builtin();
        let mut vars = VariableTable::new();
        let mut rng = SequenceRandom::new(vec![0]);
        let mut ctx = CallContext::new(&functions, &words, &mut vars, &mut rng);
        process_content(&outline.blocks[0].lines, &mut ctx)
    }

    #[test]
    fn var_lines_are_removed_and_bound() {
        let out = process("@var noun = \"dog\"\n// comment\nThe *@var(noun)* barks.").unwrap();
        assert_eq!(out.lines.len(), 1);
        assert_eq!(out.lines[0].text, "The *dog* barks.");
        assert_eq!(out.lines[0].line, 4);
    }

    #[test]
    fn deferred_var_resolves_once() {
        let out = process("@var c = @fill(colors, 1)\n@var(c) = @var(c)").unwrap();
        let (left, right) = out.lines[0].text.split_once(" = ").unwrap();
        assert_eq!(left, right);
    }

    #[test]
    fn define_only_lines_are_dropped() {
        let out = process("@define(x, 3)\nvalue @var(x)").unwrap();
        assert_eq!(out.lines.len(), 1);
        assert_eq!(out.lines[0].text, "value 3");
    }

    #[test]
    fn hints_and_explanation() {
        let out = process("HINT(\"Think of pets\")\nEXPLANATION(Cats meow.)\nCat = Gato").unwrap();
        assert_eq!(out.hints, vec!["Think of pets"]);
        assert_eq!(out.explanation.as_deref(), Some("Cats meow."));
        assert_eq!(out.lines.len(), 1);
    }

    #[test]
    fn annotations_are_extracted() {
        let out = process("@img(\"/cat.png\")\nThe [cat] @idea(pets) sleeps.").unwrap();
        assert_eq!(out.lines.len(), 2);
        assert!(out.lines[0].is_blank());
        assert_eq!(out.lines[1].text, "The [cat] sleeps.");
        assert_eq!(out.annotations().len(), 2);
        assert_eq!(out.text_lines().count(), 1);
    }

    #[test]
    fn errors_carry_the_line() {
        let err = process("A = B\n@nope(1) = C").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.error, FunctionError::UnknownFunction("nope".into()));
    }

    #[test]
    fn synthesized_lines() {
        let lines = lines_from_text(&["@img(/a.png)", "", "area(1, 2, 3, 4, true)"]).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].annotation(AnnotationKind::Image).map(|a| a.text.as_str()), Some("/a.png"));
    }
}
