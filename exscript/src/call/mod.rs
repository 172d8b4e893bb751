mod scanner;

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

pub use scanner::{find_top_level, quote_argument, split_top_level, unquote};

use crate::format_number;
use scanner::{is_ident_char, is_ident_start, scan_calls};

/// Deepest nesting of calls, lists and objects accepted in call arguments.
pub const MAX_NESTING: usize = 32;

/// Syntax error inside a decorator or function call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct CallError {
    pub message: String,
    /// Byte span within the scanned line.
    pub span: Range<usize>,
}

impl CallError {
    pub fn new(message: impl Into<String>, span: Range<usize>) -> Self {
        CallError {
            message: message.into(),
            span,
        }
    }
}

/// A typed call parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Quoted or bare text. Bare text may still embed `@name(...)` calls.
    String(String),
    Number(f64),
    Bool(bool),
    List(Vec<Param>),
    /// Small `{key: value}` object, e.g. `fill` filters.
    Object(BTreeMap<String, Param>),
    /// The whole argument is a single nested call.
    Call(FunctionCall),
}

impl Param {
    pub fn type_name(&self) -> &'static str {
        match self {
            Param::String(_) => "string",
            Param::Number(_) => "number",
            Param::Bool(_) => "bool",
            Param::List(_) => "list",
            Param::Object(_) => "object",
            Param::Call(_) => "call",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Param::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::String(s) => write!(f, "{}", s),
            Param::Number(n) => write!(f, "{}", format_number(*n)),
            Param::Bool(b) => write!(f, "{}", b),
            Param::List(items) => {
                let parts: Vec<String> = items.iter().map(|p| p.to_string()).collect();
                write!(f, "{}", parts.join(" | "))
            }
            Param::Object(map) => {
                let parts: Vec<String> = map.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Param::Call(call) => write!(f, "{}", call.source),
        }
    }
}

/// One argument of a call, optionally named (`amount=3`).
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Param,
}

/// A located `@name(args)` call.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Vec<Argument>,
    /// Byte span of the whole call within the scanned text.
    pub span: Range<usize>,
    /// The raw call text.
    pub source: String,
}

impl FunctionCall {
    /// Positional argument `index`, skipping named ones.
    pub fn positional(&self, index: usize) -> Option<&Param> {
        self.arguments
            .iter()
            .filter(|a| a.name.is_none())
            .nth(index)
            .map(|a| &a.value)
    }

    pub fn named(&self, name: &str) -> Option<&Param> {
        self.arguments
            .iter()
            .find(|a| a.name.as_deref() == Some(name))
            .map(|a| &a.value)
    }
}

/// `@var name = expr` line.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDefinition {
    pub name: String,
    pub expr: VarExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VarExpr {
    /// The right-hand side is a single call, evaluated lazily.
    Call(FunctionCall),
    /// Anything else, evaluated immediately.
    Literal(String),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Find every `@name(...)` call in `line`, in source order.
pub fn find_calls(line: &str) -> Result<Vec<FunctionCall>, CallError> {
    find_calls_at(line, 0)
}

/// Find bare `name(...)` calls (no `@`) for the given names, case-insensitive.
pub fn find_bare_calls(line: &str, names: &[&str]) -> Result<Vec<FunctionCall>, CallError> {
    let accept = |n: &str| names.iter().any(|m| m.eq_ignore_ascii_case(n));
    build_calls(line, scan_calls(line, false, &accept)?, 0)
}

/// True when `text` contains at least one `@name(` call opening.
pub fn contains_call(text: &str) -> bool {
    let mut prev: Option<char> = None;
    for (pos, c) in text.char_indices() {
        if c == '@' && !prev.is_some_and(is_ident_char) {
            let rest = &text[pos + 1..];
            let ident: String = rest.chars().take_while(|c| is_ident_char(*c)).collect();
            if !ident.is_empty()
                && ident.chars().next().is_some_and(is_ident_start)
                && rest[ident.len()..].starts_with('(')
            {
                return true;
            }
        }
        prev = Some(c);
    }
    false
}

/// Parse the comma-separated argument list between a call's parentheses.
pub fn parse_arguments(inner: &str) -> Result<Vec<Argument>, CallError> {
    parse_arguments_at(inner, 0)
}

/// Parse a single parameter value.
pub fn parse_param(raw: &str) -> Result<Param, CallError> {
    parse_param_at(raw, 0)
}

fn parse_param_at(raw: &str, depth: usize) -> Result<Param, CallError> {
    let raw = raw.trim();

    if depth > MAX_NESTING {
        return Err(CallError::new(
            format!("nesting too deep (more than {} levels)", MAX_NESTING),
            0..raw.len(),
        ));
    }

    if let Some(s) = unquote(raw) {
        return Ok(Param::String(s));
    }

    if raw.starts_with('@') {
        let calls = find_calls_at(raw, depth + 1)?;
        if calls.len() == 1 && calls[0].span == (0..raw.len()) {
            if let Some(call) = calls.into_iter().next() {
                return Ok(Param::Call(call));
            }
        }
        return Ok(Param::String(raw.to_string()));
    }

    if let Some(inner) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        if inner.trim().is_empty() {
            return Ok(Param::List(Vec::new()));
        }
        let items = split_top_level(inner, ',')
            .into_iter()
            .map(|(item, range)| parse_param_at(&item, depth + 1).map_err(|e| shift(e, range.start + 1)))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Param::List(items));
    }

    if let Some(inner) = raw.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
        let mut map = BTreeMap::new();
        for (entry, range) in split_top_level(inner, ',') {
            if entry.is_empty() {
                continue;
            }
            let Some(pos) = find_top_level(&entry, &[':', '=']) else {
                return Err(CallError::new(
                    format!("expected 'key: value' in object, found '{}'", entry),
                    range.start + 1..range.end + 1,
                ));
            };
            let key = unquote(&entry[..pos]).unwrap_or_else(|| entry[..pos].trim().to_string());
            let value = parse_param_at(&entry[pos + 1..], depth + 1).map_err(|e| shift(e, range.start + 1))?;
            map.insert(key.to_ascii_lowercase(), value);
        }
        return Ok(Param::Object(map));
    }

    if is_number(raw) {
        if let Ok(n) = raw.parse::<f64>() {
            return Ok(Param::Number(n));
        }
    }

    if raw.eq_ignore_ascii_case("true") {
        return Ok(Param::Bool(true));
    }
    if raw.eq_ignore_ascii_case("false") {
        return Ok(Param::Bool(false));
    }

    Ok(Param::String(raw.to_string()))
}

/// Recognize `@var name = expr`. Returns `None` for any other line.
pub fn parse_var_definition(line: &str) -> Option<Result<VarDefinition, CallError>> {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix("@var")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let Some((name, expr)) = rest.split_once('=') else {
        return Some(Err(CallError::new(
            "expected '@var name = value'",
            0..line.len(),
        )));
    };
    let name = name.trim();
    if name.is_empty() || !name.chars().next().is_some_and(is_ident_start) || !name.chars().all(is_ident_char) {
        return Some(Err(CallError::new(
            format!("invalid variable name '{}'", name),
            0..line.len(),
        )));
    }

    let expr = expr.trim();
    let parsed = match parse_param(expr) {
        Ok(Param::Call(call)) => VarExpr::Call(call),
        Ok(_) => VarExpr::Literal(expr.to_string()),
        Err(e) => return Some(Err(e)),
    };
    Some(Ok(VarDefinition {
        name: name.to_string(),
        expr: parsed,
    }))
}

/// Integer or decimal literal, optionally negative.
pub fn is_number(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let frac = parts.next();
    !whole.is_empty()
        && whole.chars().all(|c| c.is_ascii_digit())
        && frac.is_none_or(|f| !f.is_empty() && f.chars().all(|c| c.is_ascii_digit()))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

// `depth` counts the calls, lists and objects enclosing the text being parsed.

fn find_calls_at(line: &str, depth: usize) -> Result<Vec<FunctionCall>, CallError> {
    build_calls(line, scan_calls(line, true, &|_| true)?, depth)
}

fn parse_arguments_at(inner: &str, depth: usize) -> Result<Vec<Argument>, CallError> {
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    split_top_level(inner, ',')
        .into_iter()
        .map(|(raw, range)| parse_argument(&raw, depth).map_err(|e| shift(e, range.start)))
        .collect()
}

fn build_calls(
    line: &str,
    located: Vec<(String, Range<usize>, Range<usize>)>,
    depth: usize,
) -> Result<Vec<FunctionCall>, CallError> {
    located
        .into_iter()
        .map(|(name, span, inner)| {
            let arguments = parse_arguments_at(&line[inner.clone()], depth).map_err(|e| shift(e, inner.start))?;
            Ok(FunctionCall {
                name,
                arguments,
                source: line[span.clone()].to_string(),
                span,
            })
        })
        .collect()
}

fn parse_argument(raw: &str, depth: usize) -> Result<Argument, CallError> {
    // Named argument: identifier followed by a single `=` before any quote or bracket.
    let ident_len = raw.chars().take_while(|c| is_ident_char(*c)).count();
    if ident_len > 0 && raw.chars().next().is_some_and(is_ident_start) {
        let rest = raw[ident_len..].trim_start();
        if let Some(value) = rest.strip_prefix('=') {
            if !value.starts_with('=') {
                return Ok(Argument {
                    name: Some(raw[..ident_len].to_ascii_lowercase()),
                    value: parse_param_at(value, depth)?,
                });
            }
        }
    }
    Ok(Argument {
        name: None,
        value: parse_param_at(raw, depth)?,
    })
}

fn shift(mut err: CallError, by: usize) -> CallError {
    err.span = err.span.start + by..err.span.end + by;
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_calls_with_spans() {
        let line = "Pick @fill(animals, 2) or @var(x)";
        let calls = find_calls(line).unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "fill");
        assert_eq!(&line[calls[0].span.clone()], "@fill(animals, 2)");
        assert_eq!(calls[0].positional(0), Some(&Param::String("animals".into())));
        assert_eq!(calls[0].positional(1), Some(&Param::Number(2.0)));
        assert_eq!(&line[calls[1].span.clone()], "@var(x)");
    }

    #[test]
    fn quoted_commas_are_not_split() {
        let calls = find_calls(r#"@define(greeting, "hello, world")"#).unwrap();
        assert_eq!(calls[0].arguments.len(), 2);
        assert_eq!(calls[0].positional(1), Some(&Param::String("hello, world".into())));
    }

    #[test]
    fn parenthesised_commas_are_not_split() {
        let calls = find_calls("@length(@fill(colors, 3))").unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].arguments.len(), 1);
        match calls[0].positional(0) {
            Some(Param::Call(inner)) => {
                assert_eq!(inner.name, "fill");
                assert_eq!(inner.arguments.len(), 2);
            }
            other => panic!("expected nested call, got {:?}", other),
        }
    }

    #[test]
    fn named_arguments_and_objects() {
        let calls = find_calls("@fill(animals, amount=3, filters={level: A1, tags: [farm, pets]})").unwrap();
        let call = &calls[0];
        assert_eq!(call.named("amount"), Some(&Param::Number(3.0)));
        let Some(Param::Object(filters)) = call.named("filters") else {
            panic!("expected object");
        };
        assert_eq!(filters.get("level"), Some(&Param::String("A1".into())));
        assert_eq!(
            filters.get("tags"),
            Some(&Param::List(vec![Param::String("farm".into()), Param::String("pets".into())]))
        );
    }

    #[test]
    fn email_addresses_are_not_calls() {
        assert!(find_calls("mail me@example.com(today)").unwrap().is_empty());
        assert!(!contains_call("mail me@example.com(today)"));
        assert!(contains_call("x @img(a.png)"));
    }

    #[test]
    fn unclosed_call_is_an_error() {
        let err = find_calls("text @fill(animals, 2").unwrap_err();
        assert!(err.message.contains("unclosed"));
        assert_eq!(err.span.start, 5);
    }

    #[test]
    fn bare_calls_match_names_only() {
        let line = "area(10, 20, 30, 40, true, Cat) and other(1)";
        let calls = find_bare_calls(line, &["area"]).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].arguments.len(), 6);
        assert!(find_bare_calls("@area(1)", &["area"]).unwrap().is_empty());
        assert!(find_bare_calls("subarea(1)", &["area"]).unwrap().is_empty());
    }

    #[test]
    fn var_definitions() {
        let def = parse_var_definition("@var pets = @fill(animals, 2)").unwrap().unwrap();
        assert_eq!(def.name, "pets");
        assert!(matches!(def.expr, VarExpr::Call(ref c) if c.name == "fill"));

        let def = parse_var_definition("@var word = \"house\"").unwrap().unwrap();
        assert_eq!(def.expr, VarExpr::Literal("\"house\"".into()));

        assert!(parse_var_definition("@var(pets)").is_none());
        assert!(parse_var_definition("@var 1x = 2").unwrap().is_err());
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let lists = format!("@length({}x{})", "[".repeat(600), "]".repeat(600));
        let err = find_calls(&lists).unwrap_err();
        assert!(err.message.contains("nesting too deep"), "{}", err.message);

        let objects = format!("@fill(animals, {}a: 1{})", "{k: ".repeat(600), "}".repeat(600));
        assert!(find_calls(&objects).unwrap_err().message.contains("nesting too deep"));

        let calls = format!("{}x{}", "@length(".repeat(600), ")".repeat(600));
        assert!(find_calls(&calls).unwrap_err().message.contains("nesting too deep"));
    }

    #[test]
    fn moderate_nesting_parses() {
        let line = format!("@length({}x{})", "[".repeat(MAX_NESTING), "]".repeat(MAX_NESTING));
        let calls = find_calls(&line).unwrap();
        let mut param = calls[0].positional(0).unwrap();
        let mut levels = 0;
        while let Param::List(items) = param {
            levels += 1;
            param = &items[0];
        }
        assert_eq!(levels, MAX_NESTING);
        assert_eq!(param, &Param::String("x".into()));
    }

    #[test]
    fn single_quoted_arguments_keep_commas() {
        let calls = find_calls("@define(x, 'a, b')").unwrap();
        assert_eq!(calls[0].arguments.len(), 2);
        assert_eq!(calls[0].positional(1), Some(&Param::String("a, b".into())));

        let calls = find_calls("@define(x, don't stop)").unwrap();
        assert_eq!(calls[0].positional(1), Some(&Param::String("don't stop".into())));
    }

    #[test]
    fn numbers_and_booleans() {
        assert_eq!(parse_param("-2.5").unwrap(), Param::Number(-2.5));
        assert_eq!(parse_param("TRUE").unwrap(), Param::Bool(true));
        assert_eq!(parse_param("1.").unwrap(), Param::String("1.".into()));
        assert_eq!(parse_param("\"7\"").unwrap(), Param::String("7".into()));
    }
}
