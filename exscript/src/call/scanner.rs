use std::ops::Range;

use crate::call::CallError;

// ---------------------------------------------------------------------------
// Char scanning helpers shared by the call and field parsers
// ---------------------------------------------------------------------------

/// Characters of `text` paired with their byte offsets.
pub(crate) struct Chars {
    pub chars: Vec<char>,
    /// Byte offset of each char, plus one trailing entry for `text.len()`.
    pub byte_pos: Vec<usize>,
}

impl Chars {
    pub fn new(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut byte_pos = Vec::with_capacity(chars.len() + 1);
        let mut offset = 0;
        for c in &chars {
            byte_pos.push(offset);
            offset += c.len_utf8();
        }
        byte_pos.push(offset);
        Chars { chars, byte_pos }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Quoted-string state while scanning left to right.
///
/// `"` always opens a string. `'` opens one only where a value starts (after
/// an opening bracket, `,`, `=` or `:`), so apostrophes inside words such as
/// `don't` stay literal.
struct Quotes {
    open: Option<char>,
    escaped: bool,
    at_value_start: bool,
}

impl Quotes {
    fn new() -> Self {
        Quotes {
            open: None,
            escaped: false,
            at_value_start: true,
        }
    }

    /// Feed one char. Returns true when it belongs to a quoted string,
    /// delimiters included.
    fn step(&mut self, c: char) -> bool {
        if let Some(quote) = self.open {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == quote {
                self.open = None;
            }
            return true;
        }
        if c == '"' || (c == '\'' && self.at_value_start) {
            self.open = Some(c);
            self.at_value_start = false;
            return true;
        }
        if !c.is_whitespace() {
            self.at_value_start = matches!(c, '(' | '[' | '{' | ',' | '=' | ':');
        }
        false
    }
}

/// Find the char index of the `)` matching the `(` at `open`.
/// Quoted strings are skipped; nested `()[]{}` are balanced.
pub(crate) fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut quotes = Quotes::new();
    let mut i = open;
    while i < chars.len() {
        let c = chars[i];
        if !quotes.step(c) {
            match c {
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return if c == ')' { Some(i) } else { None };
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Split `text` at top-level occurrences of `separator`, honouring quotes
/// and `()[]{}` nesting. Returns trimmed pieces with their byte ranges.
pub fn split_top_level(text: &str, separator: char) -> Vec<(String, Range<usize>)> {
    let scan = Chars::new(text);
    let mut pieces = Vec::new();
    let mut depth = 0i32;
    let mut quotes = Quotes::new();
    let mut start = 0;

    for (i, &c) in scan.chars.iter().enumerate() {
        if quotes.step(c) {
            continue;
        }
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ if c == separator && depth <= 0 => {
                pieces.push(trimmed_piece(text, scan.byte_pos[start]..scan.byte_pos[i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(trimmed_piece(text, scan.byte_pos[start]..scan.byte_pos[scan.len()]));
    pieces
}

fn trimmed_piece(text: &str, range: Range<usize>) -> (String, Range<usize>) {
    let raw = &text[range.clone()];
    let lead = raw.len() - raw.trim_start().len();
    let trimmed = raw.trim();
    let start = range.start + lead;
    (trimmed.to_string(), start..start + trimmed.len())
}

/// Byte index of the first top-level occurrence of any of `needles`
/// (outside quotes and brackets).
pub fn find_top_level(text: &str, needles: &[char]) -> Option<usize> {
    let mut depth = 0i32;
    let mut quotes = Quotes::new();
    for (pos, c) in text.char_indices() {
        if quotes.step(c) {
            continue;
        }
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ if depth <= 0 && needles.contains(&c) => return Some(pos),
            _ => {}
        }
    }
    None
}

/// Remove surrounding double or single quotes, unescaping `\"` and `\\`.
pub fn unquote(text: &str) -> Option<String> {
    let text = text.trim();
    let quote = text.chars().next()?;
    if !(quote == '"' || quote == '\'') || text.len() < 2 || !text.ends_with(quote) {
        return None;
    }
    let inner = &text[1..text.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    if escaped {
        out.push('\\');
    }
    Some(out)
}

/// Render text as a call argument, quoting only when needed.
pub fn quote_argument(text: &str) -> String {
    let needs_quotes = text.is_empty()
        || text.trim() != text
        || text
            .chars()
            .any(|c| matches!(c, ',' | '(' | ')' | '[' | ']' | '{' | '}' | '"' | '\'' | '=' | ':' | '@' | '|'))
        || text.eq_ignore_ascii_case("true")
        || text.eq_ignore_ascii_case("false")
        || text.parse::<f64>().is_ok();
    if !needs_quotes {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Locate calls named by `accept` in `line`.
///
/// With `sigil` set, calls look like `@name(...)`; without it they are bare
/// `name(...)` at a word boundary. Returns `(name, char_start, open, close)`
/// tuples in char indices.
pub(crate) fn scan_calls(
    line: &str,
    sigil: bool,
    accept: &dyn Fn(&str) -> bool,
) -> Result<Vec<(String, Range<usize>, Range<usize>)>, CallError> {
    let scan = Chars::new(line);
    let chars = &scan.chars;
    let len = chars.len();
    let mut found = Vec::new();
    let mut i = 0;

    while i < len {
        let start = i;
        let name_start = if sigil {
            if chars[i] != '@' || (i > 0 && is_ident_char(chars[i - 1])) {
                i += 1;
                continue;
            }
            i + 1
        } else {
            if !is_ident_start(chars[i]) || (i > 0 && (is_ident_char(chars[i - 1]) || chars[i - 1] == '@')) {
                i += 1;
                continue;
            }
            i
        };

        let mut j = name_start;
        if j >= len || !is_ident_start(chars[j]) {
            i += 1;
            continue;
        }
        while j < len && is_ident_char(chars[j]) {
            j += 1;
        }
        let name: String = chars[name_start..j].iter().collect();
        if j >= len || chars[j] != '(' || !accept(&name) {
            i = j.max(i + 1);
            continue;
        }

        let Some(close) = matching_paren(chars, j) else {
            return Err(CallError::new(
                format!("unclosed call to '{}'", name),
                scan.byte_pos[start]..scan.byte_pos[len],
            ));
        };

        let span = scan.byte_pos[start]..scan.byte_pos[close + 1];
        let inner = scan.byte_pos[j + 1]..scan.byte_pos[close];
        found.push((name, span, inner));
        i = close + 1;
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_respects_quotes_and_nesting() {
        let parts: Vec<String> = split_top_level(r#"a, "b, c", [d, e], {f: 1, g: 2}, h(i, j)"#, ',')
            .into_iter()
            .map(|(s, _)| s)
            .collect();
        assert_eq!(parts, vec!["a", "\"b, c\"", "[d, e]", "{f: 1, g: 2}", "h(i, j)"]);
    }

    #[test]
    fn split_reports_trimmed_ranges() {
        let text = "  x , y";
        let parts = split_top_level(text, ',');
        assert_eq!(&text[parts[0].1.clone()], "x");
        assert_eq!(&text[parts[1].1.clone()], "y");
    }

    #[test]
    fn unquote_handles_escapes() {
        assert_eq!(unquote(r#""say \"hi\"""#).as_deref(), Some("say \"hi\""));
        assert_eq!(unquote("'single'").as_deref(), Some("single"));
        assert_eq!(unquote("bare"), None);
    }

    #[test]
    fn quote_argument_only_when_needed() {
        assert_eq!(quote_argument("cat"), "cat");
        assert_eq!(quote_argument("a, b"), "\"a, b\"");
        assert_eq!(quote_argument("42"), "\"42\"");
        assert_eq!(quote_argument("say \"x\""), "\"say \\\"x\\\"\"");
    }

    #[test]
    fn find_top_level_skips_quoted() {
        assert_eq!(find_top_level(r#""a=b" = c"#, &['=']), Some(6));
        assert_eq!(find_top_level("'a=b' = c", &['=']), Some(6));
        assert_eq!(find_top_level("f(a=b)", &['=']), None);
    }

    #[test]
    fn single_quotes_protect_separators() {
        let parts: Vec<String> = split_top_level("x, 'a, b', [c, 'd, e']", ',')
            .into_iter()
            .map(|(s, _)| s)
            .collect();
        assert_eq!(parts, vec!["x", "'a, b'", "[c, 'd, e']"]);
    }

    #[test]
    fn apostrophes_inside_words_are_literal() {
        let parts: Vec<String> = split_top_level("don't, kid's toys, ok", ',')
            .into_iter()
            .map(|(s, _)| s)
            .collect();
        assert_eq!(parts, vec!["don't", "kid's toys", "ok"]);
        let chars: Vec<char> = "(it's here)".chars().collect();
        assert_eq!(matching_paren(&chars, 0), Some(10));
    }
}
