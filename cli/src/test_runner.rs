use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pulldown_cmark::{CodeBlockKind, Event, Parser as CmarkParser, Tag, TagEnd};
use serde::Deserialize;

use compiler::{Diagnostic, Engine, ParseOutcome};

/// Info string of the fenced code blocks that hold the script.
const FENCE_LANGUAGE: &str = "exercise";

#[derive(Debug, Deserialize)]
pub struct ExpectedMessage {
    /// Substring that must appear in the message.
    pub contains: String,

    /// If set, the diagnostic must belong to this 1-based exercise block.
    #[serde(default)]
    pub block: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Author passed to the compiler.
    #[serde(default)]
    pub author: String,

    /// Extra word libraries (TOML), relative to the test file.
    #[serde(default)]
    pub words: Vec<PathBuf>,

    /// Exact number of compiled exercises.
    #[serde(default)]
    pub expect_count: Option<usize>,

    /// Type tags of the compiled exercises, in order.
    #[serde(default)]
    pub expect_types: Option<Vec<String>>,

    /// Whether every compiled exercise passes validation.
    #[serde(default)]
    pub expect_valid: Option<bool>,

    /// Expected errors. If present (even empty), count and content are checked.
    #[serde(default)]
    pub expect_errors: Option<Vec<ExpectedMessage>>,

    /// Expected warnings. If present (even empty), count and content are checked.
    #[serde(default)]
    pub expect_warnings: Option<Vec<ExpectedMessage>>,
}

/// Parse a `.test.md` file into its TOML config and Markdown body.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    if !content.starts_with("---") {
        return Err("missing opening --- frontmatter delimiter".into());
    }

    let after_open = &content[3..];
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest_start = close_pos + 4;
    let body = after_open[rest_start..]
        .strip_prefix("\r\n")
        .or_else(|| after_open[rest_start..].strip_prefix('\n'))
        .unwrap_or(&after_open[rest_start..]);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, body))
}

/// Concatenate the ```exercise fenced blocks of a Markdown body.
fn extract_script(markdown: &str) -> Option<String> {
    let mut script: Option<String> = None;
    let mut in_fence = false;
    for event in CmarkParser::new(markdown) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                in_fence = info.split_whitespace().next() == Some(FENCE_LANGUAGE);
                if in_fence {
                    let buf = script.get_or_insert_with(String::new);
                    if !buf.is_empty() && !buf.ends_with('\n') {
                        buf.push('\n');
                    }
                }
            }
            Event::Text(text) if in_fence => {
                if let Some(buf) = script.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => in_fence = false,
            _ => {}
        }
    }
    script
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    let (config, body) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("frontmatter error: {}", e)),
    };
    let description = config.description.clone();

    let Some(script) = extract_script(body) else {
        return fail(description, format!("no ```{} code block found", FENCE_LANGUAGE));
    };

    let mut engine = Engine::builtin();
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    for words in &config.words {
        if let Err(e) = engine.words_mut().load_toml_file(&base_dir.join(words)) {
            return fail(description, format!("cannot load word library: {}", e));
        }
    }

    let outcome = engine.parse(&script, &config.author);

    match check_outcome(&config, &outcome) {
        Some(reason) => fail(description, reason),
        None => TestResult {
            path: path.to_path_buf(),
            description,
            outcome: TestOutcome::Pass,
        },
    }
}

/// Compare an outcome against the expectations. Returns `Some(reason)` on mismatch.
fn check_outcome(config: &TestConfig, outcome: &ParseOutcome) -> Option<String> {
    if let Some(expected) = &config.expect_errors {
        let actual: Vec<&Diagnostic> = outcome.diagnostics.iter().filter(|d| !d.is_warning()).collect();
        if let Some(reason) = check_messages("error", &actual, expected) {
            return Some(reason);
        }
    } else if outcome.has_errors() {
        return Some(format!("unexpected errors:\n    {}", outcome.errors.join("\n    ")));
    }

    if let Some(expected) = &config.expect_warnings {
        let actual: Vec<&Diagnostic> = outcome.diagnostics.iter().filter(|d| d.is_warning()).collect();
        if let Some(reason) = check_messages("warning", &actual, expected) {
            return Some(reason);
        }
    }

    if let Some(count) = config.expect_count {
        if outcome.exercises.len() != count {
            return Some(format!(
                "expected {} exercise(s), got {}",
                count,
                outcome.exercises.len()
            ));
        }
    }

    if let Some(types) = &config.expect_types {
        let actual: Vec<&str> = outcome.exercises.iter().map(|e| e.exercise_type.as_str()).collect();
        if actual != types.iter().map(String::as_str).collect::<Vec<_>>() {
            return Some(format!(
                "type mismatch\n  expected: [{}]\n  actual:   [{}]",
                types.join(", "),
                actual.join(", ")
            ));
        }
    }

    if let Some(valid) = config.expect_valid {
        let all_valid = outcome.exercises.iter().all(|e| e.is_valid());
        if all_valid != valid {
            return Some(if valid {
                "expected every exercise to be valid".to_string()
            } else {
                "expected at least one invalid exercise".to_string()
            });
        }
    }

    None
}

fn check_messages(kind: &str, actual: &[&Diagnostic], expected: &[ExpectedMessage]) -> Option<String> {
    if actual.len() != expected.len() {
        let actual_msgs: Vec<String> = actual.iter().map(|d| format!("  - {}", d.render())).collect();
        return Some(format!(
            "expected {} {}(s), got {}\n  actual {}s:\n{}",
            expected.len(),
            kind,
            actual.len(),
            kind,
            if actual_msgs.is_empty() {
                "    (none)".to_string()
            } else {
                actual_msgs.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in actual.iter().zip(expected).enumerate() {
        if !actual.message.contains(&expected.contains) {
            return Some(format!(
                "{}[{}]: expected message containing \"{}\", got: {}",
                kind, i, expected.contains, actual.message
            ));
        }
        if let Some(block) = expected.block {
            if actual.block.map(|b| b + 1) != Some(block) {
                return Some(format!(
                    "{}[{}]: expected in block {}, got: {}",
                    kind,
                    i,
                    block,
                    actual.render()
                ));
            }
        }
    }

    None
}

/// Discover `.test.md` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(".test.md") {
                let category = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                out.entry(category).or_default().push(path);
            }
        }
    }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

fn paint(text: &str, code: &str, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    }
}

fn label_of<'a>(result: &'a TestResult) -> &'a str {
    result.description.as_deref().unwrap_or_else(|| {
        result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_suffix(".test.md"))
            .unwrap_or("?")
    })
}

/// Run all `.test.md` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let run_categories: BTreeMap<String, Vec<PathBuf>> = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let all_categories = discover_categorized(path);
        if all_categories.is_empty() {
            eprintln!("no .test.md files found in {}", path.display());
            return 1;
        }
        if categories.is_empty() {
            all_categories
        } else {
            filter_categories(all_categories, categories)
        }
    };

    if run_categories.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &run_categories {
        if !path.is_file() {
            let header = if cat.is_empty() { "(root)" } else { cat.as_str() };
            eprintln!();
            eprintln!("{}", paint(header, "1", no_color));
        }

        for file in files {
            let result = run_single_test(file);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", paint("PASS", "32", no_color), label_of(&result));
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", paint("FAIL", "31", no_color), label_of(&result));
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!("test result: {}. {} passed, 0 failed", paint("ok", "32", no_color), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            paint("FAILED", "31", no_color),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}

fn filter_categories(
    all_categories: BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<String, Vec<PathBuf>> {
    let available: Vec<String> = all_categories
        .keys()
        .map(|k| if k.is_empty() { "(root)".to_string() } else { k.clone() })
        .collect();
    let mut filtered = BTreeMap::new();
    for requested in requested {
        let req = requested.trim_matches('/');
        let mut found = false;
        for (cat, files) in &all_categories {
            if cat == req || cat.starts_with(&format!("{}/", req)) {
                filtered.insert(cat.clone(), files.clone());
                found = true;
            }
        }
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                available.join(", ")
            );
        }
    }
    filtered
}
