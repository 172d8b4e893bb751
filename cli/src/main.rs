mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::level_filters::LevelFilter;

use compiler::{Diagnostic, Engine};

#[derive(Parser)]
#[command(name = "exscript", version, about = "Exercise script compiler")]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// More logging on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a script and print the outcome as JSON
    Parse(ParseArgs),

    /// Compile a script and report diagnostics only
    Check(CheckArgs),

    /// List registered exercise types
    Types,

    /// List registered script functions
    Functions,

    /// List word libraries
    Words(WordsArgs),

    /// Run .test.md fixture files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct ParseArgs {
    /// Script file to compile
    file: PathBuf,

    /// Author recorded on every exercise
    #[arg(long, default_value = "")]
    author: String,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Extra word library (TOML). Repeatable.
    #[arg(long = "words", value_name = "FILE")]
    words: Vec<PathBuf>,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Script file to check
    file: PathBuf,

    /// Extra word library (TOML). Repeatable.
    #[arg(long = "words", value_name = "FILE")]
    words: Vec<PathBuf>,
}

#[derive(clap::Args)]
struct WordsArgs {
    /// Show the words of one library (name or alias)
    #[arg(short, long)]
    library: Option<String>,

    /// Extra word library (TOML). Repeatable.
    #[arg(long = "words", value_name = "FILE")]
    words: Vec<PathBuf>,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: PathBuf,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.no_color);

    match cli.command {
        Command::Parse(args) => do_parse(args, cli.no_color),
        Command::Check(args) => do_check(args, cli.no_color),
        Command::Types => print_types(&Engine::builtin()),
        Command::Functions => print_functions(&Engine::builtin()),
        Command::Words(args) => do_words(args),
        Command::Test(args) => {
            if args.list_categories {
                test_runner::list_categories(&args.path);
                return;
            }
            let exit_code = test_runner::run_tests(&args.path, cli.no_color, &args.category);
            process::exit(exit_code);
        }
    }
}

fn init_logging(verbose: u8, no_color: bool) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .init();
}

/// Built-in engine plus any extra word libraries.
fn build_engine(word_files: &[PathBuf]) -> Engine {
    let mut engine = Engine::builtin();
    for path in word_files {
        match engine.words_mut().load_toml_file(path) {
            Ok(count) => tracing::info!(path = %path.display(), datasets = count, "loaded word library"),
            Err(e) => {
                eprintln!("error: cannot load '{}': {}", path.display(), e);
                process::exit(1);
            }
        }
    }
    engine
}

fn read_source(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}

fn color_choice(no_color: bool) -> ColorChoice {
    if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

/// Render diagnostics against the script source on stderr.
fn emit_diagnostics(path: &Path, source: &str, diagnostics: &[Diagnostic], no_color: bool) {
    let mut files = SimpleFiles::new();
    let file_id = files.add(path.display().to_string(), source.to_string());
    let writer = StandardStream::stderr(color_choice(no_color));
    let config = term::Config::default();
    for diagnostic in diagnostics {
        let diagnostic = diagnostic.to_codespan(file_id);
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
    }
}

fn do_parse(args: ParseArgs, no_color: bool) {
    let source = read_source(&args.file);
    let engine = build_engine(&args.words);
    let outcome = engine.parse(&source, &args.author);

    emit_diagnostics(&args.file, &source, &outcome.diagnostics, no_color);

    let json = if args.pretty {
        serde_json::to_string_pretty(&outcome)
    } else {
        serde_json::to_string(&outcome)
    };
    match json {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("error: cannot serialize outcome: {}", e);
            process::exit(1);
        }
    }

    if outcome.has_errors() {
        process::exit(1);
    }
}

fn do_check(args: CheckArgs, no_color: bool) {
    let source = read_source(&args.file);
    let engine = build_engine(&args.words);
    let outcome = engine.parse(&source, "");

    emit_diagnostics(&args.file, &source, &outcome.diagnostics, no_color);

    let valid = outcome.exercises.iter().filter(|e| e.is_valid()).count();
    if outcome.has_errors() {
        eprintln!(
            "error: {}: {} error(s), {} warning(s), {} of {} exercise(s) valid",
            args.file.display(),
            outcome.errors.len(),
            outcome.warnings.len(),
            valid,
            outcome.exercises.len()
        );
        process::exit(1);
    }
    eprintln!(
        "ok: {}: {} exercise(s), {} warning(s)",
        args.file.display(),
        outcome.exercises.len(),
        outcome.warnings.len()
    );
}

fn print_types(engine: &Engine) {
    for descriptor in engine.types().by_priority() {
        println!(
            "{:>4}  {:<16} {}",
            descriptor.priority(),
            descriptor.tag(),
            descriptor.display_name()
        );
        if !descriptor.aliases().is_empty() {
            println!("      aliases: {}", descriptor.aliases().join(", "));
        }
        if !descriptor.variations().is_empty() {
            let variations: Vec<String> = descriptor
                .variations()
                .iter()
                .map(|v| {
                    if descriptor.default_variation() == Some(v.name()) {
                        format!("{} (default)", v.name())
                    } else {
                        v.name().to_string()
                    }
                })
                .collect();
            println!("      variations: {}", variations.join(", "));
        }
    }
}

fn print_functions(engine: &Engine) {
    for function in engine.functions().iter() {
        println!("@{}", function.signature());
    }
}

fn do_words(args: WordsArgs) {
    let engine = build_engine(&args.words);
    let words = engine.words();

    let Some(name) = args.library else {
        for dataset in words.datasets() {
            let aliases = if dataset.aliases.is_empty() {
                String::new()
            } else {
                format!("  (aliases: {})", dataset.aliases.join(", "))
            };
            println!("{:<12} {:>4} words{}", dataset.name, dataset.words.len(), aliases);
        }
        return;
    };

    let Some(dataset) = words.dataset(&name) else {
        eprintln!("error: no word library named '{}'", name);
        process::exit(1);
    };
    for entry in &dataset.words {
        let tags = if entry.tags.is_empty() {
            String::new()
        } else {
            format!("  [{}]", entry.tags.join(", "))
        };
        println!("{:<16} {:<10} {}{}", entry.word, entry.category, entry.level, tags);
    }
}
