use exscript::annotation::{Annotation, AnnotationKind};
use exscript::call::{FunctionCall, Param};

use crate::error::{FunctionError, RegistryError};
use crate::functions::{CallContext, FunctionRegistry, ScriptFunction};
use crate::random::{sample_indices, shuffle};
use crate::value::Value;
use crate::words::WordFilter;

/// Register `fill`, `var`, `define`, `randomize`, `length` and the
/// annotation functions.
pub fn install(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    registry.register(Box::new(Fill))?;
    registry.register(Box::new(Var))?;
    registry.register(Box::new(Define))?;
    registry.register(Box::new(Randomize))?;
    registry.register(Box::new(Length))?;
    for kind in AnnotationKind::ALL {
        registry.register(Box::new(Annotate(kind)))?;
    }
    Ok(())
}

fn text_argument(
    ctx: &mut CallContext<'_>,
    call: &FunctionCall,
    index: usize,
    name: &str,
) -> Result<String, FunctionError> {
    let value = ctx.required(call, index, name)?.to_string();
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(FunctionError::invalid(&call.name, format!("'{}' must not be empty", name)));
    }
    Ok(value)
}

/// A positive whole number, or `default` when absent.
fn count_argument(
    ctx: &mut CallContext<'_>,
    call: &FunctionCall,
    index: usize,
    name: &str,
    default: usize,
) -> Result<usize, FunctionError> {
    let Some(value) = ctx.argument(call, index, name)? else {
        return Ok(default);
    };
    match value.as_number() {
        Some(n) if n >= 1.0 && n.fract() == 0.0 => Ok(n as usize),
        _ => Err(FunctionError::invalid(
            &call.name,
            format!("'{}' must be a positive whole number, got '{}'", name, value),
        )),
    }
}

// ---------------------------------------------------------------------------
// fill
// ---------------------------------------------------------------------------

struct Fill;

impl Fill {
    fn filter(call: &FunctionCall) -> Result<WordFilter, FunctionError> {
        let mut filter = WordFilter::default();
        let param = call.named("filters").or_else(|| call.positional(2));
        let Some(param) = param else {
            return Ok(filter);
        };
        let Param::Object(map) = param else {
            return Err(FunctionError::invalid(
                "fill",
                format!("filters must be an object like {{level: A1}}, got {}", param.type_name()),
            ));
        };
        for (key, value) in map {
            let values = match value {
                Param::List(items) => items.iter().map(|p| p.to_string()).collect(),
                other => vec![other.to_string()],
            };
            match key.as_str() {
                "level" | "levels" => filter.levels.extend(values),
                "tag" | "tags" => filter.tags.extend(values),
                other => {
                    return Err(FunctionError::invalid("fill", format!("unknown filter '{}'", other)));
                }
            }
        }
        Ok(filter)
    }
}

impl ScriptFunction for Fill {
    fn name(&self) -> &str {
        "fill"
    }

    fn signature(&self) -> &str {
        "fill(libOrCategory, amount=1, filters={})"
    }

    fn call(&self, call: &FunctionCall, ctx: &mut CallContext<'_>) -> Result<Value, FunctionError> {
        let query = text_argument(ctx, call, 0, "library")?;
        let amount = count_argument(ctx, call, 1, "amount", 1)?;
        let filter = Fill::filter(call)?;
        let words = ctx.words.sample(&query, &filter, amount, ctx.rng)?;
        Ok(Value::List(words.into_iter().map(Value::Text).collect()))
    }
}

// ---------------------------------------------------------------------------
// var / define
// ---------------------------------------------------------------------------

struct Var;

impl ScriptFunction for Var {
    fn name(&self) -> &str {
        "var"
    }

    fn signature(&self) -> &str {
        "var(name)"
    }

    fn call(&self, call: &FunctionCall, ctx: &mut CallContext<'_>) -> Result<Value, FunctionError> {
        let name = text_argument(ctx, call, 0, "name")?;
        ctx.read_variable(&name)
    }
}

struct Define;

impl ScriptFunction for Define {
    fn name(&self) -> &str {
        "define"
    }

    fn signature(&self) -> &str {
        "define(name, value)"
    }

    fn call(&self, call: &FunctionCall, ctx: &mut CallContext<'_>) -> Result<Value, FunctionError> {
        let name = text_argument(ctx, call, 0, "name")?;
        match call.named("value").or_else(|| call.positional(1)) {
            Some(Param::Call(inner)) => ctx.vars.define_deferred(&name, inner.clone()),
            Some(param) => {
                let value = ctx.evaluate_param(param)?;
                ctx.vars.define_literal(&name, value);
            }
            None => return Err(FunctionError::invalid("define", "missing argument 'value'")),
        }
        Ok(Value::Empty)
    }
}

// ---------------------------------------------------------------------------
// randomize
// ---------------------------------------------------------------------------

const MASK: &str = "___";

struct Randomize;

impl Randomize {
    fn shuffle_letters(word: &str, ctx: &mut CallContext<'_>) -> String {
        let mut letters: Vec<char> = word.chars().collect();
        shuffle(&mut letters, ctx.rng);
        letters.into_iter().collect()
    }

    fn mask_letters(word: &str, amount: usize, ctx: &mut CallContext<'_>) -> String {
        let mut letters: Vec<char> = word.chars().collect();
        let positions: Vec<usize> = letters
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| i)
            .collect();
        for pick in sample_indices(positions.len(), amount, ctx.rng) {
            letters[positions[pick]] = '_';
        }
        letters.into_iter().collect()
    }
}

impl ScriptFunction for Randomize {
    fn name(&self) -> &str {
        "randomize"
    }

    fn signature(&self) -> &str {
        "randomize(content, kind=words|letters|mask|mask-letters, amount=1)"
    }

    fn call(&self, call: &FunctionCall, ctx: &mut CallContext<'_>) -> Result<Value, FunctionError> {
        let content = ctx.required(call, 0, "content")?;
        let kind = match ctx.argument(call, 1, "kind")? {
            Some(k) => k.to_string().trim().to_ascii_lowercase(),
            None => "words".to_string(),
        };
        let amount = count_argument(ctx, call, 2, "amount", 1)?;

        if let Value::List(items) = &content {
            if kind == "words" {
                let mut items = items.clone();
                shuffle(&mut items, ctx.rng);
                return Ok(Value::List(items));
            }
        }

        let text = content.to_string();
        let mut words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        match kind.as_str() {
            "words" => shuffle(&mut words, ctx.rng),
            "letters" => {
                for word in words.iter_mut() {
                    *word = Randomize::shuffle_letters(word, ctx);
                }
            }
            "mask" => {
                for i in sample_indices(words.len(), amount, ctx.rng) {
                    words[i] = MASK.to_string();
                }
            }
            "mask-letters" | "mask_letters" => {
                for word in words.iter_mut() {
                    *word = Randomize::mask_letters(word, amount, ctx);
                }
            }
            other => {
                return Err(FunctionError::invalid(
                    "randomize",
                    format!("unknown kind '{}' (expected words, letters, mask or mask-letters)", other),
                ));
            }
        }
        Ok(Value::Text(words.join(" ")))
    }
}

// ---------------------------------------------------------------------------
// length
// ---------------------------------------------------------------------------

struct Length;

impl ScriptFunction for Length {
    fn name(&self) -> &str {
        "length"
    }

    fn signature(&self) -> &str {
        "length(content)"
    }

    fn call(&self, call: &FunctionCall, ctx: &mut CallContext<'_>) -> Result<Value, FunctionError> {
        let n = match ctx.required(call, 0, "content")? {
            Value::List(items) => items.len(),
            Value::Empty => 0,
            other => other.to_string().chars().count(),
        };
        Ok(Value::Number(n as f64))
    }
}

// ---------------------------------------------------------------------------
// img / idea / ins / notes
// ---------------------------------------------------------------------------

struct Annotate(AnnotationKind);

impl ScriptFunction for Annotate {
    fn name(&self) -> &str {
        self.0.function_name()
    }

    fn signature(&self) -> &str {
        match self.0 {
            AnnotationKind::Image => "img(url)",
            AnnotationKind::Idea => "idea(text)",
            AnnotationKind::Instruction => "ins(text)",
            AnnotationKind::Note => "notes(text)",
        }
    }

    fn call(&self, call: &FunctionCall, ctx: &mut CallContext<'_>) -> Result<Value, FunctionError> {
        let argument = if self.0 == AnnotationKind::Image { "url" } else { "text" };
        let text = text_argument(ctx, call, 0, argument)?;
        Ok(Value::Marker(Annotation::new(self.0, text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::VariableTable;
    use crate::error::WordLibraryError;
    use crate::random::SequenceRandom;
    use crate::words::WordLibrary;

    fn with_ctx<T>(f: impl FnOnce(&mut CallContext<'_>) -> T) -> T {
        let mut functions = FunctionRegistry::new();
        install(&mut functions).unwrap();
        let words = WordLibrary::builtin();
        let mut vars = VariableTable::new();
        let mut rng = SequenceRandom::new(vec![5, 2, 7, 1, 3]);
        let mut ctx = CallContext::new(&functions, &words, &mut vars, &mut rng);
        f(&mut ctx)
    }

    #[test]
    fn fill_samples_distinct_words() {
        let out = with_ctx(|ctx| ctx.resolve_text("@fill(animals, 3)").unwrap());
        let words: Vec<&str> = out.split(" | ").collect();
        assert_eq!(words.len(), 3);
        let mut unique = words.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn fill_caps_at_pool_size() {
        let size = WordLibrary::builtin().pool("animals", &WordFilter::default()).len();
        let out = with_ctx(|ctx| ctx.resolve_text("@fill(animals, 100)").unwrap());
        assert_eq!(out.split(" | ").count(), size);
    }

    #[test]
    fn fill_unknown_category_fails() {
        let err = with_ctx(|ctx| ctx.resolve_text("@fill(nonexistent_category, 3)").unwrap_err());
        assert!(matches!(err, FunctionError::Words(WordLibraryError::NotFound { .. })));
    }

    #[test]
    fn fill_with_filters() {
        let out = with_ctx(|ctx| {
            ctx.resolve_text("@fill(animals, 50, filters={level: A1, tags: farm})")
                .unwrap()
        });
        for word in out.split(" | ") {
            assert!(["cow", "horse", "pig", "duck", "chicken"].contains(&word), "{}", word);
        }
        let err = with_ctx(|ctx| ctx.resolve_text("@fill(animals, 1, {colour: red})").unwrap_err());
        assert!(matches!(err, FunctionError::InvalidParameter { .. }));
    }

    #[test]
    fn fill_rejects_bad_amount() {
        let err = with_ctx(|ctx| ctx.resolve_text("@fill(animals, 0)").unwrap_err());
        assert!(matches!(err, FunctionError::InvalidParameter { .. }));
    }

    #[test]
    fn define_literal_and_deferred() {
        with_ctx(|ctx| {
            assert_eq!(ctx.resolve_text("@define(greeting, \"hello, world\")").unwrap(), "");
            assert_eq!(ctx.resolve_text("@var(greeting)!").unwrap(), "hello, world!");

            ctx.resolve_text("@define(pick, @fill(colors, 1))").unwrap();
            let first = ctx.resolve_text("@var(pick)").unwrap();
            let second = ctx.resolve_text("@var(pick)").unwrap();
            assert_eq!(first, second);
        });
    }

    #[test]
    fn undefined_and_circular_variables() {
        with_ctx(|ctx| {
            assert_eq!(
                ctx.resolve_text("@var(missing)"),
                Err(FunctionError::UndefinedVariable("missing".into()))
            );
            ctx.resolve_text("@define(a, @var(b))").unwrap();
            ctx.resolve_text("@define(b, @var(a))").unwrap();
            assert!(matches!(
                ctx.resolve_text("@var(a)"),
                Err(FunctionError::CircularVariable(_))
            ));
        });
    }

    #[test]
    fn length_of_lists_and_text() {
        with_ctx(|ctx| {
            assert_eq!(ctx.resolve_text("@length(@fill(colors, 3))").unwrap(), "3");
            assert_eq!(ctx.resolve_text("@length(house)").unwrap(), "5");
        });
    }

    #[test]
    fn randomize_kinds() {
        with_ctx(|ctx| {
            let out = ctx.resolve_text("@randomize(\"the cat sat\", words)").unwrap();
            let mut got: Vec<&str> = out.split(' ').collect();
            got.sort();
            assert_eq!(got, vec!["cat", "sat", "the"]);

            let out = ctx.resolve_text("@randomize(\"the cat sat\", mask, 2)").unwrap();
            assert_eq!(out.matches(MASK).count(), 2);

            let out = ctx.resolve_text("@randomize(house, mask-letters, 2)").unwrap();
            assert_eq!(out.chars().filter(|c| *c == '_').count(), 2);

            let out = ctx.resolve_text("@randomize(house, letters)").unwrap();
            let mut letters: Vec<char> = out.chars().collect();
            letters.sort();
            assert_eq!(letters, vec!['e', 'h', 'o', 's', 'u']);

            assert!(ctx.resolve_text("@randomize(x, sideways)").is_err());
        });
    }

    #[test]
    fn annotations_render_as_decorators() {
        with_ctx(|ctx| {
            assert_eq!(
                ctx.resolve_text("@img(\"https://e.com/a.png\")").unwrap(),
                "@img(\"https://e.com/a.png\")"
            );
            assert!(ctx.resolve_text("@idea(\"\")").is_err());
        });
    }
}
