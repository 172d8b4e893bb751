pub mod builtins;

use std::collections::BTreeMap;

use exscript::call::{FunctionCall, Param, contains_call, find_calls};

use crate::environment::{VariableLookup, VariableTable};
use crate::error::{FunctionError, RegistryError};
use crate::random::RandomSource;
use crate::value::Value;
use crate::words::WordLibrary;

/// Maximum nesting of calls, including deferred variable reads.
pub const MAX_DEPTH: usize = 32;

/// A function callable from scripts as `@name(...)`.
///
/// Implementations evaluate their own arguments through the context, which
/// lets a function such as `define` keep a nested call unevaluated.
pub trait ScriptFunction: Send + Sync {
    fn name(&self) -> &str;

    /// Human-readable signature, e.g. `fill(libOrCategory, amount=1, filters={})`.
    fn signature(&self) -> &str;

    fn call(&self, call: &FunctionCall, ctx: &mut CallContext<'_>) -> Result<Value, FunctionError>;
}

/// Name → implementation mapping.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, Box<dyn ScriptFunction>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        FunctionRegistry::default()
    }

    pub fn register(&mut self, function: Box<dyn ScriptFunction>) -> Result<(), RegistryError> {
        let name = function.name().to_ascii_lowercase();
        if self.functions.contains_key(&name) {
            return Err(RegistryError::DuplicateFunction(name));
        }
        self.functions.insert(name, function);
        Ok(())
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&dyn ScriptFunction> {
        self.functions.get(&name.to_ascii_lowercase()).map(|f| f.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ScriptFunction> {
        self.functions.values().map(|f| f.as_ref())
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Everything a function needs while a block is being resolved.
pub struct CallContext<'a> {
    pub functions: &'a FunctionRegistry,
    pub words: &'a WordLibrary,
    pub vars: &'a mut VariableTable,
    pub rng: &'a mut dyn RandomSource,
    depth: usize,
}

impl<'a> CallContext<'a> {
    pub fn new(
        functions: &'a FunctionRegistry,
        words: &'a WordLibrary,
        vars: &'a mut VariableTable,
        rng: &'a mut dyn RandomSource,
    ) -> Self {
        CallContext {
            functions,
            words,
            vars,
            rng,
            depth: 0,
        }
    }

    /// Execute one call.
    pub fn evaluate(&mut self, call: &FunctionCall) -> Result<Value, FunctionError> {
        if self.depth >= MAX_DEPTH {
            return Err(FunctionError::TooDeep(MAX_DEPTH));
        }
        let functions = self.functions;
        let function = functions
            .get(&call.name)
            .ok_or_else(|| FunctionError::UnknownFunction(call.name.clone()))?;
        self.depth += 1;
        let result = function.call(call, self);
        self.depth -= 1;
        result
    }

    /// Evaluate a parameter. Text with embedded calls is resolved in place;
    /// a parameter that is exactly one call keeps its typed value.
    pub fn evaluate_param(&mut self, param: &Param) -> Result<Value, FunctionError> {
        match param {
            Param::Call(call) => self.evaluate(call),
            Param::String(s) if contains_call(s) => Ok(Value::Text(self.resolve_text(s)?)),
            Param::List(items) => items
                .iter()
                .map(|p| self.evaluate_param(p))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            other => Ok(Value::from_literal(other)),
        }
    }

    /// Evaluate the argument named `name`, or else positional argument `index`.
    pub fn argument(
        &mut self,
        call: &FunctionCall,
        index: usize,
        name: &str,
    ) -> Result<Option<Value>, FunctionError> {
        match call.named(name).or_else(|| call.positional(index)) {
            Some(param) => self.evaluate_param(param).map(Some),
            None => Ok(None),
        }
    }

    /// Like `argument`, but missing is an error.
    pub fn required(
        &mut self,
        call: &FunctionCall,
        index: usize,
        name: &str,
    ) -> Result<Value, FunctionError> {
        self.argument(call, index, name)?
            .ok_or_else(|| FunctionError::invalid(&call.name, format!("missing argument '{}'", name)))
    }

    /// Read a variable, evaluating and memoizing a deferred binding.
    pub fn read_variable(&mut self, name: &str) -> Result<Value, FunctionError> {
        match self.vars.lookup(name)? {
            VariableLookup::Ready(value) => Ok(value),
            VariableLookup::Pending(call) => match self.evaluate(&call) {
                Ok(value) => {
                    self.vars.resolved(name, value.clone());
                    Ok(value)
                }
                Err(e) => {
                    self.vars.abandon(name);
                    Err(e)
                }
            },
        }
    }

    /// Replace every call in `text` with the rendering of its result.
    /// Calls run left to right; replacements are spliced right to left so
    /// earlier spans stay valid.
    pub fn resolve_text(&mut self, text: &str) -> Result<String, FunctionError> {
        let calls = find_calls(text)?;
        if calls.is_empty() {
            return Ok(text.to_string());
        }
        let mut rendered = Vec::with_capacity(calls.len());
        for call in &calls {
            rendered.push(self.evaluate(call)?.to_string());
        }
        let mut out = text.to_string();
        for (call, value) in calls.iter().zip(rendered).rev() {
            out.replace_range(call.span.clone(), &value);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SequenceRandom;

    struct Echo;

    impl ScriptFunction for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn signature(&self) -> &str {
            "echo(value)"
        }

        fn call(&self, call: &FunctionCall, ctx: &mut CallContext<'_>) -> Result<Value, FunctionError> {
            ctx.required(call, 0, "value")
        }
    }

    fn registry() -> FunctionRegistry {
        let mut functions = FunctionRegistry::new();
        functions.register(Box::new(Echo)).unwrap();
        functions
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut functions = registry();
        assert_eq!(
            functions.register(Box::new(Echo)),
            Err(RegistryError::DuplicateFunction("echo".into()))
        );
    }

    #[test]
    fn resolves_left_to_right_and_splices() {
        let functions = registry();
        let words = WordLibrary::empty();
        let mut vars = VariableTable::new();
        let mut rng = SequenceRandom::new(vec![0]);
        let mut ctx = CallContext::new(&functions, &words, &mut vars, &mut rng);
        let out = ctx.resolve_text("a @echo(long value) b @ECHO(2) c").unwrap();
        assert_eq!(out, "a long value b 2 c");
    }

    #[test]
    fn nested_calls_evaluate_first() {
        let functions = registry();
        let words = WordLibrary::empty();
        let mut vars = VariableTable::new();
        let mut rng = SequenceRandom::new(vec![0]);
        let mut ctx = CallContext::new(&functions, &words, &mut vars, &mut rng);
        assert_eq!(ctx.resolve_text("@echo(@echo(x))").unwrap(), "x");
    }

    #[test]
    fn unknown_function_is_an_error() {
        let functions = registry();
        let words = WordLibrary::empty();
        let mut vars = VariableTable::new();
        let mut rng = SequenceRandom::new(vec![0]);
        let mut ctx = CallContext::new(&functions, &words, &mut vars, &mut rng);
        assert_eq!(
            ctx.resolve_text("@nope(1)"),
            Err(FunctionError::UnknownFunction("nope".into()))
        );
    }
}
