use std::collections::HashMap;

use exscript::call::FunctionCall;

use crate::error::FunctionError;
use crate::value::Value;

/// How a variable was bound.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingKind {
    /// Evaluated when defined.
    Literal(Value),
    /// Evaluated on first read, then memoized.
    Deferred(FunctionCall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableBinding {
    pub name: String,
    pub kind: BindingKind,
    cache: Option<Value>,
}

impl VariableBinding {
    /// The value if it is already known.
    pub fn value(&self) -> Option<&Value> {
        match &self.kind {
            BindingKind::Literal(v) => Some(v),
            BindingKind::Deferred(_) => self.cache.as_ref(),
        }
    }
}

/// Result of looking up a variable in the table.
pub enum VariableLookup {
    /// Value known (literal or already resolved).
    Ready(Value),
    /// Deferred binding that must be evaluated; call `resolved` afterwards.
    Pending(FunctionCall),
}

/// Block-scoped variable bindings. A fresh table is created for every block.
#[derive(Debug, Default)]
pub struct VariableTable {
    bindings: HashMap<String, VariableBinding>,
    /// Deferred bindings currently being evaluated, for cycle detection.
    resolving: Vec<String>,
}

impl VariableTable {
    pub fn new() -> Self {
        VariableTable::default()
    }

    /// Bind a literal. Redefinition overwrites silently.
    pub fn define_literal(&mut self, name: &str, value: Value) {
        self.insert(name, BindingKind::Literal(value));
    }

    /// Bind a deferred call. Redefinition overwrites silently.
    pub fn define_deferred(&mut self, name: &str, call: FunctionCall) {
        self.insert(name, BindingKind::Deferred(call));
    }

    fn insert(&mut self, name: &str, kind: BindingKind) {
        let name = name.to_string();
        if self.bindings.contains_key(&name) {
            tracing::debug!(variable = %name, "redefining variable");
        }
        self.bindings.insert(
            name.clone(),
            VariableBinding {
                name,
                kind,
                cache: None,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&VariableBinding> {
        self.bindings.get(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Start reading `name`. A pending result marks the binding as being
    /// resolved until `resolved` or `abandon` is called.
    pub fn lookup(&mut self, name: &str) -> Result<VariableLookup, FunctionError> {
        let binding = self
            .bindings
            .get(name)
            .ok_or_else(|| FunctionError::UndefinedVariable(name.to_string()))?;
        if let Some(value) = binding.value() {
            return Ok(VariableLookup::Ready(value.clone()));
        }
        let BindingKind::Deferred(call) = &binding.kind else {
            return Err(FunctionError::UndefinedVariable(name.to_string()));
        };
        if self.resolving.iter().any(|n| n == name) {
            return Err(FunctionError::CircularVariable(name.to_string()));
        }
        let call = call.clone();
        self.resolving.push(name.to_string());
        Ok(VariableLookup::Pending(call))
    }

    /// Memoize the value of a deferred binding.
    pub fn resolved(&mut self, name: &str, value: Value) {
        self.resolving.retain(|n| n != name);
        if let Some(binding) = self.bindings.get_mut(name) {
            binding.cache = Some(value);
        }
    }

    /// Evaluation of a deferred binding failed.
    pub fn abandon(&mut self, name: &str) {
        self.resolving.retain(|n| n != name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exscript::call::find_calls;

    fn call(src: &str) -> FunctionCall {
        find_calls(src).unwrap().remove(0)
    }

    #[test]
    fn literal_lookup() {
        let mut vars = VariableTable::new();
        vars.define_literal("x", Value::Text("cat".into()));
        assert!(matches!(vars.lookup("x"), Ok(VariableLookup::Ready(Value::Text(ref s))) if s == "cat"));
        assert!(matches!(vars.lookup("y"), Err(FunctionError::UndefinedVariable(_))));
    }

    #[test]
    fn deferred_is_memoized() {
        let mut vars = VariableTable::new();
        vars.define_deferred("pets", call("@fill(animals, 2)"));
        assert!(matches!(vars.lookup("pets"), Ok(VariableLookup::Pending(_))));
        vars.resolved("pets", Value::Text("cat".into()));
        assert!(matches!(vars.lookup("pets"), Ok(VariableLookup::Ready(_))));
    }

    #[test]
    fn reentrant_lookup_is_circular() {
        let mut vars = VariableTable::new();
        vars.define_deferred("a", call("@var(a)"));
        assert!(matches!(vars.lookup("a"), Ok(VariableLookup::Pending(_))));
        assert!(matches!(vars.lookup("a"), Err(FunctionError::CircularVariable(_))));
        vars.abandon("a");
        assert!(matches!(vars.lookup("a"), Ok(VariableLookup::Pending(_))));
    }

    #[test]
    fn redefinition_overwrites() {
        let mut vars = VariableTable::new();
        vars.define_literal("x", Value::Number(1.0));
        vars.define_literal("x", Value::Number(2.0));
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("x").and_then(|b| b.value()), Some(&Value::Number(2.0)));
    }
}
