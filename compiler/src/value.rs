use std::fmt;

use exscript::annotation::Annotation;
use exscript::call::Param;
use exscript::format_number;

/// A value produced by evaluating a script function.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Bool(bool),
    List(Vec<Value>),
    /// An annotation decorator, rendered back into its line.
    Marker(Annotation),
    /// Produced by functions that only have side effects (`define`).
    Empty,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Marker(_) => "annotation",
            Value::Empty => "empty",
        }
    }

    /// Convert a literal parameter. Nested calls and objects have no literal
    /// value and render as their source text.
    pub fn from_literal(param: &Param) -> Value {
        match param {
            Param::String(s) => Value::Text(s.clone()),
            Param::Number(n) => Value::Number(*n),
            Param::Bool(b) => Value::Bool(*b),
            Param::List(items) => Value::List(items.iter().map(Value::from_literal).collect()),
            Param::Object(_) | Param::Call(_) => Value::Text(param.to_string()),
        }
    }

    /// Items of a list; any other value is a one-item list.
    pub fn items(&self) -> Vec<String> {
        match self {
            Value::List(items) => items.iter().map(|v| v.to_string()).collect(),
            Value::Empty => Vec::new(),
            other => vec![other.to_string()],
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Bool(b) => write!(f, "{}", b),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(" | "))
            }
            Value::Marker(annotation) => write!(f, "{}", annotation.to_decorator()),
            Value::Empty => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exscript::annotation::AnnotationKind;

    #[test]
    fn display_rendering() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        let list = Value::List(vec![Value::Text("cat".into()), Value::Text("dog".into())]);
        assert_eq!(list.to_string(), "cat | dog");
        assert_eq!(Value::Empty.to_string(), "");
        let marker = Value::Marker(Annotation::new(AnnotationKind::Image, "/a.png"));
        assert_eq!(marker.to_string(), "@img(/a.png)");
    }
}
