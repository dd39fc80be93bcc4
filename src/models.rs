// src/models.rs

use crate::core::registry::RegistrationError;
use crate::core::scope::Scope;
use std::fmt;

// --- VALUES ---
// The dynamic values passed between the command line, defaults and task bodies.

/// A parameter value after conversion from the command line, or a declared default.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// A default whose runtime type has no CLI representation; holds the type name.
    Opaque(String),
}

impl Value {
    /// A default of a type the CLI cannot express, e.g. `Value::opaque("dict")`.
    pub fn opaque(type_name: impl Into<String>) -> Self {
        Self::Opaque(type_name.into())
    }

    /// The runtime type name, as used in messages and for default-based inference.
    pub fn type_name(&self) -> &str {
        match self {
            Self::None => "None",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Opaque(name) => name,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats, the way numeric defaults usually do.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Str(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Self::Opaque(name) => write!(f, "<{}>", name),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::None, Into::into)
    }
}

// --- IDENTIFIERS ---

/// Index of a loaded module inside a [`crate::state::Runtime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub(crate) usize);

/// Index of a group inside a [`crate::state::Runtime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) usize);

/// Stable reference to one task of one module's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    pub(crate) module: ModuleId,
    pub(crate) index: usize,
}

impl TaskHandle {
    pub fn module(&self) -> ModuleId {
        self.module
    }
}

// --- MODULES ---

/// Registers a module's tasks, groups and inclusions.
pub type ModuleLoader = fn(&mut Scope<'_>) -> Result<(), RegistrationError>;

/// A named source of tasks. The name is the module's identity: a module is
/// loaded at most once per runtime, however many times it is included.
#[derive(Clone, Copy)]
pub struct ModuleDef {
    pub name: &'static str,
    pub load: ModuleLoader,
}

impl ModuleDef {
    pub const fn new(name: &'static str, load: ModuleLoader) -> Self {
        Self { name, load }
    }
}

impl fmt::Debug for ModuleDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDef").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from("a"), Value::Str("a".to_string()));
        assert_eq!(Value::from(3), Value::Int(3));
        assert_eq!(Value::from(Some(2.5)), Value::Float(2.5));
        assert_eq!(Value::from(None::<bool>), Value::None);
        assert_eq!(
            Value::from(vec!["x", "y"]),
            Value::List(vec![Value::from("x"), Value::from("y")])
        );
    }

    #[test]
    fn test_value_display_and_type_names() {
        assert_eq!(Value::from(vec![1, 2]).to_string(), "[1, 2]");
        assert_eq!(Value::opaque("dict").type_name(), "dict");
        assert_eq!(Value::opaque("dict").to_string(), "<dict>");
        assert_eq!(Value::Int(4).as_float(), Some(4.0));
    }
}
