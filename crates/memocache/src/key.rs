//! Cache key derivation
//!
//! A call is described by [`CallArgs`] (positional values plus keyword
//! pairs) and bound against a declared [`Signature`]. Binding fills
//! parameters positionally, then by keyword, then from defaults, and
//! yields a [`CacheKey`] ordered by declaration. Calls that supply the
//! same effective arguments through different syntax produce equal keys.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{BindingError, Error, Result};

/// Dynamically typed argument value
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value
    None,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// String
    Str(String),
    /// Immutable sequence; hashable when all elements are
    Tuple(Vec<Value>),
    /// Mutable sequence; never hashable
    List(Vec<Value>),
    /// Mapping; never hashable
    Dict(Vec<(String, Value)>),
}

impl Value {
    /// Name of the value's type, as reported in errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
        }
    }

    /// Whether the value can be part of a cache key
    pub fn is_hashable(&self) -> bool {
        match self {
            Value::List(_) | Value::Dict(_) => false,
            Value::Tuple(items) => items.iter().all(Value::is_hashable),
            _ => true,
        }
    }

    /// The first unhashable value reachable from this one
    fn first_unhashable(&self) -> Option<&Value> {
        match self {
            Value::List(_) | Value::Dict(_) => Some(self),
            Value::Tuple(items) => items.iter().find_map(Value::first_unhashable),
            _ => None,
        }
    }

    /// Integer payload
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Float payload; integers widen
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// String payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    fn float_bits(x: f64) -> u64 {
        if x.is_nan() {
            f64::NAN.to_bits()
        } else if x == 0.0 {
            0.0f64.to_bits()
        } else {
            x.to_bits()
        }
    }

    /// Numeric view shared by `Bool`, `Int` and `Float`: booleans count as
    /// 0/1 and whole-number floats collapse to their integer
    fn number(&self) -> Option<Number> {
        match self {
            Value::Bool(b) => Some(Number::Int(i64::from(*b))),
            Value::Int(n) => Some(Number::Int(*n)),
            // i64::MAX as f64 is 2^63, one past the range
            Value::Float(x) if x.fract() == 0.0 && *x >= i64::MIN as f64 && *x < i64::MAX as f64 => {
                Some(Number::Int(*x as i64))
            }
            Value::Float(x) => Some(Number::Float(Value::float_bits(*x))),
            _ => None,
        }
    }
}

/// Canonical numeric key
#[derive(PartialEq, Eq, Hash)]
enum Number {
    Int(i64),
    Float(u64),
}

// Numbers compare by value across Bool/Int/Float, floats by canonical
// bits, so Eq and Hash agree. All NaNs are one key.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.number(), other.number()) {
            return a == b;
        }
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if let Some(number) = self.number() {
            number.hash(state);
            return;
        }
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Str(s) => s.hash(state),
            Value::Tuple(items) | Value::List(items) => items.hash(state),
            Value::Dict(pairs) => pairs.hash(state),
            _ => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Dict(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::None, Into::into)
    }
}

/// A declared parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    default: Option<Value>,
}

impl Param {
    /// Parameter that must be supplied
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// Parameter that falls back to `default`
    pub fn with_default(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }

    /// Parameter name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared default, if any
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Declared parameter list of a memoized computation
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    function: String,
    params: Vec<Param>,
}

impl Signature {
    /// Declare a signature
    ///
    /// # Errors
    /// * `InvalidSignature` - duplicate parameter names, or a required
    ///   parameter declared after a defaulted one
    pub fn new(function: impl Into<String>, params: impl IntoIterator<Item = Param>) -> Result<Self> {
        let function = function.into();
        let params: Vec<Param> = params.into_iter().collect();

        let mut seen_default = false;
        for (i, param) in params.iter().enumerate() {
            if params[..i].iter().any(|p| p.name == param.name) {
                return Err(Error::InvalidSignature {
                    function,
                    reason: format!("duplicate parameter '{}'", param.name),
                });
            }
            match param.default {
                Some(_) => seen_default = true,
                None if seen_default => {
                    return Err(Error::InvalidSignature {
                        function,
                        reason: format!(
                            "required parameter '{}' follows a parameter with a default",
                            param.name
                        ),
                    });
                }
                None => {}
            }
        }

        Ok(Self { function, params })
    }

    /// Function name
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Declared parameters, in order
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Bind a call's arguments and derive its cache key
    ///
    /// # Errors
    /// * `Binding` - too many positionals, unknown or repeated keyword,
    ///   or required parameters left unfilled
    /// * `UnhashableArgument` - a bound value is a list, dict, or a tuple
    ///   containing one
    pub fn bind(&self, args: &CallArgs) -> Result<CacheKey> {
        if args.positional.len() > self.params.len() {
            return Err(BindingError::TooManyPositional {
                function: self.function.clone(),
                max: self.params.len(),
                given: args.positional.len(),
            }
            .into());
        }

        let mut slots: Vec<Option<&Value>> = vec![None; self.params.len()];
        for (slot, value) in slots.iter_mut().zip(&args.positional) {
            *slot = Some(value);
        }

        for (name, value) in &args.keyword {
            let idx = self
                .params
                .iter()
                .position(|p| &p.name == name)
                .ok_or_else(|| BindingError::UnexpectedKeyword {
                    function: self.function.clone(),
                    name: name.clone(),
                })?;
            if slots[idx].is_some() {
                return Err(BindingError::MultipleValues {
                    function: self.function.clone(),
                    name: name.clone(),
                }
                .into());
            }
            slots[idx] = Some(value);
        }

        let mut bound = Vec::with_capacity(self.params.len());
        let mut missing = Vec::new();
        for (param, slot) in self.params.iter().zip(slots) {
            match slot.or(param.default.as_ref()) {
                Some(value) => bound.push((param, value)),
                None => missing.push(param.name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(BindingError::MissingArguments {
                function: self.function.clone(),
                names: missing,
            }
            .into());
        }

        let mut entries = Vec::with_capacity(bound.len());
        for (param, value) in bound {
            if let Some(bad) = value.first_unhashable() {
                return Err(Error::UnhashableArgument {
                    function: self.function.clone(),
                    param: param.name.clone(),
                    type_name: bad.type_name(),
                });
            }
            entries.push((param.name.clone(), value.clone()));
        }

        Ok(CacheKey { entries })
    }
}

/// Arguments of a single call, as written by the caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<Value>,
    keyword: Vec<(String, Value)>,
}

impl CallArgs {
    /// Empty argument list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Append a keyword argument
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.push((name.into(), value.into()));
        self
    }

    /// Positional arguments
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    /// Keyword arguments, in call order
    pub fn keyword(&self) -> &[(String, Value)] {
        &self.keyword
    }
}

/// Canonical key of a bound call: every parameter with its effective
/// value, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    entries: Vec<(String, Value)>,
}

impl CacheKey {
    /// Bound value of a parameter
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// `(name, value)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of bound parameters
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True for zero-parameter functions
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, ")")
    }
}
