//! Parsed route parameters: the router hands back raw path segments
//! matched against `:name` templates, which get coerced into loosely
//! typed values per the grammar in the router's value-parsing rule.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Bool(bool),
    String(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(n) => write!(f, "{n}"),
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Parse a raw path segment into the loosest-matching typed value:
/// numeric literal, then `true`/`false` (case-insensitive), else the raw
/// string.
pub fn parse_param_value(raw: &str) -> ParamValue {
    if is_numeric(raw) {
        if let Ok(n) = raw.parse::<f64>() {
            return ParamValue::Number(n);
        }
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" => ParamValue::Bool(true),
        "false" => ParamValue::Bool(false),
        _ => ParamValue::String(raw.to_string()),
    }
}

/// Matches `^[+-]?\d*\.?\d+(?:[Ee][+-]?\d+)?$` without pulling in a regex
/// crate for a single-shot grammar.
fn is_numeric(s: &str) -> bool {
    let mut chars = s.chars().peekable();
    if matches!(chars.peek(), Some('+') | Some('-')) {
        chars.next();
    }
    let mut saw_digit_before_dot = false;
    while matches!(chars.peek(), Some(c) if c.is_ascii_digit()) {
        chars.next();
        saw_digit_before_dot = true;
    }
    if matches!(chars.peek(), Some('.')) {
        chars.next();
    }
    let mut saw_digit_after_dot = false;
    while matches!(chars.peek(), Some(c) if c.is_ascii_digit()) {
        chars.next();
        saw_digit_after_dot = true;
    }
    if !saw_digit_before_dot && !saw_digit_after_dot {
        return false;
    }
    if matches!(chars.peek(), Some('e') | Some('E')) {
        chars.next();
        if matches!(chars.peek(), Some('+') | Some('-')) {
            chars.next();
        }
        let mut saw_exp_digit = false;
        while matches!(chars.peek(), Some(c) if c.is_ascii_digit()) {
            chars.next();
            saw_exp_digit = true;
        }
        if !saw_exp_digit {
            return false;
        }
    }
    chars.next().is_none()
}

/// Ordered map of route parameter name to parsed value, merged from the
/// trie's accumulated matches on a successful lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteParams(BTreeMap<String, ParamValue>);

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Merge `other` into `self`, preferring `other`'s values on
    /// collision (the sub-router-wins rule from the lookup contract).
    pub fn merge_preferring(&mut self, other: RouteParams) {
        for (k, v) in other.0 {
            self.0.insert(k, v);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
