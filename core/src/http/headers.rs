use std::collections::HashMap;

/// A single header's value(s): most headers carry one value, but some
/// (`Set-Cookie`, `Accept`, ...) may repeat. Preserves arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Single(String),
    Multi(Vec<String>),
}

impl HeaderValue {
    pub fn first(&self) -> &str {
        match self {
            HeaderValue::Single(v) => v,
            HeaderValue::Multi(vs) => vs.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            HeaderValue::Single(v) => vec![v.as_str()],
            HeaderValue::Multi(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            HeaderValue::Single(existing) => {
                *self = HeaderValue::Multi(vec![std::mem::take(existing), value]);
            }
            HeaderValue::Multi(vs) => vs.push(value),
        }
    }
}

/// Case-preserving, case-insensitively-compared header map.
///
/// The original casing of the first occurrence of each name is preserved
/// for re-serialization, but lookups normalize to lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    // lowercased name -> (original-cased name, value)
    entries: HashMap<String, (String, HeaderValue)>,
    order: Vec<String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or append a header value, coalescing repeats into an ordered
    /// sequence (the first two collisions form a `Multi`).
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let key = name.to_ascii_lowercase();
        let value = value.into();
        if let Some((_, existing)) = self.entries.get_mut(&key) {
            existing.push(value);
        } else {
            self.order.push(key.clone());
            self.entries.insert(key, (name, HeaderValue::Single(value)));
        }
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries.get(&name.to_ascii_lowercase()).map(|(_, v)| v)
    }

    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.get(name).map(HeaderValue::first)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Iterate in insertion order as (original-cased-name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.order.iter().map(move |k| {
            let (name, value) = &self.entries[k];
            (name.as_str(), value)
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
