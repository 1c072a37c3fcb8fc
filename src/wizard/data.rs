//! Wizard data bag
//!
//! A single key/value store shared by every state and sub-state for the
//! lifetime of one wizard run. Values are a closed sum type rather than an
//! untyped "any", and a fixed set of well-known keys carries an expected kind
//! that writes are checked against. Unknown keys are extension data and accept
//! any value.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::wizard::error::WizardError;

/// A value stored in the wizard data bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WizardValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<WizardValue>),
}

/// Discriminant of a [`WizardValue`], used for schema checks and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    Bool,
    Integer,
    Float,
    Text,
    List,
}

impl WizardValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Integer(_) => ValueKind::Integer,
            Self::Float(_) => ValueKind::Float,
            Self::Text(_) => ValueKind::Text,
            Self::List(_) => ValueKind::List,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[WizardValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Parse a command-line style literal: `true`/`false`, integers, floats,
    /// comma-separated lists (`a,b,c`), otherwise plain text.
    pub fn parse_literal(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(b) = trimmed.parse::<bool>() {
            return Self::Bool(b);
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Self::Integer(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Self::Float(f);
        }
        if trimmed.contains(',') {
            return Self::List(
                trimmed
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Self::Text(s.to_string()))
                    .collect(),
            );
        }
        Self::Text(trimmed.to_string())
    }

    /// Parse `raw` as a value of `kind`. Lists split on commas even for a
    /// single item; text keeps commas. Input that does not fit a scalar kind
    /// falls back to [`parse_literal`](Self::parse_literal) so the schema
    /// check can report the mismatch.
    pub fn parse_as(raw: &str, kind: ValueKind) -> Self {
        let trimmed = raw.trim();
        match kind {
            ValueKind::Text => Self::Text(trimmed.to_string()),
            ValueKind::List => Self::List(
                trimmed
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Self::Text(s.to_string()))
                    .collect(),
            ),
            ValueKind::Bool => trimmed
                .parse::<bool>()
                .map_or_else(|_| Self::parse_literal(raw), Self::Bool),
            ValueKind::Integer => trimmed
                .parse::<i64>()
                .map_or_else(|_| Self::parse_literal(raw), Self::Integer),
            ValueKind::Float => trimmed
                .parse::<f64>()
                .map_or_else(|_| Self::parse_literal(raw), Self::Float),
        }
    }
}

impl fmt::Display for WizardValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for WizardValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for WizardValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for WizardValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for WizardValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for WizardValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for WizardValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl<T: Into<WizardValue>> From<Vec<T>> for WizardValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// Keys the built-in providers and handlers understand.
///
/// Each known key declares the kind of value it holds; writing a value of
/// another kind is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum KnownKey {
    LicenseAccepted,
    LicenseScrolledToEnd,
    SelectedComponents,
    InstallPath,
    Theme,
    InstallCompleted,
    InstallError,
}

impl KnownKey {
    pub fn expected_kind(self) -> ValueKind {
        match self {
            Self::LicenseAccepted | Self::LicenseScrolledToEnd | Self::InstallCompleted => {
                ValueKind::Bool
            }
            Self::SelectedComponents => ValueKind::List,
            Self::InstallPath | Self::Theme | Self::InstallError => ValueKind::Text,
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Ordered key/value store backing one wizard run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataBag {
    values: BTreeMap<String, WizardValue>,
}

impl DataBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a prospective write against the known-key schema without storing it.
    pub fn check(key: &str, value: &WizardValue) -> Result<(), WizardError> {
        if let Ok(known) = key.parse::<KnownKey>() {
            let expected = known.expected_kind();
            if value.kind() != expected {
                return Err(WizardError::DataType {
                    key: key.to_string(),
                    expected,
                    found: value.kind(),
                });
            }
        }
        Ok(())
    }

    /// Store a value, returning the previous one.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<WizardValue>,
    ) -> Result<Option<WizardValue>, WizardError> {
        let key = key.into();
        let value = value.into();
        Self::check(&key, &value)?;
        Ok(self.values.insert(key, value))
    }

    pub fn remove(&mut self, key: &str) -> Option<WizardValue> {
        self.values.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&WizardValue> {
        self.values.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(WizardValue::as_bool)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(WizardValue::as_str)
    }

    /// Text entries of a list value; non-text items are ignored.
    pub fn get_text_list(&self, key: &str) -> Option<Vec<&str>> {
        self.get(key)
            .and_then(WizardValue::as_list)
            .map(|items| items.iter().filter_map(WizardValue::as_str).collect())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WizardValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Put back a previous value (or remove the key), used to undo a write.
    pub(crate) fn restore(&mut self, key: &str, previous: Option<WizardValue>) {
        match previous {
            Some(value) => {
                self.values.insert(key.to_string(), value);
            }
            None => {
                self.values.remove(key);
            }
        }
    }
}
