use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

pub const DEFAULT_IGNORE_FIELDS: &[&str] = &[
    "createdAt",
    "updatedAt",
    "deletedAt",
    "lastLoginAt",
    "timestamp",
    "accessToken",
    "refreshToken",
    "accessTokenExpiresIn",
    "uptime",
    "hostname",
    "version",
];

/// Keys stripped from responses at every depth before comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IgnoreList(BTreeSet<String>);

impl IgnoreList {
    pub fn empty() -> Self {
        IgnoreList(BTreeSet::new())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for IgnoreList {
    fn default() -> Self {
        DEFAULT_IGNORE_FIELDS.iter().copied().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for IgnoreList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        IgnoreList(iter.into_iter().map(Into::into).collect())
    }
}

/// Strips every ignored key at every depth. An absent body becomes `{}`.
pub fn normalize(body: Option<&Value>, ignore: &IgnoreList) -> Value {
    match body {
        Some(value) => normalize_value(value, ignore),
        None => Value::Object(Map::new()),
    }
}

pub fn normalize_value(value: &Value, ignore: &IgnoreList) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !ignore.contains(key))
                .map(|(key, v)| (key.clone(), normalize_value(v, ignore)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| normalize_value(item, ignore)).collect())
        }
        scalar => scalar.clone(),
    }
}
