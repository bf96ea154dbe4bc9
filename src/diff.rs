use serde_json::{Map, Value};
use similar::TextDiff;

use crate::normalize::{normalize, IgnoreList};

const CONTEXT_LINES: usize = 3;

/// Headers used on the `---` / `+++` lines of a diff.
#[derive(Debug, Clone, Copy)]
pub struct DiffLabels {
    pub expected: &'static str,
    pub actual: &'static str,
}

impl DiffLabels {
    pub const LEGACY_VS_CORE: DiffLabels = DiffLabels {
        expected: "api-legacy",
        actual: "api-core",
    };

    pub const GOLDEN_VS_CORE: DiffLabels = DiffLabels {
        expected: "golden",
        actual: "api-core",
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub matched: bool,
    pub diff: Vec<String>,
}

pub struct Differ<'a> {
    ignore: &'a IgnoreList,
}

impl<'a> Differ<'a> {
    pub fn new(ignore: &'a IgnoreList) -> Self {
        Differ { ignore }
    }

    /// Normalizes both sides, then either reports a match or produces a
    /// unified diff of their key-sorted pretty renderings.
    pub fn compare(&self, expected: Option<&Value>, actual: Option<&Value>, labels: DiffLabels) -> Comparison {
        let expected = normalize(expected, self.ignore);
        let actual = normalize(actual, self.ignore);

        if expected == actual {
            return Comparison {
                matched: true,
                diff: Vec::new(),
            };
        }

        let old = render(&expected);
        let new = render(&actual);
        let text_diff = TextDiff::from_lines(old.as_str(), new.as_str());
        let text = text_diff
            .unified_diff()
            .context_radius(CONTEXT_LINES)
            .header(labels.expected, labels.actual)
            .to_string();

        let mut diff: Vec<String> = text.lines().map(str::to_string).collect();
        // Values that differ only in representation (e.g. 1 vs 1.0) can
        // render identically.
        if diff.is_empty() {
            diff.push(format!("--- {}", labels.expected));
            diff.push(format!("+++ {}", labels.actual));
            diff.push(format!("-{}", expected));
            diff.push(format!("+{}", actual));
        }

        Comparison { matched: false, diff }
    }
}

/// Pretty JSON with keys sorted at every level, newline-terminated so the
/// diff never emits a missing-newline marker.
fn render(value: &Value) -> String {
    let sorted = sort_keys(value);
    let mut text = serde_json::to_string_pretty(&sorted).unwrap_or_else(|_| sorted.to_string());
    text.push('\n');
    text
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                out.insert(key.clone(), sort_keys(&map[key.as_str()]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        scalar => scalar.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_after_normalization_matches() {
        let ignore = IgnoreList::default();
        let legacy = json!({ "id": 1, "name": "Ocean View", "createdAt": "2024-01-01T00:00:00Z" });
        let core = json!({ "name": "Ocean View", "id": 1, "createdAt": "2025-06-30T12:00:00Z" });

        let cmp = Differ::new(&ignore).compare(Some(&legacy), Some(&core), DiffLabels::LEGACY_VS_CORE);
        assert!(cmp.matched);
        assert!(cmp.diff.is_empty());
    }

    #[test]
    fn drifted_value_shows_both_sides() {
        let ignore = IgnoreList::default();
        let golden = json!({ "total": 10 });
        let live = json!({ "total": 11 });

        let cmp = Differ::new(&ignore).compare(Some(&golden), Some(&live), DiffLabels::GOLDEN_VS_CORE);
        assert!(!cmp.matched);
        assert_eq!(cmp.diff[0], "--- golden");
        assert_eq!(cmp.diff[1], "+++ api-core");
        assert!(cmp.diff.iter().any(|l| l.starts_with('-') && l.contains("10")));
        assert!(cmp.diff.iter().any(|l| l.starts_with('+') && l.contains("11")));
    }

    #[test]
    fn array_order_is_significant() {
        let ignore = IgnoreList::empty();
        let cmp = Differ::new(&ignore).compare(
            Some(&json!({ "ids": [1, 2] })),
            Some(&json!({ "ids": [2, 1] })),
            DiffLabels::LEGACY_VS_CORE,
        );
        assert!(!cmp.matched);
        assert!(!cmp.diff.is_empty());
    }

    #[test]
    fn absent_body_equals_empty_object() {
        let ignore = IgnoreList::default();
        let cmp = Differ::new(&ignore).compare(None, Some(&json!({ "timestamp": 5 })), DiffLabels::LEGACY_VS_CORE);
        assert!(cmp.matched);
    }

    #[test]
    fn numeric_representation_difference_still_yields_diff() {
        let ignore = IgnoreList::empty();
        let cmp = Differ::new(&ignore).compare(Some(&json!(1)), Some(&json!(1.0)), DiffLabels::LEGACY_VS_CORE);
        assert!(!cmp.matched);
        assert!(!cmp.diff.is_empty());
    }

    #[test]
    fn render_sorts_keys() {
        let text = render(&json!({ "b": 1, "a": { "d": 2, "c": 3 } }));
        let a = text.find("\"a\"").unwrap();
        let b = text.find("\"b\"").unwrap();
        let c = text.find("\"c\"").unwrap();
        let d = text.find("\"d\"").unwrap();
        assert!(a < b && c < d);
    }
}
