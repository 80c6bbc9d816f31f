//! Case-insensitive attribute access for search entries

use std::collections::HashMap;

/// Attribute values keyed by lowercased attribute name.
///
/// Attribute names are case-insensitive on the wire, so `memberOf`,
/// `memberof` and `MEMBEROF` all address the same values. Values under names
/// that differ only in case are merged in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    values: HashMap<String, Vec<String>>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, values: impl IntoIterator<Item = String>) {
        self.values
            .entry(name.to_ascii_lowercase())
            .or_default()
            .extend(values);
    }

    /// All values of an attribute. An attribute present with no values counts
    /// as absent.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.values
            .get(&name.to_ascii_lowercase())
            .filter(|v| !v.is_empty())
            .map(|v| v.as_slice())
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.first()).map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Whether `name` carries exactly `value` among its values
    pub fn has_value(&self, name: &str, value: &str) -> bool {
        self.get(name)
            .map(|values| values.iter().any(|v| v == value))
            .unwrap_or(false)
    }
}

impl From<HashMap<String, Vec<String>>> for AttributeMap {
    fn from(attrs: HashMap<String, Vec<String>>) -> Self {
        let mut map = AttributeMap::new();
        for (name, values) in attrs {
            map.insert(&name, values);
        }
        map
    }
}
