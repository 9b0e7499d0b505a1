//! # Query/Pagination Parameters
//!
//! Reserved keys: `page`, `limit`, `orderBy`, `order`. Every other key
//! becomes an equality filter whose value is passed to the store as-is.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifier::validate_identifier;

/// Hard ceiling on records returned per query
pub const MAX_LIMIT: i64 = 100;

/// Limit used when none (or an unusable one) is supplied
pub const DEFAULT_LIMIT: i64 = 50;

/// Sort key used when `orderBy` is absent
pub const DEFAULT_ORDER_BY: &str = "created_at";

const RESERVED_KEYS: [&str; 4] = ["page", "limit", "orderBy", "order"];

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Parses `asc`/`desc` case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Defaults applied when a parameter is missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDefaults {
    pub limit: i64,
    pub order_by: String,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            order_by: DEFAULT_ORDER_BY.to_string(),
        }
    }
}

/// Normalized query options handed to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Records to return, always within `1..=MAX_LIMIT`
    pub limit: i64,

    /// Records to skip. Negative when `page <= 0`; the store treats that as 0.
    pub offset: i64,

    pub order_by: String,

    pub order: SortOrder,

    /// Field name to expected value, uncoerced
    pub equality_filters: BTreeMap<String, Value>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            order_by: DEFAULT_ORDER_BY.to_string(),
            order: SortOrder::Desc,
            equality_filters: BTreeMap::new(),
        }
    }
}

impl QueryOptions {
    /// Normalize raw request parameters using the built-in defaults
    pub fn normalize(params: &HashMap<String, String>) -> Self {
        Self::normalize_with(params, &QueryDefaults::default())
    }

    /// Normalize raw request parameters.
    ///
    /// Never fails: unusable values fall back to defaults.
    pub fn normalize_with(params: &HashMap<String, String>, defaults: &QueryDefaults) -> Self {
        let limit = params
            .get("limit")
            .and_then(|v| parse_leading_int(v))
            .filter(|l| *l != 0)
            .unwrap_or(defaults.limit)
            .clamp(1, MAX_LIMIT);

        let page = params
            .get("page")
            .and_then(|v| parse_leading_int(v))
            .unwrap_or(1);

        let order_by = params
            .get("orderBy")
            .map(|v| v.trim())
            .filter(|v| validate_identifier(v))
            .map(str::to_string)
            .unwrap_or_else(|| defaults.order_by.clone());

        let order = params
            .get("order")
            .and_then(|v| SortOrder::parse(v))
            .unwrap_or_default();

        let equality_filters = params
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();

        Self {
            limit,
            offset: page.saturating_sub(1).saturating_mul(limit),
            order_by,
            order,
            equality_filters,
        }
    }

    /// Offset as a skip count; negative offsets skip nothing
    pub fn skip(&self) -> usize {
        usize::try_from(self.offset).unwrap_or(0)
    }

    /// Builder-style filter insertion
    pub fn with_filter(mut self, field: impl Into<String>, value: Value) -> Self {
        self.equality_filters.insert(field.into(), value);
        self
    }
}

/// Parses an optional sign followed by leading digits, ignoring any trailing
/// text (`"10abc"` is 10). Returns `None` when no digits lead the value.
fn parse_leading_int(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let query = QueryOptions::normalize(&HashMap::new());
        assert_eq!(query, QueryOptions::default());
        assert_eq!(query.order_by, "created_at");
        assert_eq!(query.order, SortOrder::Desc);
    }

    #[test]
    fn test_limit_clamped_to_ceiling() {
        let query = QueryOptions::normalize(&params(&[("limit", "1000")]));
        assert_eq!(query.limit, 100);
    }

    #[test]
    fn test_first_page_has_zero_offset() {
        let query = QueryOptions::normalize(&params(&[("page", "1"), ("limit", "10")]));
        assert_eq!(query.limit, 10);
        assert_eq!(query.offset, 0);

        let query = QueryOptions::normalize(&params(&[("page", "3"), ("limit", "10")]));
        assert_eq!(query.offset, 20);
    }

    #[test]
    fn test_page_zero_yields_negative_offset() {
        let query = QueryOptions::normalize(&params(&[("page", "0"), ("limit", "10")]));
        assert_eq!(query.offset, -10);
        assert_eq!(query.skip(), 0);
    }

    #[test]
    fn test_unusable_limits() {
        assert_eq!(QueryOptions::normalize(&params(&[("limit", "abc")])).limit, DEFAULT_LIMIT);
        assert_eq!(QueryOptions::normalize(&params(&[("limit", "0")])).limit, DEFAULT_LIMIT);
        assert_eq!(QueryOptions::normalize(&params(&[("limit", "-5")])).limit, 1);
        assert_eq!(QueryOptions::normalize(&params(&[("limit", "25rows")])).limit, 25);
    }

    #[test]
    fn test_custom_defaults() {
        let defaults = QueryDefaults {
            limit: 20,
            order_by: "updated_at".into(),
        };
        let query = QueryOptions::normalize_with(&HashMap::new(), &defaults);
        assert_eq!(query.limit, 20);
        assert_eq!(query.order_by, "updated_at");
    }

    #[test]
    fn test_ordering() {
        let query = QueryOptions::normalize(&params(&[("orderBy", "title"), ("order", "ASC")]));
        assert_eq!(query.order_by, "title");
        assert_eq!(query.order, SortOrder::Asc);

        let query = QueryOptions::normalize(&params(&[("order", "sideways")]));
        assert_eq!(query.order, SortOrder::Desc);

        let query = QueryOptions::normalize(&params(&[("orderBy", "title; drop")]));
        assert_eq!(query.order_by, DEFAULT_ORDER_BY);
    }

    #[test]
    fn test_extra_keys_become_uncoerced_filters() {
        let query = QueryOptions::normalize(&params(&[
            ("page", "2"),
            ("status", "active"),
            ("age", "30"),
        ]));
        assert_eq!(query.equality_filters.len(), 2);
        assert_eq!(query.equality_filters["status"], Value::String("active".into()));
        assert_eq!(query.equality_filters["age"], Value::String("30".into()));
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("42"), Some(42));
        assert_eq!(parse_leading_int("  7"), Some(7));
        assert_eq!(parse_leading_int("-3x"), Some(-3));
        assert_eq!(parse_leading_int("+8"), Some(8));
        assert_eq!(parse_leading_int("x1"), None);
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("99999999999999999999"), Some(i64::MAX));
    }
}
