//! Select queries issued when relationships load.

use std::cmp::Ordering;

use crate::catalog::{OrderBy, OrderDirection};
use crate::value::Value;

use super::StoredRecord;

/// Conjunction of property equality tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    terms: Vec<(String, Value)>,
}

impl Criteria {
    /// Empty criteria matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality term.
    pub fn eq(mut self, prop: impl Into<String>, value: impl Into<Value>) -> Self {
        self.terms.push((prop.into(), value.into()));
        self
    }

    /// Build from parallel property and value lists.
    pub fn from_pairs<'a>(props: impl IntoIterator<Item = &'a str>, values: &[Value]) -> Self {
        Self {
            terms: props
                .into_iter()
                .zip(values)
                .map(|(p, v)| (p.to_string(), v.clone()))
                .collect(),
        }
    }

    /// Terms in order.
    pub fn terms(&self) -> &[(String, Value)] {
        &self.terms
    }

    /// Whether a record satisfies every term. Null never matches.
    pub fn matches(&self, record: &StoredRecord, primary_key: &str) -> bool {
        self.terms.iter().all(|(prop, expected)| {
            let actual = record.value_or_id(prop, primary_key);
            values_equal(&actual, expected)
        })
    }
}

/// Equality used by criteria: null never matches, integers compare by
/// value across widths.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    if a.is_null() || b.is_null() {
        return false;
    }
    a == b || (a.as_i64().is_some() && b.as_i64().is_some() && a.sort_cmp(b) == Ordering::Equal)
}

/// Load request for one class.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// Class to load.
    pub class: String,
    /// Primary key property of the class. Criteria and ordering on it
    /// read the record id.
    pub primary_key: String,
    /// Filter.
    pub criteria: Criteria,
    /// Sort order.
    pub order_by: Vec<OrderBy>,
}

impl SelectQuery {
    /// Select every object of a class.
    pub fn new(class: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            primary_key: primary_key.into(),
            criteria: Criteria::new(),
            order_by: Vec::new(),
        }
    }

    /// Set the filter.
    pub fn with_criteria(mut self, criteria: Criteria) -> Self {
        self.criteria = criteria;
        self
    }

    /// Set the sort order.
    pub fn with_order_by(mut self, order_by: Vec<OrderBy>) -> Self {
        self.order_by = order_by;
        self
    }

    /// Whether a record of the queried class satisfies the criteria.
    pub fn matches(&self, record: &StoredRecord) -> bool {
        record.class == self.class && self.criteria.matches(record, &self.primary_key)
    }

    /// Sort records in place. Ties keep their existing order.
    pub fn sort(&self, records: &mut [StoredRecord]) {
        let primary_key = self.primary_key.as_str();
        if self.order_by.is_empty() {
            return;
        }
        records.sort_by(|a, b| {
            for order in &self.order_by {
                let left = a.value_or_id(&order.field, primary_key);
                let right = b.value_or_id(&order.field, primary_key);
                let ord = match order.direction {
                    OrderDirection::Asc => left.sort_cmp(&right),
                    OrderDirection::Desc => right.sort_cmp(&left),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }
}
