//! Client-side predicate evaluation for `find` and `findall`.
//!
//! Predicate keys are attribute names with an optional operator suffix:
//!
//! | suffix | meaning |
//! |---|---|
//! | `_eq` (or none) | equal, numbers compared by value |
//! | `_le` | less than or equal (numbers or strings) |
//! | `_ge` | greater than or equal (numbers or strings) |
//! | `_has` | substring, array element or object key |
//!
//! ```
//! use seamicro_core::filter::Filters;
//!
//! let filters: Filters = [("freeSize_le", 500), ("usedSize", 300)].into_iter().collect();
//! assert_eq!(filters.len(), 2);
//! ```

use crate::resource::{Resource, ResourceKind};
use crate::{Error, Result};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Comparison applied by a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equality
    Eq,
    /// Less than or equal
    Le,
    /// Greater than or equal
    Ge,
    /// Containment
    Has,
}

impl Operator {
    /// Key suffix for this operator.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Eq => "_eq",
            Self::Le => "_le",
            Self::Ge => "_ge",
            Self::Has => "_has",
        }
    }

    /// Split a predicate key into attribute name and operator.
    #[must_use]
    pub fn parse_key(key: &str) -> (&str, Self) {
        for op in [Self::Eq, Self::Le, Self::Ge, Self::Has] {
            if let Some(attribute) = key.strip_suffix(op.suffix()) {
                if !attribute.is_empty() {
                    return (attribute, op);
                }
            }
        }
        (key, Self::Eq)
    }

    /// Apply the operator to an attribute value and the expected value.
    #[must_use]
    pub fn matches(self, actual: &Value, expected: &Value) -> bool {
        match self {
            Self::Eq => values_equal(actual, expected),
            Self::Le => matches!(
                compare(actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Self::Ge => matches!(
                compare(actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Self::Has => contains(actual, expected),
        }
    }
}

/// One attribute test.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Attribute name without suffix
    pub attribute: String,
    /// Comparison
    pub operator: Operator,
    /// Expected value
    pub value: Value,
}

impl Predicate {
    /// Build a predicate from its parts.
    #[must_use]
    pub fn new(attribute: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            value: value.into(),
        }
    }

    /// Build a predicate from a suffixed key such as `freeSize_le`.
    #[must_use]
    pub fn parse(key: &str, value: impl Into<Value>) -> Self {
        let (attribute, operator) = Operator::parse_key(key);
        Self::new(attribute, operator, value)
    }

    /// Test an attribute value.
    #[must_use]
    pub fn matches(&self, actual: &Value) -> bool {
        self.operator.matches(actual, &self.value)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}={}",
            self.attribute,
            self.operator.suffix(),
            self.value
        )
    }
}

/// A conjunction of predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    predicates: Vec<Predicate>,
}

impl Filters {
    /// Empty filter set; matches everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality test.
    #[must_use]
    pub fn eq(self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(Predicate::new(attribute, Operator::Eq, value))
    }

    /// Add a less-than-or-equal test.
    #[must_use]
    pub fn le(self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(Predicate::new(attribute, Operator::Le, value))
    }

    /// Add a greater-than-or-equal test.
    #[must_use]
    pub fn ge(self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(Predicate::new(attribute, Operator::Ge, value))
    }

    /// Add a containment test.
    #[must_use]
    pub fn has(self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(Predicate::new(attribute, Operator::Has, value))
    }

    /// Add a test from a suffixed key.
    #[must_use]
    pub fn parsed(self, key: &str, value: impl Into<Value>) -> Self {
        self.with(Predicate::parse(key, value))
    }

    /// Add a predicate.
    #[must_use]
    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Iterate over the predicates.
    pub fn iter(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates.iter()
    }

    /// Number of predicates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Returns true if there are no predicates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl<S, V> FromIterator<(S, V)> for Filters
where
    S: AsRef<str>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        Self {
            predicates: iter
                .into_iter()
                .map(|(key, value)| Predicate::parse(key.as_ref(), value))
                .collect(),
        }
    }
}

impl fmt::Display for Filters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, predicate) in self.predicates.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{predicate}")?;
        }
        f.write_str("}")
    }
}

/// Keep the resources that satisfy every predicate.
///
/// Attribute lookups may complete unloaded resources. A candidate whose
/// attribute is missing is excluded; any other error aborts the search.
///
/// # Errors
///
/// Propagates errors other than [`Error::AttributeNotFound`].
pub async fn findall<K: ResourceKind>(
    resources: Vec<Resource<K>>,
    filters: &Filters,
) -> Result<Vec<Resource<K>>> {
    let mut found = Vec::new();

    'candidates: for mut resource in resources {
        for predicate in filters.iter() {
            match resource.get_or_fetch(&predicate.attribute).await {
                Ok(actual) => {
                    if !predicate.matches(actual) {
                        continue 'candidates;
                    }
                }
                Err(Error::AttributeNotFound { .. }) => continue 'candidates,
                Err(err) => return Err(err),
            }
        }
        found.push(resource);
    }

    Ok(found)
}

/// Reduce a match list to its single element.
///
/// # Errors
///
/// Returns [`Error::NotFound`] for no matches and [`Error::AmbiguousMatch`]
/// for several.
pub fn exactly_one<K: ResourceKind>(
    mut matches: Vec<Resource<K>>,
    filters: &Filters,
) -> Result<Resource<K>> {
    match matches.len() {
        0 => Err(Error::NotFound(format!("No {} matching {filters}", K::NAME))),
        1 => Ok(matches.remove(0)),
        n => Err(Error::AmbiguousMatch(format!(
            "{n} {} resources match {filters}",
            K::NAME
        ))),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::String(text), Value::String(part)) => text.contains(part.as_str()),
        (Value::Array(items), Value::String(text)) => items.iter().any(|item| match item {
            Value::Number(n) => n.to_string() == *text,
            other => values_equal(other, needle),
        }),
        (Value::Array(items), _) => items.iter().any(|item| values_equal(item, needle)),
        (Value::Object(map), Value::String(key)) => map.contains_key(key),
        _ => false,
    }
}
