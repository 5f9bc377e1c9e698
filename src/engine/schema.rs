//! Row validation
//!
//! A validator is anything implementing [`RowValidator`]: a closure, a
//! user type wrapping an external schema library, or the built-in
//! declarative [`FieldRules`]. The decoder only sees the outcome.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use super::row::Row;
use super::value::{Value, ValueKind};

/// Result of validating one row
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationOutcome {
    /// Whether the row passed
    pub valid: bool,
    /// Messages describing each failure
    pub errors: Vec<String>,
    /// Replacement row (e.g. with defaults filled in)
    pub data: Option<Row>,
}

impl ValidationOutcome {
    /// The row passed unchanged
    pub fn pass() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            data: None,
        }
    }

    /// The row passed and is replaced by `row`
    pub fn replace(row: Row) -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            data: Some(row),
        }
    }

    /// The row failed
    pub fn fail<I, S>(errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            valid: false,
            errors: errors.into_iter().map(Into::into).collect(),
            data: None,
        }
    }

    /// All messages joined for an error report
    pub fn message(&self) -> String {
        if self.errors.is_empty() {
            "row failed validation".to_string()
        } else {
            self.errors.join("; ")
        }
    }
}

/// Validates decoded rows
pub trait RowValidator: Send + Sync {
    /// Check one row
    fn validate(&self, row: &Row) -> ValidationOutcome;
}

impl<F> RowValidator for F
where
    F: Fn(&Row) -> ValidationOutcome + Send + Sync,
{
    fn validate(&self, row: &Row) -> ValidationOutcome {
        self(row)
    }
}

/// Shared, type-erased validator held by the options
#[derive(Clone)]
pub struct ValidatorHandle(Arc<dyn RowValidator>);

impl ValidatorHandle {
    /// Wrap a validator
    pub fn new(validator: impl RowValidator + 'static) -> Self {
        Self(Arc::new(validator))
    }
}

impl RowValidator for ValidatorHandle {
    #[inline]
    fn validate(&self, row: &Row) -> ValidationOutcome {
        self.0.validate(row)
    }
}

impl fmt::Debug for ValidatorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValidatorHandle(..)")
    }
}

// ============================================================================
// Declarative rules
// ============================================================================

/// Constraint on one column
#[derive(Debug, Clone)]
pub struct FieldRule {
    column: String,
    required: bool,
    kind: Option<ValueKind>,
    pattern: Option<Regex>,
    min: Option<f64>,
    max: Option<f64>,
}

impl FieldRule {
    /// A rule on `column` with no constraints yet
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            required: false,
            kind: None,
            pattern: None,
            min: None,
            max: None,
        }
    }

    /// The value must be present and non-empty
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Non-null values must be of this kind
    pub fn kind(mut self, kind: ValueKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// String values must match
    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Numeric values must lie in `[min, max]`
    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    fn check(&self, row: &Row, errors: &mut Vec<String>) {
        let value = row.get(&self.column).unwrap_or(&Value::Null);
        let blank = match value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        };
        if blank {
            if self.required {
                errors.push(format!("{} is required", self.column));
            }
            return;
        }

        if let Some(kind) = self.kind {
            if value.kind() != kind && !(kind == ValueKind::Float && value.is_number()) {
                errors.push(format!(
                    "{} must be {:?}, got {:?}",
                    self.column,
                    kind,
                    value.kind()
                ));
                return;
            }
        }

        if let (Some(pattern), Value::String(s)) = (&self.pattern, value) {
            if !pattern.is_match(s) {
                errors.push(format!("{} does not match {}", self.column, pattern));
            }
        }

        if let Some(x) = value.as_f64() {
            if self.min.is_some_and(|min| x < min) || self.max.is_some_and(|max| x > max) {
                errors.push(format!("{} is out of range", self.column));
            }
        }
    }
}

/// A list of [`FieldRule`]s; every rule is checked and all failures reported
///
/// ```rust
/// use delimit::engine::schema::{FieldRule, FieldRules};
/// use delimit::engine::value::ValueKind;
///
/// let rules = FieldRules::new()
///     .rule(FieldRule::new("id").required().kind(ValueKind::Int))
///     .rule(FieldRule::new("score").range(Some(0.0), Some(100.0)));
/// assert_eq!(rules.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldRules {
    rules: Vec<FieldRule>,
}

impl FieldRules {
    /// Empty rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule
    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether there are no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl RowValidator for FieldRules {
    fn validate(&self, row: &Row) -> ValidationOutcome {
        let mut errors = Vec::new();
        for rule in &self.rules {
            rule.check(row, &mut errors);
        }
        if errors.is_empty() {
            ValidationOutcome::pass()
        } else {
            ValidationOutcome::fail(errors)
        }
    }
}
