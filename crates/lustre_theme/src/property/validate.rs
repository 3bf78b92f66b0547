//! Composable value constraints
//!
//! Every check in a [`Constraints`] must pass.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::ValidationError;

type Check<T> = Arc<dyn Fn(&T) -> Result<(), String> + Send + Sync>;

/// A conjunction of checks on a property value
pub struct Constraints<T> {
    checks: Vec<Check<T>>,
}

impl<T> Clone for Constraints<T> {
    fn clone(&self) -> Self {
        Self {
            checks: self.checks.clone(),
        }
    }
}

impl<T> Default for Constraints<T> {
    fn default() -> Self {
        Self { checks: Vec::new() }
    }
}

impl<T> fmt::Debug for Constraints<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraints")
            .field("checks", &self.checks.len())
            .finish()
    }
}

impl<T: 'static> Constraints<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Add a predicate; `message` is reported when it fails
    pub fn custom<F>(mut self, message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let message = message.into();
        self.checks.push(Arc::new(move |value: &T| {
            if predicate(value) {
                Ok(())
            } else {
                Err(message.clone())
            }
        }));
        self
    }

    /// Combine with another set of constraints
    pub fn and(mut self, other: Constraints<T>) -> Self {
        self.checks.extend(other.checks);
        self
    }

    /// Run every check against `value`
    pub fn validate(&self, property: &str, value: &T) -> Result<(), ValidationError> {
        for check in &self.checks {
            check(value).map_err(|message| ValidationError::Constraint {
                property: property.to_string(),
                message,
            })?;
        }
        Ok(())
    }
}

impl<T> Constraints<T>
where
    T: PartialOrd + fmt::Display + Send + Sync + 'static,
{
    /// Value must be at least `min`
    pub fn min(mut self, min: T) -> Self {
        self.checks.push(Arc::new(move |value: &T| {
            if *value >= min {
                Ok(())
            } else {
                Err(format!("{} is below the minimum {}", value, min))
            }
        }));
        self
    }

    /// Value must be at most `max`
    pub fn max(mut self, max: T) -> Self {
        self.checks.push(Arc::new(move |value: &T| {
            if *value <= max {
                Ok(())
            } else {
                Err(format!("{} is above the maximum {}", value, max))
            }
        }));
        self
    }

    pub fn range(self, min: T, max: T) -> Self {
        self.min(min).max(max)
    }
}

impl<T> Constraints<T>
where
    T: PartialEq + fmt::Debug + Send + Sync + 'static,
{
    /// Value must be one of `allowed`
    pub fn one_of(mut self, allowed: impl IntoIterator<Item = T>) -> Self {
        let allowed: Vec<T> = allowed.into_iter().collect();
        self.checks.push(Arc::new(move |value: &T| {
            if allowed.contains(value) {
                Ok(())
            } else {
                Err(format!("{:?} is not one of {:?}", value, allowed))
            }
        }));
        self
    }
}

impl<T> Constraints<T>
where
    T: AsRef<str> + 'static,
{
    /// Value must match `pattern` (searched, not anchored)
    pub fn pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        self.checks.push(Arc::new(move |value: &T| {
            if regex.is_match(value.as_ref()) {
                Ok(())
            } else {
                Err(format!("'{}' does not match /{}/", value.as_ref(), regex.as_str()))
            }
        }));
        Ok(self)
    }
}
