//! Client-side predicates over entities.

use std::fmt;
use std::sync::Arc;

/// A described predicate over `T`.
///
/// The description is what gets logged when the predicate is used, so it
/// should read like the condition it tests.
///
/// ```
/// use docstore_storage::Filter;
///
/// let even = Filter::new("n is even", |n: &u32| n % 2 == 0);
/// let small = Filter::new("n < 10", |n: &u32| *n < 10);
/// let both = even.and(small);
///
/// assert!(both.matches(&4));
/// assert!(!both.matches(&12));
/// assert_eq!(both.description(), "(n is even) && (n < 10)");
/// ```
pub struct Filter<T> {
    description: String,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T: 'static> Filter<T> {
    pub fn new(
        description: impl Into<String>,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Matches everything.
    pub fn all() -> Self {
        Self::new("*", |_| true)
    }

    pub fn matches(&self, value: &T) -> bool {
        (self.predicate)(value)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn and(self, other: Filter<T>) -> Self {
        let description = format!("({}) && ({})", self.description, other.description);
        Self::new(description, move |v| self.matches(v) && other.matches(v))
    }

    pub fn or(self, other: Filter<T>) -> Self {
        let description = format!("({}) || ({})", self.description, other.description);
        Self::new(description, move |v| self.matches(v) || other.matches(v))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        let description = format!("!({})", self.description);
        Self::new(description, move |v| !self.matches(v))
    }
}

impl<T> Clone for Filter<T> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<T> fmt::Debug for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}
