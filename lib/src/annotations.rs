//! Publish/subscribe state shared by the estimators of one pipeline.
//!
//! An upstream estimator publishes a statistic at its pipeline position; a
//! downstream estimator reads it back by type. The store does not enforce any
//! ordering: stages must be constructed and trained leaves first.

use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A single published value together with the name of its publisher.
#[derive(Clone)]
pub struct Annotation {
    pub estimator_name: &'static str,
    value: Rc<dyn Any>,
}

impl Annotation {
    pub fn value<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Annotation")
            .field("estimator_name", &self.estimator_name)
            .finish_non_exhaustive()
    }
}

/// Reference-counted annotation bag keyed by pipeline position.
///
/// Cloning the store shares it; the underlying map lives until the last
/// estimator holding a clone is dropped.
#[derive(Clone, Default, Debug)]
pub struct AnnotationStore {
    inner: Rc<RefCell<BTreeMap<usize, Vec<Annotation>>>>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `value` at `position`.
    pub fn publish<T: Any>(&self, position: usize, estimator_name: &'static str, value: T) {
        tracing::debug!(position, estimator_name, "publishing annotation");
        self.inner
            .borrow_mut()
            .entry(position)
            .or_default()
            .push(Annotation {
                estimator_name,
                value: Rc::new(value),
            });
    }

    /// Returns the most recently published `T` visible from `position`.
    ///
    /// Values published at `position` or at any earlier position are visible.
    pub fn read<T: Any + Clone>(&self, position: usize) -> Option<T> {
        let map = self.inner.borrow();
        let found = map
            .range(..=position)
            .rev()
            .flat_map(|(_, annotations)| annotations.iter().rev())
            .find_map(|annotation| annotation.value::<T>().cloned());
        found
    }

    /// All annotations published exactly at `position`.
    pub fn at(&self, position: usize) -> Vec<Annotation> {
        self.inner
            .borrow()
            .get(&position)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of estimators currently sharing this store.
    pub fn share_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }
}
