//! Finite label spaces for states and actions

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use crate::error::{MdpError, Result};

/// Anything usable as a state or action identifier.
pub trait Label: Clone + Eq + Hash + Debug {}

impl<T: Clone + Eq + Hash + Debug> Label for T {}

/// An ordered, duplicate-free enumeration of labels.
///
/// The enumeration order is canonical: it decides table layout, output order
/// and which action wins a tie during policy improvement.
#[derive(Debug, Clone)]
pub struct Space<T: Label> {
    kind: &'static str,
    labels: Vec<T>,
    index: HashMap<T, usize>,
}

impl<T: Label> Space<T> {
    /// Build a space; `kind` ("state", "action") is only used in error messages.
    pub fn new(kind: &'static str, labels: impl IntoIterator<Item = T>) -> Result<Self> {
        let labels: Vec<T> = labels.into_iter().collect();
        if labels.is_empty() {
            return Err(MdpError::invalid(format!("{kind} set is empty")));
        }

        let mut index = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if index.insert(label.clone(), i).is_some() {
                return Err(MdpError::invalid(format!(
                    "duplicate {kind} label: {label:?}"
                )));
            }
        }

        Ok(Self {
            kind,
            labels,
            index,
        })
    }

    /// Same as [`Space::new`], wrapped for sharing between models.
    pub fn shared(kind: &'static str, labels: impl IntoIterator<Item = T>) -> Result<Arc<Self>> {
        Self::new(kind, labels).map(Arc::new)
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false for a constructed space; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn index_of(&self, label: &T) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Index of `label`, or `InvalidInput` naming the unknown label.
    pub fn require(&self, label: &T) -> Result<usize> {
        self.index_of(label)
            .ok_or_else(|| MdpError::invalid(format!("unknown {} label: {label:?}", self.kind)))
    }

    /// Label at `index`. Panics when out of range, like slice indexing.
    pub fn label(&self, index: usize) -> &T {
        &self.labels[index]
    }

    pub fn labels(&self) -> &[T] {
        &self.labels
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.labels.iter()
    }

    pub fn contains(&self, label: &T) -> bool {
        self.index.contains_key(label)
    }
}

impl<T: Label> PartialEq for Space<T> {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels
    }
}

impl<T: Label> Eq for Space<T> {}

impl<'a, T: Label> IntoIterator for &'a Space<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}

/// Cheap check for `Arc`-shared spaces: pointer equality first, then labels.
pub fn same_space<T: Label>(a: &Arc<Space<T>>, b: &Arc<Space<T>>) -> bool {
    Arc::ptr_eq(a, b) || a == b
}
