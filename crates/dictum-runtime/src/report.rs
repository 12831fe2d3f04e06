//! Read-only projections of an instance tree into failure reports

use crate::errors::{Failure, ValidationError};
use crate::instance::{Instance, Local};
use crate::path::Path;
use serde::Serialize;
use indexmap::IndexMap;

/// Lazy pre-order walk over the located failures of an instance tree.
///
/// Yields a node's own failure before its children's, children in
/// visitation order. [`Failure::Aggregate`] markers are skipped: they only
/// say that something below failed, and that something is yielded itself.
pub struct Errors<'i, 'a> {
    stack: Vec<(&'i Instance<'a>, Path)>,
}

impl<'i, 'a> Errors<'i, 'a> {
    pub(crate) fn new(root: &'i Instance<'a>) -> Self {
        Self {
            stack: vec![(root, Path::root())],
        }
    }
}

impl<'i, 'a> Iterator for Errors<'i, 'a> {
    type Item = ValidationError;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, path)) = self.stack.pop() {
            if node.is_valid() {
                continue;
            }

            for child in node.children().iter().rev() {
                let child_path = match child.segment() {
                    Some(segment) => path.child(segment.clone()),
                    None => path.clone(),
                };
                self.stack.push((child, child_path));
            }

            match node.failure() {
                Some(failure) if !failure.is_aggregate() => {
                    return Some(ValidationError::new(path, failure.clone()));
                }
                _ => {}
            }
        }
        None
    }
}

/// Nested failure report shaped like the instance tree.
///
/// ```text
/// {"errors": [], "items": {"foo": {"errors": [{"kind": "missing_field"}]}, ...}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorTree {
    /// Failures local to this node; never contains `Aggregate`.
    pub errors: Vec<Failure>,
    #[serde(skip_serializing_if = "ErrorItems::is_none")]
    pub items: ErrorItems,
}

/// Child reports of a container node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorItems {
    None,
    Sequence(Vec<ErrorTree>),
    /// Keyed in visitation order: declared fields, then unexpected keys
    Mapping(IndexMap<String, ErrorTree>),
}

impl ErrorItems {
    pub fn is_none(&self) -> bool {
        matches!(self, ErrorItems::None)
    }
}

impl ErrorTree {
    pub(crate) fn from_instance(instance: &Instance<'_>) -> Self {
        let errors = instance
            .failure()
            .filter(|failure| !failure.is_aggregate())
            .cloned()
            .into_iter()
            .collect();

        let items = match instance.local() {
            Local::Sequence => {
                ErrorItems::Sequence(instance.children().iter().map(Self::from_instance).collect())
            }
            Local::Mapping => ErrorItems::Mapping(
                instance
                    .children()
                    .iter()
                    .filter_map(|child| {
                        let key = child.segment()?.as_key()?.to_string();
                        Some((key, Self::from_instance(child)))
                    })
                    .collect(),
            ),
            Local::Value(_) | Local::Failed => ErrorItems::None,
        };

        Self { errors, items }
    }

    /// Whether no failure is recorded anywhere in this tree.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Total failures recorded in this tree.
    pub fn count(&self) -> usize {
        let nested = match &self.items {
            ErrorItems::None => 0,
            ErrorItems::Sequence(items) => items.iter().map(ErrorTree::count).sum(),
            ErrorItems::Mapping(items) => items.values().map(ErrorTree::count).sum(),
        };
        self.errors.len() + nested
    }
}
