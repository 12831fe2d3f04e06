//! Validation instances: the per-run result tree.

use crate::errors::{Failure, ValidationErrors};
use crate::path::Segment;
use crate::report::{ErrorTree, Errors};
use crate::validate::aggregate;
use dictum_core::{Decoded, Schema};
use serde_json::Value;
use indexmap::IndexMap;

/// What decoding produced at one node, before looking at children.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Local {
    /// Scalar value, or null at a nullable node
    Value(Decoded),
    Sequence,
    Mapping,
    Failed,
}

/// The result of matching one schema node against one raw value.
///
/// An instance tree mirrors the schema tree restricted to the nodes the
/// input actually reached. It borrows both the schema and the input, is
/// built in a single `validate` call and is never modified afterwards.
#[derive(Debug, Clone)]
pub struct Instance<'a> {
    schema: Option<&'a Schema>,
    raw: Option<&'a Value>,
    segment: Option<Segment>,
    local: Local,
    children: Vec<Instance<'a>>,
    valid: bool,
    failure: Option<Failure>,
}

impl<'a> Instance<'a> {
    /// Node whose local decode failed; it never has children.
    pub(crate) fn failed(
        schema: Option<&'a Schema>,
        raw: Option<&'a Value>,
        segment: Option<Segment>,
        failure: Failure,
    ) -> Self {
        Self {
            schema,
            raw,
            segment,
            local: Local::Failed,
            children: Vec::new(),
            valid: false,
            failure: Some(failure),
        }
    }

    pub(crate) fn decoded(
        schema: &'a Schema,
        raw: &'a Value,
        segment: Option<Segment>,
        value: Decoded,
    ) -> Self {
        Self {
            schema: Some(schema),
            raw: Some(raw),
            segment,
            local: Local::Value(value),
            children: Vec::new(),
            valid: true,
            failure: None,
        }
    }

    /// Container node. `local_failure` is a constraint on the container
    /// itself (such as its length) that failed even though its shape was
    /// right; children are kept either way.
    pub(crate) fn container(
        schema: &'a Schema,
        raw: &'a Value,
        segment: Option<Segment>,
        local: Local,
        local_failure: Option<Failure>,
        children: Vec<Instance<'a>>,
    ) -> Self {
        let valid = aggregate(local_failure.is_none(), &children);
        let failure = match local_failure {
            Some(failure) => Some(failure),
            None if !valid => Some(Failure::Aggregate),
            None => None,
        };

        Self {
            schema: Some(schema),
            raw: Some(raw),
            segment,
            local,
            children,
            valid,
            failure,
        }
    }

    /// The schema node this instance was matched against. `None` only for
    /// keys rejected by a strict mapping.
    pub fn schema(&self) -> Option<&'a Schema> {
        self.schema
    }

    /// The raw input at this node. `None` for a missing field.
    pub fn raw(&self) -> Option<&'a Value> {
        self.raw
    }

    /// Position relative to the parent; `None` at the root.
    pub fn segment(&self) -> Option<&Segment> {
        self.segment.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The local failure, or [`Failure::Aggregate`] when only children failed.
    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Whether decoding succeeded at this node, regardless of children.
    pub fn decoded_locally(&self) -> bool {
        !matches!(self.local, Local::Failed)
            && !self.failure.as_ref().is_some_and(|f| !f.is_aggregate())
    }

    pub fn children(&self) -> &[Instance<'a>] {
        &self.children
    }

    /// Child instance for a mapping field or dictionary key.
    pub fn field(&self, key: &str) -> Option<&Instance<'a>> {
        self.children
            .iter()
            .find(|child| child.segment.as_ref().and_then(Segment::as_key) == Some(key))
    }

    /// Child instance for a sequence position.
    pub fn item(&self, index: usize) -> Option<&Instance<'a>> {
        self.children
            .iter()
            .find(|child| child.segment.as_ref().and_then(Segment::as_index) == Some(index))
    }

    /// The decoded value, present only when this node and all its
    /// descendants are valid.
    ///
    /// Composite values are assembled from the children: sequences keep
    /// input order, mappings hold one entry per present field in
    /// visitation order.
    pub fn value(&self) -> Option<Decoded> {
        if !self.valid {
            return None;
        }

        match &self.local {
            Local::Value(value) => Some(value.clone()),
            Local::Sequence => self
                .children
                .iter()
                .map(Instance::value)
                .collect::<Option<Vec<_>>>()
                .map(Decoded::Sequence),
            Local::Mapping => self
                .children
                .iter()
                .map(|child| {
                    let key = child.segment.as_ref()?.as_key()?.to_string();
                    Some((key, child.value()?))
                })
                .collect::<Option<IndexMap<_, _>>>()
                .map(Decoded::Mapping),
            Local::Failed => None,
        }
    }

    /// Lazily walk every located failure, in visitation order.
    pub fn errors(&self) -> Errors<'_, 'a> {
        Errors::new(self)
    }

    pub fn validation_errors(&self) -> ValidationErrors {
        self.errors().collect()
    }

    /// Nested failure report mirroring the instance tree.
    pub fn error_tree(&self) -> ErrorTree {
        ErrorTree::from_instance(self)
    }

    /// The decoded value, or every failure found.
    pub fn into_result(self) -> Result<Decoded, ValidationErrors> {
        match self.value() {
            Some(value) => Ok(value),
            None => Err(self.validation_errors()),
        }
    }

    pub(crate) fn local(&self) -> &Local {
        &self.local
    }
}
