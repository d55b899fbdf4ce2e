//! Planning of the JSON Patch that converges a policy object to a desired
//! state.
//!
//! The builder walks the desired fields in the caller's order and emits only
//! the operations needed for the fields the caller named. Every operation is
//! mirrored onto an owned copy of the document as soon as it is emitted, so
//! that later comparisons in the same pass see the cumulative state.

use json_patch::{
    jsonptr::PointerBuf, AddOperation, Patch, PatchOperation, RemoveOperation, ReplaceOperation,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    desired::{Desired, DesiredFieldSet},
    document::{Document, FieldPath},
    schema::{FieldKind, PolicySchema, SectionRule},
    Result,
};

/// The operations of one reconciliation pass, and the document as it looks
/// after applying them.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchPlan {
    pub ops: Patch,
    pub document: Document,
}

impl PatchPlan {
    pub fn empty(document: Document) -> Self {
        PatchPlan {
            ops: Patch(Vec::new()),
            document,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.0.len()
    }
}

/// The pointer of the object at `index` in the collection at `collection`.
pub fn object_pointer(collection: &PointerBuf, index: usize) -> PointerBuf {
    let mut pointer = collection.clone();
    pointer.push_back(index.to_string());
    pointer
}

/// Accumulates operations and keeps the working document in step.
struct Pass<'b> {
    base: &'b PointerBuf,
    document: Document,
    ops: Vec<PatchOperation>,
}

impl Pass<'_> {
    fn add(&mut self, path: &FieldPath, value: Value) {
        let pointer = path.pointer_from(self.base);
        debug!(path = %pointer, "add");
        self.ops.push(PatchOperation::Add(AddOperation {
            path: pointer,
            value: value.clone(),
        }));
        self.document.set(path, value);
    }

    fn remove(&mut self, path: &FieldPath) {
        let pointer = path.pointer_from(self.base);
        debug!(path = %pointer, "remove");
        self.ops
            .push(PatchOperation::Remove(RemoveOperation { path: pointer }));
        self.document.remove(path);
    }

    /// Replace the leaf unless it already holds `value`. An absent leaf
    /// counts as different.
    fn replace_if_changed(&mut self, path: &FieldPath, value: Value) {
        if self.document.get(path) == Some(&value) {
            return;
        }
        let pointer = path.pointer_from(self.base);
        debug!(path = %pointer, %value, "replace");
        self.ops.push(PatchOperation::Replace(ReplaceOperation {
            path: pointer,
            value: value.clone(),
        }));
        self.document.set(path, value);
    }

    fn finish(self) -> PatchPlan {
        PatchPlan {
            ops: Patch(self.ops),
            document: self.document,
        }
    }
}

pub struct PatchBuilder<'s> {
    schema: &'s PolicySchema,
}

impl<'s> PatchBuilder<'s> {
    pub fn new(schema: &'s PolicySchema) -> Self {
        PatchBuilder { schema }
    }

    /// Plan the update of an existing object located at `base`.
    pub fn update(
        &self,
        current: &Document,
        desired: &DesiredFieldSet,
        base: &PointerBuf,
    ) -> Result<PatchPlan> {
        self.schema.validate(desired)?;
        let mut pass = Pass {
            base,
            document: current.clone(),
            ops: Vec::new(),
        };
        let mut visited: Vec<&str> = Vec::new();

        for (path, want) in desired.entries() {
            let section = match path.section() {
                Some(name) => self.schema.section(name),
                None => self.schema.section(path.head()),
            };
            match section {
                Some(rule) => {
                    if visited.contains(&rule.name) {
                        continue;
                    }
                    visited.push(rule.name);
                    self.update_section(&mut pass, rule, desired)?;
                }
                None => self.update_field(&mut pass, path, want)?,
            }
        }
        Ok(pass.finish())
    }

    fn update_field(&self, pass: &mut Pass<'_>, path: &FieldPath, want: &Desired) -> Result<()> {
        match want {
            Desired::Unset => {}
            Desired::Remove => {
                if pass.document.contains(path) {
                    pass.remove(path);
                }
            }
            Desired::Set(value) => {
                let rule = self.schema.rule(path)?;
                let value = rule.wire_value(value)?;
                if rule.kind == FieldKind::List {
                    if pass.document.get(path) != Some(&value) {
                        warn!(
                            field = rule.param,
                            "updating the entries of an existing list is not supported; leaving it unchanged"
                        );
                    }
                    return Ok(());
                }
                pass.replace_if_changed(path, value);
            }
        }
        Ok(())
    }

    /// Handle every desired field of one sub-section at the position where
    /// the section is first mentioned.
    fn update_section(
        &self,
        pass: &mut Pass<'_>,
        rule: &SectionRule,
        desired: &DesiredFieldSet,
    ) -> Result<()> {
        let section_path = FieldPath::leaf(rule.name);
        if matches!(desired.get(&section_path), Desired::Remove) {
            if pass.document.contains(&section_path) {
                pass.remove(&section_path);
            }
            return Ok(());
        }

        let values = self.section_values(rule, desired)?;
        if values.is_empty() {
            return Ok(());
        }

        if pass.document.section(rule.name).is_none() {
            let mut payload = Map::new();
            for (path, value) in values {
                payload.insert(path.last().to_string(), value);
            }
            for (field, literal) in rule.injected {
                payload.insert(field.to_string(), literal.to_value());
            }
            pass.add(&section_path, Value::Object(payload));
            return Ok(());
        }

        // Injected constants are reasserted whenever the section is touched,
        // so a stored section missing them is not idempotent.
        let injected = rule
            .injected
            .iter()
            .map(|(field, literal)| (FieldPath::nested(rule.name, field), literal.to_value()));
        for (path, value) in values.into_iter().chain(injected) {
            pass.replace_if_changed(&path, value);
        }
        Ok(())
    }

    /// Translated values supplied for the fields of a section, in order.
    fn section_values(
        &self,
        rule: &SectionRule,
        desired: &DesiredFieldSet,
    ) -> Result<Vec<(FieldPath, Value)>> {
        desired
            .section_values(rule.name)
            .map(|(path, value)| Ok((path.clone(), self.schema.wire_value(path, value)?)))
            .collect()
    }

    /// Plan the creation of a new object, appended to `collection`.
    ///
    /// `seed` carries fields that are only set on creation and are not part
    /// of the caller's parameters.
    pub fn create(
        &self,
        seed: Document,
        desired: &DesiredFieldSet,
        collection: &PointerBuf,
    ) -> Result<PatchPlan> {
        self.schema.validate(desired)?;
        let mut document = seed;
        for (path, want) in desired.entries() {
            if let Desired::Set(value) = want {
                document.set(path, self.schema.wire_value(path, value)?);
            }
        }
        for rule in self.schema.sections {
            if document.section(rule.name).is_none() {
                continue;
            }
            for (field, literal) in rule.injected {
                document.set(&FieldPath::nested(rule.name, field), literal.to_value());
            }
        }

        let mut pointer = collection.clone();
        pointer.push_back("-");
        debug!(path = %pointer, "add {}", self.schema.description);
        Ok(PatchPlan {
            ops: Patch(vec![PatchOperation::Add(AddOperation {
                path: pointer,
                value: document.clone().into_value(),
            })]),
            document,
        })
    }

    /// Plan the removal of the object at `object`.
    pub fn remove(&self, object: &PointerBuf) -> PatchPlan {
        debug!(path = %object, "remove {}", self.schema.description);
        PatchPlan {
            ops: Patch(vec![PatchOperation::Remove(RemoveOperation {
                path: object.clone(),
            })]),
            document: Document::new(),
        }
    }
}
