//! Frame repair before a parameter-reachable field is overwritten
//!
//! Once `x.value` is reassigned, the object that used to live there is no
//! longer reachable through `$1.@value`. Allocations that had escaped to that
//! location become frame-local again, and operands that named it by path are
//! rebound to a snapshot of the old contents.

use super::{AllocId, BodyAnalyzer, Operand};
use crate::error::InferenceError;
use crate::path::Path;
use crate::types::TypeId;
use crux_ast::{Selector, Span};
use indexmap::IndexMap;

impl BodyAnalyzer<'_> {
    /// Detach everything at or below `target`.
    ///
    /// Must run while the slot types still describe the old contents. Returns
    /// `value` rebound the same way when it referred into them.
    pub(super) fn detach(
        &mut self,
        target: &Path,
        value: Operand,
        span: Span,
    ) -> Result<Operand, InferenceError> {
        let detached: Vec<(AllocId, Path)> = self
            .allocations
            .iter()
            .enumerate()
            .filter_map(|(id, allocation)| match &allocation.escaped {
                Some(path) if path.starts_with(target) => Some((id, path.clone())),
                _ => None,
            })
            .collect();
        let stale_locals: Vec<(String, Path)> = self
            .locals
            .iter()
            .filter_map(|(name, operand)| match operand {
                Operand::Path(path) if path.starts_with(target) => {
                    Some((name.clone(), path.clone()))
                }
                _ => None,
            })
            .collect();
        let stale_value = match &value {
            Operand::Path(path) if path.starts_with(target) => Some(path.clone()),
            _ => None,
        };

        if detached.is_empty()
            && stale_locals.is_empty()
            && stale_value.is_none()
            && self.stale_fields(target).is_empty()
        {
            return Ok(value);
        }

        let mut rebuilt = Vec::with_capacity(detached.len());
        for (id, path) in &detached {
            let fields = self.snapshot_fields(Some(*id), path, target, &detached, span)?;
            rebuilt.push((*id, fields));
        }
        let root = self.snapshot(target, target, &detached, span)?;

        for (id, fields) in rebuilt {
            let allocation = &mut self.allocations[id];
            allocation.fields = fields;
            allocation.escaped = None;
        }
        for (name, path) in stale_locals {
            let operand = self.reread(&root, target, &path, span)?;
            self.locals.insert(name, operand);
        }
        for (id, selector, path) in self.stale_fields(target) {
            let operand = self.reread(&root, target, &path, span)?;
            self.allocations[id].fields.insert(selector, operand);
        }

        match stale_value {
            Some(path) => self.reread(&root, target, &path, span),
            None => Ok(value),
        }
    }

    /// Allocation fields holding a path at or below `target`
    fn stale_fields(&self, target: &Path) -> Vec<(AllocId, Selector, Path)> {
        let mut stale = Vec::new();
        for (id, allocation) in self.allocations.iter().enumerate() {
            for (selector, operand) in &allocation.fields {
                if let Operand::Path(path) = operand {
                    if path.starts_with(target) {
                        stale.push((id, selector.clone(), path.clone()));
                    }
                }
            }
        }
        stale
    }

    /// Frame-local copy of the object currently at `path`, reusing the
    /// allocations detached from it
    fn snapshot(
        &mut self,
        path: &Path,
        target: &Path,
        detached: &[(AllocId, Path)],
        span: Span,
    ) -> Result<Operand, InferenceError> {
        if let Some((id, _)) = detached.iter().find(|(_, escaped)| escaped == path) {
            return Ok(Operand::Fresh(*id));
        }

        let ty = self.path_type(path, span)?;
        let Some(class_name) = self.engine.universe.object_name(ty).map(str::to_string) else {
            return Ok(Operand::Type(ty));
        };
        let fields = self.snapshot_fields(None, path, target, detached, span)?;
        Ok(Operand::Fresh(self.new_allocation(&class_name, fields)))
    }

    fn snapshot_fields(
        &mut self,
        existing: Option<AllocId>,
        path: &Path,
        target: &Path,
        detached: &[(AllocId, Path)],
        span: Span,
    ) -> Result<IndexMap<Selector, Operand>, InferenceError> {
        let ty = self.path_type(path, span)?;
        let bindings: Vec<(Selector, TypeId)> = self
            .engine
            .universe
            .fields(ty)
            .map(|(selector, field_type)| (selector.clone(), field_type))
            .collect();

        let mut fields = IndexMap::with_capacity(bindings.len());
        for (selector, field_type) in bindings {
            let child = path.child(selector.clone());
            let operand = if detached.iter().any(|(_, escaped)| escaped.starts_with(&child)) {
                self.snapshot(&child, target, detached, span)?
            } else {
                let previous = existing
                    .and_then(|id| self.allocations[id].fields.get(&selector).cloned());
                match previous {
                    Some(operand) => {
                        if self.still_holds(&operand, field_type, target, span)? {
                            operand
                        } else {
                            Operand::Type(field_type)
                        }
                    }
                    None => Operand::Type(field_type),
                }
            };
            fields.insert(selector, operand);
        }
        Ok(fields)
    }

    /// Whether a field operand recorded before escaping still describes the
    /// field's current type
    fn still_holds(
        &mut self,
        operand: &Operand,
        field_type: TypeId,
        target: &Path,
        span: Span,
    ) -> Result<bool, InferenceError> {
        if let Operand::Path(path) = operand {
            if path.starts_with(target) {
                return Ok(false);
            }
        }
        let current = self.concrete_type(operand, span)?;
        Ok(self.engine.universe.structurally_equal(current, field_type))
    }

    /// Follow the part of `path` below `target` from the snapshot `root`
    fn reread(
        &mut self,
        root: &Operand,
        target: &Path,
        path: &Path,
        span: Span,
    ) -> Result<Operand, InferenceError> {
        let mut operand = root.clone();
        for selector in &path.selectors()[target.selectors().len()..] {
            operand = self.read_field(operand, selector, span)?;
        }
        Ok(operand)
    }
}
