//! Call binding
//!
//! A callee's instance is expressed in the callee's own frame: slot 0 is its
//! return value and slots `1..` are its arguments. Binding rewrites that
//! instance into the caller's frame by replacing every slot with the operand
//! the caller passed for it and re-applying the callee's writes.

use super::{AllocId, BodyAnalyzer, Operand};
use crate::cache::BoundCall;
use crate::error::{to_source_span, InferenceError};
use crate::path::{Path, Value, RETURN_SLOT};
use crate::registry::DefId;
use crux_ast::{Selector, Span};
use tracing::trace;

impl BodyAnalyzer<'_> {
    /// Analyze `target` with the concrete types of `arguments` and bind the
    /// result into this frame.
    pub(super) fn bind_call(
        &mut self,
        method_name: &str,
        target: DefId,
        arguments: Vec<Operand>,
        span: Span,
    ) -> Result<Operand, InferenceError> {
        let arguments: Vec<Operand> = arguments
            .into_iter()
            .map(|argument| self.settle(argument))
            .collect();

        let mut argument_types = Vec::with_capacity(arguments.len());
        for argument in &arguments {
            argument_types.push(self.concrete_type(argument, span)?);
        }

        let instance = self.engine.analyze(target, &argument_types)?;

        // An object returned by value is new to this frame
        let fresh_return = match &instance.return_value {
            Value::Type(ty) => self.promote(*ty),
            Value::Path(_) => None,
        };

        // Writes go first so that a returned path reads the updated state
        for mutation in &instance.mutations {
            let root = mutation.target.root();
            let base = self.frame_slot(method_name, &arguments, fresh_return, root, span)?;
            let value = self.substitute_value(
                method_name,
                &arguments,
                fresh_return,
                &mutation.value,
                span,
            )?;
            self.write_at(base, mutation.target.selectors(), value, span)?;
        }

        let result = match (&instance.return_value, fresh_return) {
            (_, Some(id)) => self.settle(Operand::Fresh(id)),
            (Value::Type(ty), None) => Operand::Type(*ty),
            (Value::Path(path), None) => {
                self.substitute(method_name, &arguments, fresh_return, path, span)?
            }
        };

        let value = self.publish(&result, span)?;
        trace!(
            method = method_name,
            signature = %instance.signature.display(&self.engine.universe),
            value = %value.display(&self.engine.universe),
            "bound call"
        );
        self.calls.push(BoundCall {
            method_name: method_name.to_string(),
            target,
            signature: instance.signature.clone(),
            instance,
            value,
            span,
        });

        Ok(result)
    }

    /// Caller operand standing in for callee slot `root`
    fn frame_slot(
        &self,
        method_name: &str,
        arguments: &[Operand],
        fresh_return: Option<AllocId>,
        root: usize,
        span: Span,
    ) -> Result<Operand, InferenceError> {
        let operand = if root == RETURN_SLOT {
            fresh_return.map(Operand::Fresh)
        } else {
            root.checked_sub(1)
                .and_then(|index| arguments.get(index))
                .cloned()
        };
        operand
            .map(|operand| self.settle(operand))
            .ok_or_else(|| InferenceError::UnboundSlot {
                method_name: method_name.to_string(),
                slot: root,
                span: to_source_span(span),
            })
    }

    /// Rewrite a callee path into this frame by reading along its selectors
    fn substitute(
        &mut self,
        method_name: &str,
        arguments: &[Operand],
        fresh_return: Option<AllocId>,
        path: &Path,
        span: Span,
    ) -> Result<Operand, InferenceError> {
        let mut current =
            self.frame_slot(method_name, arguments, fresh_return, path.root(), span)?;
        for selector in path.selectors() {
            current = self.read_field(current, selector, span)?;
        }
        Ok(current)
    }

    fn substitute_value(
        &mut self,
        method_name: &str,
        arguments: &[Operand],
        fresh_return: Option<AllocId>,
        value: &Value,
        span: Span,
    ) -> Result<Operand, InferenceError> {
        match value {
            Value::Type(ty) => Ok(Operand::Type(*ty)),
            Value::Path(path) => self.substitute(method_name, arguments, fresh_return, path, span),
        }
    }

    /// `base.s1.s2...sn = value`
    fn write_at(
        &mut self,
        base: Operand,
        selectors: &[Selector],
        value: Operand,
        span: Span,
    ) -> Result<(), InferenceError> {
        let Some((last, prefix)) = selectors.split_last() else {
            return Ok(());
        };

        let mut current = base;
        for selector in prefix {
            current = self.read_field(current, selector, span)?;
        }
        self.write_field(current, last, value, span)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::InferenceEngine;
    use crux_ast::Program;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_slots_missing_from_the_call_are_errors() {
        let mut engine = InferenceEngine::new(&Program::new());
        let main = engine.registry().main();
        let mut analyzer = BodyAnalyzer::new(&mut engine, main, &[]);
        let int = Operand::Type(analyzer.engine.universe.primitive());
        let arguments = [int.clone()];

        let bound = analyzer.frame_slot("foo", &arguments, None, 1, Span::default());
        assert_eq!(bound.ok(), Some(int));

        let error = analyzer
            .frame_slot("foo", &arguments, None, 2, Span::default())
            .unwrap_err();
        assert!(matches!(
            error,
            InferenceError::UnboundSlot { ref method_name, slot: 2, .. } if method_name == "foo"
        ));

        let error = analyzer
            .frame_slot("foo", &arguments, None, RETURN_SLOT, Span::default())
            .unwrap_err();
        assert!(matches!(error, InferenceError::UnboundSlot { slot: 0, .. }));

        let error = analyzer
            .substitute(
                "foo",
                &arguments,
                None,
                &Path::with_selectors(3, ["@value"]),
                Span::default(),
            )
            .unwrap_err();
        assert!(matches!(error, InferenceError::UnboundSlot { slot: 3, .. }));
    }
}
