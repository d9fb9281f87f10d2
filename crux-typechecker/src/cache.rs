//! Per-definition signature cache
//!
//! Memoizes analysis results by argument-type signature. Entries are only ever
//! added within one inference run; a signature under analysis is held as an
//! in-progress marker so re-entry can be detected.

use crate::path::{Mutation, Value};
use crate::registry::DefId;
use crate::types::{TypeId, TypeUniverse};
use crux_ast::Span;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Definition name plus the concrete argument types it was called with
#[derive(Debug, Clone)]
pub struct Signature {
    pub def_name: String,
    pub argument_types: Vec<TypeId>,
}

impl Signature {
    pub fn new(def_name: impl Into<String>, argument_types: Vec<TypeId>) -> Self {
        Self {
            def_name: def_name.into(),
            argument_types,
        }
    }

    pub fn display<'u>(&'u self, universe: &'u TypeUniverse) -> SignatureDisplay<'u> {
        SignatureDisplay {
            signature: self,
            universe,
        }
    }

    /// Same definition name and structurally equal argument types
    pub fn matches(&self, other: &Signature, universe: &TypeUniverse) -> bool {
        self.def_name == other.def_name
            && universe.all_structurally_equal(&self.argument_types, &other.argument_types)
    }
}

pub struct SignatureDisplay<'u> {
    signature: &'u Signature,
    universe: &'u TypeUniverse,
}

impl fmt::Display for SignatureDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.signature.def_name)?;
        for (index, argument) in self.signature.argument_types.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.universe.display(*argument))?;
        }
        write!(f, ")")
    }
}

/// Memoized analysis of one definition under one signature
#[derive(Debug)]
pub struct Instance {
    pub signature: Signature,
    /// Concrete type, or a path rooted at a parameter slot (never slot 0)
    pub return_value: Value,
    /// Writes in source order; targets are rooted at a parameter or slot 0
    pub mutations: Vec<Mutation>,
    /// Every call bound while analyzing this body, in evaluation order
    pub calls: Vec<BoundCall>,
}

impl Instance {
    pub fn last_call(&self) -> Option<&BoundCall> {
        self.calls.last()
    }
}

/// Result of binding one call expression
#[derive(Debug, Clone)]
pub struct BoundCall {
    pub method_name: String,
    pub target: DefId,
    pub signature: Signature,
    /// The callee's memoized analysis, in the callee's own frame
    pub instance: Rc<Instance>,
    /// The call's value rewritten into the caller's frame
    pub value: Value,
    pub span: Span,
}

/// Outcome of probing the cache
#[derive(Debug, Clone)]
pub enum CacheLookup {
    Hit(Rc<Instance>),
    InProgress,
    Miss,
}

#[derive(Debug)]
enum EntryState {
    InProgress,
    Complete(Rc<Instance>),
}

#[derive(Debug)]
struct CacheEntry {
    argument_types: Vec<TypeId>,
    state: EntryState,
}

/// Cache performance statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub recursive_entries: usize,
}

/// Signature-keyed memo table owned by a single definition
#[derive(Debug, Default)]
pub struct SignatureCache {
    /// Entries bucketed by the combined fingerprint of their argument types
    buckets: HashMap<u64, Vec<CacheEntry>>,
    stats: CacheStats,
}

impl SignatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe for `argument_types`, updating statistics
    pub fn lookup(&mut self, universe: &TypeUniverse, argument_types: &[TypeId]) -> CacheLookup {
        let result = match self.find(universe, argument_types) {
            Some(EntryState::Complete(instance)) => CacheLookup::Hit(Rc::clone(instance)),
            Some(EntryState::InProgress) => CacheLookup::InProgress,
            None => CacheLookup::Miss,
        };

        match result {
            CacheLookup::Hit(_) => self.stats.cache_hits += 1,
            CacheLookup::InProgress => self.stats.recursive_entries += 1,
            CacheLookup::Miss => self.stats.cache_misses += 1,
        }
        result
    }

    /// The completed instance for `argument_types`, without touching statistics
    pub fn get(&self, universe: &TypeUniverse, argument_types: &[TypeId]) -> Option<Rc<Instance>> {
        match self.find(universe, argument_types) {
            Some(EntryState::Complete(instance)) => Some(Rc::clone(instance)),
            _ => None,
        }
    }

    /// Mark `argument_types` as under analysis
    pub fn begin(&mut self, universe: &TypeUniverse, argument_types: &[TypeId]) {
        let key = Self::key(universe, argument_types);
        self.buckets.entry(key).or_default().push(CacheEntry {
            argument_types: argument_types.to_vec(),
            state: EntryState::InProgress,
        });
    }

    /// Replace the in-progress marker with the finished instance
    pub fn complete(
        &mut self,
        universe: &TypeUniverse,
        argument_types: &[TypeId],
        instance: Rc<Instance>,
    ) {
        if let Some(entry) = self.in_progress_entry(universe, argument_types) {
            entry.state = EntryState::Complete(instance);
        }
    }

    /// Drop the in-progress marker of a failed analysis
    pub fn abandon(&mut self, universe: &TypeUniverse, argument_types: &[TypeId]) {
        let key = Self::key(universe, argument_types);
        if let Some(bucket) = self.buckets.get_mut(&key) {
            bucket.retain(|entry| {
                !(matches!(entry.state, EntryState::InProgress)
                    && universe.all_structurally_equal(&entry.argument_types, argument_types))
            });
        }
    }

    /// Completed instances, in no particular order
    pub fn instances(&self) -> impl Iterator<Item = &Rc<Instance>> {
        self.buckets
            .values()
            .flatten()
            .filter_map(|entry| match &entry.state {
                EntryState::Complete(instance) => Some(instance),
                EntryState::InProgress => None,
            })
    }

    /// Number of completed instances
    pub fn len(&self) -> usize {
        self.instances().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn find(&self, universe: &TypeUniverse, argument_types: &[TypeId]) -> Option<&EntryState> {
        let key = Self::key(universe, argument_types);
        self.buckets
            .get(&key)?
            .iter()
            .find(|entry| universe.all_structurally_equal(&entry.argument_types, argument_types))
            .map(|entry| &entry.state)
    }

    fn in_progress_entry(
        &mut self,
        universe: &TypeUniverse,
        argument_types: &[TypeId],
    ) -> Option<&mut CacheEntry> {
        let key = Self::key(universe, argument_types);
        self.buckets.get_mut(&key)?.iter_mut().find(|entry| {
            matches!(entry.state, EntryState::InProgress)
                && universe.all_structurally_equal(&entry.argument_types, argument_types)
        })
    }

    fn key(universe: &TypeUniverse, argument_types: &[TypeId]) -> u64 {
        argument_types.iter().fold(argument_types.len() as u64, |acc, id| {
            acc.rotate_left(7) ^ universe.fingerprint(*id)
        })
    }
}
