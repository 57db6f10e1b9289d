//! The environment variable map
//!
//! Holds raw (unresolved) values keyed by variable name and resolves
//! `${env:NAME}` references on demand. Resolution is depth-first and
//! memoizing: each entry caches its resolved value until a write
//! invalidates it according to the configured [`InvalidationPolicy`].
//! Names missing from the map fall through to the injected
//! [`EnvironmentLookup`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::environment::{strip_nul_padding, EnvironmentLookup, ProcessEnvironment};
use crate::error::CycleError;
use crate::interpolation::{self, Segment};

/// Which memoized values a write clears
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidationPolicy {
    /// Clear the written key and every key that references it, transitively
    #[default]
    Dependents,
    /// Clear every memoized value
    All,
    /// Clear only the written key; dependents may keep stale values
    EntryOnly,
}

/// Options for building an [`EnvironmentVariableMap`]
#[derive(Debug, Clone, Default)]
pub struct MapOptions {
    /// How writes invalidate memoized resolved values
    pub invalidation: InvalidationPolicy,
}

#[derive(Debug, Clone)]
struct VariableEntry {
    raw_value: String,
    /// `None` until resolved; `Some("")` is a legitimate result
    resolved_value: Option<String>,
}

impl VariableEntry {
    fn new(raw_value: String) -> Self {
        Self {
            raw_value,
            resolved_value: None,
        }
    }
}

/// A key-ordered map of environment variables with lazy resolution
///
/// Resolution populates a cache, so the resolving accessors take
/// `&mut self`. Share a map between threads behind a single lock.
#[derive(Clone)]
pub struct EnvironmentVariableMap {
    entries: BTreeMap<String, VariableEntry>,
    lookup: Arc<dyn EnvironmentLookup>,
    options: MapOptions,
}

impl Default for EnvironmentVariableMap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EnvironmentVariableMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentVariableMap")
            .field("entries", &self.entries)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl EnvironmentVariableMap {
    /// Create an empty map backed by the process environment
    pub fn new() -> Self {
        Self::with_lookup_and_options(Arc::new(ProcessEnvironment), MapOptions::default())
    }

    /// Create an empty map with a custom host environment
    pub fn with_lookup(lookup: Arc<dyn EnvironmentLookup>) -> Self {
        Self::with_lookup_and_options(lookup, MapOptions::default())
    }

    /// Create an empty map backed by the process environment with custom options
    pub fn with_options(options: MapOptions) -> Self {
        Self::with_lookup_and_options(Arc::new(ProcessEnvironment), options)
    }

    /// Create an empty map with a custom host environment and options
    pub fn with_lookup_and_options(
        lookup: Arc<dyn EnvironmentLookup>,
        options: MapOptions,
    ) -> Self {
        Self {
            entries: BTreeMap::new(),
            lookup,
            options,
        }
    }

    /// The options this map was built with
    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    /// Insert or overwrite many raw values; later pairs win over earlier ones.
    ///
    /// Nothing is resolved while loading.
    pub fn load_raw<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in pairs {
            self.set_value(key, value);
        }
    }

    /// Insert or overwrite a single raw value
    pub fn set_value(&mut self, key: impl Into<String>, raw_value: impl Into<String>) {
        let key = key.into();
        self.entries
            .insert(key.clone(), VariableEntry::new(raw_value.into()));
        self.invalidate(&key);
    }

    /// Remove a variable, returning its raw value
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let removed = self.entries.remove(key)?;
        self.invalidate(key);
        Some(removed.raw_value)
    }

    /// Remove every variable
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Forget every memoized resolved value
    ///
    /// Useful after the host environment changed underneath the map.
    pub fn clear_cache(&mut self) {
        for entry in self.entries.values_mut() {
            entry.resolved_value = None;
        }
    }

    /// Number of variables in the map
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no variables
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` is defined in the map (the host environment is not consulted)
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Raw value of `key`, if defined
    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|e| e.raw_value.as_str())
    }

    /// Whether `key` currently has a memoized resolved value
    pub fn is_resolved(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|e| e.resolved_value.is_some())
    }

    /// All keys, in key order
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// All raw values, parallel to [`keys`](Self::keys)
    pub fn raw_values(&self) -> Vec<String> {
        self.entries.values().map(|e| e.raw_value.clone()).collect()
    }

    /// All resolved values, parallel to [`keys`](Self::keys)
    ///
    /// Resolves any entry that is not memoized yet.
    pub fn resolved_values(&mut self) -> Result<Vec<String>, CycleError> {
        let keys = self.keys();
        keys.iter().map(|key| self.resolve(key)).collect()
    }

    /// `(key, raw value)` pairs for persistence; resolved values are never included
    pub fn to_raw_pairs(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(k, e)| (k.clone(), e.raw_value.clone()))
            .collect()
    }

    /// Resolve every key and return a `key → resolved value` snapshot
    pub fn resolved_environment_variables(
        &mut self,
    ) -> Result<BTreeMap<String, String>, CycleError> {
        let keys = self.keys();
        let mut resolved = BTreeMap::new();
        for key in keys {
            let value = self.resolve(&key)?;
            resolved.insert(key, value);
        }
        Ok(resolved)
    }

    /// Resolve a single key
    ///
    /// Keys defined in the map have their references substituted
    /// recursively. Keys not defined in the map are read from the host
    /// environment; an unset variable resolves to the empty string.
    pub fn resolve(&mut self, key: &str) -> Result<String, CycleError> {
        let mut resolution_stack = Vec::new();
        self.resolve_with_stack(key, &mut resolution_stack)
    }

    fn resolve_with_stack(
        &mut self,
        key: &str,
        resolution_stack: &mut Vec<String>,
    ) -> Result<String, CycleError> {
        let raw = match self.entries.get(key) {
            Some(VariableEntry {
                resolved_value: Some(resolved),
                ..
            }) => return Ok(resolved.clone()),
            Some(entry) => entry.raw_value.clone(),
            None => return Ok(self.lookup_host(key)),
        };

        if resolution_stack.iter().any(|k| k == key) {
            let mut chain = resolution_stack.clone();
            chain.push(key.to_string());
            return Err(cycle(key, chain));
        }

        let resolved = if interpolation::contains_reference(&raw) {
            self.substitute(key, &raw, resolution_stack)?
        } else {
            raw
        };

        log::trace!("Resolved '{}'", key);
        if let Some(entry) = self.entries.get_mut(key) {
            entry.resolved_value = Some(resolved.clone());
        }
        Ok(resolved)
    }

    fn substitute(
        &mut self,
        key: &str,
        raw: &str,
        resolution_stack: &mut Vec<String>,
    ) -> Result<String, CycleError> {
        let mut resolved = String::with_capacity(raw.len());

        for segment in interpolation::parse(raw) {
            let name = match segment {
                Segment::Literal(text) => {
                    resolved.push_str(&text);
                    continue;
                }
                Segment::Reference(name) => name,
            };

            if name == key {
                let mut chain = resolution_stack.clone();
                chain.push(key.to_string());
                chain.push(key.to_string());
                return Err(cycle(key, chain));
            }

            resolution_stack.push(key.to_string());
            let result = self.resolve_with_stack(&name, resolution_stack);
            resolution_stack.pop();

            resolved.push_str(&result?);
        }

        Ok(resolved)
    }

    fn lookup_host(&self, name: &str) -> String {
        match self.lookup.lookup(name) {
            Some(value) => {
                log::trace!("'{}' not in map, using host environment", name);
                strip_nul_padding(&value).to_string()
            }
            None => {
                log::trace!("'{}' is not set anywhere, using empty string", name);
                String::new()
            }
        }
    }

    fn invalidate(&mut self, key: &str) {
        match self.options.invalidation {
            InvalidationPolicy::EntryOnly => {
                if let Some(entry) = self.entries.get_mut(key) {
                    entry.resolved_value = None;
                }
            }
            InvalidationPolicy::All => self.clear_cache(),
            InvalidationPolicy::Dependents => {
                let dirty = self.dependents_of(key);
                log::debug!(
                    "Invalidating {} cached value(s) after writing '{}'",
                    dirty.len(),
                    key
                );
                for name in dirty {
                    if let Some(entry) = self.entries.get_mut(&name) {
                        entry.resolved_value = None;
                    }
                }
            }
        }
    }

    /// `key` plus every key whose raw value reaches it through references
    fn dependents_of(&self, key: &str) -> BTreeSet<String> {
        let mut dirty = BTreeSet::from([key.to_string()]);
        let mut pending = vec![key.to_string()];

        while let Some(name) = pending.pop() {
            for (candidate, entry) in &self.entries {
                if !dirty.contains(candidate)
                    && interpolation::references_name(&entry.raw_value, &name)
                {
                    dirty.insert(candidate.clone());
                    pending.push(candidate.clone());
                }
            }
        }

        dirty
    }
}

fn cycle(key: &str, chain: Vec<String>) -> CycleError {
    log::warn!(
        "Circular reference detected while resolving '{}': {}",
        key,
        chain.join(" → ")
    );
    CycleError::new(key, chain)
}
