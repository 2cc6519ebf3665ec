//! The merged configuration tree and its provenance.

use crate::error::LayerfigError;
use crate::list::{self, ListOptions};
use crate::merge::{deep_merge, merge_maps};
use crate::path::{self, KeyPath};
use crate::provenance::Trace;
use crate::value::Value;

/// Write policy. `Unlocked` → `Locked` is one-way until [`ConfigStore::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    #[default]
    Unlocked,
    /// Writes are rejected; `raise` chooses an error over a logged warning.
    Locked { raise: bool },
}

/// Owns the merged tree (always a map at the root) and the trace beside it.
///
/// Not internally synchronized: serialize writers. Once locked, shared
/// `&ConfigStore` reads are safe from any thread.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    data: Value,
    trace: Trace,
    lock: LockState,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    pub fn new() -> Self {
        Self {
            data: Value::empty_map(),
            trace: Trace::new(),
            lock: LockState::Unlocked,
        }
    }

    /// Deep-merge `value` at `path`, recording `label` as its source.
    ///
    /// An empty path is a no-op. `"."` merges at the root, which only
    /// accepts maps. When locked, the write is dropped with a warning or
    /// rejected with [`LayerfigError::Locked`], depending on the lock mode.
    pub fn set(&mut self, path: &str, value: Value, label: &str) -> Result<(), LayerfigError> {
        if path.is_empty() {
            return Ok(());
        }
        if self.guard_locked(path)? {
            return Ok(());
        }

        let key_path = KeyPath::parse(path)?;
        let Value::Map(root) = &mut self.data else {
            return Err(LayerfigError::RootNotMap("non-map"));
        };

        match &key_path {
            KeyPath::Root => {
                let overlay = match value {
                    Value::Map(overlay) => overlay,
                    other => return Err(LayerfigError::RootNotMap(other.kind())),
                };
                self.trace.record("", label);
                *root = merge_maps(root, overlay, label, "", &mut self.trace);
            }
            KeyPath::Nested(segments) => {
                let Some((leaf, parents)) = segments.split_last() else {
                    return Err(LayerfigError::EmptyPath);
                };
                let parent = path::navigate_mut(root, parents, &key_path)?;
                let merged = deep_merge(
                    parent.get(leaf),
                    value,
                    label,
                    &key_path.trace_key(),
                    &mut self.trace,
                );
                parent.insert(leaf.clone(), merged);
            }
        }
        tracing::trace!(path, label, "applied config layer");
        Ok(())
    }

    /// Returns `Ok(true)` when the write should be silently dropped.
    fn guard_locked(&self, path: &str) -> Result<bool, LayerfigError> {
        match self.lock {
            LockState::Unlocked => Ok(false),
            LockState::Locked { raise: true } => Err(LayerfigError::Locked {
                path: path.to_string(),
            }),
            LockState::Locked { raise: false } => {
                tracing::warn!("config is locked; ignoring write to '{path}'");
                Ok(true)
            }
        }
    }

    /// Read the node at `path`. Empty paths and missing keys yield `None`;
    /// routing through a non-map is a [`LayerfigError::StructuralPath`].
    pub fn get(&self, path: &str) -> Result<Option<&Value>, LayerfigError> {
        if path.is_empty() {
            return Ok(None);
        }
        let key_path = KeyPath::parse(path)?;
        if key_path == KeyPath::Root {
            return Ok(Some(&self.data));
        }
        match &self.data {
            Value::Map(root) => path::lookup(root, &key_path),
            _ => Ok(None),
        }
    }

    /// Owned copy of the node at `path`, or `default` when absent.
    pub fn get_or(&self, path: &str, default: Value) -> Result<Value, LayerfigError> {
        Ok(self.get(path)?.cloned().unwrap_or(default))
    }

    /// Last writer label for `path` (`"a.b"` or `".a.b"`).
    pub fn trace(&self, path: &str) -> Option<&str> {
        self.trace.get(path)
    }

    pub fn trace_map(&self) -> &Trace {
        &self.trace
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Freeze the store. `raise` selects error-on-write over warn-and-ignore.
    ///
    /// The tree is never handed out mutably, so freezing is a state change
    /// rather than a walk over the nodes.
    pub fn lock(&mut self, raise: bool) {
        self.lock = LockState::Locked { raise };
    }

    pub fn lock_state(&self) -> LockState {
        self.lock
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.lock, LockState::Locked { .. })
    }

    /// Back to an empty, unlocked store.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn list(&self, opts: &ListOptions, sink: &mut dyn FnMut(&str)) {
        list::render(&self.data, &self.trace, opts, sink);
    }
}
