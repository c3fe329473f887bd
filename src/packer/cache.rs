use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use crate::core::{AlignmentClass, PackError};

/// Normalized cache key: `(schema qualifier, bare type with modifier)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeKey {
    pub schema: Option<String>,
    pub type_name: String,
}

/// Classification results shared by every table a session reorders.
///
/// The lock is held while an entry is resolved, so each key is resolved at
/// most once even when several threads classify the same type.
#[derive(Debug, Default)]
pub struct TypeAlignmentCache {
    entries: Mutex<HashMap<TypeKey, AlignmentClass>>,
}

impl TypeAlignmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached class for `key`, or runs `resolve` and stores its
    /// result. Failures are not cached.
    pub fn get_or_resolve<F>(&self, key: TypeKey, resolve: F) -> Result<AlignmentClass, PackError>
    where
        F: FnOnce(&TypeKey) -> Result<AlignmentClass, PackError>,
    {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(class) = entries.get(&key) {
            return Ok(*class);
        }

        let class = resolve(&key)?;
        entries.insert(key, class);
        Ok(class)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reset(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
