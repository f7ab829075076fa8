//! Principal-scoped directory cache.
//!
//! A [`DirectorySession`] remembers successful lookups made on behalf of one
//! principal. Entries live as long as the session. Failed lookups are never
//! remembered.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::services::person_directory::{
    DirectoryError, FamilyRelations, PersonDirectory, PersonInfo,
};

/// Builds a cache key from `(principal, ident)`.
pub type CacheKeyFn = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Which kind of caller opened a session.
///
/// The scope is a label for logs. It does not change caching: entries live
/// exactly as long as the [`DirectorySession`] value that holds them, so the
/// lifetime is decided by whoever owns the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheScope {
    /// One session per lifecycle call.
    #[default]
    Operation,
    /// The caller opens a session and passes it to several calls.
    Session,
}

fn default_key(principal: &str, ident: &str) -> String {
    format!("{principal}:{ident}")
}

/// Directory view of one principal.
#[derive(Clone)]
pub struct DirectorySession {
    principal: String,
    scope: CacheScope,
    directory: Arc<dyn PersonDirectory>,
    key_fn: CacheKeyFn,
    families: Arc<RwLock<HashMap<String, FamilyRelations>>>,
    persons: Arc<RwLock<HashMap<String, PersonInfo>>>,
}

impl DirectorySession {
    /// Open a session with the default key function.
    #[must_use]
    pub fn new(principal: impl Into<String>, directory: Arc<dyn PersonDirectory>) -> Self {
        Self::with_key_fn(principal, directory, Arc::new(default_key))
    }

    /// Open a session with a custom key function.
    #[must_use]
    pub fn with_key_fn(
        principal: impl Into<String>,
        directory: Arc<dyn PersonDirectory>,
        key_fn: CacheKeyFn,
    ) -> Self {
        Self {
            principal: principal.into(),
            scope: CacheScope::Session,
            directory,
            key_fn,
            families: Arc::new(RwLock::new(HashMap::new())),
            persons: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Label the session. Caching behaves the same for every scope.
    #[must_use]
    pub fn with_scope(mut self, scope: CacheScope) -> Self {
        self.scope = scope;
        self
    }

    /// The label given by [`Self::with_scope`].
    #[must_use]
    pub const fn scope(&self) -> CacheScope {
        self.scope
    }

    /// The principal this session acts for.
    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    fn key(&self, ident: &str) -> String {
        (self.key_fn)(&self.principal, ident)
    }

    /// Family relations of `ident`, fetched at most once per session.
    pub async fn family(&self, ident: &str) -> Result<FamilyRelations, DirectoryError> {
        let key = self.key(ident);
        if let Some(cached) = self.families.read().await.get(&key) {
            return Ok(cached.clone());
        }

        let fetched = self.directory.fetch_family(ident).await?;
        self.families.write().await.insert(key, fetched.clone());
        Ok(fetched)
    }

    /// Person info of `ident`, fetched at most once per session.
    pub async fn person_info(&self, ident: &str) -> Result<PersonInfo, DirectoryError> {
        let key = self.key(ident);
        if let Some(cached) = self.persons.read().await.get(&key) {
            return Ok(cached.clone());
        }

        let fetched = self.directory.fetch_person_info(ident).await?;
        self.persons.write().await.insert(key, fetched.clone());
        Ok(fetched)
    }

    /// Number of remembered lookups.
    pub async fn cached_entries(&self) -> usize {
        self.families.read().await.len() + self.persons.read().await.len()
    }
}

impl std::fmt::Debug for DirectorySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorySession")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
