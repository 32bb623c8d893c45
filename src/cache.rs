//! A read-through cache for per-user reference data collections.
//!
//! Each cached list is identified by a [CacheKey] made up of the collection
//! and the owning user. Reads go through [CollectionCache::read_through] and
//! writes through [CollectionCache::mutate], which applies the change to the
//! cached list straight away, reverts it if the store rejects the write and
//! invalidates the key once the write succeeds.
//!
//! Every key has a generation that goes up whenever the key is mutated or
//! invalidated. A fetched list is only stored, and a snapshot only restored,
//! if the generation is still the one seen before the lock was released.

use std::{
    collections::HashMap,
    fmt::Display,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{Error, auth::UserID};

/// The reference data collections that are cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    People,
    Categories,
}

impl Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Collection::People => write!(f, "people"),
            Collection::Categories => write!(f, "categories"),
        }
    }
}

/// Identifies one cached list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub collection: Collection,
    pub owner: UserID,
}

#[derive(Debug)]
struct Entries<T> {
    lists: HashMap<CacheKey, Vec<T>>,
    generations: HashMap<CacheKey, u64>,
}

impl<T> Entries<T> {
    fn generation(&self, key: &CacheKey) -> u64 {
        self.generations.get(key).copied().unwrap_or_default()
    }

    fn bump(&mut self, key: CacheKey) -> u64 {
        let generation = self.generations.entry(key).or_default();
        *generation += 1;
        *generation
    }
}

/// Caches one list of `T` per owner for a single [Collection].
#[derive(Debug)]
pub struct CollectionCache<T> {
    collection: Collection,
    entries: Arc<Mutex<Entries<T>>>,
}

impl<T> Clone for CollectionCache<T> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection,
            entries: self.entries.clone(),
        }
    }
}

impl<T: Clone> CollectionCache<T> {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            entries: Arc::new(Mutex::new(Entries {
                lists: HashMap::new(),
                generations: HashMap::new(),
            })),
        }
    }

    pub fn key(&self, owner: UserID) -> CacheKey {
        CacheKey {
            collection: self.collection,
            owner,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Entries<T>>, Error> {
        self.entries
            .lock()
            .inspect_err(|error| {
                tracing::error!("could not acquire {} cache lock: {error}", self.collection)
            })
            .map_err(|_| Error::CacheLockError)
    }

    /// Return the cached list for `owner`, calling `fetch` to fill the cache on a miss.
    ///
    /// Errors from `fetch` are returned as is and nothing is cached. The
    /// fetched list is not cached either if the key was mutated or
    /// invalidated while `fetch` ran.
    pub fn read_through<F>(&self, owner: UserID, fetch: F) -> Result<Vec<T>, Error>
    where
        F: FnOnce() -> Result<Vec<T>, Error>,
    {
        let key = self.key(owner);

        let generation = {
            let entries = self.lock()?;
            if let Some(items) = entries.lists.get(&key) {
                tracing::debug!("cache hit for {} of user {}", key.collection, key.owner);
                return Ok(items.clone());
            }
            entries.generation(&key)
        };

        tracing::debug!("cache miss for {} of user {}", key.collection, key.owner);
        let items = fetch()?;

        let mut entries = self.lock()?;
        if entries.generation(&key) == generation {
            entries.lists.insert(key, items.clone());
        } else {
            tracing::debug!(
                "not caching {} of user {}, the key changed during the fetch",
                key.collection,
                key.owner
            );
        }

        Ok(items)
    }

    /// Optimistically apply a change to the cached list and then run `remote`.
    ///
    /// `apply_local` only runs if the list for `owner` is cached. If `remote`
    /// fails, the list is restored to how it was before `apply_local` ran and
    /// the error is returned, unless the key changed again in the meantime.
    /// If `remote` succeeds, the key is invalidated so the next read fetches
    /// the stored rows.
    pub fn mutate<L, R, O>(&self, owner: UserID, apply_local: L, remote: R) -> Result<O, Error>
    where
        L: FnOnce(&mut Vec<T>),
        R: FnOnce() -> Result<O, Error>,
    {
        let key = self.key(owner);

        let (snapshot, generation) = {
            let mut entries = self.lock()?;
            let generation = entries.bump(key);
            let snapshot = entries.lists.get_mut(&key).map(|items| {
                let snapshot = items.clone();
                apply_local(items);
                snapshot
            });
            (snapshot, generation)
        };

        match remote() {
            Ok(output) => {
                let mut entries = self.lock()?;
                entries.lists.remove(&key);
                entries.bump(key);
                Ok(output)
            }
            Err(error) => {
                let mut entries = self.lock()?;
                match snapshot {
                    Some(snapshot) if entries.generation(&key) == generation => {
                        tracing::debug!(
                            "reverting {} cache of user {} after failed write: {error}",
                            key.collection,
                            key.owner
                        );
                        entries.lists.insert(key, snapshot);
                    }
                    Some(_) => {
                        entries.lists.remove(&key);
                    }
                    None => {}
                }
                Err(error)
            }
        }
    }

    /// Drop the cached list for `owner`.
    pub fn invalidate(&self, owner: UserID) -> Result<(), Error> {
        let key = self.key(owner);
        let mut entries = self.lock()?;
        entries.lists.remove(&key);
        entries.bump(key);

        Ok(())
    }

    /// Peek at the cached list for `owner` without fetching.
    #[cfg(test)]
    pub fn get(&self, owner: UserID) -> Option<Vec<T>> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.lists.get(&self.key(owner)).cloned())
    }
}
