//! Collection registry
//!
//! Maps collection names to live collections and guarantees at most one
//! instance per name.
//!
//! Every directory mutation happens under one mutex, but no store I/O does.
//! A create first claims its name, loads with the lock released, then
//! publishes the collection. A name that is still loading is taken for other
//! creates and absent for lookups. Closing runs after the entry has been
//! unlinked and the lock dropped.

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use stash_core::{Document, Error, Result, TextDocument};
use stash_storage::{BlobStore, FileStore, StorageCodec};
use tracing::{info, warn};

use crate::collection::{validate_collection_name, Collection};
use crate::config::{StashConfig, CONFIG_FILE_NAME};

// =============================================================================
// Type erasure
// =============================================================================

/// Document-type-agnostic view of a collection, as stored by the registry.
pub trait ManagedCollection: Send + Sync + 'static {
    /// Collection name
    fn name(&self) -> &str;

    /// Rust type name of the stored documents
    fn document_type(&self) -> &'static str;

    /// See [`Collection::save_now`]
    fn save_now(&self) -> Result<()>;

    /// See [`Collection::clear`]
    fn clear(&self, save_immediately: bool);

    /// See [`Collection::close`]
    fn close(&self);

    /// See [`Collection::flush`]
    fn flush(&self);

    /// Upcast for downcasting back to `Collection<D>`.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<D: Document> ManagedCollection for Collection<D> {
    fn name(&self) -> &str {
        Collection::name(self)
    }

    fn document_type(&self) -> &'static str {
        std::any::type_name::<D>()
    }

    fn save_now(&self) -> Result<()> {
        Collection::save_now(self)
    }

    fn clear(&self, save_immediately: bool) {
        Collection::clear(self, save_immediately)
    }

    fn close(&self) {
        Collection::close(self)
    }

    fn flush(&self) {
        Collection::flush(self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

// =============================================================================
// Registry
// =============================================================================

static GLOBAL: OnceCell<Registry> = OnceCell::new();

#[derive(Default)]
struct Directory {
    live: HashMap<String, Arc<dyn ManagedCollection>>,
    /// Names claimed by a create that is still loading
    loading: HashSet<String>,
}

impl Directory {
    fn is_taken(&self, name: &str) -> bool {
        self.live.contains_key(name) || self.loading.contains(name)
    }

    fn snapshot(&self) -> Vec<Arc<dyn ManagedCollection>> {
        self.live.values().cloned().collect()
    }
}

/// A name reserved by a create in progress.
///
/// Dropped without [`LoadingClaim::publish`], the reservation is released.
struct LoadingClaim<'a> {
    directory: &'a Mutex<Directory>,
    name: &'a str,
    published: bool,
}

impl<'a> LoadingClaim<'a> {
    /// Reserve `name`, or `None` if it is registered or being loaded.
    fn acquire(directory: &'a Mutex<Directory>, name: &'a str) -> Option<Self> {
        let mut guard = directory.lock();
        if guard.is_taken(name) {
            return None;
        }
        guard.loading.insert(name.to_string());
        Some(LoadingClaim {
            directory,
            name,
            published: false,
        })
    }

    /// Swap the reservation for the live entry in one critical section.
    fn publish(mut self, collection: Arc<dyn ManagedCollection>) {
        let mut guard = self.directory.lock();
        guard.loading.remove(self.name);
        guard.live.insert(self.name.to_string(), collection);
        self.published = true;
    }
}

impl Drop for LoadingClaim<'_> {
    fn drop(&mut self) {
        if !self.published {
            self.directory.lock().loading.remove(self.name);
        }
    }
}

/// Name -> collection directory sharing one store, codec and config.
pub struct Registry {
    store: Arc<dyn BlobStore>,
    codec: Arc<dyn StorageCodec>,
    config: StashConfig,
    directory: Mutex<Directory>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("store", &self.store.describe())
            .field("codec", &self.codec.codec_id())
            .field("collections", &self.names())
            .finish()
    }
}

impl Registry {
    /// Registry persisting to files under `config.data_dir`.
    ///
    /// Creates the directory if needed. Does not read `stash.toml`; see
    /// [`Registry::open_dir`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an invalid codec setting and `Error::Io`
    /// if the data directory cannot be created.
    pub fn open(config: StashConfig) -> Result<Self> {
        let codec = config.build_codec()?;
        std::fs::create_dir_all(&config.data_dir)?;
        let store: Arc<dyn BlobStore> = Arc::new(FileStore::new(config.data_dir.clone()));

        info!(
            target: "stash::registry",
            data_dir = ?config.data_dir,
            codec = codec.codec_id(),
            save_delay_ms = config.save_delay_ms,
            "Registry opened"
        );
        Ok(Self::with_store(store, codec, config))
    }

    /// Open a data directory, reading (and on first use creating) its
    /// `stash.toml`.
    pub fn open_dir(path: impl AsRef<Path>) -> Result<Self> {
        let dir = path.as_ref();
        std::fs::create_dir_all(dir)?;
        let config_path = dir.join(CONFIG_FILE_NAME);
        StashConfig::write_default_if_missing(&config_path)?;
        Self::open(StashConfig::from_file(&config_path)?)
    }

    /// Registry over an arbitrary store.
    ///
    /// `config.data_dir` and `config.codec` are informational here; only the
    /// save delay is used.
    pub fn with_store(
        store: Arc<dyn BlobStore>,
        codec: Arc<dyn StorageCodec>,
        config: StashConfig,
    ) -> Self {
        Registry {
            store,
            codec,
            config,
            directory: Mutex::new(Directory::default()),
        }
    }

    /// Process-wide registry.
    ///
    /// Built on first use from [`StashConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns the [`Registry::open`] error if the data directory cannot be
    /// used. Nothing is cached on failure; the next call tries again.
    pub fn global() -> Result<&'static Registry> {
        GLOBAL.get_or_try_init(|| Registry::open(StashConfig::from_env()))
    }

    /// Build the process-wide registry from `config`.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyInitialized` if the global registry already
    /// exists, including one built lazily by [`Registry::global`].
    pub fn init_global(config: StashConfig) -> Result<&'static Registry> {
        if GLOBAL.get().is_some() {
            return Err(Error::AlreadyInitialized);
        }
        let registry = Registry::open(config)?;
        GLOBAL
            .try_insert(registry)
            .map_err(|_| Error::AlreadyInitialized)
    }

    /// Settings this registry was built with
    pub fn config(&self) -> &StashConfig {
        &self.config
    }

    /// Store shared by every collection
    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    // =========================================================================
    // Lookup and creation
    // =========================================================================

    /// Create, load and register a text collection.
    ///
    /// # Errors
    ///
    /// See [`Registry::collection_of`].
    pub fn collection(&self, name: &str) -> Result<Arc<Collection<TextDocument>>> {
        self.collection_of::<TextDocument>(name)
    }

    /// Create a collection of `D` named `name`, load its stored state, and
    /// register it.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidCollectionName` if `name` cannot be a storage key
    /// - `Error::CollectionAlreadyExists` if `name` is registered or another
    ///   caller is still loading it
    /// - `Error::Load` if stored state exists but cannot be read; nothing is
    ///   registered in that case
    pub fn collection_of<D: Document>(&self, name: &str) -> Result<Arc<Collection<D>>> {
        validate_collection_name(name)?;

        let claim = LoadingClaim::acquire(&self.directory, name)
            .ok_or_else(|| Error::CollectionAlreadyExists(name.to_string()))?;

        let collection = Arc::new(Collection::<D>::new(
            name,
            Arc::clone(&self.store),
            Arc::clone(&self.codec),
            self.config.save_delay(),
        )?);
        collection.load()?;

        claim.publish(Arc::clone(&collection) as Arc<dyn ManagedCollection>);
        info!(
            target: "stash::registry",
            collection = name,
            documents = collection.len(),
            "Collection registered"
        );
        Ok(collection)
    }

    /// Registered text collection, if any. Never creates or loads.
    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection<TextDocument>>> {
        self.get_collection_of::<TextDocument>(name)
    }

    /// Registered collection of `D`, if any.
    ///
    /// A collection registered under `name` with a different document type
    /// is reported as `None`.
    pub fn get_collection_of<D: Document>(&self, name: &str) -> Option<Arc<Collection<D>>> {
        let entry = self.directory.lock().live.get(name).cloned()?;
        let actual = entry.document_type();
        match entry.into_any().downcast::<Collection<D>>() {
            Ok(collection) => Some(collection),
            Err(_) => {
                warn!(
                    target: "stash::registry",
                    collection = name,
                    expected = std::any::type_name::<D>(),
                    actual,
                    "Collection exists with a different document type"
                );
                None
            }
        }
    }

    /// Unregister `name` and close the instance.
    ///
    /// No final save is forced: a pending debounced save is dropped, saves
    /// already queued still run. Returns false if nothing was registered.
    pub fn release_collection(&self, name: &str) -> bool {
        let removed = self.directory.lock().live.remove(name);
        match removed {
            Some(collection) => {
                collection.close();
                info!(target: "stash::registry", collection = name, "Collection released");
                true
            }
            None => false,
        }
    }

    /// Empty the directory, then clear and close every collection it held.
    ///
    /// Each collection persists its empty state through its own queue before
    /// it closes. Creates still loading are not affected.
    pub fn reset(&self) {
        let drained: Vec<Arc<dyn ManagedCollection>> = self
            .directory
            .lock()
            .live
            .drain()
            .map(|(_, collection)| collection)
            .collect();
        let count = drained.len();
        for collection in drained {
            collection.clear(true);
            collection.close();
        }
        info!(target: "stash::registry", collections = count, "Registry reset");
    }

    /// `save_now` on every registered collection.
    ///
    /// Every collection is attempted; the first failure is returned.
    /// Collections closed behind the registry's back are skipped.
    pub fn save_all(&self) -> Result<()> {
        let snapshot = self.directory.lock().snapshot();

        let mut first_error = None;
        for collection in snapshot {
            match collection.save_now() {
                Ok(()) | Err(Error::CollectionClosed(_)) => {}
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Block until every registered collection's save queue is idle.
    pub fn flush_all(&self) {
        let snapshot = self.directory.lock().snapshot();
        for collection in snapshot {
            collection.flush();
        }
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.directory.lock().live.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered collections
    pub fn len(&self) -> usize {
        self.directory.lock().live.len()
    }

    /// Returns true if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.directory.lock().live.is_empty()
    }

    /// Returns true if `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.directory.lock().live.contains_key(name)
    }
}
