//! Collection engine
//!
//! A `Collection` is a named, in-memory map of documents with brute-force
//! cosine search and debounced persistence.
//!
//! ## Persistence
//!
//! Mutations never touch storage directly. A non-immediate mutation (re)arms
//! the collection's debounce timer; when the timer fires a save task is pushed
//! onto the collection's single-worker FIFO queue. Immediate mutations and
//! `save_now` skip the timer and enqueue directly. A save task snapshots the
//! map under the read lock at the moment it runs, so queued saves always
//! write the freshest state and never run concurrently.
//!
//! Write failures on the debounced path are logged and counted; they never
//! reach the caller of the mutation and never alter in-memory state.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use stash_core::{
    cosine_similarity, magnitude, try_cosine_similarity, Document, Error, LoadError, Result,
    SearchResult, TextDocument, Uuid, DEFAULT_NUM_RESULTS,
};
use stash_storage::{format, BlobStore, StorageCodec};
use tracing::{debug, info, warn};

use crate::background::SaveQueue;
use crate::debounce::Debouncer;

/// Longest accepted collection name, in bytes.
pub const MAX_COLLECTION_NAME_LEN: usize = 256;

/// Check that `name` can be used as a storage key.
///
/// # Errors
///
/// Returns `Error::InvalidCollectionName` if the name is empty, longer than
/// 256 bytes, contains `/`, `\` or NUL, or is `.` / `..`.
pub fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name(name, "name is empty"));
    }
    if name.len() > MAX_COLLECTION_NAME_LEN {
        return Err(Error::invalid_name(
            name,
            format!("name exceeds {} bytes", MAX_COLLECTION_NAME_LEN),
        ));
    }
    if name == "." || name == ".." {
        return Err(Error::invalid_name(name, "reserved path component"));
    }
    if let Some(c) = name.chars().find(|c| matches!(c, '/' | '\\' | '\0')) {
        return Err(Error::invalid_name(
            name,
            format!("contains forbidden character {:?}", c),
        ));
    }
    Ok(())
}

/// Save counters and pending work for one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistStats {
    /// Saves that reached the store
    pub saves_completed: u64,
    /// Saves that failed to serialize, encode, or write
    pub saves_failed: u64,
    /// A debounce timer is armed and has not fired yet
    pub save_pending: bool,
    /// Saves waiting in the queue or running
    pub queued_saves: usize,
}

// =============================================================================
// Shared state
// =============================================================================

/// State shared between the collection handle and its save tasks.
///
/// Save tasks only hold this, never the queue or the timer, so a task can
/// outlive the handle without keeping the workers alive.
struct CollectionInner<D: Document> {
    name: String,
    documents: RwLock<HashMap<Uuid, Arc<D>>>,
    store: Arc<dyn BlobStore>,
    codec: Arc<dyn StorageCodec>,
    saves_completed: AtomicU64,
    saves_failed: AtomicU64,
}

impl<D: Document> CollectionInner<D> {
    /// Serialize, seal and write the current map.
    fn persist(&self) -> Result<usize> {
        let payload = {
            let docs = self.documents.read();
            let snapshot: BTreeMap<String, &D> = docs
                .iter()
                .map(|(id, doc)| (id.to_string(), doc.as_ref()))
                .collect();
            rmp_serde::to_vec_named(&snapshot)
                .map_err(|e| Error::persist(&self.name, format!("serialize: {}", e)))?
        };

        let blob = format::seal(&payload, self.codec.as_ref())
            .map_err(|e| Error::persist(&self.name, e.to_string()))?;

        self.store
            .write(&self.name, &blob)
            .map_err(|e| Error::persist(&self.name, format!("write: {}", e)))?;
        Ok(blob.len())
    }

    fn persist_logged(&self) -> Result<()> {
        match self.persist() {
            Ok(bytes) => {
                self.saves_completed.fetch_add(1, AtomicOrdering::Relaxed);
                debug!(
                    target: "stash::persist",
                    collection = %self.name,
                    bytes,
                    "Collection saved"
                );
                Ok(())
            }
            Err(e) => {
                self.saves_failed.fetch_add(1, AtomicOrdering::Relaxed);
                warn!(
                    target: "stash::persist",
                    collection = %self.name,
                    store = %self.store.describe(),
                    error = %e,
                    "Failed to save collection"
                );
                Err(e)
            }
        }
    }

    fn read_snapshot(&self) -> std::result::Result<Option<HashMap<Uuid, Arc<D>>>, LoadError> {
        let blob = match self.store.read(&self.name)? {
            Some(blob) => blob,
            None => return Ok(None),
        };

        let payload = format::open(&blob, self.codec.as_ref())?;
        let stored: BTreeMap<String, D> = rmp_serde::from_slice(&payload)
            .map_err(|e| LoadError::Deserialize(e.to_string()))?;

        let mut documents = HashMap::with_capacity(stored.len());
        for (key, doc) in stored {
            let id = doc.id();
            if key != id.to_string() {
                return Err(LoadError::CorruptKey {
                    key,
                    id: id.to_string(),
                });
            }
            documents.insert(id, Arc::new(doc));
        }
        Ok(Some(documents))
    }
}

/// Push a save onto the queue, optionally reporting its outcome.
fn enqueue_save<D: Document>(
    inner: &Arc<CollectionInner<D>>,
    queue: &SaveQueue,
    reply: Option<mpsc::SyncSender<Result<()>>>,
) -> Result<()> {
    let task_inner = Arc::clone(inner);
    queue
        .submit(move || {
            let result = task_inner.persist_logged();
            if let Some(reply) = reply {
                let _ = reply.send(result);
            }
        })
        .map_err(|_| Error::CollectionClosed(inner.name.clone()))
}

// =============================================================================
// Collection
// =============================================================================

/// A named set of documents with similarity search and debounced saves.
///
/// All methods take `&self`; a collection is shared as `Arc<Collection<D>>`.
pub struct Collection<D: Document = TextDocument> {
    inner: Arc<CollectionInner<D>>,
    queue: Arc<SaveQueue>,
    debouncer: Debouncer,
    closed: AtomicBool,
}

impl<D: Document> std::fmt::Debug for Collection<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.inner.name)
            .field("len", &self.len())
            .field("save_delay", &self.debouncer.delay())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<D: Document> Collection<D> {
    /// Create an empty collection bound to `name` in `store`.
    ///
    /// Nothing is read from the store; call [`Collection::load`] for that.
    /// Starts the collection's timer and persistence threads.
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn BlobStore>,
        codec: Arc<dyn StorageCodec>,
        save_delay: Duration,
    ) -> Result<Self> {
        let name = name.into();
        validate_collection_name(&name)?;

        let inner = Arc::new(CollectionInner {
            name,
            documents: RwLock::new(HashMap::new()),
            store,
            codec,
            saves_completed: AtomicU64::new(0),
            saves_failed: AtomicU64::new(0),
        });
        let queue = Arc::new(SaveQueue::new(&inner.name));

        let timer_inner = Arc::clone(&inner);
        let timer_queue = Arc::clone(&queue);
        let debouncer = Debouncer::new(&inner.name, save_delay, move || {
            if let Err(e) = enqueue_save(&timer_inner, &timer_queue, None) {
                debug!(
                    target: "stash::persist",
                    collection = %timer_inner.name,
                    error = %e,
                    "Debounced save dropped"
                );
            }
        });

        Ok(Collection {
            inner,
            queue,
            debouncer,
            closed: AtomicBool::new(false),
        })
    }

    /// Collection name (also its storage key)
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Debounce delay between the last mutation and the save
    pub fn save_delay(&self) -> Duration {
        self.debouncer.delay()
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.inner.documents.read().len()
    }

    /// Returns true if the collection holds no documents
    pub fn is_empty(&self) -> bool {
        self.inner.documents.read().is_empty()
    }

    /// Returns true if a document with `id` is present
    pub fn contains(&self, id: &Uuid) -> bool {
        self.inner.documents.read().contains_key(id)
    }

    /// Returns true once the collection has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(AtomicOrdering::Acquire)
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Replace the in-memory map with the persisted one.
    ///
    /// A missing blob leaves the map untouched and is not an error.
    ///
    /// # Errors
    ///
    /// Returns `Error::Load` if the blob cannot be read, opened, decoded or
    /// deserialized. The in-memory map is left as it was.
    pub fn load(&self) -> Result<()> {
        let loaded = self
            .inner
            .read_snapshot()
            .map_err(|e| Error::load(&self.inner.name, e))?;

        match loaded {
            Some(documents) => {
                let count = documents.len();
                *self.inner.documents.write() = documents;
                info!(
                    target: "stash::collection",
                    collection = %self.inner.name,
                    documents = count,
                    "Collection loaded"
                );
            }
            None => {
                debug!(
                    target: "stash::collection",
                    collection = %self.inner.name,
                    "No stored blob, starting empty"
                );
            }
        }
        Ok(())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert or overwrite a document by id.
    pub fn add_document(&self, document: D, save_immediately: bool) {
        let id = document.id();
        self.inner.documents.write().insert(id, Arc::new(document));
        self.schedule_save(save_immediately);
    }

    /// Insert or overwrite several documents under one write lock.
    ///
    /// An empty batch does not schedule a save.
    pub fn add_documents(&self, documents: impl IntoIterator<Item = D>, save_immediately: bool) {
        let added = {
            let mut docs = self.inner.documents.write();
            let before = docs.len();
            let mut added = 0usize;
            for document in documents {
                docs.insert(document.id(), Arc::new(document));
                added += 1;
            }
            debug!(
                target: "stash::collection",
                collection = %self.inner.name,
                added,
                new = docs.len() - before,
                "Batch insert"
            );
            added
        };
        if added > 0 {
            self.schedule_save(save_immediately);
        }
    }

    /// Remove a document by id.
    ///
    /// Returns true if a document was removed. A miss schedules nothing.
    pub fn remove_document(&self, id: &Uuid, save_immediately: bool) -> bool {
        let removed = self.inner.documents.write().remove(id).is_some();
        if removed {
            self.schedule_save(save_immediately);
        }
        removed
    }

    /// Remove every document and schedule a save of the empty state.
    pub fn clear(&self, save_immediately: bool) {
        self.inner.documents.write().clear();
        self.schedule_save(save_immediately);
    }

    fn schedule_save(&self, immediate: bool) {
        if self.is_closed() {
            return;
        }
        if immediate {
            self.debouncer.cancel();
            if let Err(e) = enqueue_save(&self.inner, &self.queue, None) {
                debug!(
                    target: "stash::persist",
                    collection = %self.inner.name,
                    error = %e,
                    "Immediate save dropped"
                );
            }
        } else {
            self.debouncer.arm();
        }
    }

    // =========================================================================
    // Saving
    // =========================================================================

    /// Save now and wait for the write to finish.
    ///
    /// Cancels any pending debounced save. The save runs on the persistence
    /// worker behind anything already queued.
    ///
    /// # Errors
    ///
    /// Returns `Error::CollectionClosed` after [`Collection::close`], and
    /// `Error::Persist` if the write fails.
    pub fn save_now(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::CollectionClosed(self.inner.name.clone()));
        }
        self.debouncer.cancel();

        let (tx, rx) = mpsc::sync_channel(1);
        enqueue_save(&self.inner, &self.queue, Some(tx))?;
        rx.recv().map_err(|_| {
            Error::persist(&self.inner.name, "save task ended without reporting")
        })?
    }

    /// Block until every queued save has run.
    ///
    /// A pending debounce timer is not forced; it still fires on schedule.
    pub fn flush(&self) {
        self.queue.drain();
    }

    /// Save counters since creation, plus saves not yet written
    pub fn persist_stats(&self) -> PersistStats {
        let queue = self.queue.stats();
        PersistStats {
            saves_completed: self.inner.saves_completed.load(AtomicOrdering::Relaxed),
            saves_failed: self.inner.saves_failed.load(AtomicOrdering::Relaxed),
            save_pending: self.debouncer.is_armed(),
            queued_saves: queue.queue_depth + queue.active_tasks,
        }
    }

    /// Stop persisting.
    ///
    /// Cancels the pending timer, runs saves that are already queued, and
    /// stops both background threads. Later mutations stay in memory only.
    /// Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, AtomicOrdering::AcqRel) {
            return;
        }
        self.debouncer.cancel();
        self.debouncer.shutdown();
        self.queue.shutdown();

        info!(
            target: "stash::collection",
            collection = %self.inner.name,
            "Collection closed"
        );
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Snapshot of every document, in no particular order.
    pub fn get_all_documents(&self) -> Vec<Arc<D>> {
        self.inner.documents.read().values().cloned().collect()
    }

    /// Look up a document by id.
    pub fn get_document(&self, id: &Uuid) -> Option<Arc<D>> {
        self.inner.documents.read().get(id).cloned()
    }

    /// Rank documents by cosine similarity to `query`.
    ///
    /// Scores below `threshold` are dropped. Results are ordered by score
    /// descending, ties broken by id ascending, and cut to `num_results`.
    /// Embeddings of a different length than the query are compared over
    /// the common prefix.
    pub fn search(
        &self,
        query: &[f32],
        num_results: usize,
        threshold: Option<f32>,
    ) -> Vec<SearchResult<D>> {
        if num_results == 0 {
            return Vec::new();
        }
        let query_magnitude = magnitude(query);

        let docs = self.inner.documents.read();
        let mut results: Vec<SearchResult<D>> = docs
            .values()
            .filter_map(|doc| {
                let score =
                    cosine_similarity(query, doc.embedding(), query_magnitude, doc.magnitude());
                passes_threshold(score, threshold)
                    .then(|| SearchResult::new(Arc::clone(doc), score))
            })
            .collect();
        drop(docs);

        rank(&mut results, num_results);
        results
    }

    /// Like [`Collection::search`] but rejects embeddings whose length
    /// differs from the query.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` for the first such document found.
    pub fn search_strict(
        &self,
        query: &[f32],
        num_results: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<SearchResult<D>>> {
        let query_magnitude = magnitude(query);

        let mut results = Vec::new();
        {
            let docs = self.inner.documents.read();
            for doc in docs.values() {
                let score = try_cosine_similarity(
                    query,
                    doc.embedding(),
                    query_magnitude,
                    doc.magnitude(),
                )?;
                if passes_threshold(score, threshold) {
                    results.push(SearchResult::new(Arc::clone(doc), score));
                }
            }
        }

        rank(&mut results, num_results);
        Ok(results)
    }

    /// Top [`DEFAULT_NUM_RESULTS`] matches with no threshold.
    pub fn nearest(&self, query: &[f32]) -> Vec<SearchResult<D>> {
        self.search(query, DEFAULT_NUM_RESULTS, None)
    }
}

impl<D: Document> Drop for Collection<D> {
    fn drop(&mut self) {
        self.close();
    }
}

fn passes_threshold(score: f32, threshold: Option<f32>) -> bool {
    match threshold {
        Some(t) => score >= t,
        None => true,
    }
}

/// Sort by score descending, then id ascending, and keep the top `k`.
fn rank<D: Document>(results: &mut Vec<SearchResult<D>>, k: usize) {
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.id.cmp(&b.id))
    });
    results.truncate(k);
}

// =============================================================================
// Tests
// =============================================================================
