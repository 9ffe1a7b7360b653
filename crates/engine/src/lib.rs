//! Collection engine for Stash
//!
//! This crate ties the core types to storage:
//! - Collection: in-memory document map, similarity search, debounced saves
//! - Registry: one live collection per name, process-wide or standalone
//! - StashConfig: `stash.toml` settings (save delay, codec)
//!
//! Each collection owns two background threads: a debounce timer and a
//! single-worker save queue. Nothing here installs a tracing subscriber.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod background;
pub mod collection;
pub mod config;
pub mod debounce;
pub mod registry;

pub use background::{QueueClosed, QueueStats, SaveQueue};
pub use collection::{validate_collection_name, Collection, PersistStats, MAX_COLLECTION_NAME_LEN};
pub use config::{StashConfig, CONFIG_FILE_NAME, DEFAULT_DATA_DIR, ENV_DATA_DIR, ENV_SAVE_DELAY_MS};
pub use debounce::Debouncer;
pub use registry::{ManagedCollection, Registry};
