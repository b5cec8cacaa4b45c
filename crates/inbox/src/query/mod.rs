//! Query API for inbox consumers
//!
//! Read-only views over the store, shaped for rendering folder lists and
//! thread pages.

mod threads;

pub use threads::{FolderCounts, ThreadDetail, ThreadSummary, folder_counts, get_thread_detail, list_threads};
