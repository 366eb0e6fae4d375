//! Lock aliases shared across the workspace.

/// A synchronous read-write lock.
pub type SyncRwLock<T> = parking_lot::RwLock<T>;

/// A synchronous mutex.
pub type SyncMutex<T> = parking_lot::Mutex<T>;
