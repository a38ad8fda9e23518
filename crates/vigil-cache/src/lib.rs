//! Lock-free, insert-only cache for Vigil.
//!
//! [`VersionedCache`] keeps its whole key/value set in one immutable
//! snapshot and publishes changes by swapping the snapshot reference with a
//! compare-and-swap. Readers never lock; writers retry only when another
//! writer committed first.
//!
//! # Modules
//!
//! - [`versioned`] -- [`VersionedCache`] and the [`TryAdd`] outcome

pub mod versioned;

pub use versioned::{TryAdd, VersionedCache};
