//! Map, set and hasher aliases used throughout the runtime.
//!
//! The fast Fx/aHash variants are the default; the `std-hash` feature swaps in
//! the standard library types for hosts that want SipHash everywhere.

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::{HashMap, HashSet};
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
}

#[cfg(feature = "std-hash")]
pub mod hasher {
    pub use std::collections::hash_map::DefaultHasher as KeyHasher;

    #[inline]
    pub fn new() -> KeyHasher {
        KeyHasher::new()
    }
}

#[cfg(not(feature = "std-hash"))]
pub mod hasher {
    pub use ahash::AHasher as KeyHasher;

    #[inline]
    pub fn new() -> KeyHasher {
        KeyHasher::default()
    }
}
