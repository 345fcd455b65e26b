//! Shared collection aliases.

pub use rustc_hash::{FxHashMap, FxHashSet};
