//! Hash collections used by the keyed reconciler.
//!
//! `hashbrown` is the default backend. Enabling the `std-hash` feature swaps in
//! `std::collections` for hosts that want to avoid the extra dependency.

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::{HashMap, HashSet};
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use hashbrown::{HashMap, HashSet};
}
