#![doc = r"Stores: the `{get_state, subscribe, actions}` projection of a resource."]

mod actions;
mod map;
mod store;

pub use actions::{tap_actions, Actions};
pub use map::map_store;
pub use store::{store, tap_store, tap_store_state, Store, StoreOutput, StoreSource};
pub use tap_core::Subscription;
