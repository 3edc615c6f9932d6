//! Testing utilities and harness for tap resources

pub mod testing;

pub use testing::*;

pub mod prelude {
    pub use crate::testing::*;
}
