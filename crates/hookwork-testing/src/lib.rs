//! Testing utilities and harness for Hookwork

pub mod testing;

pub use testing::*;
