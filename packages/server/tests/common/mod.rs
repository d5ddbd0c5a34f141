// Shared test utilities; not every test binary uses every helper.
#![allow(dead_code)]

pub mod fixtures;
pub mod harness;

pub use fixtures::*;
pub use harness::TestHarness;
