#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;
