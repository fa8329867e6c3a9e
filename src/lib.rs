#[macro_use]
pub mod errors;
pub mod cache;
pub mod cli;
pub mod config;
pub mod manifest;
pub mod policy;
pub mod registry;
pub mod semver;
mod util;

pub use util::{show_vec, show_vec_with};
