//! Integration test suite modules

mod config;
mod dedup;
mod errors;
mod ordering;
mod post;
