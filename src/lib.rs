//! Resolve git and local-directory dependencies into checked-out source trees
//! and a build-system manifest.

pub mod cache;
pub mod config;
pub mod manifest;
pub mod resolve;
pub mod types;

#[cfg(test)]
mod testutil;
