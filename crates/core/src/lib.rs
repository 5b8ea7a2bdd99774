pub mod cache;
pub mod compose;
pub mod config;
pub mod error;
pub mod media;
pub mod names;
pub mod speech;
pub mod timeline;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;
