//! Infrastructure layer: configuration, relational storage, object storage.

pub mod config;
pub mod db;
pub mod repository;
pub mod storage;

pub use config::Settings;
