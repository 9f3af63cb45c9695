//! Two-phase CSV ingestion service: preview an upload, then confirm it into a
//! dataset with tamper-evident integrity tokens in between.

pub mod analytics;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod integrity;
pub mod middleware;
pub mod services;
pub mod state;
