//! Homebox storage library
//!
//! Document and attachment storage for the Homebox inventory system: a
//! key-addressed blob store with a local filesystem backend, the records that
//! point into it, and the services built on top.

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod services;
pub mod storage;

pub use error::{AppError, Result};
