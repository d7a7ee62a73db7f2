//! Postgres backend for the bonus engine.
mod postgres_impl;

pub mod db;
pub use postgres_impl::{PostgresBatch, PostgresDatabase};
