//! Tubely Database Library
//!
//! Record store for video metadata: a `VideoRepository` trait with a Postgres
//! implementation and an in-memory one for development and tests.

pub mod db;

pub use db::{InMemoryVideoRepository, PgVideoRepository, VideoRepository};
