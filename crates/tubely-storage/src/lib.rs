//! Tubely Storage Library
//!
//! This crate provides the object storage abstraction used by the upload pipeline: the
//! `Storage` trait, an S3 implementation built on `object_store`, and a local
//! filesystem implementation with HMAC-signed URLs for development.
//!
//! # Storage key format
//!
//! `{classification}/{id}.{subtype}` where `classification` is `landscape`, `portrait`
//! or `other` and `id` is 16 random bytes in unpadded base64url (22 characters). Keys
//! are never derived from user-supplied filenames. Key generation lives in the `keys`
//! module so every backend sees the same layout.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::{create_storage, StorageHandles};
pub use keys::plan_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ByteReader, Storage, StorageError, StorageResult};
pub use tubely_core::StorageBackend;
