//! API constants
//!
//! Route prefixes shared by the router, the OpenAPI document and the tests.

/// API base path prefix
pub const API_PREFIX: &str = "/api";

/// Path prefix under which the local storage backend serves signed objects
pub const MEDIA_PREFIX: &str = "/media";

/// Crate version reported by the health endpoint
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Multipart overhead allowed on top of the video size ceiling before the transport
/// layer rejects a body. The precise ceiling is enforced while buffering.
pub const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;
