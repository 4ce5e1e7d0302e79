//! Video upload pipeline.

mod service;

pub use service::VideoUploadService;
