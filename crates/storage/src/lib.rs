//! Storage abstractions for the aurora nowcast services.
//!
//! Read access to the public magnetometer archive through `object_store`:
//! unsigned S3, plain HTTP endpoints, a local mirror directory, or an
//! in-memory store for tests.

pub mod object_store;

pub use self::object_store::{ObjectStorage, ObjectStorageConfig};
