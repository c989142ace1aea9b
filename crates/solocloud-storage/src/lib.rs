//! SoloCloud Storage Library
//!
//! One capability contract ([`Storage`]) implemented per backend family:
//!
//! - **Local**: bytes stay under the upload root; uploads are no-ops.
//! - **Object store**: Aliyun OSS, Tencent COS and Qiniu through their S3-compatible APIs.
//! - **WebDAV**: Jianguoyun.
//!
//! # Storage key format
//!
//! Every backend stores an object under `{subfolder}/{unique_name}`, the same relative
//! path the file has under the local upload root. Keys must not contain `..` or a
//! leading `/`.

pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod registry;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;
#[cfg(feature = "storage-webdav")]
pub mod webdav;

pub use keys::object_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use registry::StorageRegistry;
#[cfg(feature = "storage-s3")]
pub use s3::ObjectStoreStorage;
pub use solocloud_core::{ProviderConfig, StorageProvider};
pub use traits::{ConnectionReport, Storage, StorageError, StorageResult};
#[cfg(feature = "storage-webdav")]
pub use webdav::WebDavStorage;
