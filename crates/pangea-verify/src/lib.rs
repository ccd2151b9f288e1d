//! Upload integrity primitives.
//!
//! Computes the parameters a presigned upload must declare before any byte is
//! sent: SHA-256, CRC32C (Castagnoli) and size, in a single pass over a
//! seekable stream, leaving the stream where it was found.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use pangea_verify::upload_params;
//!
//! let mut stream = Cursor::new(b"123456789".to_vec());
//! let params = upload_params(&mut stream).unwrap();
//!
//! assert_eq!(params.size, 9);
//! assert_eq!(params.crc32c, "e3069283");
//! assert_eq!(stream.position(), 0);
//! ```

pub use self::error::{Result, VerificationError};
pub use self::hasher::Hasher;
pub use self::reader::{HashingReader, Pair};

#[cfg(feature = "sha256")]
pub use self::hasher::Sha256Hasher;

#[cfg(feature = "crc32c")]
pub use self::hasher::Crc32cHasher;

#[cfg(all(feature = "sha256", feature = "crc32c"))]
pub use self::params::{UploadParams, upload_params};

mod error;
mod hasher;
#[cfg(all(feature = "sha256", feature = "crc32c"))]
mod params;
mod reader;
