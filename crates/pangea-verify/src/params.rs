use std::io::{self, Read, Seek, SeekFrom};

use crate::reader::{HashingReader, Pair};
use crate::{Crc32cHasher, Result, Sha256Hasher, VerificationError};

const BUFFER_SIZE: usize = 64 * 1024;

/// Integrity parameters a presigned upload has to declare up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadParams {
    /// Lowercase hex SHA-256.
    pub sha256: String,
    /// Lowercase hex CRC32C (Castagnoli), big-endian.
    pub crc32c: String,
    pub size:   u64,
}

/// Read `stream` from its current offset to EOF, then seek back to that offset.
///
/// Memory use is bounded by a fixed read buffer regardless of stream length.
pub fn upload_params<S: Read + Seek + ?Sized>(stream: &mut S) -> Result<UploadParams> {
    let start = stream.stream_position()?;

    let mut reader = HashingReader::new(&mut *stream, Pair(Sha256Hasher::new(), Crc32cHasher::new()));
    let mut buf = vec![0u8; BUFFER_SIZE];
    let read = loop {
        match reader.read(&mut buf) {
            Ok(0) => break Ok(()),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => break Err(e),
        }
    };
    let (hasher, size) = reader.into_parts();
    if let Err(e) = read {
        // Put the stream back where it was found; the read error is what gets reported.
        let _ = stream.seek(SeekFrom::Start(start));
        return Err(e.into());
    }
    let (sha256, crc32c) = hasher.finalize_both();

    let actual = stream.seek(SeekFrom::Start(start))?;
    if actual != start {
        return Err(VerificationError::Rewind { expected: start, actual });
    }

    Ok(UploadParams {
        sha256: hex::encode(sha256),
        crc32c: hex::encode(crc32c),
        size,
    })
}
