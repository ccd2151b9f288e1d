use std::io::{self, Read};

use crate::Hasher;

/// Streaming reader that feeds every byte it yields to a hasher and counts
/// how many bytes went through.
pub struct HashingReader<R, H> {
    reader: R,
    hasher: H,
    len:    u64,
}

impl<R, H> HashingReader<R, H> {
    pub fn new(reader: R, hasher: H) -> Self {
        Self { reader, hasher, len: 0 }
    }

    /// Bytes read so far.
    pub fn len(&self) -> u64 { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }
}

impl<R, H: Hasher> HashingReader<R, H> {
    /// Consume the reader, returning the digest and the byte count.
    pub fn finish(self) -> (Vec<u8>, u64) { (self.hasher.finalize(), self.len) }

    /// Consume the reader, handing back the hasher unfinalized.
    pub fn into_parts(self) -> (H, u64) { (self.hasher, self.len) }
}

impl<R: Read, H: Hasher> Read for HashingReader<R, H> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.reader.read(buf)?;
        if n > 0 {
            self.hasher.update(&buf[..n]);
            self.len += n as u64;
        }
        Ok(n)
    }
}

/// Fans one stream of updates out to two hashers.
pub struct Pair<A, B>(pub A, pub B);

impl<A: Hasher, B: Hasher> Pair<A, B> {
    pub fn finalize_both(self) -> (Vec<u8>, Vec<u8>) { (self.0.finalize(), self.1.finalize()) }
}

impl<A: Hasher, B: Hasher> Hasher for Pair<A, B> {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
        self.1.update(data);
    }

    /// Concatenation of both digests; use [`Pair::finalize_both`] to keep them apart.
    fn finalize(self) -> Vec<u8> {
        let (mut a, b) = self.finalize_both();
        a.extend_from_slice(&b);
        a
    }
}
