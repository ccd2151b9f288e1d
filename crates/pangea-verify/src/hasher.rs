#[cfg(feature = "sha256")]
use sha2::Digest;

pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self) -> Vec<u8>;
}

#[cfg(feature = "sha256")]
pub struct Sha256Hasher(sha2::Sha256);

#[cfg(feature = "sha256")]
impl Hasher for Sha256Hasher {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize(self) -> Vec<u8> { self.0.finalize().to_vec() }
}

#[cfg(feature = "sha256")]
impl Default for Sha256Hasher {
    fn default() -> Self { Self::new() }
}

#[cfg(feature = "sha256")]
impl Sha256Hasher {
    pub fn new() -> Self { Self(sha2::Sha256::new()) }

    pub fn digest(data: &[u8]) -> Vec<u8> { sha2::Sha256::digest(data).to_vec() }
}

/// CRC32C (Castagnoli). `finalize` yields the checksum in big-endian order.
#[cfg(feature = "crc32c")]
#[derive(Default)]
pub struct Crc32cHasher(u32);

#[cfg(feature = "crc32c")]
impl Hasher for Crc32cHasher {
    fn update(&mut self, data: &[u8]) { self.0 = crc32c::crc32c_append(self.0, data); }
    fn finalize(self) -> Vec<u8> { self.0.to_be_bytes().to_vec() }
}

#[cfg(feature = "crc32c")]
impl Crc32cHasher {
    pub fn new() -> Self { Self(0) }

    pub fn digest(data: &[u8]) -> Vec<u8> { crc32c::crc32c(data).to_be_bytes().to_vec() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "sha256")]
    #[test]
    fn test_sha256_hasher() {
        let mut hasher = Sha256Hasher::new();
        hasher.update(b"hello ");
        hasher.update(b"world");
        let hash = hasher.finalize();

        let expected =
            hex::decode("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
                .unwrap();
        assert_eq!(hash, expected);
        assert_eq!(Sha256Hasher::digest(b"hello world"), expected);
    }

    #[cfg(feature = "crc32c")]
    #[test]
    fn test_crc32c_check_value() {
        // Standard CRC-32C check value for "123456789"
        let mut hasher = Crc32cHasher::new();
        hasher.update(b"1234");
        hasher.update(b"56789");
        assert_eq!(hex::encode(hasher.finalize()), "e3069283");
        assert_eq!(hex::encode(Crc32cHasher::digest(b"123456789")), "e3069283");
    }

    #[cfg(feature = "crc32c")]
    #[test]
    fn test_crc32c_empty() {
        assert_eq!(hex::encode(Crc32cHasher::new().finalize()), "00000000");
    }
}
