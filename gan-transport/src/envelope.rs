//! AES-128-CBC frame envelope shared by every smart-cube protocol generation.
//!
//! Frames are packed into a block cipher with an unusual "overlapping chunk"
//! scheme: the first 16 bytes are always one CBC block, and if the frame is
//! longer than 16 bytes, the *last* 16 bytes are a second, independently
//! keyed/IV'd CBC block. When the frame is shorter than 32 bytes these two
//! chunks overlap in the middle. Encrypt head-then-tail; decrypt tail-then-head
//! so the overlap resolves correctly in both directions.

use crate::error::CryptoError;
use aes::Aes128;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// A keyed AES-CBC envelope, salted for one device connection.
pub struct AesCbcEnvelope {
    key: [u8; 16],
    iv: [u8; 16],
}

impl AesCbcEnvelope {
    /// Derive an envelope from the fixed (key, iv) pair and a per-device salt.
    ///
    /// `key[i] = (key[i] + salt[i]) mod 255` for `i < salt.len().min(6)`, left
    /// unchanged beyond that. The modulus is 255, not 256 — a firmware quirk,
    /// preserved exactly for wire compatibility.
    pub fn new(key: [u8; 16], iv: [u8; 16], salt: &[u8]) -> Self {
        let mut k = key;
        let mut v = iv;
        for i in 0..salt.len().min(6) {
            k[i] = ((k[i] as u16 + salt[i] as u16) % 255) as u8;
            v[i] = ((v[i] as u16 + salt[i] as u16) % 255) as u8;
        }
        Self { key: k, iv: v }
    }

    /// Encrypt `buf` in place: head chunk first, then tail chunk if the frame
    /// is longer than one block.
    pub fn encrypt(&self, buf: &mut [u8]) -> Result<(), CryptoError> {
        let len = buf.len();
        if len < 16 {
            return Err(CryptoError::FrameTooShort { len });
        }
        self.transform_chunk(&mut buf[0..16], true);
        if len > 16 {
            let tail_start = len - 16;
            let mut tail = [0u8; 16];
            tail.copy_from_slice(&buf[tail_start..]);
            self.transform_chunk(&mut tail, true);
            buf[tail_start..].copy_from_slice(&tail);
        }
        Ok(())
    }

    /// Decrypt `buf` in place: tail chunk first, then head chunk — the
    /// reverse order of [`Self::encrypt`], required for the overlap to
    /// resolve correctly when `16 < buf.len() < 32`.
    pub fn decrypt(&self, buf: &mut [u8]) -> Result<(), CryptoError> {
        let len = buf.len();
        if len < 16 {
            return Err(CryptoError::FrameTooShort { len });
        }
        if len > 16 {
            let tail_start = len - 16;
            let mut tail = [0u8; 16];
            tail.copy_from_slice(&buf[tail_start..]);
            self.transform_chunk(&mut tail, false);
            buf[tail_start..].copy_from_slice(&tail);
        }
        self.transform_chunk(&mut buf[0..16], false);
        Ok(())
    }

    fn transform_chunk(&self, chunk: &mut [u8], encrypt: bool) {
        debug_assert_eq!(chunk.len(), 16);
        if encrypt {
            let out = Aes128CbcEnc::new(&self.key.into(), &self.iv.into())
                .encrypt_padded_vec_mut::<NoPadding>(chunk);
            chunk.copy_from_slice(&out);
        } else {
            let out = Aes128CbcDec::new(&self.key.into(), &self.iv.into())
                .decrypt_padded_vec_mut::<NoPadding>(chunk)
                .expect("single-block NoPadding decrypt of a fixed 16-byte chunk never fails");
            chunk.copy_from_slice(&out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> AesCbcEnvelope {
        AesCbcEnvelope::new([0x11; 16], [0x22; 16], &[1, 2, 3, 4, 5, 6])
    }

    #[test]
    fn round_trips_exactly_one_block() {
        let env = envelope();
        let original = [7u8; 16];
        let mut buf = original;
        env.encrypt(&mut buf).unwrap();
        assert_ne!(buf, original);
        env.decrypt(&mut buf).unwrap();
        assert_eq!(buf, original);
    }

    #[test]
    fn round_trips_overlapping_chunks() {
        let env = envelope();
        for len in [17usize, 20, 31] {
            let original: Vec<u8> = (0..len as u8).collect();
            let mut buf = original.clone();
            env.encrypt(&mut buf).unwrap();
            assert_ne!(buf, original);
            env.decrypt(&mut buf).unwrap();
            assert_eq!(buf, original);
        }
    }

    #[test]
    fn round_trips_disjoint_chunks() {
        let env = envelope();
        let original: Vec<u8> = (0..40u8).collect();
        let mut buf = original.clone();
        env.encrypt(&mut buf).unwrap();
        env.decrypt(&mut buf).unwrap();
        assert_eq!(buf, original);
    }

    #[test]
    fn rejects_short_frames() {
        let env = envelope();
        let mut buf = [0u8; 8];
        assert!(env.encrypt(&mut buf).is_err());
        assert!(env.decrypt(&mut buf).is_err());
    }
}
