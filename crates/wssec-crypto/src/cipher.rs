#![forbid(unsafe_code)]

//! Block ciphers for XML Encryption: AES-CBC and 3DES-CBC.
//!
//! Ciphertext is `IV || CBC(plaintext)` with the XML Encryption padding.

use rand::RngCore;
use wssec_core::{algorithm, Error};

/// Trait for cipher algorithms.
pub trait CipherAlgorithm: Send {
    fn uri(&self) -> &'static str;
    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error>;
    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error>;
    fn key_size(&self) -> usize;
}

/// Create a cipher algorithm from its URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn CipherAlgorithm>, Error> {
    match uri {
        algorithm::AES128_CBC => Ok(Box::new(CbcCipher { kind: Kind::Aes128, uri: algorithm::AES128_CBC })),
        algorithm::AES192_CBC => Ok(Box::new(CbcCipher { kind: Kind::Aes192, uri: algorithm::AES192_CBC })),
        algorithm::AES256_CBC => Ok(Box::new(CbcCipher { kind: Kind::Aes256, uri: algorithm::AES256_CBC })),
        algorithm::TRIPLEDES_CBC => Ok(Box::new(CbcCipher { kind: Kind::TripleDes, uri: algorithm::TRIPLEDES_CBC })),
        _ => Err(Error::UnsupportedAlgorithm(format!("cipher: {uri}"))),
    }
}

/// Generate a random session key sized for the cipher `uri`.
pub fn generate_key(uri: &str) -> Result<Vec<u8>, Error> {
    let size = from_uri(uri)?.key_size();
    let mut key = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut key);
    Ok(key)
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Aes128,
    Aes192,
    Aes256,
    TripleDes,
}

impl Kind {
    fn key_size(self) -> usize {
        match self {
            Kind::Aes128 => 16,
            Kind::Aes192 | Kind::TripleDes => 24,
            Kind::Aes256 => 32,
        }
    }

    fn block_size(self) -> usize {
        match self {
            Kind::TripleDes => 8,
            _ => 16,
        }
    }
}

struct CbcCipher {
    kind: Kind,
    uri: &'static str,
}

impl CbcCipher {
    fn check_key(&self, key: &[u8]) -> Result<(), Error> {
        if key.len() != self.kind.key_size() {
            return Err(Error::Crypto(format!(
                "expected {} byte key, got {}",
                self.kind.key_size(),
                key.len()
            )));
        }
        Ok(())
    }
}

impl CipherAlgorithm for CbcCipher {
    fn uri(&self) -> &'static str {
        self.uri
    }

    fn key_size(&self) -> usize {
        self.kind.key_size()
    }

    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        use cbc::cipher::{BlockEncryptMut, KeyIvInit};

        self.check_key(key)?;
        let block = self.kind.block_size();
        let mut iv = vec![0u8; block];
        rand::thread_rng().fill_bytes(&mut iv);

        // Already padded, use NoPadding in cipher
        let mut buf = pkcs7_pad(plaintext, block);
        let buf_len = buf.len();

        macro_rules! do_encrypt {
            ($c:ty) => {{
                let enc = cbc::Encryptor::<$c>::new_from_slices(key, &iv)
                    .map_err(|e| Error::Crypto(format!("CBC init: {e}")))?;
                enc.encrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf, buf_len)
                    .map_err(|e| Error::Crypto(format!("CBC encrypt: {e}")))?;
            }};
        }
        match self.kind {
            Kind::Aes128 => do_encrypt!(aes::Aes128),
            Kind::Aes192 => do_encrypt!(aes::Aes192),
            Kind::Aes256 => do_encrypt!(aes::Aes256),
            Kind::TripleDes => do_encrypt!(des::TdesEde3),
        }

        let mut result = iv;
        result.extend_from_slice(&buf);
        Ok(result)
    }

    fn decrypt(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
        use cbc::cipher::{BlockDecryptMut, KeyIvInit};

        self.check_key(key)?;
        let block = self.kind.block_size();
        if data.len() < 2 * block || data.len() % block != 0 {
            return Err(Error::Crypto("CBC data has invalid length".into()));
        }
        let (iv, ciphertext) = data.split_at(block);
        let mut buf = ciphertext.to_vec();

        macro_rules! do_decrypt {
            ($c:ty) => {{
                let dec = cbc::Decryptor::<$c>::new_from_slices(key, iv)
                    .map_err(|e| Error::Crypto(format!("CBC init: {e}")))?;
                dec.decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf)
                    .map_err(|e| Error::Crypto(format!("CBC decrypt: {e}")))?;
            }};
        }
        match self.kind {
            Kind::Aes128 => do_decrypt!(aes::Aes128),
            Kind::Aes192 => do_decrypt!(aes::Aes192),
            Kind::Aes256 => do_decrypt!(aes::Aes256),
            Kind::TripleDes => do_decrypt!(des::TdesEde3),
        }

        xmlenc_unpad(&buf, block)
    }
}

// ── Padding ──────────────────────────────────────────────────────────

fn pkcs7_pad(data: &[u8], block_size: usize) -> Vec<u8> {
    let pad_len = block_size - (data.len() % block_size);
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.extend(std::iter::repeat(pad_len as u8).take(pad_len));
    padded
}

/// Remove XML Encryption padding. Only the last byte (the pad length) is
/// checked, which accepts both PKCS#7 and ISO 10126 filler.
fn xmlenc_unpad(data: &[u8], block_size: usize) -> Result<Vec<u8>, Error> {
    let Some(&pad_byte) = data.last() else {
        return Ok(Vec::new());
    };
    let pad_len = pad_byte as usize;
    if pad_len == 0 || pad_len > block_size || pad_len > data.len() {
        return Err(Error::Crypto("invalid padding".into()));
    }
    Ok(data[..data.len() - pad_len].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso10126_unpad() {
        let mut data = b"hello world!".to_vec();
        data.extend_from_slice(&[0xAB, 0xCD, 0xEF, 0x04]);
        assert_eq!(xmlenc_unpad(&data, 16).unwrap(), b"hello world!");
        assert!(xmlenc_unpad(&[0x11; 16], 16).is_err());
    }

    #[test]
    fn test_aes128_cbc() {
        let key = generate_key(algorithm::AES128_CBC).unwrap();
        assert_eq!(key.len(), 16);
        let cipher = from_uri(algorithm::AES128_CBC).unwrap();
        let ct = cipher.encrypt(&key, b"<m:echo>hi</m:echo>").unwrap();
        // IV plus two blocks
        assert_eq!(ct.len(), 48);
        assert_eq!(cipher.decrypt(&key, &ct).unwrap(), b"<m:echo>hi</m:echo>");
    }

    #[test]
    fn test_3des_cbc() {
        let key = [0x42u8; 24];
        let cipher = from_uri(algorithm::TRIPLEDES_CBC).unwrap();
        let ct = cipher.encrypt(&key, b"test data").unwrap();
        assert_eq!(ct.len(), 8 + 16);
        assert_eq!(cipher.decrypt(&key, &ct).unwrap(), b"test data");
    }

    #[test]
    fn test_wrong_key_size() {
        let cipher = from_uri(algorithm::AES256_CBC).unwrap();
        assert!(matches!(cipher.encrypt(&[0u8; 16], b"x"), Err(Error::Crypto(_))));
        assert!(from_uri("http://www.w3.org/2009/xmlenc11#aes128-gcm").is_err());
    }
}
