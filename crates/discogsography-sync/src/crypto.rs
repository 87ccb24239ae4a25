//! At-rest encryption for stored OAuth tokens (`oauth_tokens.access_token_encrypted`
//! / `access_secret_encrypted`), AES-256-GCM with a random 96-bit nonce per
//! write. Grounded in the teacher's `TokenVaultService::encrypt_token` /
//! `decrypt_token`, minus its KMS envelope-encryption layer — SPEC_FULL
//! names a single configured key, not key rotation or per-tenant data keys.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use discogsography_core::error::{AppError, Result};
use rand::RngCore;

pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    /// `key` must be exactly 32 bytes (AES-256).
    pub fn new(key: &[u8]) -> anyhow::Result<Self> {
        if key.len() != 32 {
            anyhow::bail!("token encryption key must be 32 bytes, got {}", key.len());
        }
        let key = Key::<Aes256Gcm>::from_slice(key);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Encrypts `plaintext`, returning `(ciphertext, nonce)`.
    pub fn encrypt(&self, plaintext: &str) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut nonce_bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| AppError::Internal { message: Some("failed to encrypt oauth token".into()) })?;

        Ok((ciphertext, nonce_bytes.to_vec()))
    }

    pub fn decrypt(&self, ciphertext: &[u8], nonce: &[u8]) -> Result<String> {
        if nonce.len() != 12 {
            return Err(AppError::Internal { message: Some("stored nonce is not 12 bytes".into()) });
        }
        let nonce = Nonce::from_slice(nonce);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| AppError::Internal { message: Some("failed to decrypt oauth token".into()) })?;
        String::from_utf8(plaintext).map_err(|_| AppError::Internal { message: Some("decrypted token is not valid UTF-8".into()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> TokenCipher {
        TokenCipher::new(&[7u8; 32]).unwrap()
    }

    #[test]
    fn round_trip_recovers_plaintext() {
        let cipher = test_cipher();
        let (ciphertext, nonce) = cipher.encrypt("super-secret-token").unwrap();
        assert_eq!(cipher.decrypt(&ciphertext, &nonce).unwrap(), "super-secret-token");
    }

    #[test]
    fn wrong_nonce_fails_to_decrypt() {
        let cipher = test_cipher();
        let (ciphertext, _nonce) = cipher.encrypt("super-secret-token").unwrap();
        let wrong_nonce = [0u8; 12];
        assert!(cipher.decrypt(&ciphertext, &wrong_nonce).is_err());
    }

    #[test]
    fn rejects_non_32_byte_keys() {
        assert!(TokenCipher::new(&[1u8; 16]).is_err());
    }
}
