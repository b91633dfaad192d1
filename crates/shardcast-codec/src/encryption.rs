// Shardcast - Peer-to-Peer File Distribution
// Copyright (C) 2025 Shardcast Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! ChaCha20-Poly1305 chunk encryption with scrypt key derivation
//!
//! Every chunk is sealed under a key derived from `(password, salt)` with a
//! fresh 16-byte salt and a fresh 12-byte nonce, so the same password can
//! protect any number of chunks without nonce-reuse concerns.
//!
//! # Envelope format
//!
//! ```text
//! [salt:16][nonce:12][ciphertext:N][tag:16]
//! ```
//!
//! The 16-byte Poly1305 tag is appended to the ciphertext by the AEAD.

use crate::error::{CodecError, CodecResult};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use scrypt::Params;
use tracing::debug;

/// Salt size in bytes
pub const SALT_SIZE: usize = 16;

/// Nonce size in bytes (96 bits for ChaCha20-Poly1305)
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size in bytes (128-bit Poly1305 tag)
pub const TAG_SIZE: usize = 16;

/// Derived key size in bytes
pub const KEY_SIZE: usize = 32;

// scrypt cost parameters: N = 2^15 = 32768, r = 8, p = 1
const SCRYPT_LOG_N: u8 = 15;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Derive a 32-byte key from `(password, salt)` using scrypt
fn derive_key(password: &str, salt: &[u8]) -> CodecResult<[u8; KEY_SIZE]> {
    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_SIZE)
        .map_err(|e| CodecError::KeyDerivation(e.to_string()))?;

    let mut key = [0u8; KEY_SIZE];
    scrypt::scrypt(password.as_bytes(), salt, &params, &mut key)
        .map_err(|e| CodecError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

/// Encrypt a chunk under the given password
///
/// Draws a fresh random salt and nonce, derives the key, seals the plaintext
/// and emits the `salt ‖ nonce ‖ ciphertext‖tag` envelope.
///
/// # Errors
///
/// Returns `CodecError::KeyDerivation` if scrypt rejects its parameters or
/// fails to derive a key.
pub fn encrypt(password: &str, plaintext: &[u8]) -> CodecResult<Vec<u8>> {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);

    let key = derive_key(password, &salt)?;
    let cipher = ChaCha20Poly1305::new_from_slice(&key)
        .map_err(|e| CodecError::KeyDerivation(e.to_string()))?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| CodecError::Decrypt(format!("seal failed: {}", e)))?;

    let mut envelope = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
    envelope.extend_from_slice(&salt);
    envelope.extend_from_slice(&nonce_bytes);
    envelope.extend_from_slice(&ciphertext);

    debug!(
        plaintext_size = plaintext.len(),
        envelope_size = envelope.len(),
        "chunk sealed"
    );

    Ok(envelope)
}

/// Decrypt a chunk envelope under the given password
///
/// # Errors
///
/// Returns `CodecError::Decrypt` on a truncated envelope (shorter than
/// salt + nonce), tag mismatch, or wrong password, and
/// `CodecError::KeyDerivation` if scrypt fails.
pub fn decrypt(password: &str, envelope: &[u8]) -> CodecResult<Vec<u8>> {
    if envelope.len() < SALT_SIZE + NONCE_SIZE {
        return Err(CodecError::Decrypt(format!(
            "envelope too short: {} bytes",
            envelope.len()
        )));
    }

    let salt = &envelope[..SALT_SIZE];
    let nonce_bytes = &envelope[SALT_SIZE..SALT_SIZE + NONCE_SIZE];
    let ciphertext = &envelope[SALT_SIZE + NONCE_SIZE..];

    let key = derive_key(password, salt)?;
    let cipher = ChaCha20Poly1305::new_from_slice(&key)
        .map_err(|e| CodecError::KeyDerivation(e.to_string()))?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CodecError::Decrypt("authentication failed".to_string()))?;

    debug!(
        envelope_size = envelope.len(),
        plaintext_size = plaintext.len(),
        "chunk opened"
    );

    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let plaintext = b"chunk payload bytes";

        let envelope = encrypt("pw", plaintext).unwrap();
        let decrypted = decrypt("pw", &envelope).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_envelope_layout() {
        let plaintext = b"payload";
        let envelope = encrypt("pw", plaintext).unwrap();

        // salt + nonce + ciphertext + tag
        assert_eq!(
            envelope.len(),
            SALT_SIZE + NONCE_SIZE + plaintext.len() + TAG_SIZE
        );
        // Ciphertext must differ from plaintext
        assert_ne!(
            &envelope[SALT_SIZE + NONCE_SIZE..SALT_SIZE + NONCE_SIZE + plaintext.len()],
            plaintext.as_slice()
        );
    }

    #[test]
    fn test_wrong_password_fails() {
        let envelope = encrypt("correct", b"secret").unwrap();
        let err = decrypt("incorrect", &envelope).unwrap_err();
        assert!(err.is_decrypt());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let mut envelope = encrypt("pw", b"original data").unwrap();
        let mid = SALT_SIZE + NONCE_SIZE + 3;
        envelope[mid] ^= 0x01;
        assert!(decrypt("pw", &envelope).unwrap_err().is_decrypt());
    }

    #[test]
    fn test_tampered_tag_fails() {
        let mut envelope = encrypt("pw", b"tagged data").unwrap();
        let last = envelope.len() - 1;
        envelope[last] ^= 0x01;
        assert!(decrypt("pw", &envelope).unwrap_err().is_decrypt());
    }

    #[test]
    fn test_short_envelope_fails() {
        let err = decrypt("pw", &[0u8; SALT_SIZE + NONCE_SIZE - 1]).unwrap_err();
        assert!(err.is_decrypt());
    }

    #[test]
    fn test_fresh_salt_and_nonce_per_chunk() {
        let e1 = encrypt("pw", b"same plaintext").unwrap();
        let e2 = encrypt("pw", b"same plaintext").unwrap();

        assert_ne!(&e1[..SALT_SIZE], &e2[..SALT_SIZE]);
        assert_ne!(
            &e1[SALT_SIZE..SALT_SIZE + NONCE_SIZE],
            &e2[SALT_SIZE..SALT_SIZE + NONCE_SIZE]
        );
        assert_ne!(e1, e2);
        assert_eq!(decrypt("pw", &e1).unwrap(), b"same plaintext");
        assert_eq!(decrypt("pw", &e2).unwrap(), b"same plaintext");
    }

    #[test]
    fn test_empty_plaintext() {
        let envelope = encrypt("pw", b"").unwrap();
        // Even empty plaintext carries salt, nonce and tag
        assert_eq!(envelope.len(), SALT_SIZE + NONCE_SIZE + TAG_SIZE);
        assert_eq!(decrypt("pw", &envelope).unwrap(), b"");
    }

    #[test]
    fn test_truncated_envelope_fails() {
        let mut envelope = encrypt("pw", b"will be truncated").unwrap();
        envelope.truncate(envelope.len() - TAG_SIZE);
        assert!(decrypt("pw", &envelope).is_err());
    }
}
