//! Sealing of redacted text with AES-256-GCM.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{redacted_text, RedactedText};
use crate::error::{Error, Result};
use crate::model::{Page, SealedPayload, Token};

const NONCE_LEN: usize = 12;

/// Key sealing the redacted text of a volume. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RedactionKey([u8; 32]);

impl RedactionKey {
    /// Generate a random key.
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Self(key)
    }

    /// From existing key material.
    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self(key)
    }

    /// From a byte slice, which must be exactly 32 bytes long.
    pub fn from_slice(key: &[u8]) -> Result<Self> {
        let key: [u8; 32] = key.try_into().map_err(|_| {
            Error::Encryption(format!("redaction key must be 32 bytes, got {}", key.len()))
        })?;
        Ok(Self(key))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.0)
            .map_err(|e| Error::Encryption(format!("Failed to create cipher: {}", e)))
    }
}

impl fmt::Debug for RedactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RedactionKey(..)")
    }
}

/// Encrypt the redacted text of a page.
///
/// Returns `None` for a page without redactions. The page id is bound to the
/// payload as associated data, so a payload only opens on the page it was
/// sealed for.
pub fn seal(page: &Page, key: &RedactionKey) -> Result<Option<SealedPayload>> {
    let text = redacted_text(page);
    if text.is_empty() {
        return Ok(None);
    }

    let plaintext = serde_json::to_vec(&text)?;
    let cipher = key.cipher()?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from(nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: &plaintext,
                aad: page.id.as_bytes(),
            },
        )
        .map_err(|e| Error::Encryption(format!("Encryption failed: {}", e)))?;

    // nonce || ciphertext || tag
    let mut sealed = nonce_bytes.to_vec();
    sealed.extend_from_slice(&ciphertext);

    log::debug!(
        "Sealed {} redacted fragments of page {}",
        text.len(),
        page.id
    );
    Ok(Some(SealedPayload(sealed)))
}

/// Decrypt the sealed payload stored on a page.
///
/// Any failure to authenticate (wrong key, tampered payload, payload of
/// another page) is [`Error::DecryptionFailure`]; no partial data is returned.
pub fn open(page: &Page, key: &RedactionKey) -> Result<RedactedText> {
    let payload = page
        .sealed
        .as_ref()
        .ok_or_else(|| Error::MissingReference(format!("sealed payload of page {}", page.id)))?;
    let bytes = payload.as_bytes();
    if bytes.len() < NONCE_LEN {
        return Err(Error::DecryptionFailure);
    }

    let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);
    let nonce_bytes: [u8; NONCE_LEN] = nonce_bytes
        .try_into()
        .map_err(|_| Error::DecryptionFailure)?;
    let nonce = Nonce::from(nonce_bytes);

    let plaintext = key
        .cipher()?
        .decrypt(
            &nonce,
            Payload {
                msg: ciphertext,
                aad: page.id.as_bytes(),
            },
        )
        .map_err(|_| Error::DecryptionFailure)?;

    serde_json::from_slice(&plaintext).map_err(|_| Error::DecryptionFailure)
}

/// Seal a page's redacted text and blank it in place.
///
/// Returns `false` when the page has nothing to seal.
pub fn seal_page(page: &mut Page, key: &RedactionKey) -> Result<bool> {
    if page.sealed.is_some() {
        return Err(Error::Encryption(format!("page {} is already sealed", page.id)));
    }
    let Some(payload) = seal(page, key)? else {
        return Ok(false);
    };

    let text = redacted_text(page);
    for fragment in &text.fragments {
        if let Some(token) = page
            .block_mut(&fragment.block_id)
            .and_then(|b| b.tokens.as_mut())
            .and_then(|t| t.get_mut(fragment.token))
        {
            blank(token);
        }
    }
    page.sealed = Some(payload);
    Ok(true)
}

/// Restore a sealed page's redacted text and drop the payload.
pub fn unseal_page(page: &mut Page, key: &RedactionKey) -> Result<RedactedText> {
    let text = open(page, key)?;

    // Check every fragment before touching the page.
    for fragment in &text.fragments {
        let token = page
            .block(&fragment.block_id)
            .and_then(|b| b.tokens.as_ref())
            .and_then(|t| t.get(fragment.token))
            .ok_or_else(|| {
                Error::MissingReference(format!(
                    "token {} of block {}",
                    fragment.token, fragment.block_id
                ))
            })?;
        if !matches!(token, Token::Text(_) | Token::EditStart { .. }) {
            return Err(Error::Malformed(format!(
                "sealed fragment points at a {:?} token in block {}",
                token, fragment.block_id
            )));
        }
    }

    for fragment in &text.fragments {
        if let Some(token) = page
            .block_mut(&fragment.block_id)
            .and_then(|b| b.tokens.as_mut())
            .and_then(|t| t.get_mut(fragment.token))
        {
            restore(token, &fragment.text);
        }
    }
    page.sealed = None;

    log::debug!("Unsealed {} fragments of page {}", text.len(), page.id);
    Ok(text)
}

fn blank(token: &mut Token) {
    match token {
        Token::Text(text) => text.clear(),
        Token::EditStart { original } => original.clear(),
        _ => {}
    }
}

fn restore(token: &mut Token, value: &str) {
    match token {
        Token::Text(text) => *text = value.to_string(),
        Token::EditStart { original } => *original = value.to_string(),
        _ => {}
    }
}
