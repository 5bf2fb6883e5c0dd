use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;

const CREDENTIAL_FILE: &str = ".mailbridge_credential";
const KEY_FILE: &str = ".mailbridge_key";

fn load_cipher() -> Result<Aes256Gcm> {
    let key_path = PathBuf::from(KEY_FILE);
    let cipher = if key_path.exists() {
        // Read existing key
        let key_bytes = fs::read(key_path)?;
        Aes256Gcm::new_from_slice(&key_bytes)
            .map_err(|e| anyhow::anyhow!("Failed to create cipher from key: {}", e))?
    } else {
        // Generate new key
        let mut key_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key_bytes);
        fs::write(key_path, key_bytes)?;
        Aes256Gcm::new_from_slice(&key_bytes)
            .map_err(|e| anyhow::anyhow!("Failed to create cipher from new key: {}", e))?
    };
    Ok(cipher)
}

pub fn encrypt_credential(credential: &str) -> Result<String> {
    let cipher = load_cipher()?;
    let mut nonce_bytes = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher.encrypt(nonce, credential.as_bytes())
        .map_err(|e| anyhow::anyhow!("Failed to encrypt credential: {}", e))?;

    let mut combined = Vec::new();
    combined.extend_from_slice(&nonce_bytes);
    combined.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(&combined))
}

pub fn decrypt_credential(encrypted: &str) -> Result<String> {
    let cipher = load_cipher()?;
    let combined = BASE64.decode(encrypted)
        .map_err(|e| anyhow::anyhow!("Failed to decode base64: {}", e))?;

    let (nonce_bytes, ciphertext) = combined.split_at(12);
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = cipher.decrypt(nonce, ciphertext)
        .map_err(|e| anyhow::anyhow!("Failed to decrypt credential: {}", e))?;

    String::from_utf8(plaintext)
        .map_err(|e| anyhow::anyhow!("Failed to convert decrypted bytes to string: {}", e))
}

/// Returns the account credential, prompting once and caching it encrypted
/// on disk for later runs.
pub fn obtain_credential() -> Result<String> {
    let credential_path = PathBuf::from(CREDENTIAL_FILE);

    let credential = if credential_path.exists() {
        // Read and decrypt the stored credential
        let encrypted = fs::read_to_string(credential_path)?;
        decrypt_credential(&encrypted)?
    } else {
        // Prompt for a new credential and store it
        let credential = rpassword::prompt_password("Enter your password: ")?;
        let encrypted = encrypt_credential(&credential)?;
        fs::write(credential_path, encrypted)?;
        credential
    };

    Ok(credential)
}
