//! Módulo de criptografia para dados sensíveis
//!
//! Campos sensíveis do paciente são gravados com AES-256-GCM usando a chave
//! mestra do banco. A chave mestra é guardada embrulhada com
//! ChaCha20-Poly1305 sob uma chave derivada da frase-senha via Argon2id.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use argon2::Argon2;
use chacha20poly1305::{ChaCha20Poly1305, Key as ChaChaKey, Nonce as ChaChaNonce};
use rand::{rngs::OsRng as RandOsRng, RngCore};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Erros específicos para operações de criptografia
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Falha na criptografia: {0}")]
    EncryptionFailed(String),

    #[error("Falha na descriptografia: {0}")]
    DecryptionFailed(String),

    #[error("Dados inválidos: {0}")]
    InvalidData(String),

    #[error("Configuração de criptografia inválida: {0}")]
    InvalidConfiguration(String),
}

/// Tamanho do nonce em bytes (AES-GCM e ChaCha20-Poly1305)
const NONCE_SIZE: usize = 12;

/// Tamanho do salt usado na derivação da chave de embrulho
pub const SALT_SIZE: usize = 16;

/// Chave AES-256 para criptografia (com zeroização automática)
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Cria uma nova chave aleatória
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        RandOsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Cria uma chave a partir de bytes existentes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidData(format!(
                "A chave deve ter 32 bytes, recebeu {}",
                bytes.len()
            )));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Converte para bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// Estrutura que armazena dados criptografados e seu nonce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    /// Dados criptografados
    pub ciphertext: Vec<u8>,
    /// Nonce usado na criptografia
    pub nonce: Vec<u8>,
}

fn check_nonce(nonce: &[u8]) -> Result<(), CryptoError> {
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidData(format!(
            "Nonce inválido: esperado {} bytes, recebido {}",
            NONCE_SIZE,
            nonce.len()
        )));
    }
    Ok(())
}

/// Criptografa dados usando AES-256-GCM
pub fn encrypt(data: &[u8], key: &EncryptionKey) -> Result<EncryptedData, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    // Nonce aleatório por registro
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, data)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok(EncryptedData {
        ciphertext,
        nonce: nonce.to_vec(),
    })
}

/// Descriptografa dados usando AES-256-GCM
pub fn decrypt(encrypted: &EncryptedData, key: &EncryptionKey) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    check_nonce(&encrypted.nonce)?;
    let nonce = Nonce::from_slice(&encrypted.nonce);

    cipher
        .decrypt(nonce, encrypted.ciphertext.as_ref())
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

/// Novo salt aleatório para `wrap_key`
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    RandOsRng.fill_bytes(&mut salt);
    salt
}

/// Deriva a chave de embrulho a partir da frase-senha com Argon2id
fn derive_wrapping_key(password: &str, salt: &[u8]) -> Result<EncryptionKey, CryptoError> {
    if password.is_empty() {
        return Err(CryptoError::InvalidConfiguration(
            "Frase-senha vazia".to_string(),
        ));
    }

    let mut wrapping_key = [0u8; 32];
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut wrapping_key)
        .map_err(|e| CryptoError::InvalidConfiguration(e.to_string()))?;

    let key = EncryptionKey(wrapping_key);
    wrapping_key.zeroize();
    Ok(key)
}

/// Criptografa uma chave usando ChaCha20-Poly1305 com chave derivada de senha
pub fn wrap_key(
    key: &EncryptionKey,
    password: &str,
    salt: &[u8],
) -> Result<EncryptedData, CryptoError> {
    let wrapping_key = derive_wrapping_key(password, salt)?;
    let cipher = ChaCha20Poly1305::new(ChaChaKey::from_slice(wrapping_key.as_bytes()));

    let mut nonce = [0u8; NONCE_SIZE];
    RandOsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(ChaChaNonce::from_slice(&nonce), key.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok(EncryptedData {
        ciphertext,
        nonce: nonce.to_vec(),
    })
}

/// Descriptografa uma chave usando ChaCha20-Poly1305 com chave derivada de senha
pub fn unwrap_key(
    encrypted: &EncryptedData,
    password: &str,
    salt: &[u8],
) -> Result<EncryptionKey, CryptoError> {
    let wrapping_key = derive_wrapping_key(password, salt)?;
    let cipher = ChaCha20Poly1305::new(ChaChaKey::from_slice(wrapping_key.as_bytes()));

    check_nonce(&encrypted.nonce)?;

    let mut plaintext = cipher
        .decrypt(
            ChaChaNonce::from_slice(&encrypted.nonce),
            encrypted.ciphertext.as_ref(),
        )
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

    let key = EncryptionKey::from_bytes(&plaintext);
    plaintext.zeroize();
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encryption_decryption() -> anyhow::Result<()> {
        let data = b"Alergia a penicilina";
        let key = EncryptionKey::generate();

        let encrypted = encrypt(data, &key)?;
        assert_ne!(&encrypted.ciphertext, data);

        let decrypted = decrypt(&encrypted, &key)?;
        assert_eq!(&decrypted, data);

        Ok(())
    }

    #[test]
    fn test_key_wrapping() -> anyhow::Result<()> {
        let original_key = EncryptionKey::generate();
        let password = "senha-forte-do-admin";
        let salt = generate_salt();

        let wrapped = wrap_key(&original_key, password, &salt)?;
        let unwrapped_key = unwrap_key(&wrapped, password, &salt)?;
        assert_eq!(original_key.as_bytes(), unwrapped_key.as_bytes());

        // Senha errada ou salt diferente não abrem a chave
        assert!(unwrap_key(&wrapped, "senha-errada", &salt).is_err());
        assert!(unwrap_key(&wrapped, password, &generate_salt()).is_err());

        Ok(())
    }

    #[test]
    fn test_empty_password_is_rejected() {
        let key = EncryptionKey::generate();
        let result = wrap_key(&key, "", &generate_salt());
        assert!(matches!(result, Err(CryptoError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_encryption_with_different_keys() -> anyhow::Result<()> {
        let data = b"Dados de teste";
        let key1 = EncryptionKey::generate();
        let key2 = EncryptionKey::generate();
        assert_ne!(key1.as_bytes(), key2.as_bytes());

        let encrypted = encrypt(data, &key1)?;
        assert!(decrypt(&encrypted, &key2).is_err());

        let decrypted = decrypt(&encrypted, &key1)?;
        assert_eq!(&decrypted, data);

        Ok(())
    }

    #[test]
    fn test_truncated_nonce_is_rejected() {
        let key = EncryptionKey::generate();
        let mut encrypted = encrypt(b"x", &key).unwrap();
        encrypted.nonce.truncate(8);
        assert!(matches!(
            decrypt(&encrypted, &key),
            Err(CryptoError::InvalidData(_))
        ));
    }
}
