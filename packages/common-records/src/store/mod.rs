//! Persistência de referência dos registros em SQLite
//!
//! O `RecordStore` faz o papel da camada de persistência: gera
//! identificadores, confere a integridade referencial antes de aceitar um
//! registro e aplica as transições de status de forma atômica por registro,
//! com `UPDATE ... WHERE status = <status lido>`. Quem perde a corrida recebe
//! `DbError::StaleRecord`.

use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::crypto::{self, EncryptedData, EncryptionKey};
use crate::error::DbError;
use crate::DbConfig;

mod appointments;
mod clinical;
mod doctors;
mod messages;
mod patients;
mod payments;

/// Versão atual do formato da chave mestra
const KEY_VERSION: i64 = 1;

/// Acesso aos registros persistidos
#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
    key: EncryptionKey,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore").finish_non_exhaustive()
    }
}

impl RecordStore {
    /// Abre o banco, aplica migrações e destrava a chave mestra
    pub async fn open(config: &DbConfig) -> Result<Self, DbError> {
        let pool = crate::init_db_pool(config)
            .await
            .map_err(|e| DbError::ConnectionError(format!("{:#}", e)))?;
        Self::from_pool(pool, &config.key_phrase).await
    }

    /// Usa um pool já migrado
    pub async fn from_pool(pool: SqlitePool, key_phrase: &str) -> Result<Self, DbError> {
        if key_phrase.is_empty() {
            return Err(DbError::CryptoError(
                "Frase-senha da chave mestra não configurada".to_string(),
            ));
        }
        let key = load_or_create_master_key(&pool, key_phrase).await?;
        Ok(Self { pool, key })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn seal<T: Serialize>(&self, value: &T) -> Result<EncryptedData, DbError> {
        let plaintext = serde_json::to_vec(value)?;
        Ok(crypto::encrypt(&plaintext, &self.key)?)
    }

    fn open_sealed<T: DeserializeOwned>(&self, ciphertext: Vec<u8>, nonce: Vec<u8>) -> Result<T, DbError> {
        let plaintext = crypto::decrypt(&EncryptedData { ciphertext, nonce }, &self.key)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

/// Destrava a chave mestra ativa ou cria uma nova no primeiro uso
async fn load_or_create_master_key(
    pool: &SqlitePool,
    key_phrase: &str,
) -> Result<EncryptionKey, DbError> {
    let active = sqlx::query(
        "SELECT wrapped_key_ciphertext, wrapped_key_nonce, salt FROM master_keys
         WHERE active = 1 ORDER BY key_version DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    if let Some(row) = active {
        let wrapped = EncryptedData {
            ciphertext: row.try_get("wrapped_key_ciphertext")?,
            nonce: row.try_get("wrapped_key_nonce")?,
        };
        let salt: Vec<u8> = row.try_get("salt")?;
        debug!("Chave mestra encontrada, destravando");
        return Ok(crypto::unwrap_key(&wrapped, key_phrase, &salt)?);
    }

    let key = EncryptionKey::generate();
    let salt = crypto::generate_salt();
    let wrapped = crypto::wrap_key(&key, key_phrase, &salt)?;

    sqlx::query(
        "INSERT INTO master_keys (active, wrapped_key_ciphertext, wrapped_key_nonce, salt, key_version)
         VALUES (1, ?, ?, ?, ?)",
    )
    .bind(wrapped.ciphertext.as_slice())
    .bind(wrapped.nonce.as_slice())
    .bind(salt.as_slice())
    .bind(KEY_VERSION)
    .execute(pool)
    .await?;

    info!("Nova chave mestra criada (versão {})", KEY_VERSION);
    Ok(key)
}

/// Lê uma coluna de texto e converte para a enumeração fechada
pub(crate) fn decode_enum<T>(row: &SqliteRow, column: &str) -> sqlx::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Lê uma coluna JSON
pub(crate) fn decode_json<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> sqlx::Result<T> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Resultado de um `UPDATE` condicionado ao status lido
pub(crate) fn expect_one_row(affected: u64, entity: &str, id: &str) -> Result<(), DbError> {
    if affected == 1 {
        Ok(())
    } else {
        Err(DbError::StaleRecord(format!("{} {}", entity, id)))
    }
}
