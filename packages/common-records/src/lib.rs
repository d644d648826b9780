//! Common Records - Biblioteca compartilhada com os registros da clínica de telemedicina
//!
//! Esta biblioteca fornece:
//! - Modelos de domínio (médico, paciente, agendamento, prescrição, mensagem,
//!   sessão de teleconsulta, pagamento) com validação
//! - Máquinas de estado explícitas para cada status
//! - Regras de acesso por papel
//! - Persistência de referência em SQLite, com dados sensíveis criptografados

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use tracing::info;

pub mod access;
pub mod crypto;
pub mod error;
pub mod lifecycle;
pub mod migrations;
pub mod models;
pub mod store;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod fixtures;

pub use access::Actor;
pub use error::{
    AccessError, DbError, FieldViolation, InvalidTransitionError, RecordError, ValidationError,
};
pub use lifecycle::Lifecycle;
pub use store::RecordStore;
pub use validation::Record;

/// Configuração da conexão com o banco de dados
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Caminho para o arquivo SQLite
    pub db_path: String,
    /// Frase-senha que protege a chave mestra (derivada com Argon2id)
    pub key_phrase: String,
    /// Número máximo de conexões no pool
    pub max_connections: u32,
    /// Nível de trace do SQL (0 desliga o log de comandos)
    pub trace_level: u8,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            db_path: "data/clinic.db".to_string(),
            key_phrase: "".to_string(), // Vazio por segurança, deve ser definido explicitamente
            max_connections: 5,
            trace_level: 0,
        }
    }
}

impl DbConfig {
    /// Lê a configuração das variáveis `CLINIC_DB_*`, usando o padrão para as ausentes
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            db_path: lookup("CLINIC_DB_PATH").unwrap_or(defaults.db_path),
            key_phrase: lookup("CLINIC_DB_KEY").unwrap_or(defaults.key_phrase),
            max_connections: parse_var(&lookup, "CLINIC_DB_MAX_CONNECTIONS")?
                .unwrap_or(defaults.max_connections),
            trace_level: parse_var(&lookup, "CLINIC_DB_TRACE_LEVEL")?
                .unwrap_or(defaults.trace_level),
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("Valor inválido em {}: {}", name, raw))
        })
        .transpose()
}

/// Inicializa uma conexão com o banco de dados SQLite e aplica as migrações
pub async fn init_db_pool(config: &DbConfig) -> Result<SqlitePool> {
    let db_path = Path::new(&config.db_path);

    // Verifica se o diretório pai existe
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .context("Falha ao criar diretório para banco de dados")?;
        }
    }

    let mut connection_options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .pragma("synchronous", "NORMAL");

    if config.trace_level == 0 {
        connection_options = connection_options.disable_statement_logging();
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(connection_options)
        .await
        .context("Falha ao conectar ao banco de dados SQLite")?;

    migrations::run_migrations(&pool)
        .await
        .context("Falha ao aplicar migrações")?;

    info!("Banco de dados inicializado com sucesso: {}", config.db_path);
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_db_connection() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("nested").join("test.db");

        let config = DbConfig {
            db_path: db_path.to_string_lossy().to_string(),
            key_phrase: "test_password".to_string(),
            max_connections: 2,
            trace_level: 3,
        };

        let pool = init_db_pool(&config).await?;

        let result: (i64,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await?;
        assert_eq!(result.0, 1);

        let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await?;
        assert_eq!(foreign_keys, 1);

        Ok(())
    }

    #[test]
    fn test_config_from_lookup() -> Result<()> {
        let vars: HashMap<&str, &str> = [
            ("CLINIC_DB_PATH", "/tmp/clinic.db"),
            ("CLINIC_DB_MAX_CONNECTIONS", " 8 "),
        ]
        .into_iter()
        .collect();

        let config = DbConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()))?;
        assert_eq!(config.db_path, "/tmp/clinic.db");
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.trace_level, 0);
        assert!(config.key_phrase.is_empty());
        Ok(())
    }

    #[test]
    fn test_config_rejects_bad_numbers() {
        let result = DbConfig::from_lookup(|name| {
            (name == "CLINIC_DB_TRACE_LEVEL").then(|| "alto".to_string())
        });
        assert!(result.is_err());
    }
}
