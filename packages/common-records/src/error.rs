//! Definições de erro para a biblioteca common-records
//!
//! Os erros de domínio (`ValidationError`, `InvalidTransitionError`,
//! `AccessError`) são recuperáveis e dizem respeito a um único registro.
//! `DbError` agrega esses erros com as falhas de persistência.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::CryptoError;

/// Uma violação de regra em um campo específico do registro
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Caminho do campo, ex.: `emergency_contact.phone` ou `medications[0].dosage`
    pub field: String,
    /// Código estável da regra violada
    pub code: String,
    /// Mensagem para exibição
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Registro malformado ou com valores fora do domínio
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Registro inválido ({entity}): {}", summarize(.violations))]
pub struct ValidationError {
    /// Tipo de registro validado
    pub entity: &'static str,
    /// Violações encontradas, ordenadas por campo
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    /// Cria um erro com uma única violação
    pub fn single(
        entity: &'static str,
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            entity,
            violations: vec![FieldViolation::new(field, code, message)],
        }
    }

    /// Campos que falharam na validação, sem repetição
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self.violations.iter().map(|v| v.field.as_str()).collect();
        fields.dedup();
        fields
    }

    /// Indica se o campo informado está entre os inválidos
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Mudança de status fora do conjunto de transições permitidas
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Transição inválida de {entity}: {current} -> {requested}")]
pub struct InvalidTransitionError {
    pub entity: &'static str,
    /// Status atual do registro
    pub current: String,
    /// Status solicitado
    pub requested: String,
}

/// Recusa de uma ação pelo papel ou identidade do ator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("Ação não permitida para {actor}: {reason}")]
    Forbidden { actor: String, reason: String },
}

/// Falha de uma ação sobre um registro, antes de qualquer persistência
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransitionError),

    #[error(transparent)]
    Access(#[from] AccessError),
}

/// Erros específicos para operações de banco de dados
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Erro de conexão com banco de dados: {0}")]
    ConnectionError(String),

    #[error("Erro de migração: {0}")]
    MigrationError(String),

    #[error("Erro de consulta: {0}")]
    QueryError(String),

    #[error("Entidade não encontrada: {0}")]
    NotFound(String),

    #[error("Violação de restrição: {0}")]
    ConstraintViolation(String),

    #[error("Referência inexistente: {0}")]
    MissingReference(String),

    #[error("Registro alterado concorrentemente: {0}")]
    StaleRecord(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransitionError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("Erro de criptografia: {0}")]
    CryptoError(String),

    #[error("Erro interno: {0}")]
    InternalError(String),
}

impl From<RecordError> for DbError {
    fn from(error: RecordError) -> Self {
        match error {
            RecordError::Validation(e) => DbError::Validation(e),
            RecordError::InvalidTransition(e) => DbError::InvalidTransition(e),
            RecordError::Access(e) => DbError::Access(e),
        }
    }
}

impl From<CryptoError> for DbError {
    fn from(error: CryptoError) -> Self {
        DbError::CryptoError(error.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(error: serde_json::Error) -> Self {
        DbError::InternalError(format!("Falha de serialização: {}", error))
    }
}

/// Códigos estendidos do SQLite para violações de restrição
/// (genérico, CHECK, FOREIGN KEY, PRIMARY KEY, UNIQUE)
const SQLITE_CONSTRAINT_CODES: &[&str] = &["19", "275", "787", "1555", "2067"];

/// Conversão de erros específicos do SQLx para nossos tipos de erro
impl From<sqlx::Error> for DbError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => DbError::NotFound("Registro não encontrado".to_string()),
            sqlx::Error::Database(dbe) => {
                if let Some(code) = dbe.code() {
                    if code.as_ref() == "23000" || SQLITE_CONSTRAINT_CODES.contains(&code.as_ref()) {
                        return DbError::ConstraintViolation(dbe.message().to_string());
                    }
                }
                DbError::QueryError(dbe.message().to_string())
            }
            sqlx::Error::ColumnNotFound(col) => {
                DbError::QueryError(format!("Coluna não encontrada: {}", col))
            }
            sqlx::Error::TypeNotFound { type_name } => {
                DbError::QueryError(format!("Tipo não encontrado: {}", type_name))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::QueryError(format!("Erro ao decodificar coluna {}: {}", index, source))
            }
            sqlx::Error::Io(io_err) => DbError::ConnectionError(io_err.to_string()),
            sqlx::Error::Configuration(conf_err) => DbError::ConnectionError(conf_err.to_string()),
            sqlx::Error::PoolClosed => {
                DbError::ConnectionError("Pool de conexões fechado".to_string())
            }
            sqlx::Error::PoolTimedOut => {
                DbError::ConnectionError("Timeout no pool de conexões".to_string())
            }
            sqlx::Error::WorkerCrashed => {
                DbError::InternalError("Worker do banco de dados falhou".to_string())
            }
            _ => DbError::InternalError(format!("Erro inesperado: {:?}", error)),
        }
    }
}
