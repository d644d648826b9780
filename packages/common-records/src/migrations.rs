//! Sistema de migrações para banco de dados
//!
//! Este módulo gerencia as migrações do banco de dados SQLite. A versão
//! aplicada fica em `PRAGMA user_version`.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Lista de migrações SQL a serem aplicadas
pub(crate) const MIGRATIONS: &[&str] = &[
    // 001_records.sql
    r#"
    -- Médicos; disponibilidade em JSON
    CREATE TABLE IF NOT EXISTS doctors (
        id TEXT PRIMARY KEY NOT NULL,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        specialty TEXT NOT NULL,
        education TEXT NOT NULL,
        experience_years INTEGER NOT NULL CHECK (experience_years >= 0),
        rating REAL NOT NULL CHECK (rating >= 0 AND rating <= 5),
        consultation_fee REAL NOT NULL CHECK (consultation_fee >= 0),
        availability TEXT NOT NULL,
        image TEXT NOT NULL,
        bio TEXT NOT NULL,
        location TEXT NOT NULL
    );

    -- Pacientes; histórico, carteirinha e contato de emergência criptografados
    CREATE TABLE IF NOT EXISTS patients (
        id TEXT PRIMARY KEY NOT NULL,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT NOT NULL,
        phone TEXT NOT NULL,
        date_of_birth DATE NOT NULL,
        gender TEXT NOT NULL,
        insurance_provider TEXT,
        insurance_number_ciphertext BLOB,
        insurance_number_nonce BLOB,
        history_ciphertext BLOB NOT NULL,
        history_nonce BLOB NOT NULL,
        emergency_contact_ciphertext BLOB,
        emergency_contact_nonce BLOB
    );

    -- Agendamentos
    CREATE TABLE IF NOT EXISTS appointments (
        id TEXT PRIMARY KEY NOT NULL,
        patient_id TEXT NOT NULL,
        doctor_id TEXT NOT NULL,
        date DATE NOT NULL,
        start_time TIME NOT NULL,
        end_time TIME NOT NULL,
        modality TEXT NOT NULL CHECK (modality IN ('video', 'chat')),
        status TEXT NOT NULL CHECK (status IN ('scheduled', 'completed', 'canceled', 'no-show')),
        symptoms TEXT,
        notes TEXT,
        payment_status TEXT NOT NULL CHECK (payment_status IN ('pending', 'completed', 'refunded')),
        payment_amount REAL NOT NULL CHECK (payment_amount >= 0),
        CHECK (end_time > start_time),
        FOREIGN KEY (patient_id) REFERENCES patients (id),
        FOREIGN KEY (doctor_id) REFERENCES doctors (id)
    );

    -- Prescrições
    CREATE TABLE IF NOT EXISTS prescriptions (
        id TEXT PRIMARY KEY NOT NULL,
        appointment_id TEXT NOT NULL,
        patient_id TEXT NOT NULL,
        doctor_id TEXT NOT NULL,
        date DATE NOT NULL,
        medications TEXT NOT NULL,
        notes TEXT,
        status TEXT NOT NULL CHECK (status IN ('active', 'completed')),
        FOREIGN KEY (appointment_id) REFERENCES appointments (id)
    );

    -- Mensagens
    CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY NOT NULL,
        sender_id TEXT NOT NULL,
        sender_role TEXT NOT NULL CHECK (sender_role IN ('patient', 'doctor', 'admin')),
        receiver_id TEXT NOT NULL,
        receiver_role TEXT NOT NULL CHECK (receiver_role IN ('patient', 'doctor', 'admin')),
        content TEXT NOT NULL,
        timestamp TIMESTAMP NOT NULL,
        read BOOLEAN NOT NULL DEFAULT 0,
        appointment_id TEXT,
        FOREIGN KEY (appointment_id) REFERENCES appointments (id)
    );

    -- Sessões de teleconsulta, uma por agendamento
    CREATE TABLE IF NOT EXISTS consultation_sessions (
        id TEXT PRIMARY KEY NOT NULL,
        appointment_id TEXT NOT NULL UNIQUE,
        patient_id TEXT NOT NULL,
        doctor_id TEXT NOT NULL,
        start_time TIMESTAMP NOT NULL,
        end_time TIMESTAMP,
        status TEXT NOT NULL CHECK (status IN ('waiting', 'active', 'ended')),
        modality TEXT NOT NULL CHECK (modality IN ('video', 'chat')),
        notes TEXT,
        FOREIGN KEY (appointment_id) REFERENCES appointments (id)
    );

    -- Pagamentos
    CREATE TABLE IF NOT EXISTS payments (
        id TEXT PRIMARY KEY NOT NULL,
        appointment_id TEXT NOT NULL,
        patient_id TEXT NOT NULL,
        doctor_id TEXT NOT NULL,
        amount REAL NOT NULL CHECK (amount >= 0),
        currency TEXT NOT NULL,
        status TEXT NOT NULL CHECK (status IN ('pending', 'completed', 'refunded')),
        timestamp TIMESTAMP NOT NULL,
        method TEXT NOT NULL CHECK (method IN ('credit_card', 'insurance', 'other')),
        transaction_id TEXT,
        CHECK (status = 'pending' OR (transaction_id IS NOT NULL AND transaction_id <> '')),
        FOREIGN KEY (appointment_id) REFERENCES appointments (id)
    );

    -- Índices para otimização
    CREATE INDEX IF NOT EXISTS idx_doctors_specialty ON doctors (specialty);
    CREATE INDEX IF NOT EXISTS idx_appointments_patient_id ON appointments (patient_id);
    CREATE INDEX IF NOT EXISTS idx_appointments_doctor_id ON appointments (doctor_id);
    CREATE INDEX IF NOT EXISTS idx_appointments_date ON appointments (date);
    CREATE INDEX IF NOT EXISTS idx_prescriptions_appointment_id ON prescriptions (appointment_id);
    CREATE INDEX IF NOT EXISTS idx_messages_appointment_id ON messages (appointment_id);
    CREATE INDEX IF NOT EXISTS idx_messages_receiver ON messages (receiver_id, read);
    CREATE INDEX IF NOT EXISTS idx_payments_appointment_id ON payments (appointment_id);
    "#,
    // 002_master_keys.sql
    r#"
    -- Chave mestra embrulhada pela frase-senha
    CREATE TABLE IF NOT EXISTS master_keys (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        active BOOLEAN NOT NULL DEFAULT 0,
        wrapped_key_ciphertext BLOB NOT NULL,
        wrapped_key_nonce BLOB NOT NULL,
        salt BLOB NOT NULL,
        key_version INTEGER NOT NULL
    );
    "#,
];

/// Executa todas as migrações pendentes no banco de dados
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Aplicando migrações de banco de dados...");

    let version: i64 = match sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await
    {
        Ok(v) => v,
        Err(e) => {
            // Pode ser a primeira execução
            warn!("Erro ao obter versão do banco: {}", e);
            0
        }
    };

    info!("Versão atual do banco: {}", version);

    for (i, migration_sql) in MIGRATIONS.iter().enumerate() {
        let migration_version = (i + 1) as i64;

        if migration_version <= version {
            info!("Migração {} já aplicada", migration_version);
            continue;
        }

        info!("Aplicando migração {}...", migration_version);

        let mut transaction = pool
            .begin()
            .await
            .with_context(|| format!("Falha ao iniciar transação para migração {}", migration_version))?;

        sqlx::query(migration_sql)
            .execute(&mut *transaction)
            .await
            .with_context(|| format!("Falha ao executar migração {}", migration_version))?;

        sqlx::query(&format!("PRAGMA user_version = {}", migration_version))
            .execute(&mut *transaction)
            .await
            .with_context(|| format!("Falha ao atualizar versão para {}", migration_version))?;

        transaction
            .commit()
            .await
            .with_context(|| format!("Falha ao confirmar transação para migração {}", migration_version))?;

        info!("Migração {} aplicada com sucesso", migration_version);
    }

    info!("Migrações concluídas. Versão atual: {}", MIGRATIONS.len());
    Ok(())
}
