//! Prescrições e sessões de teleconsulta

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use tracing::{debug, info};

use super::{decode_enum, decode_json, expect_one_row, RecordStore};
use crate::error::{DbError, ValidationError};
use crate::models::{
    AppointmentId, ConsultationSession, DoctorId, PatientId, Prescription, PrescriptionId,
    PrescriptionStatus, SessionId, SessionStatus,
};
use crate::validation::Record;

impl FromRow<'_, SqliteRow> for Prescription {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: PrescriptionId::from(row.try_get::<String, _>("id")?),
            appointment_id: AppointmentId::from(row.try_get::<String, _>("appointment_id")?),
            patient_id: PatientId::from(row.try_get::<String, _>("patient_id")?),
            doctor_id: DoctorId::from(row.try_get::<String, _>("doctor_id")?),
            date: row.try_get("date")?,
            medications: decode_json(row, "medications")?,
            notes: row.try_get("notes")?,
            status: decode_enum(row, "status")?,
        })
    }
}

impl FromRow<'_, SqliteRow> for ConsultationSession {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: SessionId::from(row.try_get::<String, _>("id")?),
            appointment_id: AppointmentId::from(row.try_get::<String, _>("appointment_id")?),
            patient_id: PatientId::from(row.try_get::<String, _>("patient_id")?),
            doctor_id: DoctorId::from(row.try_get::<String, _>("doctor_id")?),
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
            status: decode_enum(row, "status")?,
            modality: decode_enum(row, "modality")?,
            notes: row.try_get("notes")?,
        })
    }
}

impl RecordStore {
    /// Grava uma prescrição do agendamento; partes precisam bater com ele
    pub async fn insert_prescription(&self, prescription: &Prescription) -> Result<(), DbError> {
        prescription.check()?;

        let appointment = self.referenced_appointment(&prescription.appointment_id).await?;
        if !prescription.matches(&appointment) {
            return Err(ValidationError::single(
                Prescription::ENTITY,
                "appointment_id",
                "mismatch",
                "paciente ou médico diferem do agendamento",
            )
            .into());
        }

        sqlx::query(
            "INSERT INTO prescriptions (id, appointment_id, patient_id, doctor_id, date,
                medications, notes, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(prescription.id.as_str())
        .bind(prescription.appointment_id.as_str())
        .bind(prescription.patient_id.as_str())
        .bind(prescription.doctor_id.as_str())
        .bind(prescription.date)
        .bind(serde_json::to_string(&prescription.medications)?)
        .bind(prescription.notes.as_deref())
        .bind(prescription.status.as_str())
        .execute(&self.pool)
        .await?;

        info!(
            "Prescrição {} emitida no agendamento {}",
            prescription.id, prescription.appointment_id
        );
        Ok(())
    }

    pub async fn get_prescription(&self, id: &PrescriptionId) -> Result<Prescription, DbError> {
        sqlx::query_as::<_, Prescription>("SELECT * FROM prescriptions WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("prescription {}", id)))
    }

    /// `active -> completed`
    pub async fn complete_prescription(&self, id: &PrescriptionId) -> Result<Prescription, DbError> {
        let mut prescription = self.get_prescription(id).await?;
        prescription.complete()?;

        let result = sqlx::query("UPDATE prescriptions SET status = ? WHERE id = ? AND status = ?")
            .bind(PrescriptionStatus::Completed.as_str())
            .bind(id.as_str())
            .bind(PrescriptionStatus::Active.as_str())
            .execute(&self.pool)
            .await?;
        expect_one_row(result.rows_affected(), "prescription", id.as_str())?;

        Ok(prescription)
    }

    /// Abre a sala de teleconsulta do agendamento (uma por agendamento)
    pub async fn start_session(
        &self,
        appointment_id: &AppointmentId,
        start_time: DateTime<Utc>,
    ) -> Result<ConsultationSession, DbError> {
        let appointment = self.referenced_appointment(appointment_id).await?;
        let session = ConsultationSession::open(&appointment, start_time)?;
        self.insert_session(&session).await?;
        Ok(session)
    }

    /// Grava uma sessão já montada, conferindo-a contra o agendamento
    pub async fn insert_session(&self, session: &ConsultationSession) -> Result<(), DbError> {
        session.check()?;

        let appointment = self.referenced_appointment(&session.appointment_id).await?;
        session.check_against(&appointment)?;

        sqlx::query(
            "INSERT INTO consultation_sessions (id, appointment_id, patient_id, doctor_id,
                start_time, end_time, status, modality, notes)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(session.id.as_str())
        .bind(session.appointment_id.as_str())
        .bind(session.patient_id.as_str())
        .bind(session.doctor_id.as_str())
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(session.status.as_str())
        .bind(session.modality.as_str())
        .bind(session.notes.as_deref())
        .execute(&self.pool)
        .await?;

        info!("Sessão {} aberta para o agendamento {}", session.id, session.appointment_id);
        Ok(())
    }

    pub async fn get_session(&self, id: &SessionId) -> Result<ConsultationSession, DbError> {
        sqlx::query_as::<_, ConsultationSession>("SELECT * FROM consultation_sessions WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("consultation_session {}", id)))
    }

    /// Avança a sessão; `at` vira o horário de término ao encerrar
    pub async fn transition_session(
        &self,
        id: &SessionId,
        next: SessionStatus,
        at: DateTime<Utc>,
    ) -> Result<ConsultationSession, DbError> {
        let mut session = self.get_session(id).await?;
        let current = session.status;
        session.transition(next, at)?;

        let result = sqlx::query(
            "UPDATE consultation_sessions SET status = ?, end_time = ? WHERE id = ? AND status = ?",
        )
        .bind(session.status.as_str())
        .bind(session.end_time)
        .bind(id.as_str())
        .bind(current.as_str())
        .execute(&self.pool)
        .await?;
        expect_one_row(result.rows_affected(), "consultation_session", id.as_str())?;

        debug!("Sessão {}: {} -> {}", id, current, next);
        Ok(session)
    }
}
