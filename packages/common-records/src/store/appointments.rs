use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use tracing::{debug, info};

use super::{decode_enum, expect_one_row, RecordStore};
use crate::access::Actor;
use crate::error::DbError;
use crate::models::{
    Appointment, AppointmentId, AppointmentStatus, DoctorId, PatientId, PaymentStatus,
};
use crate::validation::Record;

impl FromRow<'_, SqliteRow> for Appointment {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: AppointmentId::from(row.try_get::<String, _>("id")?),
            patient_id: PatientId::from(row.try_get::<String, _>("patient_id")?),
            doctor_id: DoctorId::from(row.try_get::<String, _>("doctor_id")?),
            date: row.try_get("date")?,
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
            modality: decode_enum(row, "modality")?,
            status: decode_enum(row, "status")?,
            symptoms: row.try_get("symptoms")?,
            notes: row.try_get("notes")?,
            payment_status: decode_enum(row, "payment_status")?,
            payment_amount: row.try_get("payment_amount")?,
        })
    }
}

impl RecordStore {
    /// Grava um agendamento; paciente e médico precisam existir
    pub async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), DbError> {
        appointment.check()?;

        if !self.patient_exists(&appointment.patient_id).await? {
            return Err(DbError::MissingReference(format!(
                "patient {}",
                appointment.patient_id
            )));
        }
        if !self.doctor_exists(&appointment.doctor_id).await? {
            return Err(DbError::MissingReference(format!(
                "doctor {}",
                appointment.doctor_id
            )));
        }

        sqlx::query(
            "INSERT INTO appointments (id, patient_id, doctor_id, date, start_time, end_time,
                modality, status, symptoms, notes, payment_status, payment_amount)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(appointment.id.as_str())
        .bind(appointment.patient_id.as_str())
        .bind(appointment.doctor_id.as_str())
        .bind(appointment.date)
        .bind(appointment.start_time)
        .bind(appointment.end_time)
        .bind(appointment.modality.as_str())
        .bind(appointment.status.as_str())
        .bind(appointment.symptoms.as_deref())
        .bind(appointment.notes.as_deref())
        .bind(appointment.payment_status.as_str())
        .bind(appointment.payment_amount)
        .execute(&self.pool)
        .await?;

        info!(
            "Agendamento {} criado para {} {}",
            appointment.id, appointment.date, appointment.start_time
        );
        Ok(())
    }

    pub async fn get_appointment(&self, id: &AppointmentId) -> Result<Appointment, DbError> {
        sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("appointment {}", id)))
    }

    /// Agendamento citado por outro registro; ausência vira `MissingReference`
    pub(crate) async fn referenced_appointment(
        &self,
        id: &AppointmentId,
    ) -> Result<Appointment, DbError> {
        match self.get_appointment(id).await {
            Err(DbError::NotFound(_)) => {
                Err(DbError::MissingReference(format!("appointment {}", id)))
            }
            other => other,
        }
    }

    pub async fn list_appointments_for_patient(
        &self,
        patient_id: &PatientId,
    ) -> Result<Vec<Appointment>, DbError> {
        let appointments = sqlx::query_as::<_, Appointment>(
            "SELECT * FROM appointments WHERE patient_id = ? ORDER BY date, start_time",
        )
        .bind(patient_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(appointments)
    }

    pub async fn list_appointments_for_doctor(
        &self,
        doctor_id: &DoctorId,
    ) -> Result<Vec<Appointment>, DbError> {
        let appointments = sqlx::query_as::<_, Appointment>(
            "SELECT * FROM appointments WHERE doctor_id = ? ORDER BY date, start_time",
        )
        .bind(doctor_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(appointments)
    }

    /// Muda o status do agendamento em nome do ator
    pub async fn transition_appointment(
        &self,
        id: &AppointmentId,
        actor: &Actor,
        next: AppointmentStatus,
    ) -> Result<Appointment, DbError> {
        let mut appointment = self.get_appointment(id).await?;
        let current = appointment.status;
        appointment.transition_status(actor, next)?;

        let result = sqlx::query("UPDATE appointments SET status = ? WHERE id = ? AND status = ?")
            .bind(next.as_str())
            .bind(id.as_str())
            .bind(current.as_str())
            .execute(&self.pool)
            .await?;
        expect_one_row(result.rows_affected(), "appointment", id.as_str())?;

        debug!("Agendamento {}: {} -> {} por {}", id, current, next, actor.role);
        Ok(appointment)
    }

    /// Muda o status de pagamento do agendamento
    pub async fn transition_appointment_payment(
        &self,
        id: &AppointmentId,
        next: PaymentStatus,
    ) -> Result<Appointment, DbError> {
        let mut appointment = self.get_appointment(id).await?;
        let current = appointment.payment_status;
        appointment.transition_payment(next)?;

        let result = sqlx::query(
            "UPDATE appointments SET payment_status = ? WHERE id = ? AND payment_status = ?",
        )
        .bind(next.as_str())
        .bind(id.as_str())
        .bind(current.as_str())
        .execute(&self.pool)
        .await?;
        expect_one_row(result.rows_affected(), "appointment", id.as_str())?;

        debug!("Pagamento do agendamento {}: {} -> {}", id, current, next);
        Ok(appointment)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fixtures;
    use crate::models::Role;
    use crate::store::test_support::temp_store;

    /// Grava paciente, médico e agendamento de exemplo
    pub(crate) async fn seed(store: &RecordStore) -> anyhow::Result<Appointment> {
        store.insert_patient(&fixtures::patient()).await?;
        store.insert_doctor(&fixtures::doctor()).await?;
        let appointment = fixtures::appointment();
        store.insert_appointment(&appointment).await?;
        Ok(appointment)
    }

    #[tokio::test]
    async fn test_appointment_round_trip() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;
        let appointment = seed(&store).await?;

        assert_eq!(store.get_appointment(&appointment.id).await?, appointment);
        assert_eq!(
            store.list_appointments_for_patient(&appointment.patient_id).await?,
            vec![appointment.clone()]
        );
        assert_eq!(
            store.list_appointments_for_doctor(&appointment.doctor_id).await?,
            vec![appointment]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_patient_is_rejected() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;
        store.insert_doctor(&fixtures::doctor()).await?;

        let err = store
            .insert_appointment(&fixtures::appointment())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::MissingReference(ref what) if what.starts_with("patient")));
        Ok(())
    }

    #[tokio::test]
    async fn test_payment_scenario() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;
        let appointment = seed(&store).await?;
        assert_eq!(appointment.status, AppointmentStatus::Scheduled);
        assert_eq!(appointment.payment_status, PaymentStatus::Pending);

        let paid = store
            .transition_appointment_payment(&appointment.id, PaymentStatus::Completed)
            .await?;
        assert_eq!(paid.payment_status, PaymentStatus::Completed);

        let err = store
            .transition_appointment_payment(&appointment.id, PaymentStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidTransition(_)));
        assert_eq!(
            store.get_appointment(&appointment.id).await?.payment_status,
            PaymentStatus::Completed
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_status_transition_checks_actor() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;
        let appointment = seed(&store).await?;

        let patient = Actor::new(appointment.patient_id.as_str(), Role::Patient);
        let err = store
            .transition_appointment(&appointment.id, &patient, AppointmentStatus::Canceled)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Access(_)));

        let admin = Actor::new("admin-1", Role::Admin);
        let updated = store
            .transition_appointment(&appointment.id, &admin, AppointmentStatus::Canceled)
            .await?;
        assert_eq!(updated.status, AppointmentStatus::Canceled);
        assert_eq!(
            store.get_appointment(&appointment.id).await?.status,
            AppointmentStatus::Canceled
        );

        let err = store
            .transition_appointment(&appointment.id, &admin, AppointmentStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidTransition(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_transitions_only_one_wins() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;
        let appointment = seed(&store).await?;
        let admin = Actor::new("admin-1", Role::Admin);
        let doctor = Actor::new(appointment.doctor_id.as_str(), Role::Doctor);

        let (a, b) = tokio::join!(
            store.transition_appointment(&appointment.id, &admin, AppointmentStatus::Canceled),
            store.transition_appointment(&appointment.id, &doctor, AppointmentStatus::Completed),
        );

        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        let loser = a.err().or(b.err()).unwrap();
        assert!(matches!(
            loser,
            DbError::StaleRecord(_) | DbError::InvalidTransition(_)
        ));
        Ok(())
    }
}
