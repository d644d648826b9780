use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use tracing::{debug, info, warn};

use super::{decode_enum, expect_one_row, RecordStore};
use crate::error::{DbError, ValidationError};
use crate::models::{AppointmentId, DoctorId, PatientId, Payment, PaymentId, PaymentStatus};
use crate::validation::Record;

impl FromRow<'_, SqliteRow> for Payment {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: PaymentId::from(row.try_get::<String, _>("id")?),
            appointment_id: AppointmentId::from(row.try_get::<String, _>("appointment_id")?),
            patient_id: PatientId::from(row.try_get::<String, _>("patient_id")?),
            doctor_id: DoctorId::from(row.try_get::<String, _>("doctor_id")?),
            amount: row.try_get("amount")?,
            currency: row.try_get("currency")?,
            status: decode_enum(row, "status")?,
            timestamp: row.try_get("timestamp")?,
            method: decode_enum(row, "method")?,
            transaction_id: row.try_get("transaction_id")?,
        })
    }
}

impl RecordStore {
    /// Grava um pagamento do agendamento; partes precisam bater com ele
    pub async fn insert_payment(&self, payment: &Payment) -> Result<(), DbError> {
        payment.check()?;

        let appointment = self.referenced_appointment(&payment.appointment_id).await?;
        if !payment.matches(&appointment) {
            return Err(ValidationError::single(
                Payment::ENTITY,
                "appointment_id",
                "mismatch",
                "paciente ou médico diferem do agendamento",
            )
            .into());
        }

        sqlx::query(
            "INSERT INTO payments (id, appointment_id, patient_id, doctor_id, amount, currency,
                status, timestamp, method, transaction_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(payment.id.as_str())
        .bind(payment.appointment_id.as_str())
        .bind(payment.patient_id.as_str())
        .bind(payment.doctor_id.as_str())
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(payment.timestamp)
        .bind(payment.method.as_str())
        .bind(payment.transaction_id.as_deref())
        .execute(&self.pool)
        .await?;

        info!(
            "Pagamento {} de {:.2} {} registrado",
            payment.id, payment.amount, payment.currency
        );
        Ok(())
    }

    pub async fn get_payment(&self, id: &PaymentId) -> Result<Payment, DbError> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("payment {}", id)))
    }

    /// Avança o pagamento e acompanha o status de pagamento do agendamento
    ///
    /// As duas escritas vão na mesma transação. O agendamento só é tocado se
    /// ainda estiver no mesmo status que o pagamento tinha.
    pub async fn transition_payment(
        &self,
        id: &PaymentId,
        next: PaymentStatus,
        transaction_id: Option<String>,
    ) -> Result<Payment, DbError> {
        let mut payment = self.get_payment(id).await?;
        let current = payment.status;
        payment.transition(next, transaction_id)?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE payments SET status = ?, transaction_id = ?, timestamp = ?
             WHERE id = ? AND status = ?",
        )
        .bind(payment.status.as_str())
        .bind(payment.transaction_id.as_deref())
        .bind(payment.timestamp)
        .bind(id.as_str())
        .bind(current.as_str())
        .execute(&mut *tx)
        .await?;
        expect_one_row(result.rows_affected(), "payment", id.as_str())?;

        let synced = sqlx::query(
            "UPDATE appointments SET payment_status = ? WHERE id = ? AND payment_status = ?",
        )
        .bind(payment.status.as_str())
        .bind(payment.appointment_id.as_str())
        .bind(current.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if synced.rows_affected() == 0 {
            warn!(
                "Pagamento {} foi para {}, mas o agendamento {} não estava mais em {}",
                id, next, payment.appointment_id, current
            );
        }
        debug!("Pagamento {}: {} -> {}", id, current, next);
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::models::PaymentMethod;
    use crate::store::appointments::tests::seed;
    use crate::store::test_support::temp_store;

    #[tokio::test]
    async fn test_payment_round_trip() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;
        seed(&store).await?;
        let payment = fixtures::payment();

        store.insert_payment(&payment).await?;
        assert_eq!(store.get_payment(&payment.id).await?, payment);
        Ok(())
    }

    #[tokio::test]
    async fn test_payment_for_other_patient_is_rejected() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;
        seed(&store).await?;
        let mut payment = fixtures::payment();
        payment.patient_id = PatientId::new("pat-9999");

        let err = store.insert_payment(&payment).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(ref e) if e.has_field("appointment_id")));
        Ok(())
    }

    #[tokio::test]
    async fn test_payment_needs_existing_appointment() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;
        let err = store.insert_payment(&fixtures::payment()).await.unwrap_err();
        assert!(matches!(err, DbError::MissingReference(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_lookup_failure_is_not_reported_as_missing_reference() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;
        seed(&store).await?;
        store.pool().close().await;

        let err = store.insert_payment(&fixtures::payment()).await.unwrap_err();
        assert!(matches!(err, DbError::ConnectionError(_)), "{:?}", err);
        Ok(())
    }

    #[tokio::test]
    async fn test_payment_leaves_moved_appointment_alone() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;
        let appointment = seed(&store).await?;
        let payment = fixtures::payment();
        store.insert_payment(&payment).await?;
        store
            .transition_appointment_payment(&appointment.id, PaymentStatus::Refunded)
            .await?;

        let paid = store
            .transition_payment(&payment.id, PaymentStatus::Completed, Some("txn-1".to_string()))
            .await?;
        assert_eq!(paid.status, PaymentStatus::Completed);
        assert_eq!(
            store.get_appointment(&appointment.id).await?.payment_status,
            PaymentStatus::Refunded
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_completed_payment_updates_appointment() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;
        let appointment = seed(&store).await?;
        let payment = Payment::request(&appointment, "BRL", PaymentMethod::Insurance)?;
        store.insert_payment(&payment).await?;

        let err = store
            .transition_payment(&payment.id, PaymentStatus::Completed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(store.get_payment(&payment.id).await?.status, PaymentStatus::Pending);

        let paid = store
            .transition_payment(&payment.id, PaymentStatus::Completed, Some("txn-7781".to_string()))
            .await?;
        assert_eq!(paid.transaction_id.as_deref(), Some("txn-7781"));
        assert_eq!(store.get_payment(&payment.id).await?, paid);
        assert_eq!(
            store.get_appointment(&appointment.id).await?.payment_status,
            PaymentStatus::Completed
        );

        let err = store
            .transition_payment(&payment.id, PaymentStatus::Refunded, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidTransition(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_refund_from_pending() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;
        let appointment = seed(&store).await?;
        let payment = fixtures::payment();
        store.insert_payment(&payment).await?;

        let refunded = store
            .transition_payment(&payment.id, PaymentStatus::Refunded, Some("rev-001".to_string()))
            .await?;
        assert_eq!(refunded.status, PaymentStatus::Refunded);
        assert_eq!(
            store.get_appointment(&appointment.id).await?.payment_status,
            PaymentStatus::Refunded
        );
        Ok(())
    }
}
