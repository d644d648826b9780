use chrono::NaiveDate;
use sqlx::FromRow;
use tracing::info;

use super::RecordStore;
use crate::error::DbError;
use crate::models::{EmergencyContact, MedicalHistory, Patient, PatientId};
use crate::validation::Record;

/// Linha da tabela `patients`, ainda com os campos criptografados
#[derive(FromRow)]
struct PatientRow {
    id: String,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    date_of_birth: NaiveDate,
    gender: String,
    insurance_provider: Option<String>,
    insurance_number_ciphertext: Option<Vec<u8>>,
    insurance_number_nonce: Option<Vec<u8>>,
    history_ciphertext: Vec<u8>,
    history_nonce: Vec<u8>,
    emergency_contact_ciphertext: Option<Vec<u8>>,
    emergency_contact_nonce: Option<Vec<u8>>,
}

impl RecordStore {
    /// Grava um paciente validado; histórico, carteirinha e contato vão criptografados
    pub async fn insert_patient(&self, patient: &Patient) -> Result<(), DbError> {
        patient.check()?;

        let history = self.seal(&patient.medical_history)?;
        let insurance_number = patient
            .insurance_number
            .as_ref()
            .map(|number| self.seal(number))
            .transpose()?;
        let emergency_contact = patient
            .emergency_contact
            .as_ref()
            .map(|contact| self.seal(contact))
            .transpose()?;

        sqlx::query(
            "INSERT INTO patients (id, first_name, last_name, email, phone, date_of_birth, gender,
                insurance_provider, insurance_number_ciphertext, insurance_number_nonce,
                history_ciphertext, history_nonce,
                emergency_contact_ciphertext, emergency_contact_nonce)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(patient.id.as_str())
        .bind(&patient.first_name)
        .bind(&patient.last_name)
        .bind(&patient.email)
        .bind(&patient.phone)
        .bind(patient.date_of_birth)
        .bind(&patient.gender)
        .bind(patient.insurance_provider.as_deref())
        .bind(insurance_number.as_ref().map(|e| e.ciphertext.clone()))
        .bind(insurance_number.as_ref().map(|e| e.nonce.clone()))
        .bind(history.ciphertext)
        .bind(history.nonce)
        .bind(emergency_contact.as_ref().map(|e| e.ciphertext.clone()))
        .bind(emergency_contact.as_ref().map(|e| e.nonce.clone()))
        .execute(&self.pool)
        .await?;

        info!("Paciente {} cadastrado", patient.id);
        Ok(())
    }

    pub async fn get_patient(&self, id: &PatientId) -> Result<Patient, DbError> {
        let row = sqlx::query_as::<_, PatientRow>("SELECT * FROM patients WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("patient {}", id)))?;

        let medical_history: MedicalHistory =
            self.open_sealed(row.history_ciphertext, row.history_nonce)?;
        let insurance_number: Option<String> =
            match (row.insurance_number_ciphertext, row.insurance_number_nonce) {
                (Some(ciphertext), Some(nonce)) => Some(self.open_sealed(ciphertext, nonce)?),
                _ => None,
            };
        let emergency_contact: Option<EmergencyContact> =
            match (row.emergency_contact_ciphertext, row.emergency_contact_nonce) {
                (Some(ciphertext), Some(nonce)) => Some(self.open_sealed(ciphertext, nonce)?),
                _ => None,
            };

        Ok(Patient {
            id: PatientId::from(row.id),
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            date_of_birth: row.date_of_birth,
            gender: row.gender,
            insurance_provider: row.insurance_provider,
            insurance_number,
            medical_history,
            emergency_contact,
        })
    }

    pub async fn patient_exists(&self, id: &PatientId) -> Result<bool, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patients WHERE id = ?")
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::store::test_support::temp_store;

    #[tokio::test]
    async fn test_patient_round_trip() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;
        let patient = fixtures::patient();

        store.insert_patient(&patient).await?;
        assert_eq!(store.get_patient(&patient.id).await?, patient);
        Ok(())
    }

    #[tokio::test]
    async fn test_patient_without_optional_fields_round_trip() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;
        let mut patient = fixtures::patient();
        patient.insurance_provider = None;
        patient.insurance_number = None;
        patient.emergency_contact = None;
        patient.medical_history = MedicalHistory::default();

        store.insert_patient(&patient).await?;
        assert_eq!(store.get_patient(&patient.id).await?, patient);
        Ok(())
    }

    #[tokio::test]
    async fn test_sensitive_fields_are_not_stored_in_clear() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;
        let patient = fixtures::patient();
        store.insert_patient(&patient).await?;

        let history: Vec<u8> =
            sqlx::query_scalar("SELECT history_ciphertext FROM patients WHERE id = ?")
                .bind(patient.id.as_str())
                .fetch_one(store.pool())
                .await?;
        let needle = "penicilina".as_bytes();
        assert!(!history.windows(needle.len()).any(|w| w == needle));
        Ok(())
    }

    #[tokio::test]
    async fn test_patient_with_half_insurance_is_rejected() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;
        let mut patient = fixtures::patient();
        patient.insurance_provider = None;

        let err = store.insert_patient(&patient).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert!(!store.patient_exists(&patient.id).await?);
        Ok(())
    }
}
