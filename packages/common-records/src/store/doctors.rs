use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use tracing::info;

use super::{decode_json, RecordStore};
use crate::error::DbError;
use crate::models::{Doctor, DoctorId};
use crate::validation::Record;

impl FromRow<'_, SqliteRow> for Doctor {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: DoctorId::from(row.try_get::<String, _>("id")?),
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            specialty: row.try_get("specialty")?,
            education: row.try_get("education")?,
            experience_years: row.try_get("experience_years")?,
            rating: row.try_get("rating")?,
            consultation_fee: row.try_get("consultation_fee")?,
            availability: decode_json(row, "availability")?,
            image: row.try_get("image")?,
            bio: row.try_get("bio")?,
            location: row.try_get("location")?,
        })
    }
}

impl RecordStore {
    /// Grava um médico validado
    pub async fn insert_doctor(&self, doctor: &Doctor) -> Result<(), DbError> {
        doctor.check()?;

        sqlx::query(
            "INSERT INTO doctors (id, first_name, last_name, specialty, education,
                experience_years, rating, consultation_fee, availability, image, bio, location)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(doctor.id.as_str())
        .bind(&doctor.first_name)
        .bind(&doctor.last_name)
        .bind(&doctor.specialty)
        .bind(&doctor.education)
        .bind(doctor.experience_years)
        .bind(doctor.rating)
        .bind(doctor.consultation_fee)
        .bind(serde_json::to_string(&doctor.availability)?)
        .bind(&doctor.image)
        .bind(&doctor.bio)
        .bind(&doctor.location)
        .execute(&self.pool)
        .await?;

        info!("Médico {} cadastrado", doctor.id);
        Ok(())
    }

    pub async fn get_doctor(&self, id: &DoctorId) -> Result<Doctor, DbError> {
        sqlx::query_as::<_, Doctor>("SELECT * FROM doctors WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("doctor {}", id)))
    }

    pub async fn doctor_exists(&self, id: &DoctorId) -> Result<bool, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM doctors WHERE id = ?")
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Médicos de uma especialidade, melhor avaliados primeiro
    pub async fn list_doctors_by_specialty(&self, specialty: &str) -> Result<Vec<Doctor>, DbError> {
        let doctors = sqlx::query_as::<_, Doctor>(
            "SELECT * FROM doctors WHERE specialty = ? ORDER BY rating DESC, last_name",
        )
        .bind(specialty)
        .fetch_all(&self.pool)
        .await?;
        Ok(doctors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::store::test_support::temp_store;

    #[tokio::test]
    async fn test_doctor_round_trip() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;
        let doctor = fixtures::doctor();

        store.insert_doctor(&doctor).await?;
        assert_eq!(store.get_doctor(&doctor.id).await?, doctor);
        assert!(store.doctor_exists(&doctor.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_doctor_is_not_stored() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;
        let mut doctor = fixtures::doctor();
        doctor.rating = 7.0;

        let err = store.insert_doctor(&doctor).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert!(!store.doctor_exists(&doctor.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_id_is_a_constraint_violation() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;
        let doctor = fixtures::doctor();
        store.insert_doctor(&doctor).await?;

        let err = store.insert_doctor(&doctor).await.unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_by_specialty_orders_by_rating() -> anyhow::Result<()> {
        let (store, _dir) = temp_store().await?;

        let first = fixtures::doctor();
        let mut second = fixtures::doctor();
        second.id = DoctorId::new("doc-0002");
        second.rating = 4.9;
        let mut other = fixtures::doctor();
        other.id = DoctorId::new("doc-0003");
        other.specialty = "Dermatologia".to_string();

        for doctor in [&first, &second, &other] {
            store.insert_doctor(doctor).await?;
        }

        let found = store.list_doctors_by_specialty("Cardiologia").await?;
        let ids: Vec<&str> = found.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["doc-0002", "doc-0001"]);

        assert!(store.get_doctor(&DoctorId::new("nope")).await.is_err());
        Ok(())
    }
}
