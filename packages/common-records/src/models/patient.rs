use std::borrow::Cow;
use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::PatientId;
use crate::validation::{not_blank, Record, Violations};

/// Histórico médico: cada lista é um conjunto independente de textos livres
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalHistory {
    #[serde(default)]
    pub conditions: BTreeSet<String>,
    #[serde(default)]
    pub allergies: BTreeSet<String>,
    #[serde(default)]
    pub medications: BTreeSet<String>,
    #[serde(default)]
    pub surgeries: BTreeSet<String>,
}

impl MedicalHistory {
    fn sections(&self) -> [(&'static str, &BTreeSet<String>); 4] {
        [
            ("conditions", &self.conditions),
            ("allergies", &self.allergies),
            ("medications", &self.medications),
            ("surgeries", &self.surgeries),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.sections().iter().all(|(_, set)| set.is_empty())
    }
}

/// Contato de emergência: os três campos vêm juntos ou o contato é omitido
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EmergencyContact {
    #[serde(default)]
    #[validate(custom = "contact_part")]
    pub name: String,
    #[serde(default)]
    #[validate(custom = "contact_part")]
    pub relationship: String,
    #[serde(default)]
    #[validate(custom = "contact_part")]
    pub phone: String,
}

fn contact_part(value: &str) -> Result<(), validator::ValidationError> {
    not_blank(value).map_err(|mut error| {
        error.message = Some(Cow::Borrowed(
            "contato de emergência exige nome, parentesco e telefone",
        ));
        error
    })
}

/// Paciente da clínica
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Patient {
    pub id: PatientId,
    #[validate(custom = "not_blank")]
    pub first_name: String,
    #[validate(custom = "not_blank")]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom = "not_blank")]
    pub phone: String,
    pub date_of_birth: NaiveDate,
    #[validate(custom = "not_blank")]
    pub gender: String,
    #[serde(default)]
    pub insurance_provider: Option<String>,
    #[serde(default)]
    pub insurance_number: Option<String>,
    #[serde(default)]
    pub medical_history: MedicalHistory,
    #[serde(default)]
    #[validate]
    pub emergency_contact: Option<EmergencyContact>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Idade completa em anos na data informada
    pub fn age_on(&self, date: NaiveDate) -> Option<u32> {
        date.years_since(self.date_of_birth)
    }
}

/// Trata `Some("")` como ausência de valor
fn present(value: &Option<String>) -> bool {
    value.as_deref().map_or(false, |v| !v.trim().is_empty())
}

impl Record for Patient {
    const ENTITY: &'static str = "patient";

    fn check_rules(&self, violations: &mut Violations) {
        violations.require_id("id", self.id.as_str());

        match (present(&self.insurance_provider), present(&self.insurance_number)) {
            (true, false) => violations.push(
                "insurance_number",
                "required_with",
                "número da carteirinha obrigatório quando há convênio",
            ),
            (false, true) => violations.push(
                "insurance_provider",
                "required_with",
                "convênio obrigatório quando há número da carteirinha",
            ),
            _ => {}
        }

        for (section, entries) in self.medical_history.sections() {
            let field = format!("medical_history.{}", section);
            for entry in entries {
                violations.require_text(&field, entry);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_valid_patient_passes() {
        assert!(fixtures::patient().validated().is_ok());
    }

    #[test]
    fn test_insurance_number_without_provider_fails() {
        let mut patient = fixtures::patient();
        patient.insurance_provider = None;
        patient.insurance_number = Some("123-456".to_string());

        let err = patient.check().unwrap_err();
        assert_eq!(err.fields(), vec!["insurance_provider"]);
    }

    #[test]
    fn test_provider_without_number_fails() {
        let mut patient = fixtures::patient();
        patient.insurance_number = Some("  ".to_string());

        let err = patient.check().unwrap_err();
        assert_eq!(err.fields(), vec!["insurance_number"]);
    }

    #[test]
    fn test_no_insurance_at_all_passes() {
        let mut patient = fixtures::patient();
        patient.insurance_provider = None;
        patient.insurance_number = None;
        assert!(patient.check().is_ok());
    }

    #[test]
    fn test_emergency_contact_without_phone_fails() -> anyhow::Result<()> {
        let mut value = serde_json::to_value(fixtures::patient())?;
        value["emergency_contact"] = serde_json::json!({
            "name": "Maria Souza",
            "relationship": "mãe",
        });
        let patient: Patient = serde_json::from_value(value)?;

        let err = patient.check().unwrap_err();
        assert_eq!(err.fields(), vec!["emergency_contact.phone"]);
        Ok(())
    }

    #[test]
    fn test_blank_emergency_contact_phone_fails() {
        let mut patient = fixtures::patient();
        if let Some(contact) = patient.emergency_contact.as_mut() {
            contact.phone = "   ".to_string();
        }

        let err = patient.check().unwrap_err();
        assert_eq!(err.fields(), vec!["emergency_contact.phone"]);
        assert!(err.violations[0].message.contains("parentesco"));
    }

    #[test]
    fn test_blank_names_fail() {
        let mut patient = fixtures::patient();
        patient.first_name = "  ".to_string();
        patient.gender = "\t".to_string();

        let err = patient.check().unwrap_err();
        assert_eq!(err.fields(), vec!["first_name", "gender"]);
    }

    #[test]
    fn test_emergency_contact_all_or_none_passes() {
        let mut patient = fixtures::patient();
        assert!(patient.emergency_contact.is_some());
        assert!(patient.check().is_ok());

        patient.emergency_contact = None;
        assert!(patient.check().is_ok());
    }

    #[test]
    fn test_invalid_email_fails() {
        let mut patient = fixtures::patient();
        patient.email = "sem-arroba".to_string();
        assert_eq!(patient.check().unwrap_err().fields(), vec!["email"]);
    }

    #[test]
    fn test_blank_history_entry_fails() {
        let mut patient = fixtures::patient();
        patient.medical_history.allergies.insert(" ".to_string());
        assert!(patient
            .check()
            .unwrap_err()
            .has_field("medical_history.allergies"));
    }

    #[test]
    fn test_age_on() {
        let patient = fixtures::patient();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(patient.age_on(date), Some(33));
    }
}
