use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{Appointment, AppointmentId, DoctorId, PatientId, PrescriptionId, PrescriptionStatus};
use crate::error::{InvalidTransitionError, ValidationError};
use crate::lifecycle::Lifecycle;
use crate::validation::{not_blank, Record, Violations};

/// Um medicamento prescrito; todos os campos são obrigatórios
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct MedicationEntry {
    #[validate(custom = "not_blank")]
    pub name: String,
    #[validate(custom = "not_blank")]
    pub dosage: String,
    #[validate(custom = "not_blank")]
    pub frequency: String,
    #[validate(custom = "not_blank")]
    pub duration: String,
    #[validate(custom = "not_blank")]
    pub instructions: String,
}

/// Prescrição emitida em uma consulta
///
/// Paciente e médico repetem os do agendamento para facilitar consultas;
/// a camada de persistência confere que batem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Prescription {
    pub id: PrescriptionId,
    pub appointment_id: AppointmentId,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub date: NaiveDate,
    #[validate]
    pub medications: Vec<MedicationEntry>,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: PrescriptionStatus,
}

impl Prescription {
    /// Nova prescrição ativa vinculada ao agendamento
    pub fn issue(
        appointment: &Appointment,
        date: NaiveDate,
        medications: Vec<MedicationEntry>,
        notes: Option<String>,
    ) -> Result<Self, ValidationError> {
        Prescription {
            id: PrescriptionId::generate(),
            appointment_id: appointment.id.clone(),
            patient_id: appointment.patient_id.clone(),
            doctor_id: appointment.doctor_id.clone(),
            date,
            medications,
            notes,
            status: PrescriptionStatus::INITIAL,
        }
        .validated()
    }

    /// Encerra a prescrição (`active -> completed`)
    pub fn complete(&mut self) -> Result<(), InvalidTransitionError> {
        self.status = self.status.transition(PrescriptionStatus::Completed)?;
        Ok(())
    }

    /// Confere se a prescrição aponta para as mesmas partes do agendamento
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.appointment_id == appointment.id
            && self.patient_id == appointment.patient_id
            && self.doctor_id == appointment.doctor_id
    }
}

impl Record for Prescription {
    const ENTITY: &'static str = "prescription";

    fn check_rules(&self, violations: &mut Violations) {
        violations.require_id("id", self.id.as_str());
        violations.require_id("appointment_id", self.appointment_id.as_str());
        violations.require_id("patient_id", self.patient_id.as_str());
        violations.require_id("doctor_id", self.doctor_id.as_str());

        if self.medications.is_empty() {
            violations.push(
                "medications",
                "required",
                "a prescrição deve ter ao menos um medicamento",
            );
        }
    }
}
