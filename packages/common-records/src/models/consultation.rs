use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{Appointment, AppointmentId, DoctorId, Modality, PatientId, SessionId, SessionStatus};
use crate::error::{InvalidTransitionError, ValidationError};
use crate::lifecycle::Lifecycle;
use crate::validation::{Record, Violations};

/// Sala de teleconsulta; no máximo uma por agendamento
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ConsultationSession {
    pub id: SessionId,
    pub appointment_id: AppointmentId,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub start_time: DateTime<Utc>,
    /// Preenchido apenas ao encerrar a sessão
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    /// Sempre igual à modalidade do agendamento
    pub modality: Modality,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ConsultationSession {
    /// Abre a sala em `waiting`, herdando partes e modalidade do agendamento
    pub fn open(appointment: &Appointment, start_time: DateTime<Utc>) -> Result<Self, ValidationError> {
        ConsultationSession {
            id: SessionId::generate(),
            appointment_id: appointment.id.clone(),
            patient_id: appointment.patient_id.clone(),
            doctor_id: appointment.doctor_id.clone(),
            start_time,
            end_time: None,
            status: SessionStatus::INITIAL,
            modality: appointment.modality,
            notes: None,
        }
        .validated()
    }

    /// Avança o status; ao chegar em `ended` registra o horário de término
    pub fn transition(
        &mut self,
        next: SessionStatus,
        at: DateTime<Utc>,
    ) -> Result<SessionStatus, InvalidTransitionError> {
        let next = self.status.transition(next)?;
        if next == SessionStatus::Ended {
            self.end_time = Some(at.max(self.start_time));
        }
        self.status = next;
        Ok(next)
    }

    pub fn activate(&mut self) -> Result<SessionStatus, InvalidTransitionError> {
        self.transition(SessionStatus::Active, Utc::now())
    }

    pub fn end(&mut self, at: DateTime<Utc>) -> Result<SessionStatus, InvalidTransitionError> {
        self.transition(SessionStatus::Ended, at)
    }

    /// Confere partes e modalidade contra o agendamento
    pub fn check_against(&self, appointment: &Appointment) -> Result<(), ValidationError> {
        let mut violations = Violations::new(Self::ENTITY);
        if self.appointment_id != appointment.id {
            violations.push("appointment_id", "mismatch", "sessão de outro agendamento");
        }
        if self.patient_id != appointment.patient_id {
            violations.push("patient_id", "mismatch", "paciente difere do agendamento");
        }
        if self.doctor_id != appointment.doctor_id {
            violations.push("doctor_id", "mismatch", "médico difere do agendamento");
        }
        if self.modality != appointment.modality {
            violations.push("modality", "mismatch", "modalidade difere do agendamento");
        }
        violations.finish()
    }
}

impl Record for ConsultationSession {
    const ENTITY: &'static str = "consultation_session";

    fn check_rules(&self, violations: &mut Violations) {
        violations.require_id("id", self.id.as_str());
        violations.require_id("appointment_id", self.appointment_id.as_str());
        violations.require_id("patient_id", self.patient_id.as_str());
        violations.require_id("doctor_id", self.doctor_id.as_str());

        match (self.status, self.end_time) {
            (SessionStatus::Ended, None) => {
                violations.push("end_time", "required", "sessão encerrada exige horário de término")
            }
            (SessionStatus::Ended, Some(end)) if end < self.start_time => violations.push(
                "end_time",
                "after_start",
                "término não pode ser anterior ao início",
            ),
            (SessionStatus::Waiting | SessionStatus::Active, Some(_)) => violations.push(
                "end_time",
                "unexpected",
                "término só é registrado ao encerrar a sessão",
            ),
            _ => {}
        }
    }
}
