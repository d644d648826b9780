use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{AppointmentId, AppointmentStatus, DoctorId, Modality, PatientId, PaymentStatus};
use crate::access::{authorize_appointment_transition, Actor};
use crate::error::{InvalidTransitionError, RecordError, ValidationError};
use crate::lifecycle::Lifecycle;
use crate::validation::{Record, Violations};

/// Representa uma consulta/agendamento entre paciente e médico
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Appointment {
    /// Identificador único da consulta
    pub id: AppointmentId,
    /// Identificador do paciente
    pub patient_id: PatientId,
    /// Identificador do médico
    pub doctor_id: DoctorId,
    /// Data da consulta
    pub date: NaiveDate,
    /// Horário de início
    pub start_time: NaiveTime,
    /// Horário de término, sempre depois do início
    pub end_time: NaiveTime,
    /// Canal da consulta
    pub modality: Modality,
    /// Status atual da consulta
    pub status: AppointmentStatus,
    /// Sintomas relatados pelo paciente no agendamento
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Status do pagamento da consulta
    pub payment_status: PaymentStatus,
    /// Valor cobrado
    pub payment_amount: f64,
}

impl Appointment {
    /// Novo agendamento em `scheduled` com pagamento `pending`
    #[allow(clippy::too_many_arguments)]
    pub fn schedule(
        patient_id: PatientId,
        doctor_id: DoctorId,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        modality: Modality,
        payment_amount: f64,
        symptoms: Option<String>,
    ) -> Result<Self, ValidationError> {
        Appointment {
            id: AppointmentId::generate(),
            patient_id,
            doctor_id,
            date,
            start_time,
            end_time,
            modality,
            status: AppointmentStatus::INITIAL,
            symptoms,
            notes: None,
            payment_status: PaymentStatus::INITIAL,
            payment_amount,
        }
        .validated()
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Muda o status da consulta; exige médico responsável ou administrador
    pub fn transition_status(
        &mut self,
        actor: &Actor,
        next: AppointmentStatus,
    ) -> Result<AppointmentStatus, RecordError> {
        authorize_appointment_transition(actor, self)?;
        self.status = self.status.transition(next)?;
        Ok(self.status)
    }

    /// Muda o status do pagamento da consulta
    pub fn transition_payment(
        &mut self,
        next: PaymentStatus,
    ) -> Result<PaymentStatus, InvalidTransitionError> {
        self.payment_status = self.payment_status.transition(next)?;
        Ok(self.payment_status)
    }
}

impl Record for Appointment {
    const ENTITY: &'static str = "appointment";

    fn check_rules(&self, violations: &mut Violations) {
        violations.require_id("id", self.id.as_str());
        violations.require_id("patient_id", self.patient_id.as_str());
        violations.require_id("doctor_id", self.doctor_id.as_str());
        violations.require_amount("payment_amount", self.payment_amount);

        if self.end_time <= self.start_time {
            violations.push(
                "end_time",
                "after_start",
                "horário de término deve ser posterior ao de início",
            );
        }
    }
}
