use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{
    Appointment, AppointmentId, DoctorId, PatientId, PaymentId, PaymentMethod, PaymentStatus,
};
use crate::error::{RecordError, ValidationError};
use crate::lifecycle::Lifecycle;
use crate::validation::{Record, Violations};

/// Pagamento de uma consulta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Payment {
    pub id: PaymentId,
    pub appointment_id: AppointmentId,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub amount: f64,
    /// Código ISO 4217, ex.: "BRL"
    pub currency: String,
    pub status: PaymentStatus,
    pub timestamp: DateTime<Utc>,
    pub method: PaymentMethod,
    /// Obrigatório assim que o status sai de `pending`
    #[serde(default)]
    pub transaction_id: Option<String>,
}

impl Payment {
    /// Novo pagamento pendente para o agendamento
    pub fn request(
        appointment: &Appointment,
        currency: impl Into<String>,
        method: PaymentMethod,
    ) -> Result<Self, ValidationError> {
        Payment {
            id: PaymentId::generate(),
            appointment_id: appointment.id.clone(),
            patient_id: appointment.patient_id.clone(),
            doctor_id: appointment.doctor_id.clone(),
            amount: appointment.payment_amount,
            currency: currency.into(),
            status: PaymentStatus::INITIAL,
            timestamp: Utc::now(),
            method,
            transaction_id: None,
        }
        .validated()
    }

    /// Avança o status; sair de `pending` exige o identificador da transação
    ///
    /// Em caso de erro o registro fica inalterado.
    pub fn transition(
        &mut self,
        next: PaymentStatus,
        transaction_id: Option<String>,
    ) -> Result<PaymentStatus, RecordError> {
        let next = self.status.transition(next)?;
        let transaction_id = transaction_id.or_else(|| self.transaction_id.clone());

        let mut candidate = self.clone();
        candidate.status = next;
        candidate.transaction_id = transaction_id;
        candidate.timestamp = Utc::now();
        *self = candidate.validated()?;
        Ok(next)
    }

    /// Confere o trio agendamento/paciente/médico
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.appointment_id == appointment.id
            && self.patient_id == appointment.patient_id
            && self.doctor_id == appointment.doctor_id
    }
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}

impl Record for Payment {
    const ENTITY: &'static str = "payment";

    fn check_rules(&self, violations: &mut Violations) {
        violations.require_id("id", self.id.as_str());
        violations.require_id("appointment_id", self.appointment_id.as_str());
        violations.require_id("patient_id", self.patient_id.as_str());
        violations.require_id("doctor_id", self.doctor_id.as_str());
        violations.require_amount("amount", self.amount);

        if !is_currency_code(&self.currency) {
            violations.push("currency", "iso_4217", "moeda deve ser um código ISO 4217");
        }

        let has_transaction = self
            .transaction_id
            .as_deref()
            .map_or(false, |id| !id.trim().is_empty());
        if self.status != PaymentStatus::Pending && !has_transaction {
            violations.push(
                "transaction_id",
                "required",
                "identificador da transação obrigatório após o pagamento sair de pending",
            );
        }
    }
}
