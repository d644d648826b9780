//! Modelos de dados compartilhados entre aplicações
//!
//! Este módulo define os registros de domínio da clínica de telemedicina.
//! O agendamento (`Appointment`) é o agregado central: prescrição, sessão de
//! teleconsulta, mensagens e pagamentos apontam para ele por identificador,
//! nunca por cópia embutida.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod appointment;
pub mod consultation;
pub mod doctor;
pub mod enums;
pub mod message;
pub mod patient;
pub mod payment;
pub mod prescription;

pub use appointment::Appointment;
pub use consultation::ConsultationSession;
pub use doctor::{DayAvailability, Doctor};
pub use enums::{
    AppointmentStatus, Modality, PaymentMethod, PaymentStatus, PrescriptionStatus, Role,
    SessionStatus, UnknownVariant,
};
pub use message::{Message, Participant};
pub use patient::{EmergencyContact, MedicalHistory, Patient};
pub use payment::Payment;
pub use prescription::{MedicationEntry, Prescription};

/// Identificador opaco atribuído pela camada de persistência
macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Novo identificador aleatório (UUID v4)
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

record_id!(
    /// Identificador de médico
    DoctorId
);
record_id!(
    /// Identificador de paciente
    PatientId
);
record_id!(
    /// Identificador de agendamento
    AppointmentId
);
record_id!(PrescriptionId);
record_id!(MessageId);
record_id!(SessionId);
record_id!(PaymentId);
record_id!(
    /// Identificador de quem troca mensagens: paciente, médico ou administrador
    ParticipantId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = PatientId::generate();
        let b = PatientId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_id_serializes_as_plain_string() -> anyhow::Result<()> {
        let id = DoctorId::new("dr-42");
        assert_eq!(serde_json::to_string(&id)?, "\"dr-42\"");
        assert_eq!(serde_json::from_str::<DoctorId>("\"dr-42\"")?, id);
        Ok(())
    }

    fn json_round_trip<T>(record: &T) -> anyhow::Result<()>
    where
        T: Serialize + serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let json = serde_json::to_string(record)?;
        let back: T = serde_json::from_str(&json)?;
        assert_eq!(&back, record, "{}", json);
        Ok(())
    }

    #[test]
    fn test_records_survive_json() -> anyhow::Result<()> {
        use crate::fixtures;

        json_round_trip(&fixtures::doctor())?;
        json_round_trip(&fixtures::patient())?;
        json_round_trip(&fixtures::prescription())?;
        json_round_trip(&fixtures::message())?;
        json_round_trip(&fixtures::payment())?;

        let mut appointment = fixtures::appointment();
        appointment.status = AppointmentStatus::NoShow;
        json_round_trip(&appointment)?;
        assert_eq!(serde_json::to_value(&appointment)?["status"], "no-show");

        let mut session = fixtures::session();
        session.activate()?;
        session.end(session.start_time + chrono::Duration::minutes(20))?;
        json_round_trip(&session)?;
        Ok(())
    }
}
