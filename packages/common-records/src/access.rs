//! Regras de acesso por papel
//!
//! A identidade do ator vem do serviço de autenticação (externo a esta
//! biblioteca). Aqui ficam apenas as decisões que dependem dos registros.

use serde::{Deserialize, Serialize};

use crate::error::AccessError;
use crate::models::{Appointment, Message, Role};

/// Usuário autenticado que executa a ação
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }

    fn forbidden(&self, reason: &str) -> AccessError {
        AccessError::Forbidden {
            actor: format!("{}:{}", self.role, self.id),
            reason: reason.to_string(),
        }
    }
}

/// Só o médico do agendamento ou um administrador tira o agendamento de `scheduled`
pub fn authorize_appointment_transition(
    actor: &Actor,
    appointment: &Appointment,
) -> Result<(), AccessError> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Doctor if actor.id == appointment.doctor_id.as_str() => Ok(()),
        Role::Doctor => Err(actor.forbidden("médico não responsável pelo agendamento")),
        Role::Patient => Err(actor.forbidden("paciente não altera o status do agendamento")),
    }
}

/// Só o destinatário marca a mensagem como lida
pub fn authorize_mark_read(actor: &Actor, message: &Message) -> Result<(), AccessError> {
    if actor.id == message.receiver.id.as_str() && actor.role == message.receiver.role {
        Ok(())
    } else {
        Err(actor.forbidden("apenas o destinatário marca a mensagem como lida"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_only_assigned_doctor_or_admin_moves_appointment() {
        let appointment = fixtures::appointment();

        let own_doctor = Actor::new(appointment.doctor_id.as_str(), Role::Doctor);
        let other_doctor = Actor::new("dr-other", Role::Doctor);
        let admin = Actor::new("admin-1", Role::Admin);
        let patient = Actor::new(appointment.patient_id.as_str(), Role::Patient);

        assert!(authorize_appointment_transition(&own_doctor, &appointment).is_ok());
        assert!(authorize_appointment_transition(&admin, &appointment).is_ok());
        assert!(authorize_appointment_transition(&other_doctor, &appointment).is_err());
        assert!(authorize_appointment_transition(&patient, &appointment).is_err());
    }

    #[test]
    fn test_only_receiver_marks_read() {
        let message = fixtures::message();

        let receiver = Actor::new(message.receiver.id.as_str(), message.receiver.role);
        let sender = Actor::new(message.sender.id.as_str(), message.sender.role);
        let impostor = Actor::new(message.receiver.id.as_str(), Role::Admin);

        assert!(authorize_mark_read(&receiver, &message).is_ok());
        assert!(authorize_mark_read(&sender, &message).is_err());
        assert!(authorize_mark_read(&impostor, &message).is_err());
    }
}
