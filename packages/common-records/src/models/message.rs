use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{AppointmentId, MessageId, ParticipantId, Role};
use crate::access::{authorize_mark_read, Actor};
use crate::error::AccessError;
use crate::validation::{not_blank, Record, Violations};

/// Remetente ou destinatário de uma mensagem
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub role: Role,
}

impl Participant {
    pub fn new(id: impl Into<ParticipantId>, role: Role) -> Self {
        Self { id: id.into(), role }
    }
}

/// Mensagem entre paciente, médico ou administração
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Message {
    pub id: MessageId,
    pub sender: Participant,
    pub receiver: Participant,
    #[validate(custom = "not_blank")]
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Só o destinatário muda para `true`
    #[serde(default)]
    pub read: bool,
    /// Agendamento que dá contexto à conversa
    #[serde(default)]
    pub appointment_id: Option<AppointmentId>,
}

impl Message {
    /// Nova mensagem não lida
    pub fn compose(
        sender: Participant,
        receiver: Participant,
        content: impl Into<String>,
        appointment_id: Option<AppointmentId>,
    ) -> Result<Self, crate::error::ValidationError> {
        Message {
            id: MessageId::generate(),
            sender,
            receiver,
            content: content.into(),
            timestamp: Utc::now(),
            read: false,
            appointment_id,
        }
        .validated()
    }

    /// Marca como lida; recusado para quem não é o destinatário
    pub fn mark_read(&mut self, actor: &Actor) -> Result<(), AccessError> {
        authorize_mark_read(actor, self)?;
        self.read = true;
        Ok(())
    }
}

impl Record for Message {
    const ENTITY: &'static str = "message";

    fn check_rules(&self, violations: &mut Violations) {
        violations.require_id("id", self.id.as_str());
        violations.require_id("sender.id", self.sender.id.as_str());
        violations.require_id("receiver.id", self.receiver.id.as_str());

        if self.sender == self.receiver {
            violations.push(
                "receiver",
                "same_as_sender",
                "remetente e destinatário devem ser diferentes",
            );
        }
        if let Some(appointment_id) = &self.appointment_id {
            violations.require_id("appointment_id", appointment_id.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_compose_starts_unread() -> anyhow::Result<()> {
        let message = Message::compose(
            Participant::new("p-1", Role::Patient),
            Participant::new("d-1", Role::Doctor),
            "Bom dia, doutor",
            None,
        )?;
        assert!(!message.read);
        Ok(())
    }

    #[test]
    fn test_participant_id_is_a_plain_string_on_the_wire() -> anyhow::Result<()> {
        let message = fixtures::message();
        let value = serde_json::to_value(&message)?;
        assert_eq!(value["sender"]["id"], "pat-0001");
        assert_eq!(message.receiver.id, ParticipantId::new("doc-0001"));
        Ok(())
    }

    #[test]
    fn test_read_defaults_to_false_when_missing() -> anyhow::Result<()> {
        let mut value = serde_json::to_value(fixtures::message())?;
        value.as_object_mut().unwrap().remove("read");
        let message: Message = serde_json::from_value(value)?;
        assert!(!message.read);
        Ok(())
    }

    #[test]
    fn test_blank_content_fails() {
        let mut message = fixtures::message();
        message.content = "   ".to_string();
        assert_eq!(message.check().unwrap_err().fields(), vec!["content"]);
    }

    #[test]
    fn test_message_to_self_fails() {
        let mut message = fixtures::message();
        message.receiver = message.sender.clone();
        assert!(message.check().unwrap_err().has_field("receiver"));
    }

    #[test]
    fn test_unknown_role_is_rejected_on_decode() -> anyhow::Result<()> {
        let mut value = serde_json::to_value(fixtures::message())?;
        value["sender"]["role"] = serde_json::json!("nurse");
        assert!(serde_json::from_value::<Message>(value).is_err());
        Ok(())
    }

    #[test]
    fn test_mark_read_by_receiver_only() {
        let mut message = fixtures::message();
        let sender = Actor::new(message.sender.id.as_str(), message.sender.role);
        assert!(message.mark_read(&sender).is_err());
        assert!(!message.read);

        let receiver = Actor::new(message.receiver.id.as_str(), message.receiver.role);
        message.mark_read(&receiver).unwrap();
        assert!(message.read);
    }
}
