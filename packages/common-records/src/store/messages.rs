use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use tracing::{debug, info};

use super::{decode_enum, RecordStore};
use crate::access::Actor;
use crate::error::DbError;
use crate::models::{AppointmentId, Message, MessageId, Participant, ParticipantId};
use crate::validation::Record;

impl FromRow<'_, SqliteRow> for Message {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let appointment_id: Option<String> = row.try_get("appointment_id")?;
        Ok(Self {
            id: MessageId::from(row.try_get::<String, _>("id")?),
            sender: Participant {
                id: ParticipantId::from(row.try_get::<String, _>("sender_id")?),
                role: decode_enum(row, "sender_role")?,
            },
            receiver: Participant {
                id: ParticipantId::from(row.try_get::<String, _>("receiver_id")?),
                role: decode_enum(row, "receiver_role")?,
            },
            content: row.try_get("content")?,
            timestamp: row.try_get("timestamp")?,
            read: row.try_get("read")?,
            appointment_id: appointment_id.map(AppointmentId::from),
        })
    }
}

impl RecordStore {
    /// Grava uma mensagem; o agendamento citado precisa existir
    pub async fn insert_message(&self, message: &Message) -> Result<(), DbError> {
        message.check()?;

        if let Some(appointment_id) = &message.appointment_id {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM appointments WHERE id = ?")
                .bind(appointment_id.as_str())
                .fetch_one(&self.pool)
                .await?;
            if count == 0 {
                return Err(DbError::MissingReference(format!(
                    "appointment {}",
                    appointment_id
                )));
            }
        }

        sqlx::query(
            "INSERT INTO messages (id, sender_id, sender_role, receiver_id, receiver_role,
                content, timestamp, read, appointment_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(message.id.as_str())
        .bind(message.sender.id.as_str())
        .bind(message.sender.role.as_str())
        .bind(message.receiver.id.as_str())
        .bind(message.receiver.role.as_str())
        .bind(&message.content)
        .bind(message.timestamp)
        .bind(message.read)
        .bind(message.appointment_id.as_ref().map(|id| id.as_str()))
        .execute(&self.pool)
        .await?;

        debug!("Mensagem {} de {} para {}", message.id, message.sender.role, message.receiver.role);
        Ok(())
    }

    pub async fn get_message(&self, id: &MessageId) -> Result<Message, DbError> {
        sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("message {}", id)))
    }

    /// Conversa de um agendamento em ordem cronológica
    pub async fn list_messages_for_appointment(
        &self,
        appointment_id: &AppointmentId,
    ) -> Result<Vec<Message>, DbError> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE appointment_id = ? ORDER BY timestamp, id",
        )
        .bind(appointment_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    /// Marca como lida em nome do destinatário
    pub async fn mark_message_read(&self, id: &MessageId, actor: &Actor) -> Result<Message, DbError> {
        let mut message = self.get_message(id).await?;
        message.mark_read(actor)?;

        sqlx::query("UPDATE messages SET read = 1 WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        info!("Mensagem {} lida", id);
        Ok(message)
    }
}
