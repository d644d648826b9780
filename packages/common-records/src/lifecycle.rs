//! Ciclos de vida dos status
//!
//! Cada status tem uma tabela explícita `estado -> próximos estados`.
//! Nenhuma transição volta atrás nem pula um estado intermediário definido.
//! Transições para o próprio estado também são recusadas.

use std::fmt::Display;

use crate::error::InvalidTransitionError;
use crate::models::{AppointmentStatus, PaymentStatus, PrescriptionStatus, SessionStatus};

/// Máquina de estados de um campo de status
pub trait Lifecycle: Copy + Eq + Display + 'static {
    /// Nome da entidade dona do status, usado nos erros
    const ENTITY: &'static str;

    /// Estado inicial de um registro recém-criado
    const INITIAL: Self;

    /// Estados alcançáveis a partir de `self` em um passo
    fn successors(self) -> &'static [Self];

    fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    fn can_transition_to(self, next: Self) -> bool {
        self.successors().contains(&next)
    }

    /// Valida a transição e devolve o novo estado
    fn transition(self, next: Self) -> Result<Self, InvalidTransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransitionError {
                entity: Self::ENTITY,
                current: self.to_string(),
                requested: next.to_string(),
            })
        }
    }
}

impl Lifecycle for AppointmentStatus {
    const ENTITY: &'static str = "appointment";
    const INITIAL: Self = AppointmentStatus::Scheduled;

    fn successors(self) -> &'static [Self] {
        use AppointmentStatus::*;
        match self {
            Scheduled => &[Completed, Canceled, NoShow],
            Completed | Canceled | NoShow => &[],
        }
    }
}

impl Lifecycle for PaymentStatus {
    const ENTITY: &'static str = "payment";
    const INITIAL: Self = PaymentStatus::Pending;

    fn successors(self) -> &'static [Self] {
        use PaymentStatus::*;
        match self {
            Pending => &[Completed, Refunded],
            Completed | Refunded => &[],
        }
    }
}

impl Lifecycle for PrescriptionStatus {
    const ENTITY: &'static str = "prescription";
    const INITIAL: Self = PrescriptionStatus::Active;

    fn successors(self) -> &'static [Self] {
        match self {
            PrescriptionStatus::Active => &[PrescriptionStatus::Completed],
            PrescriptionStatus::Completed => &[],
        }
    }
}

impl Lifecycle for SessionStatus {
    const ENTITY: &'static str = "consultation_session";
    const INITIAL: Self = SessionStatus::Waiting;

    fn successors(self) -> &'static [Self] {
        match self {
            SessionStatus::Waiting => &[SessionStatus::Active],
            SessionStatus::Active => &[SessionStatus::Ended],
            SessionStatus::Ended => &[],
        }
    }
}
