//! Enumerações fechadas dos registros
//!
//! Cada variante carrega o rótulo usado no JSON e nas colunas de texto do
//! banco. Valores desconhecidos falham na desserialização ou em `FromStr`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rótulo desconhecido para uma enumeração fechada
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Valor inválido para {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Gera a enum com `as_str`, `Display`, `FromStr` e os rótulos do serde
macro_rules! closed_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $label)]
                $variant
            ),+
        }

        impl $name {
            /// Todas as variantes, na ordem de declaração
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant)),+,
                    _ => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

closed_enum!(
    /// Canal de comunicação da consulta
    Modality {
        Video => "video",
        Chat => "chat",
    }
);

closed_enum!(
    /// Papel de um participante em mensagens e ações
    Role {
        Patient => "patient",
        Doctor => "doctor",
        Admin => "admin",
    }
);

closed_enum!(
    /// Status de um agendamento
    AppointmentStatus {
        /// Agendamento inicial; único estado não terminal
        Scheduled => "scheduled",
        /// Consulta realizada
        Completed => "completed",
        /// Cancelado
        Canceled => "canceled",
        /// Paciente não compareceu
        NoShow => "no-show",
    }
);

closed_enum!(
    /// Status de pagamento, tanto do agendamento quanto do `Payment`
    PaymentStatus {
        Pending => "pending",
        Completed => "completed",
        Refunded => "refunded",
    }
);

closed_enum!(
    /// Status de uma prescrição
    PrescriptionStatus {
        Active => "active",
        Completed => "completed",
    }
);

closed_enum!(
    /// Status de uma sessão de teleconsulta
    SessionStatus {
        /// Sala aberta, aguardando os participantes
        Waiting => "waiting",
        Active => "active",
        Ended => "ended",
    }
);

closed_enum!(
    /// Meio de pagamento
    PaymentMethod {
        CreditCard => "credit_card",
        Insurance => "insurance",
        Other => "other",
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_match_serde_tags() -> anyhow::Result<()> {
        for status in AppointmentStatus::ALL {
            let json = serde_json::to_string(status)?;
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert_eq!(serde_json::to_string(&PaymentMethod::CreditCard)?, "\"credit_card\"");
        assert_eq!(serde_json::to_string(&AppointmentStatus::NoShow)?, "\"no-show\"");
        Ok(())
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        assert_eq!("chat".parse::<Modality>(), Ok(Modality::Chat));

        let err = "phone".parse::<Modality>().unwrap_err();
        assert_eq!(err.kind, "Modality");

        assert!(serde_json::from_str::<Role>("\"nurse\"").is_err());
    }
}
