use chrono::Weekday;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::DoctorId;
use crate::validation::{not_blank, Record, Violations};

/// Nota máxima de avaliação de um médico
pub const MAX_RATING: f64 = 5.0;

/// Horários de atendimento em um dia da semana
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DayAvailability {
    pub day: Weekday,
    /// Rótulos dos horários, ex.: "09:00", na ordem de exibição
    pub slots: Vec<String>,
}

/// Médico que atende por teleconsulta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Doctor {
    pub id: DoctorId,
    #[validate(custom = "not_blank")]
    pub first_name: String,
    #[validate(custom = "not_blank")]
    pub last_name: String,
    #[validate(custom = "not_blank")]
    pub specialty: String,
    #[validate(custom = "not_blank")]
    pub education: String,
    pub experience_years: u32,
    /// Avaliação média, de 0 a 5
    pub rating: f64,
    /// Valor da consulta na moeda da clínica
    pub consultation_fee: f64,
    #[validate]
    pub availability: Vec<DayAvailability>,
    /// Referência da foto de perfil (URL ou caminho); pode ficar vazia
    pub image: String,
    pub bio: String,
    #[validate(custom = "not_blank")]
    pub location: String,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Horários do dia informado, se o médico atende nesse dia
    pub fn slots_on(&self, day: Weekday) -> Option<&[String]> {
        self.availability
            .iter()
            .find(|entry| entry.day == day)
            .map(|entry| entry.slots.as_slice())
    }
}

impl Record for Doctor {
    const ENTITY: &'static str = "doctor";

    fn check_rules(&self, violations: &mut Violations) {
        violations.require_id("id", self.id.as_str());
        violations.require_range("rating", self.rating, 0.0, MAX_RATING);
        violations.require_amount("consultation_fee", self.consultation_fee);

        let days: Vec<Weekday> = self.availability.iter().map(|entry| entry.day).collect();
        violations.require_unique("availability", &days);

        for (index, entry) in self.availability.iter().enumerate() {
            let field = format!("availability[{}].slots", index);
            for slot in &entry.slots {
                violations.require_text(&field, slot);
            }
            violations.require_unique(&field, &entry.slots);
        }
    }
}
