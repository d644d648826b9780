//! Coleta de violações de validação
//!
//! As regras simples de campo (obrigatoriedade via [`not_blank`], e-mail,
//! registros aninhados) vêm do derive `validator::Validate`. As regras numéricas e entre campos são
//! escritas à mão em cada modelo. `Violations` junta as duas fontes em um
//! único `ValidationError` com os campos ordenados.

use std::borrow::Cow;
use std::collections::HashSet;
use std::hash::Hash;

use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::{FieldViolation, ValidationError};

/// Contrato comum de validação dos registros de domínio
pub trait Record: Validate + Sized {
    /// Nome do tipo de registro usado nas mensagens de erro
    const ENTITY: &'static str;

    /// Regras que o derive não expressa (domínios numéricos, campos cruzados)
    fn check_rules(&self, violations: &mut Violations);

    /// Valida o registro completo, acumulando todas as violações
    fn check(&self) -> Result<(), ValidationError> {
        let mut violations = Violations::new(Self::ENTITY);
        if let Err(errors) = self.validate() {
            violations.extend_from(&errors);
        }
        self.check_rules(&mut violations);
        violations.finish()
    }

    /// Consome o candidato e devolve a instância validada
    fn validated(self) -> Result<Self, ValidationError> {
        self.check()?;
        Ok(self)
    }
}

/// Regra `custom` do derive para texto obrigatório: espaços não contam
pub fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        let mut error = validator::ValidationError::new("required");
        error.message = Some(Cow::Borrowed("campo obrigatório"));
        return Err(error);
    }
    Ok(())
}

/// Acumulador de violações de um registro
#[derive(Debug)]
pub struct Violations {
    entity: &'static str,
    items: Vec<FieldViolation>,
}

impl Violations {
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, field: impl Into<String>, code: &str, message: impl Into<String>) {
        self.items.push(FieldViolation::new(field, code, message));
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Converte os erros do `validator`, inclusive aninhados, em violações
    pub fn extend_from(&mut self, errors: &ValidationErrors) {
        collect("", errors, &mut self.items);
    }

    /// Identificador opaco obrigatório
    pub fn require_id(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "required", "identificador obrigatório");
        }
    }

    /// Texto obrigatório (não vazio após remover espaços)
    pub fn require_text(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "required", "campo obrigatório");
        }
    }

    /// Valor monetário finito e não negativo
    pub fn require_amount(&mut self, field: &str, value: f64) {
        if !value.is_finite() {
            self.push(field, "not_finite", "valor deve ser um número finito");
        } else if value < 0.0 {
            self.push(field, "negative", "valor não pode ser negativo");
        }
    }

    /// Valor finito dentro do intervalo fechado `[min, max]`
    pub fn require_range(&mut self, field: &str, value: f64, min: f64, max: f64) {
        if !value.is_finite() || value < min || value > max {
            self.push(
                field,
                "range",
                format!("valor deve estar entre {} e {}", min, max),
            );
        }
    }

    /// Itens repetidos dentro de uma mesma coleção
    pub fn require_unique<'a, T, I>(&mut self, field: &str, items: I)
    where
        T: Eq + Hash + std::fmt::Display + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut seen = HashSet::new();
        for item in items {
            if !seen.insert(item) {
                self.push(field, "duplicate", format!("valor repetido: {}", item));
            }
        }
    }

    /// Encerra a coleta: `Ok` se não houve violação
    pub fn finish(mut self) -> Result<(), ValidationError> {
        if self.items.is_empty() {
            return Ok(());
        }
        self.items.sort_by(|a, b| a.field.cmp(&b.field).then(a.code.cmp(&b.code)));
        self.items.dedup();
        Err(ValidationError {
            entity: self.entity,
            violations: self.items,
        })
    }
}

fn collect(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldViolation>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| default_message(&error.code).to_string());
                    out.push(FieldViolation::new(path.clone(), error.code.to_string(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

fn default_message(code: &str) -> &'static str {
    match code {
        "required" | "length" => "campo obrigatório",
        "email" => "e-mail inválido",
        "range" => "valor fora do intervalo permitido",
        _ => "valor inválido",
    }
}
