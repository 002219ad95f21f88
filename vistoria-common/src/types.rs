//! Domain enums shared across the Vistoria services
//!
//! Wire tokens are the Portuguese values the mobile clients already speak
//! (`RASCUNHO`, `NAO_CONFORME`, ...). Enums are stored as TEXT in SQLite and
//! parsed back at the query layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authenticated user role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    /// Manager
    Gestor,
    /// Field inspector
    Fiscal,
}

/// Business module an inspection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModuleType {
    SegurancaTrabalho,
    ObrasInvestimento,
    ObrasGlobal,
    Canteiro,
    Qualidade,
}

/// Inspection lifecycle status
///
/// ```text
/// RASCUNHO --finalize(no non-conformity)--> FINALIZADA
/// RASCUNHO --finalize(has non-conformity)--> PENDENTE_AJUSTE
/// PENDENTE_AJUSTE --resolve--> RESOLVIDA
/// ```
///
/// `FINALIZADA` and `RESOLVIDA` are terminal for the normal flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionStatus {
    Rascunho,
    Finalizada,
    PendenteAjuste,
    Resolvida,
}

/// Tri-state answer for an inspection item (unset is represented as NULL)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChecklistAnswer {
    Conforme,
    NaoConforme,
    NaoAplicavel,
}

/// Status of a pending adjustment (non-conformity remediation record)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingStatus {
    Pendente,
    Resolvida,
}

macro_rules! impl_wire_token {
    ($ty:ident { $($variant:ident => $token:literal),+ $(,)? }) => {
        impl $ty {
            /// Wire/database token for this value
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $token,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = crate::Error;

            fn from_str(s: &str) -> crate::Result<Self> {
                match s {
                    $($token => Ok(Self::$variant),)+
                    other => Err(crate::Error::Validation(format!(
                        "unknown {} value: {}",
                        stringify!($ty),
                        other
                    ))),
                }
            }
        }
    };
}

impl_wire_token!(UserRole {
    Admin => "ADMIN",
    Gestor => "GESTOR",
    Fiscal => "FISCAL",
});

impl_wire_token!(ModuleType {
    SegurancaTrabalho => "SEGURANCA_TRABALHO",
    ObrasInvestimento => "OBRAS_INVESTIMENTO",
    ObrasGlobal => "OBRAS_GLOBAL",
    Canteiro => "CANTEIRO",
    Qualidade => "QUALIDADE",
});

impl_wire_token!(InspectionStatus {
    Rascunho => "RASCUNHO",
    Finalizada => "FINALIZADA",
    PendenteAjuste => "PENDENTE_AJUSTE",
    Resolvida => "RESOLVIDA",
});

impl_wire_token!(ChecklistAnswer {
    Conforme => "CONFORME",
    NaoConforme => "NAO_CONFORME",
    NaoAplicavel => "NAO_APLICAVEL",
});

impl_wire_token!(PendingStatus {
    Pendente => "PENDENTE",
    Resolvida => "RESOLVIDA",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_tokens_round_trip() {
        for status in [
            InspectionStatus::Rascunho,
            InspectionStatus::Finalizada,
            InspectionStatus::PendenteAjuste,
            InspectionStatus::Resolvida,
        ] {
            assert_eq!(status.as_str().parse::<InspectionStatus>().unwrap(), status);
        }

        assert_eq!(
            "NAO_CONFORME".parse::<ChecklistAnswer>().unwrap(),
            ChecklistAnswer::NaoConforme
        );
        assert_eq!("GESTOR".parse::<UserRole>().unwrap(), UserRole::Gestor);
    }

    #[test]
    fn unknown_token_is_a_validation_error() {
        let err = "DRAFT".parse::<InspectionStatus>().unwrap_err();
        assert!(matches!(err, crate::Error::Validation(_)));
    }

    #[test]
    fn serde_uses_wire_tokens() {
        let json = serde_json::to_string(&InspectionStatus::PendenteAjuste).unwrap();
        assert_eq!(json, "\"PENDENTE_AJUSTE\"");

        let answer: ChecklistAnswer = serde_json::from_str("\"NAO_APLICAVEL\"").unwrap();
        assert_eq!(answer, ChecklistAnswer::NaoAplicavel);
    }
}
