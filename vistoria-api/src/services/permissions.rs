//! Role-based mutability window
//!
//! The single permission rule consulted by both the lifecycle update and the
//! sync update path: an inspector may only mutate an inspection while it is
//! still a draft; managers and administrators may mutate at any status.

use vistoria_common::{InspectionStatus, UserRole};

/// Whether `role` may mutate an inspection currently in `status`
pub fn can_mutate(role: UserRole, status: InspectionStatus) -> bool {
    match role {
        UserRole::Fiscal => status == InspectionStatus::Rascunho,
        UserRole::Gestor | UserRole::Admin => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [InspectionStatus; 4] = [
        InspectionStatus::Rascunho,
        InspectionStatus::Finalizada,
        InspectionStatus::PendenteAjuste,
        InspectionStatus::Resolvida,
    ];

    #[test]
    fn fiscal_can_only_mutate_drafts() {
        assert!(can_mutate(UserRole::Fiscal, InspectionStatus::Rascunho));
        for status in ALL_STATUSES {
            if status != InspectionStatus::Rascunho {
                assert!(!can_mutate(UserRole::Fiscal, status), "{status} should be locked");
            }
        }
    }

    #[test]
    fn gestor_and_admin_mutate_at_any_status() {
        for status in ALL_STATUSES {
            assert!(can_mutate(UserRole::Gestor, status));
            assert!(can_mutate(UserRole::Admin, status));
        }
    }
}
