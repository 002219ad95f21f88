//! Score and final-status evaluation
//!
//! Pure functions over the answers of an inspection. No database access, so
//! the compliance rules stay independently testable.

use vistoria_common::{ChecklistAnswer, InspectionStatus};

/// Compliance percentage over the evaluated answers.
///
/// Unset and NAO_APLICAVEL answers are excluded from the evaluated set. An
/// inspection with nothing evaluable scores 100 (nothing to be non-compliant
/// about). Rounded half-up to two decimal places, the precision the score is
/// persisted with.
pub fn calculate_score_percent(answers: &[Option<ChecklistAnswer>]) -> f64 {
    let evaluated: Vec<ChecklistAnswer> = answers
        .iter()
        .filter_map(|a| *a)
        .filter(|a| *a != ChecklistAnswer::NaoAplicavel)
        .collect();

    if evaluated.is_empty() {
        return 100.0;
    }

    let conforme_count = evaluated
        .iter()
        .filter(|a| **a == ChecklistAnswer::Conforme)
        .count();

    let raw = 100.0 * conforme_count as f64 / evaluated.len() as f64;
    round_half_up_2(raw)
}

/// True iff at least one answer is NAO_CONFORME
pub fn has_non_conformity(answers: &[Option<ChecklistAnswer>]) -> bool {
    answers
        .iter()
        .any(|a| *a == Some(ChecklistAnswer::NaoConforme))
}

/// Terminal status the inspection finalizes into
pub fn resolve_final_status(answers: &[Option<ChecklistAnswer>]) -> InspectionStatus {
    if has_non_conformity(answers) {
        InspectionStatus::PendenteAjuste
    } else {
        InspectionStatus::Finalizada
    }
}

/// Round half-up to 2 decimal places.
///
/// `f64::round` rounds half away from zero, which is half-up for the
/// non-negative values a percentage can take.
fn round_half_up_2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use vistoria_common::ChecklistAnswer::{Conforme, NaoAplicavel, NaoConforme};

    #[test]
    fn score_is_100_when_nothing_evaluated() {
        assert_eq!(calculate_score_percent(&[]), 100.0);
        assert_eq!(calculate_score_percent(&[None, None]), 100.0);
        assert_eq!(
            calculate_score_percent(&[Some(NaoAplicavel), Some(NaoAplicavel), None]),
            100.0
        );
    }

    #[test]
    fn score_excludes_not_applicable_from_denominator() {
        // 2 conforme / 3 evaluated; NAO_APLICAVEL excluded
        let answers = [
            Some(Conforme),
            Some(Conforme),
            Some(NaoConforme),
            Some(NaoAplicavel),
        ];
        assert_eq!(calculate_score_percent(&answers), 66.67);
    }

    #[test]
    fn score_rounds_half_up_to_two_decimals() {
        // 1/3 = 33.333... -> 33.33
        assert_eq!(
            calculate_score_percent(&[Some(Conforme), Some(NaoConforme), Some(NaoConforme)]),
            33.33
        );
        // 5/6 = 83.333... -> 83.33; 1/6 = 16.666... -> 16.67
        let five_of_six: Vec<_> = std::iter::repeat(Some(Conforme))
            .take(5)
            .chain(std::iter::once(Some(NaoConforme)))
            .collect();
        assert_eq!(calculate_score_percent(&five_of_six), 83.33);
        let one_of_six: Vec<_> = std::iter::once(Some(Conforme))
            .chain(std::iter::repeat(Some(NaoConforme)).take(5))
            .collect();
        assert_eq!(calculate_score_percent(&one_of_six), 16.67);
    }

    #[test]
    fn score_is_exact_on_clean_fractions() {
        assert_eq!(calculate_score_percent(&[Some(Conforme)]), 100.0);
        assert_eq!(calculate_score_percent(&[Some(NaoConforme)]), 0.0);
        assert_eq!(
            calculate_score_percent(&[Some(Conforme), Some(NaoConforme)]),
            50.0
        );
    }

    #[test]
    fn final_status_depends_only_on_non_conformity() {
        assert_eq!(resolve_final_status(&[]), InspectionStatus::Finalizada);
        assert_eq!(
            resolve_final_status(&[Some(Conforme), Some(NaoAplicavel), None]),
            InspectionStatus::Finalizada
        );
        assert_eq!(
            resolve_final_status(&[Some(Conforme), Some(NaoConforme)]),
            InspectionStatus::PendenteAjuste
        );
        // Position must not matter
        assert_eq!(
            resolve_final_status(&[Some(NaoConforme), Some(Conforme)]),
            InspectionStatus::PendenteAjuste
        );
    }

    #[test]
    fn has_non_conformity_ignores_other_answers() {
        assert!(!has_non_conformity(&[Some(Conforme), Some(NaoAplicavel), None]));
        assert!(has_non_conformity(&[None, Some(NaoConforme)]));
    }
}
