use crate::cohort::RiskLabel;
use crate::runtime::PredictionInput;

/// Builds the ordered advisory list for a classified request.
///
/// Pure and deterministic: rules are checked in a fixed order and each
/// appends independently, so golden-output tests can rely on the exact
/// sequence.
#[must_use]
pub fn recommendations(risk_level: RiskLabel, input: &PredictionInput) -> Vec<String> {
    let mut advisories = Vec::new();

    if risk_level == RiskLabel::High {
        advisories.push(
            "Consult with a healthcare professional immediately for comprehensive health assessment."
                .to_string(),
        );
        advisories.push(
            "Consider lifestyle modifications including diet and exercise changes.".to_string(),
        );
    }

    if input.bmi > 25.0 {
        advisories.push(
            "Focus on gradual weight loss through balanced diet and regular exercise.".to_string(),
        );
    }

    if input.activity_level == "sedentary" {
        advisories.push(
            "Incorporate at least 150 minutes of moderate-intensity exercise per week.".to_string(),
        );
    }

    if input.smoking_status == "current" {
        advisories.push(
            "Consider smoking cessation programs to significantly reduce health risks.".to_string(),
        );
    }

    if risk_level == RiskLabel::Moderate {
        advisories
            .push("Maintain regular health check-ups and monitor key health metrics.".to_string());
    }

    if risk_level == RiskLabel::Low {
        advisories.push("Continue your current healthy lifestyle habits.".to_string());
        advisories
            .push("Regular health screenings are still important for preventive care.".to_string());
    }

    advisories
}
