//! Declared input/output schemas for every flow and for the tool bridge.

use super::schema::{FieldSpec, FieldType, Schema};
use super::types::RiskLevel;

/// Symptom descriptions shorter than this (after trimming) are rejected.
pub const MIN_SYMPTOM_CHARS: usize = 10;

/// "lat,long" with optional sign, decimals and a space after the comma.
pub const LOCATION_PATTERN: &str = r"^\s*-?\d{1,3}(\.\d+)?\s*,\s*-?\d{1,3}(\.\d+)?\s*$";

/// `data:<mime>;base64,` prefix.
pub const DATA_URI_PATTERN: &str = r"^data:[A-Za-z0-9.+-]+/[A-Za-z0-9.+-]+;base64,";

fn language_field(description: &'static str) -> FieldSpec {
    FieldSpec::string("language", description).min_length(1)
}

pub fn diagnosis_request_schema() -> Schema {
    Schema::new("DiagnosisRequest")
        .field(
            FieldSpec::string("symptoms", "The user's symptoms described in their local language.")
                .min_length(MIN_SYMPTOM_CHARS),
        )
        .field(language_field(
            "The language in which the symptoms are described (e.g., hindi, tamil).",
        ))
        .field(
            FieldSpec::string("location", "The user's coarse location as 'latitude,longitude'.")
                .optional()
                .pattern(LOCATION_PATTERN),
        )
}

/// Output the model must produce for a preliminary diagnosis.
pub fn diagnosis_assessment_schema() -> Schema {
    Schema::new("DiagnosisAssessment")
        .field(FieldSpec::string(
            "diagnosis",
            "The preliminary diagnosis, written in the script of the requested language.",
        ))
        .field(
            FieldSpec::number(
                "confidenceLevel",
                "Confidence in the diagnosis from 0 to 1, where 1 is the highest confidence.",
            )
            .range(0.0, 1.0),
        )
        .field(FieldSpec::string(
            "urgencyAlert",
            "How urgently to seek medical attention (e.g., 'Seek a doctor immediately'), in the requested language.",
        ))
        .field(FieldSpec::string(
            "suggestedMedicines",
            "Suggested over-the-counter medicines for the symptoms, in the requested language.",
        ))
        .field(FieldSpec::string(
            "suggestedDoctors",
            "Types of specialists to consult (e.g., General Physician, Cardiologist), in the requested language.",
        ))
}

pub fn report_request_schema() -> Schema {
    Schema::new("ReportRequest")
        .field(FieldSpec::string("symptoms", "A summary of the patient's symptoms.").min_length(1))
        .field(FieldSpec::string("diagnosis", "The preliminary diagnosis.").min_length(1))
        .field(
            FieldSpec::string("riskLevel", "The risk level associated with the diagnosis.")
                .one_of(RiskLevel::ALL),
        )
        .field(FieldSpec::string(
            "recommendation",
            "A recommendation for seeking medical attention (e.g., see a doctor).",
        ))
        .field(language_field(
            "The language for the report (e.g., hindi, tamil). The report must be in this language.",
        ))
}

pub fn report_result_schema() -> Schema {
    Schema::new("ReportResult").field(
        FieldSpec::string(
            "report",
            "A concise health report covering symptoms, diagnosis, risk level and recommendation.",
        )
        .min_length(1),
    )
}

pub fn image_analysis_request_schema() -> Schema {
    Schema::new("ImageAnalysisRequest")
        .field(
            FieldSpec::string(
                "photoDataUri",
                "A photo of a medical document as a base64 data URI: 'data:<mimetype>;base64,<encoded_data>'.",
            )
            .pattern(DATA_URI_PATTERN),
        )
        .field(language_field("The language for the analysis response."))
}

pub fn image_analysis_result_schema() -> Schema {
    Schema::new("ImageAnalysisResult").field(
        FieldSpec::string(
            "analysis",
            "A simple, easy-to-understand explanation of the medical image.",
        )
        .min_length(1),
    )
}

pub fn health_center_schema() -> Schema {
    Schema::new("HealthCenter")
        .field(FieldSpec::string("name", "Name of the health center."))
        .field(FieldSpec::string("address", "Street address."))
        .field(FieldSpec::string("phone", "Contact phone number."))
        .field(FieldSpec::string("specialty", "Medical specialty offered.").optional())
}

pub fn find_nearby_doctors_input_schema() -> Schema {
    Schema::new("FindNearbyDoctorsInput")
        .field(
            FieldSpec::string(
                "specialty",
                "The medical specialty to search for (e.g., Cardiology, Dermatology, General Physician).",
            )
            .min_length(1),
        )
        .field(
            FieldSpec::string("location", "The user's location as 'latitude,longitude'.").optional(),
        )
}

pub fn find_nearby_doctors_output_schema() -> Schema {
    Schema::new("FindNearbyDoctorsOutput").field(FieldSpec::new(
        "healthCenters",
        FieldType::Array(Box::new(FieldType::Object(Box::new(health_center_schema())))),
        "Health centers matching the specialty, in directory order.",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assessment_rejects_missing_confidence() {
        let err = diagnosis_assessment_schema()
            .validate(&json!({
                "diagnosis": "Flu",
                "urgencyAlert": "Rest",
                "suggestedMedicines": "Paracetamol",
                "suggestedDoctors": "General Physician"
            }))
            .unwrap_err();
        assert!(err.has_violation("confidenceLevel"));
    }

    #[test]
    fn assessment_rejects_confidence_above_one() {
        let err = diagnosis_assessment_schema()
            .validate(&json!({
                "diagnosis": "Flu",
                "confidenceLevel": 1.5,
                "urgencyAlert": "Rest",
                "suggestedMedicines": "Paracetamol",
                "suggestedDoctors": "General Physician"
            }))
            .unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert!(err.has_violation("confidenceLevel"));
    }

    #[test]
    fn diagnosis_request_location_format() {
        let schema = diagnosis_request_schema();
        let base = |loc: &str| {
            json!({ "symptoms": "Fever and chills since yesterday", "language": "english", "location": loc })
        };
        assert!(schema.validate(&base("12.9,77.6")).is_ok());
        assert!(schema.validate(&base("-33.86, 151.2")).is_ok());
        assert!(schema.validate(&base("near the market")).is_err());
    }

    #[test]
    fn diagnosis_request_without_location_is_valid() {
        let value = json!({ "symptoms": "Fever and chills since yesterday", "language": "hindi" });
        assert!(diagnosis_request_schema().validate(&value).is_ok());
    }

    #[test]
    fn report_request_rejects_unknown_risk_level() {
        let err = report_request_schema()
            .validate(&json!({
                "symptoms": "Cough",
                "diagnosis": "Cold",
                "riskLevel": "Severe",
                "recommendation": "Rest",
                "language": "english"
            }))
            .unwrap_err();
        assert!(err.has_violation("riskLevel"));
    }

    #[test]
    fn image_request_requires_data_uri() {
        let schema = image_analysis_request_schema();
        assert!(schema
            .validate(&json!({ "photoDataUri": "data:image/png;base64,iVBORw0KGgo=", "language": "english" }))
            .is_ok());
        assert!(schema
            .validate(&json!({ "photoDataUri": "https://example.com/x.png", "language": "english" }))
            .is_err());
    }

    #[test]
    fn tool_output_schema_checks_nested_centers() {
        let schema = find_nearby_doctors_output_schema();
        assert!(schema.validate(&json!({ "healthCenters": [] })).is_ok());
        let err = schema
            .validate(&json!({ "healthCenters": [{ "name": "A", "address": "B" }] }))
            .unwrap_err();
        assert!(err.has_violation("healthCenters[0].phone"));
    }

    #[test]
    fn assessment_json_schema_lists_all_required_fields() {
        let rendered = diagnosis_assessment_schema().to_json_schema();
        assert_eq!(rendered["required"].as_array().unwrap().len(), 5);
        assert_eq!(rendered["properties"]["confidenceLevel"]["type"], "number");
    }
}
