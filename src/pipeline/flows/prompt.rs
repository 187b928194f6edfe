//! Instruction templates for the three flows.
//!
//! Rendering is literal interpolation of the request fields. The only
//! conditional is the location block of the diagnosis prompt.

use super::media::DataUri;
use super::tools::FIND_NEARBY_DOCTORS;
use super::types::{DiagnosisRequest, ImageAnalysisRequest, ReportRequest};

/// Rendered instruction for one model call.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub system: &'static str,
    pub prompt: String,
    /// Base64 image payloads attached to the user message.
    pub images: Vec<String>,
}

pub const DIAGNOSIS_SYSTEM_PROMPT: &str = r#"
You are an AI-powered diagnostic assistant that provides preliminary diagnoses
based on symptoms described by the user in their local language.

RULES:
1. Provide a preliminary diagnosis, a confidence level between 0 and 1, an
   urgency alert, suggested over-the-counter medicines, and the type of doctor
   the user should consult.
2. Only mention health centers returned by the tool. Never invent one.
3. Respond with a single JSON object that matches the requested format.
"#;

pub const REPORT_SYSTEM_PROMPT: &str = r#"
You are an AI assistant that writes short, clear health reports for patients.
Respond with a single JSON object that matches the requested format.
"#;

pub const IMAGE_SYSTEM_PROMPT: &str = r#"
You are an expert medical assistant who can analyze medical images like X-rays
and prescriptions. Explain the image simply and clearly for a patient who may
not have medical knowledge. Do not provide a diagnosis. Describe what you see
and explain any notable findings in simple terms.
Respond with a single JSON object that matches the requested format.
"#;

/// Build the preliminary diagnosis instruction.
pub fn build_diagnosis_prompt(request: &DiagnosisRequest) -> Instruction {
    let location_block = match request.location.as_deref() {
        Some(location) => format!(
            "\nLocation: {location}\n\
             The user shared their location. After deciding which specialty they should \
             consult, call the `{FIND_NEARBY_DOCTORS}` tool with that specialty and this location.\n"
        ),
        None => String::new(),
    };

    let prompt = format!(
        r#"Symptoms: {symptoms}
Language: {language}
{location_block}
IMPORTANT: All text-based responses (diagnosis, urgencyAlert, suggestedMedicines,
suggestedDoctors) MUST be in the SCRIPT of the specified language. For example,
if the language is 'hindi', the response must be in Hindi script.

Respond in valid JSON format."#,
        symptoms = request.symptoms,
        language = request.language,
    );

    Instruction {
        system: DIAGNOSIS_SYSTEM_PROMPT,
        prompt,
        images: Vec::new(),
    }
}

/// Build the health report instruction.
pub fn build_report_prompt(request: &ReportRequest) -> Instruction {
    let ctx = &request.context;
    let prompt = format!(
        r#"Symptoms: {symptoms}
Diagnosis: {diagnosis}
Risk Level: {risk}
Recommendation: {recommendation}

Generate a concise and easy-to-understand health report IN THE SCRIPT of the
requested language: {language}. For example, if the language is 'hindi', the
response must be in Hindi script. The report should include a brief overview of
the symptoms, the diagnosis, the associated risk level, and the recommendation
for seeking medical attention."#,
        symptoms = ctx.symptoms,
        diagnosis = ctx.diagnosis,
        risk = ctx.risk_level,
        recommendation = ctx.recommendation,
        language = request.language,
    );

    Instruction {
        system: REPORT_SYSTEM_PROMPT,
        prompt,
        images: Vec::new(),
    }
}

/// Build the image analysis instruction. The image travels as an attachment.
pub fn build_image_prompt(request: &ImageAnalysisRequest) -> Instruction {
    let images = DataUri::parse(&request.photo_data_uri)
        .map(|data| vec![data.payload.trim().to_string()])
        .unwrap_or_default();

    let prompt = format!(
        "Analyze the attached image and provide your analysis in {language}.",
        language = request.language,
    );

    Instruction {
        system: IMAGE_SYSTEM_PROMPT,
        prompt,
        images,
    }
}
