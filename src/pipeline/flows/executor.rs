//! Flow executor and the three flow definitions.
//!
//! A flow is a named, typed, schema-validated model call. The executor runs
//! the shared steps for every flow: validate input, render, call the model
//! (answering tool calls from the capability table), parse, validate the
//! output, and assemble the typed result.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::contracts::{
    diagnosis_assessment_schema, diagnosis_request_schema, image_analysis_request_schema,
    image_analysis_result_schema, report_request_schema, report_result_schema,
};
use super::parser::extract_json_object;
use super::prompt::{build_diagnosis_prompt, build_image_prompt, build_report_prompt, Instruction};
use super::schema::Schema;
use super::tools::{CapabilityTable, ToolContext, ToolInvocation, FIND_NEARBY_DOCTORS};
use super::types::{
    ChatModel, DiagnosisAssessment, DiagnosisRequest, DiagnosisResult, FindNearbyDoctorsOutput,
    HealthCenter, ImageAnalysisRequest, ImageAnalysisResult, ModelMessage, ModelRequest,
    ReportRequest, ReportResult,
};
use super::FlowError;

/// Upper bound on model turns that request tools before a final answer.
pub const MAX_TOOL_ROUNDS: usize = 4;

pub trait Flow {
    const NAME: &'static str;

    /// Capabilities exposed to the model during this flow.
    const TOOLS: &'static [&'static str] = &[];

    type Input: Serialize;
    /// Shape the model must produce (validated against `output_schema`).
    type ModelOutput: DeserializeOwned;
    type Output;

    fn input_schema() -> Schema;
    fn output_schema() -> Schema;
    fn render(input: &Self::Input) -> Instruction;

    /// What the input tells capabilities, independent of model arguments.
    fn tool_context(_input: &Self::Input) -> ToolContext {
        ToolContext::default()
    }

    fn assemble(
        input: &Self::Input,
        output: Self::ModelOutput,
        invocations: &[ToolInvocation],
    ) -> Result<Self::Output, FlowError>;
}

pub struct FlowExecutor {
    model: Arc<dyn ChatModel + Send + Sync>,
    capabilities: CapabilityTable,
}

impl FlowExecutor {
    pub fn new(model: Arc<dyn ChatModel + Send + Sync>, capabilities: CapabilityTable) -> Self {
        Self {
            model,
            capabilities,
        }
    }

    /// Run one flow to completion. Stateless: nothing from earlier runs is sent.
    pub fn run<F: Flow>(&self, input: &F::Input) -> Result<F::Output, FlowError> {
        let _span = tracing::info_span!("flow", flow = F::NAME).entered();

        let input_value = serde_json::to_value(input)
            .map_err(|e| FlowError::contract(F::NAME, format!("input not serializable: {e}")))?;
        F::input_schema().validate(&input_value).map_err(|e| {
            tracing::info!(violations = e.violations.len(), "Flow input rejected");
            FlowError::Validation(e)
        })?;

        let instruction = F::render(input);
        let mut request = ModelRequest {
            messages: vec![
                ModelMessage::system(instruction.system.trim()),
                ModelMessage::user(instruction.prompt, instruction.images),
            ],
            format: F::output_schema().to_json_schema(),
            tools: self.capabilities.declarations(F::TOOLS),
        };

        let tool_ctx = F::tool_context(input);
        let mut invocations = Vec::new();
        for round in 0..=MAX_TOOL_ROUNDS {
            let reply = self.model.chat(&request).map_err(|e| {
                tracing::warn!(flow = F::NAME, error = %e, "Model call failed");
                e
            })?;

            if reply.tool_calls.is_empty() {
                let result = Self::finish::<F>(input, &reply.content, &invocations);
                if let Err(FlowError::ModelContractViolation { detail, .. }) = &result {
                    tracing::warn!(flow = F::NAME, error = %detail, "Model output rejected");
                }
                return result;
            }

            if round == MAX_TOOL_ROUNDS {
                break;
            }

            request
                .messages
                .push(ModelMessage::assistant_tool_calls(reply.content, reply.tool_calls.clone()));
            for call in &reply.tool_calls {
                let invocation = self.capabilities.invoke(F::NAME, F::TOOLS, call, &tool_ctx)?;
                request
                    .messages
                    .push(ModelMessage::tool_result(&invocation.name, invocation.output.to_string()));
                invocations.push(invocation);
            }
        }

        tracing::warn!(flow = F::NAME, rounds = MAX_TOOL_ROUNDS, "Model kept requesting tools");
        Err(FlowError::contract(
            F::NAME,
            format!("no final answer after {MAX_TOOL_ROUNDS} tool rounds"),
        ))
    }

    fn finish<F: Flow>(
        input: &F::Input,
        content: &str,
        invocations: &[ToolInvocation],
    ) -> Result<F::Output, FlowError> {
        let value = extract_json_object(F::NAME, content)?;
        F::output_schema()
            .validate(&value)
            .map_err(|e| FlowError::contract(F::NAME, e.to_string()))?;
        let output: F::ModelOutput = serde_json::from_value(value)
            .map_err(|e| FlowError::contract(F::NAME, e.to_string()))?;
        F::assemble(input, output, invocations)
    }
}

// ──────────────────────────────────────────────
// Flow definitions
// ──────────────────────────────────────────────

pub struct PreliminaryDiagnosisFlow;

impl Flow for PreliminaryDiagnosisFlow {
    const NAME: &'static str = "preliminaryDiagnosis";
    const TOOLS: &'static [&'static str] = &[FIND_NEARBY_DOCTORS];

    type Input = DiagnosisRequest;
    type ModelOutput = DiagnosisAssessment;
    type Output = DiagnosisResult;

    fn input_schema() -> Schema {
        diagnosis_request_schema()
    }

    fn output_schema() -> Schema {
        diagnosis_assessment_schema()
    }

    fn render(input: &DiagnosisRequest) -> Instruction {
        build_diagnosis_prompt(input)
    }

    fn tool_context(input: &DiagnosisRequest) -> ToolContext {
        ToolContext::with_location(input.location.as_deref())
    }

    fn assemble(
        input: &DiagnosisRequest,
        output: DiagnosisAssessment,
        invocations: &[ToolInvocation],
    ) -> Result<DiagnosisResult, FlowError> {
        let centers = match input.location.as_deref() {
            Some(location) if !location.trim().is_empty() => {
                collect_health_centers(Self::NAME, invocations)?
            }
            _ => Vec::new(),
        };
        let nearby = (!centers.is_empty()).then_some(centers);
        Ok(DiagnosisResult::from_assessment(output, nearby))
    }
}

/// Union of what `findNearbyDoctors` returned, in call order, without repeats.
fn collect_health_centers(
    flow: &'static str,
    invocations: &[ToolInvocation],
) -> Result<Vec<HealthCenter>, FlowError> {
    let mut centers: Vec<HealthCenter> = Vec::new();
    for invocation in invocations.iter().filter(|i| i.name == FIND_NEARBY_DOCTORS) {
        let output: FindNearbyDoctorsOutput = serde_json::from_value(invocation.output.clone())
            .map_err(|e| FlowError::contract(flow, format!("unreadable tool output: {e}")))?;
        for center in output.health_centers {
            if !centers
                .iter()
                .any(|c| c.name == center.name && c.address == center.address)
            {
                centers.push(center);
            }
        }
    }
    Ok(centers)
}

pub struct HealthReportFlow;

impl Flow for HealthReportFlow {
    const NAME: &'static str = "healthReport";

    type Input = ReportRequest;
    type ModelOutput = ReportResult;
    type Output = ReportResult;

    fn input_schema() -> Schema {
        report_request_schema()
    }

    fn output_schema() -> Schema {
        report_result_schema()
    }

    fn render(input: &ReportRequest) -> Instruction {
        build_report_prompt(input)
    }

    fn assemble(_: &ReportRequest, output: ReportResult, _: &[ToolInvocation]) -> Result<ReportResult, FlowError> {
        Ok(output)
    }
}

pub struct ImageAnalysisFlow;

impl Flow for ImageAnalysisFlow {
    const NAME: &'static str = "imageAnalysis";

    type Input = ImageAnalysisRequest;
    type ModelOutput = ImageAnalysisResult;
    type Output = ImageAnalysisResult;

    fn input_schema() -> Schema {
        image_analysis_request_schema()
    }

    fn output_schema() -> Schema {
        image_analysis_result_schema()
    }

    fn render(input: &ImageAnalysisRequest) -> Instruction {
        build_image_prompt(input)
    }

    fn assemble(
        _: &ImageAnalysisRequest,
        output: ImageAnalysisResult,
        _: &[ToolInvocation],
    ) -> Result<ImageAnalysisResult, FlowError> {
        Ok(output)
    }
}
