//! Tool-call bridge: capabilities the model may invoke mid-generation.
//!
//! Each capability is registered with a name, a description, input and
//! output schemas, and a handler. The executor only ever talks to the
//! `CapabilityTable`; concrete collaborators (the health-center directory)
//! are injected when the table is built.

use std::sync::Arc;

use serde_json::Value;

use super::contracts::{find_nearby_doctors_input_schema, find_nearby_doctors_output_schema};
use super::schema::Schema;
use super::types::{
    FindNearbyDoctorsInput, FindNearbyDoctorsOutput, HealthCenter, ToolCall, ToolDeclaration,
};
use super::FlowError;
use crate::directory::HealthCenterDirectory;

pub const FIND_NEARBY_DOCTORS: &str = "findNearbyDoctors";

/// Specialty used when nothing matches the requested one.
const FALLBACK_SPECIALTY: &str = "general physician";

/// Handler signature: validated JSON arguments plus the run's context in, JSON result out.
pub type ToolHandler = Box<dyn Fn(Value, &ToolContext) -> Result<Value, String> + Send + Sync>;

/// Facts taken from the flow input, not from model-written arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolContext {
    /// Location the user sent with the request. Blank counts as absent.
    pub location: Option<String>,
}

impl ToolContext {
    pub fn with_location(location: Option<&str>) -> Self {
        Self {
            location: location
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from),
        }
    }
}

pub struct Capability {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Schema,
    pub output_schema: Schema,
    handler: ToolHandler,
}

impl Capability {
    pub fn new(
        name: &'static str,
        description: &'static str,
        input_schema: Schema,
        output_schema: Schema,
        handler: ToolHandler,
    ) -> Self {
        Self {
            name,
            description,
            input_schema,
            output_schema,
            handler,
        }
    }

    pub fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name.to_string(),
            description: self.description.to_string(),
            parameters: self.input_schema.to_json_schema(),
        }
    }
}

/// Record of one executed tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub input: Value,
    pub output: Value,
}

#[derive(Default)]
pub struct CapabilityTable {
    entries: Vec<Capability>,
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding the diagnosis capabilities, backed by `directory`.
    pub fn diagnostic(directory: Arc<dyn HealthCenterDirectory + Send + Sync>) -> Self {
        let mut table = Self::new();
        table.register(find_nearby_doctors_capability(directory));
        table
    }

    /// Register a capability. A later registration with the same name replaces the earlier one.
    pub fn register(&mut self, capability: Capability) {
        self.entries.retain(|c| c.name != capability.name);
        self.entries.push(capability);
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.entries.iter().find(|c| c.name == name)
    }

    /// Declarations for the named capabilities that are registered.
    pub fn declarations(&self, names: &[&str]) -> Vec<ToolDeclaration> {
        names
            .iter()
            .filter_map(|name| self.get(name))
            .map(Capability::declaration)
            .collect()
    }

    /// Run one model-requested call, restricted to `allowed` capabilities.
    pub fn invoke(
        &self,
        flow: &'static str,
        allowed: &[&str],
        call: &ToolCall,
        ctx: &ToolContext,
    ) -> Result<ToolInvocation, FlowError> {
        let capability = allowed
            .contains(&call.name.as_str())
            .then(|| self.get(&call.name))
            .flatten()
            .ok_or_else(|| {
                FlowError::contract(flow, format!("model requested unknown tool '{}'", call.name))
            })?;

        let input = normalize_arguments(&call.arguments);
        capability.input_schema.validate(&input).map_err(|e| {
            FlowError::contract(flow, format!("invalid arguments for '{}': {e}", capability.name))
        })?;

        let output = (capability.handler)(input.clone(), ctx).map_err(|e| {
            tracing::warn!(flow, tool = capability.name, error = %e, "Tool handler failed");
            FlowError::Transport(format!("tool '{}' failed: {e}", capability.name))
        })?;

        capability.output_schema.validate(&output).map_err(|e| {
            FlowError::Transport(format!("tool '{}' returned malformed output: {e}", capability.name))
        })?;

        Ok(ToolInvocation {
            name: capability.name.to_string(),
            input,
            output,
        })
    }
}

/// Some models send tool arguments as a JSON-encoded string.
fn normalize_arguments(arguments: &Value) -> Value {
    match arguments {
        Value::String(raw) => serde_json::from_str(raw).unwrap_or_else(|_| arguments.clone()),
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    }
}

/// Find health centers for a specialty.
///
/// Without a location the directory is not queried and the result is empty.
/// The location is otherwise accepted but not used for matching.
pub fn find_nearby_doctors(
    directory: &dyn HealthCenterDirectory,
    specialty: &str,
    location: Option<&str>,
) -> Vec<HealthCenter> {
    if location.map_or(true, |l| l.trim().is_empty()) {
        tracing::debug!("findNearbyDoctors called without location, returning no centers");
        return Vec::new();
    }

    let matches = directory.query(specialty);
    if !matches.is_empty() {
        return matches;
    }
    directory.query(FALLBACK_SPECIALTY)
}

pub fn find_nearby_doctors_capability(
    directory: Arc<dyn HealthCenterDirectory + Send + Sync>,
) -> Capability {
    Capability::new(
        FIND_NEARBY_DOCTORS,
        "Finds nearby health centers or doctors for a medical specialty. \
         Use it only when the user's location is known.",
        find_nearby_doctors_input_schema(),
        find_nearby_doctors_output_schema(),
        Box::new(move |args, ctx| {
            let input: FindNearbyDoctorsInput =
                serde_json::from_value(args).map_err(|e| e.to_string())?;
            if input.location.is_some() && ctx.location.is_none() {
                tracing::warn!(tool = FIND_NEARBY_DOCTORS, "Ignoring model-supplied location");
            }
            // Only the user's own location unlocks the directory.
            let health_centers =
                find_nearby_doctors(directory.as_ref(), &input.specialty, ctx.location.as_deref());
            tracing::info!(
                tool = FIND_NEARBY_DOCTORS,
                found = health_centers.len(),
                "Tool call completed"
            );
            serde_json::to_value(FindNearbyDoctorsOutput { health_centers }).map_err(|e| e.to_string())
        }),
    )
}
