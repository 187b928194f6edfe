//! Declarative field schemas for flow inputs, flow outputs and tool contracts.
//!
//! A `Schema` is a named set of `FieldSpec`s. The same definition serves two
//! purposes:
//! - `validate()` checks a JSON value and reports *every* violated field,
//!   never just the first one.
//! - `to_json_schema()` renders a JSON Schema document that is handed to the
//!   model as the required response format (and as tool parameter shapes).
//!
//! Descriptions are semantic hints for the model, not documentation.

use serde_json::{json, Map, Value};

/// Primitive shape of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array(Box<FieldType>),
    Object(Box<Schema>),
}

impl FieldType {
    fn label(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array(_) => "array",
            FieldType::Object(_) => "object",
        }
    }

    fn to_json_schema(&self) -> Value {
        match self {
            FieldType::Array(item) => json!({ "type": "array", "items": item.to_json_schema() }),
            FieldType::Object(schema) => schema.to_json_schema(),
            other => json!({ "type": other.label() }),
        }
    }
}

/// Constraint applied on top of the primitive type.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Minimum number of characters after trimming surrounding whitespace.
    MinLength(usize),
    /// Inclusive numeric range.
    Range { min: f64, max: f64 },
    /// Value must be one of the listed strings (exact match).
    OneOf(&'static [&'static str]),
    /// Value must match the regular expression.
    Pattern(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldType,
    pub required: bool,
    pub description: &'static str,
    pub constraints: Vec<Constraint>,
}

impl FieldSpec {
    pub fn new(name: &'static str, kind: FieldType, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
            constraints: Vec::new(),
        }
    }

    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldType::String, description)
    }

    pub fn number(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldType::Number, description)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.constraints.push(Constraint::MinLength(min));
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.constraints.push(Constraint::Range { min, max });
        self
    }

    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.constraints.push(Constraint::OneOf(allowed));
        self
    }

    pub fn pattern(mut self, pattern: &'static str) -> Self {
        self.constraints.push(Constraint::Pattern(pattern));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub name: &'static str,
    pub fields: Vec<FieldSpec>,
}

/// What went wrong with a single field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViolationKind {
    #[error("required field is missing")]
    Missing,

    #[error("expected {expected}, found {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("must be at least {min} characters")]
    TooShort { min: usize },

    #[error("must be between {min} and {max}")]
    OutOfRange { min: f64, max: f64 },

    #[error("must be one of {allowed:?}")]
    NotAllowed { allowed: &'static [&'static str] },

    #[error("does not match the expected format")]
    PatternMismatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    /// Dotted path to the field, e.g. `healthCenters[1].name`. `$` is the root.
    pub field: String,
    pub kind: ViolationKind,
}

/// A value failed its schema. Enumerates every violated field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{schema}: {}", format_violations(.violations))]
pub struct ValidationError {
    pub schema: &'static str,
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn has_violation(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn format_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{} {}", v.field, v.kind))
        .collect::<Vec<_>>()
        .join("; ")
}

impl Schema {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate a candidate value. Unknown fields are ignored.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        let mut violations = Vec::new();
        self.collect_violations(value, "", &mut violations);

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                schema: self.name,
                violations,
            })
        }
    }

    fn collect_violations(&self, value: &Value, prefix: &str, out: &mut Vec<FieldViolation>) {
        let Some(object) = value.as_object() else {
            out.push(FieldViolation {
                field: if prefix.is_empty() { "$".into() } else { prefix.to_string() },
                kind: ViolationKind::WrongType {
                    expected: "object",
                    found: json_type_name(value),
                },
            });
            return;
        };

        for spec in &self.fields {
            let path = join_path(prefix, spec.name);
            match object.get(spec.name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        out.push(FieldViolation {
                            field: path,
                            kind: ViolationKind::Missing,
                        });
                    }
                }
                Some(field_value) => check_field(&spec.kind, &spec.constraints, field_value, &path, out),
            }
        }
    }

    /// Render as a JSON Schema object suitable for model response formats.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for spec in &self.fields {
            let mut property = spec.kind.to_json_schema();
            if let Some(obj) = property.as_object_mut() {
                obj.insert("description".into(), Value::String(spec.description.into()));
                for constraint in &spec.constraints {
                    match constraint {
                        Constraint::MinLength(min) => {
                            obj.insert("minLength".into(), json!(min));
                        }
                        Constraint::Range { min, max } => {
                            obj.insert("minimum".into(), json!(min));
                            obj.insert("maximum".into(), json!(max));
                        }
                        Constraint::OneOf(allowed) => {
                            obj.insert("enum".into(), json!(allowed));
                        }
                        Constraint::Pattern(pattern) => {
                            obj.insert("pattern".into(), json!(pattern));
                        }
                    }
                }
            }
            properties.insert(spec.name.to_string(), property);
            if spec.required {
                required.push(Value::String(spec.name.to_string()));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

fn check_field(
    kind: &FieldType,
    constraints: &[Constraint],
    value: &Value,
    path: &str,
    out: &mut Vec<FieldViolation>,
) {
    let type_ok = match (kind, value) {
        (FieldType::String, Value::String(_)) => true,
        (FieldType::Number, Value::Number(_)) => true,
        (FieldType::Boolean, Value::Bool(_)) => true,
        (FieldType::Array(item), Value::Array(items)) => {
            for (i, element) in items.iter().enumerate() {
                check_field(item, &[], element, &format!("{path}[{i}]"), out);
            }
            true
        }
        (FieldType::Object(schema), Value::Object(_)) => {
            schema.collect_violations(value, path, out);
            true
        }
        _ => false,
    };

    if !type_ok {
        out.push(FieldViolation {
            field: path.to_string(),
            kind: ViolationKind::WrongType {
                expected: kind.label(),
                found: json_type_name(value),
            },
        });
        return;
    }

    for constraint in constraints {
        if let Some(kind) = check_constraint(constraint, value) {
            out.push(FieldViolation {
                field: path.to_string(),
                kind,
            });
        }
    }
}

fn check_constraint(constraint: &Constraint, value: &Value) -> Option<ViolationKind> {
    match (constraint, value) {
        (Constraint::MinLength(min), Value::String(s)) => {
            (s.trim().chars().count() < *min).then_some(ViolationKind::TooShort { min: *min })
        }
        (Constraint::Range { min, max }, Value::Number(n)) => {
            let v = n.as_f64().unwrap_or(f64::NAN);
            let inside = v >= *min && v <= *max;
            (!inside).then_some(ViolationKind::OutOfRange { min: *min, max: *max })
        }
        (Constraint::OneOf(allowed), Value::String(s)) => {
            (!allowed.contains(&s.as_str())).then_some(ViolationKind::NotAllowed { allowed })
        }
        (Constraint::Pattern(pattern), Value::String(s)) => match regex::Regex::new(pattern) {
            Ok(re) if re.is_match(s) => None,
            Ok(_) => Some(ViolationKind::PatternMismatch),
            Err(e) => {
                tracing::error!(pattern, error = %e, "Schema pattern failed to compile");
                Some(ViolationKind::PatternMismatch)
            }
        },
        // Constraint does not apply to this primitive type.
        _ => None,
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
