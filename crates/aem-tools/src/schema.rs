//! Argument validation against tool schemas.
//!
//! Schemas are compiled once with `jsonschema` (draft 2020-12) and every
//! violation is mapped onto a [`ParameterValidationError`] naming the
//! offending argument, e.g. `fields.tags[1]`. An object member holding
//! `null` is treated as absent.

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, ValidationError, Validator};
use serde_json::Value;

use crate::tool::{ParamResult, ParameterValidationError, json_type_name};

/// Name used for a violation on the arguments object itself.
const ROOT_NAME: &str = "arguments";

/// A compiled tool schema.
pub struct ArgumentValidator {
    schema: Value,
    validator: Validator,
}

impl ArgumentValidator {
    /// Compile `schema`. Fails if the schema itself is malformed.
    pub fn compile(schema: Value) -> Result<Self, String> {
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&schema)
            .map_err(|e| e.to_string())?;
        Ok(Self { schema, validator })
    }

    /// Validate `args`, collecting every violation.
    pub fn validate(&self, args: &Value) -> ParamResult<()> {
        let args = without_nulls(args);
        if self.validator.is_valid(&args) {
            return Ok(());
        }

        let errors = self
            .validator
            .iter_errors(&args)
            .flat_map(|error| self.describe(&error))
            .collect();
        match ParameterValidationError::from_many(errors) {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    fn describe(&self, error: &ValidationError<'_>) -> Vec<ParameterValidationError> {
        let at = error.instance_path.to_string();
        let name = argument_name(&at);
        let instance: &Value = &error.instance;

        match &error.kind {
            ValidationErrorKind::Required { property } => {
                let key = property.as_str().map_or_else(|| property.to_string(), str::to_string);
                return vec![ParameterValidationError::missing(
                    child_name(&at, &key),
                    "this argument is required",
                )];
            }
            ValidationErrorKind::AdditionalProperties { unexpected } => {
                return unexpected
                    .iter()
                    .map(|key| {
                        let value = instance.get(key).map(display).unwrap_or_default();
                        ParameterValidationError::invalid_value(
                            child_name(&at, key),
                            value,
                            "unknown argument",
                        )
                    })
                    .collect();
            }
            _ => {}
        }

        let schema_path = error.schema_path.to_string();
        let keyword = schema_path.rsplit('/').next().unwrap_or_default();
        let constraint = self.schema.pointer(&schema_path);

        let mapped = match (keyword, constraint) {
            ("type", Some(expected)) => ParameterValidationError::invalid_type(
                name,
                expected_types(expected),
                json_type_name(instance),
            ),
            ("enum", Some(Value::Array(options))) => {
                let choices: Vec<String> = options.iter().map(Value::to_string).collect();
                ParameterValidationError::invalid_value(
                    name,
                    display(instance),
                    format!("expected one of {}", choices.join(", ")),
                )
            }
            ("minimum", Some(min)) => ParameterValidationError::out_of_range(
                name,
                instance,
                format!("must be at least {}", min),
            ),
            ("maximum", Some(max)) => ParameterValidationError::out_of_range(
                name,
                instance,
                format!("must be at most {}", max),
            ),
            ("minLength", Some(min)) => ParameterValidationError::invalid_value(
                name,
                display(instance),
                format!("must be at least {} characters", min),
            ),
            ("not", Some(Value::Object(negated))) if negated.contains_key("const") => {
                ParameterValidationError::out_of_range(
                    name,
                    instance,
                    format!("must not be {}", negated["const"]),
                )
            }
            _ => ParameterValidationError::invalid_value(name, display(instance), error.to_string()),
        };
        vec![mapped]
    }
}

/// Validate `value` against `schema` without keeping the compiled form.
#[cfg(test)]
pub(crate) fn validate(schema: &Value, value: &Value) -> ParamResult<()> {
    match ArgumentValidator::compile(schema.clone()) {
        Ok(validator) => validator.validate(value),
        Err(e) => Err(ParameterValidationError::invalid_value(
            ROOT_NAME,
            display(value),
            format!("schema does not compile: {}", e),
        )),
    }
}

/// Copy of `value` with `null` object members removed at every depth.
fn without_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), without_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(without_nulls).collect()),
        other => other.clone(),
    }
}

/// Turn a JSON pointer such as `/fields/tags/1` into `fields.tags[1]`.
fn argument_name(pointer: &str) -> String {
    let mut name = String::new();
    for segment in pointer.split('/').skip(1) {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        if !name.is_empty() && segment.parse::<usize>().is_ok() {
            name.push_str(&format!("[{}]", segment));
        } else {
            if !name.is_empty() {
                name.push('.');
            }
            name.push_str(&segment);
        }
    }
    if name.is_empty() {
        ROOT_NAME.to_string()
    } else {
        name
    }
}

fn child_name(pointer: &str, key: &str) -> String {
    if pointer.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", argument_name(pointer), key)
    }
}

fn expected_types(expected: &Value) -> String {
    match expected {
        Value::Array(types) => types
            .iter()
            .map(display)
            .collect::<Vec<_>>()
            .join(" or "),
        other => display(other),
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
