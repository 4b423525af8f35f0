//! Configuration validation utilities.
//!
//! Backend implementations describe the TOML table they accept as a `Schema`
//! and validate it before construction, so a typo in `storage.implementations`
//! fails at startup instead of on the first request.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// Error that occurs when a required field is missing.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// Error that occurs when a field has an invalid value.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// Error that occurs when field type is incorrect.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
	/// Error that occurs when a field is not part of the schema.
	#[error("Unknown field: {0}")]
	UnknownField(String),
}

/// Represents the type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	/// A string value.
	String,
	/// An integer value with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	/// A boolean value.
	Boolean,
}

/// Type alias for field validator functions.
///
/// Validators run after the type check and return an error message on failure.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// Represents a field in a configuration schema.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	/// Creates a new field with the given name and type.
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Adds a custom validator to this field.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}
}

/// Validation schema for a TOML table.
///
/// Fields outside `required` and `optional` are rejected.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	/// Creates a new schema with required and optional fields.
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML value against this schema.
	///
	/// # Errors
	///
	/// Returns an error if the value is not a table, a required field is
	/// missing, a field has the wrong type or fails its validator, or an
	/// unknown field is present.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			validate_field(field, value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				validate_field(field, value)?;
			}
		}

		for key in table.keys() {
			let known = self
				.required
				.iter()
				.chain(self.optional.iter())
				.any(|field| &field.name == key);
			if !known {
				return Err(ValidationError::UnknownField(key.clone()));
			}
		}

		Ok(())
	}
}

fn validate_field(field: &Field, value: &toml::Value) -> Result<(), ValidationError> {
	validate_field_type(&field.name, value, &field.field_type)?;

	if let Some(validator) = &field.validator {
		validator(value).map_err(|message| ValidationError::InvalidValue {
			field: field.name.clone(),
			message,
		})?;
	}

	Ok(())
}

fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	let mismatch = |expected: &str| ValidationError::TypeMismatch {
		field: field_name.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	};

	match expected_type {
		FieldType::String => {
			if !value.is_str() {
				return Err(mismatch("string"));
			}
		},
		FieldType::Integer { min, max } => {
			let int_val = value.as_integer().ok_or_else(|| mismatch("integer"))?;

			if let Some(min_val) = min {
				if int_val < *min_val {
					return Err(ValidationError::InvalidValue {
						field: field_name.to_string(),
						message: format!("Value {} is less than minimum {}", int_val, min_val),
					});
				}
			}

			if let Some(max_val) = max {
				if int_val > *max_val {
					return Err(ValidationError::InvalidValue {
						field: field_name.to_string(),
						message: format!("Value {} is greater than maximum {}", int_val, max_val),
					});
				}
			}
		},
		FieldType::Boolean => {
			if !value.is_bool() {
				return Err(mismatch("boolean"));
			}
		},
	}

	Ok(())
}

/// Trait defining a configuration schema that can validate TOML values.
pub trait ConfigSchema: Send + Sync {
	/// Validates a TOML configuration value against this schema.
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn schema() -> Schema {
		Schema::new(
			vec![Field::new("storage_path", FieldType::String)],
			vec![Field::new(
				"lock_timeout_ms",
				FieldType::Integer {
					min: Some(1),
					max: Some(60_000),
				},
			)],
		)
	}

	#[test]
	fn test_valid_table_passes() {
		let value: toml::Value = toml::from_str("storage_path = \"./data\"\nlock_timeout_ms = 500").unwrap();
		assert!(schema().validate(&value).is_ok());
	}

	#[test]
	fn test_missing_required_field() {
		let value: toml::Value = toml::from_str("lock_timeout_ms = 500").unwrap();
		let err = schema().validate(&value).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(ref f) if f == "storage_path"));
	}

	#[test]
	fn test_out_of_range_integer() {
		let value: toml::Value =
			toml::from_str("storage_path = \"./data\"\nlock_timeout_ms = 0").unwrap();
		let err = schema().validate(&value).unwrap_err();
		assert!(err.to_string().contains("less than minimum"));
	}

	#[test]
	fn test_unknown_field_is_rejected() {
		let value: toml::Value =
			toml::from_str("storage_path = \"./data\"\nstorage_pth = \"typo\"").unwrap();
		let err = schema().validate(&value).unwrap_err();
		assert!(matches!(err, ValidationError::UnknownField(ref f) if f == "storage_pth"));
	}

	#[test]
	fn test_custom_validator() {
		let schema = Schema::new(
			vec![Field::new("storage_path", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some(s) if !s.trim().is_empty() => Ok(()),
					_ => Err("must not be empty".to_string()),
				}
			})],
			vec![],
		);
		let value: toml::Value = toml::from_str("storage_path = \" \"").unwrap();
		assert!(schema.validate(&value).is_err());
	}
}
