use crate::errors::Error;
use crate::test::file::{UnvalidatedDefinition, UnvalidatedStep};
use log::trace;
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;

const DEFINITION_SCHEMA: &str = include_str!("definition.schema.json");

/// Pass/fail check of a raw test definition document.
pub trait DefinitionValidator {
    fn validate(&self, path: &Path, document: &Value) -> Result<(), Error>;
}

/// Validates against the embedded test definition schema. The schema is
/// compiled once, on construction.
pub struct JsonSchemaValidator {
    validator: jsonschema::Validator,
}

impl JsonSchemaValidator {
    pub fn new() -> Result<JsonSchemaValidator, Error> {
        let schema_path = Path::new("definition.schema.json");
        let schema: Value =
            serde_json::from_str(DEFINITION_SCHEMA).map_err(|e| Error::parse(schema_path, e))?;
        let validator =
            jsonschema::validator_for(&schema).map_err(|e| Error::parse(schema_path, e))?;

        Ok(JsonSchemaValidator { validator })
    }
}

impl DefinitionValidator for JsonSchemaValidator {
    fn validate(&self, path: &Path, document: &Value) -> Result<(), Error> {
        trace!("validating {}", path.display());

        match self.validator.iter_errors(document).next() {
            None => Ok(()),
            Some(error) => Err(Error::SchemaValidation {
                path: path.to_path_buf(),
                pointer: error.instance_path.to_string(),
                message: error.to_string(),
            }),
        }
    }
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^[a-z0-9-_]+$").expect("variable name pattern compiles"))
}

pub fn validate_variable_name(name: &str) -> Result<(), Error> {
    if name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidVariableName {
            name: name.to_string(),
        })
    }
}

/// Checks every declared and bound variable name of a definition.
pub fn validate_variable_names(definition: &UnvalidatedDefinition) -> Result<(), Error> {
    let step_names = |steps: &[UnvalidatedStep]| -> Vec<String> {
        steps
            .iter()
            .flat_map(|s| s.variables().keys().cloned())
            .collect()
    };

    let mut names: Vec<String> = definition.required_variables.clone();
    names.extend(definition.variables.keys().cloned());
    names.extend(step_names(&definition.prepare_steps));

    for scenario in definition.test_scenarios.iter() {
        names.extend(scenario.required_variables.iter().cloned());
        names.extend(scenario.variables.keys().cloned());
        names.extend(step_names(&scenario.steps));
    }

    names.iter().try_for_each(|n| validate_variable_name(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(document: Value) -> Result<(), Error> {
        JsonSchemaValidator::new()
            .unwrap()
            .validate(Path::new("/defs/a.yaml"), &document)
    }

    #[test]
    fn accepts_well_formed_definition() {
        let result = validate(json!({
            "scope": "ResourceGroup",
            "requiredVariables": ["vnetName"],
            "variables": {"prefix": "asc"},
            "prepareSteps": [{"armTemplateDeployment": "./setup.json"}],
            "testScenarios": [{
                "description": "create and chain",
                "steps": [
                    {"step": "create", "exampleFile": "./create.json", "statusCode": 201,
                     "patchRequest": [{"merge": "/parameters", "value": {"tags": {}}}]},
                    {"step": "update", "fromStep": "create", "operationId": "Widgets_Update"}
                ]
            }]
        }));

        assert_eq!(true, result.is_ok());
    }

    #[test]
    fn reports_location_of_first_error() {
        let result = validate(json!({
            "testScenarios": [{"steps": [{"step": "s", "exampleFile": "./a.json", "statusCode": "ok"}]}]
        }));

        match result {
            Err(Error::SchemaValidation { path, pointer, .. }) => {
                assert_eq!(Path::new("/defs/a.yaml"), path);
                assert!(pointer.starts_with("/testScenarios/0/steps/0"));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_scope_and_patch_operation() {
        assert!(validate(json!({"scope": "Galaxy", "testScenarios": []})).is_err());
        assert!(validate(json!({
            "testScenarios": [{"steps": [{"step": "s", "exampleFile": "a.json", "patchRequest": [{"frobnicate": "/a"}]}]}]
        }))
        .is_err());
    }

    #[test]
    fn variable_names_follow_identifier_rules() {
        assert_eq!(true, validate_variable_name("vnet-Name_1").is_ok());
        assert!(matches!(
            validate_variable_name("bad name"),
            Err(Error::InvalidVariableName { name }) if name == "bad name"
        ));
    }

    #[test]
    fn scenario_variables_are_checked() {
        let definition: UnvalidatedDefinition = serde_json::from_value(json!({
            "testScenarios": [{"variables": {"ok": 1, "not ok": 2}, "steps": []}]
        }))
        .unwrap();

        assert!(matches!(
            validate_variable_names(&definition),
            Err(Error::InvalidVariableName { .. })
        ));
    }
}
