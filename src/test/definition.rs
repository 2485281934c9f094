use crate::json::patch::PatchOperation;
use crate::swagger::index::Operation;
use crate::test::file::{
    UnvalidatedArmTemplateStep, UnvalidatedDefinition, UnvalidatedRestCallStep,
    UnvalidatedScenario, UnvalidatedStep,
};
use crate::test::variable::RequiredVariables;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_STATUS_CODE: u16 = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    #[default]
    ResourceGroup,
    Subscription,
    Tenant,
    None,
}

/// A test definition with every step resolved, in execution-ready form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDefinitionFile {
    pub file_path: PathBuf,
    pub scope: Scope,
    pub required_variables: RequiredVariables,
    pub variables: IndexMap<String, Value>,
    pub prepare_steps: Vec<Arc<TestStep>>,
    pub test_scenarios: Vec<TestScenario>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestScenario {
    pub description: String,
    pub share_test_scope: bool,
    pub variables: IndexMap<String, Value>,
    pub required_variables: RequiredVariables,
    /// The scenario's own steps, in declaration order.
    pub steps: Vec<Arc<TestStep>>,
    /// Execution order: the definition's prepare steps, then `steps`.
    pub resolved_steps: Vec<Arc<TestStep>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum TestStep {
    ArmTemplateDeployment(ArmTemplateStep),
    RestCall(RestCallStep),
}

impl TestStep {
    pub fn name(&self) -> Option<&str> {
        match self {
            TestStep::ArmTemplateDeployment(s) => s.step.as_deref(),
            TestStep::RestCall(s) => Some(&s.step),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmTemplateStep {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    pub arm_template_deployment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arm_template_parameters: Option<String>,
    pub variables: IndexMap<String, Value>,
    pub template: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    /// String parameters with neither a default nor a supplied value.
    pub required_parameters: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestCallStep {
    pub step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_step: Option<String>,
    pub operation_id: String,
    #[serde(skip)]
    pub operation: Arc<Operation>,
    pub variables: IndexMap<String, Value>,
    pub request_parameters: Value,
    pub expected_response: Value,
    pub patch_request: Vec<PatchOperation>,
    pub patch_response: Vec<PatchOperation>,
    pub status_code: u16,
    pub example_id: String,
}

impl TestDefinitionFile {
    /// The declared document shape with defaults applied and inferred
    /// operation ids filled in, for writing back to disk.
    pub fn normalized(&self) -> UnvalidatedDefinition {
        UnvalidatedDefinition {
            scope: Some(self.scope),
            required_variables: self.required_variables.to_vec(),
            variables: self.variables.clone(),
            prepare_steps: self.prepare_steps.iter().map(|s| s.normalized()).collect(),
            test_scenarios: self.test_scenarios.iter().map(|s| s.normalized()).collect(),
        }
    }
}

impl TestScenario {
    pub fn normalized(&self) -> UnvalidatedScenario {
        UnvalidatedScenario {
            description: Some(self.description.clone()),
            share_test_scope: Some(self.share_test_scope),
            variables: self.variables.clone(),
            required_variables: self.required_variables.to_vec(),
            steps: self.steps.iter().map(|s| s.normalized()).collect(),
        }
    }
}

impl TestStep {
    pub fn normalized(&self) -> UnvalidatedStep {
        match self {
            TestStep::ArmTemplateDeployment(s) => UnvalidatedStep::ArmTemplate(UnvalidatedArmTemplateStep {
                step: s.step.clone(),
                arm_template_deployment: s.arm_template_deployment.clone(),
                arm_template_parameters: s.arm_template_parameters.clone(),
                variables: s.variables.clone(),
            }),
            TestStep::RestCall(s) => UnvalidatedStep::RestCall(UnvalidatedRestCallStep {
                step: s.step.clone(),
                example_file: s.example_file.clone(),
                from_step: s.from_step.clone(),
                operation_id: Some(s.operation_id.clone()),
                variables: s.variables.clone(),
                patch_request: s.patch_request.clone(),
                patch_response: s.patch_response.clone(),
                status_code: Some(s.status_code),
            }),
        }
    }
}
