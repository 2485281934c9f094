use crate::errors::Error;
use crate::files::{self, FileLoader};
use crate::json::pointer;
use crate::swagger::document::SpecDocument;
use indexmap::IndexMap;
use log::{debug, trace};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const METHODS: [&str; 7] = ["get", "put", "post", "patch", "delete", "head", "options"];
const EXAMPLES_EXTENSION: &str = "x-ms-examples";
const REQUEST_BODY_NAME_EXTENSION: &str = "x-ms-requestBody-name";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Body,
    FormData,
    Cookie,
}

impl ParameterLocation {
    fn parse(value: &str) -> Option<ParameterLocation> {
        match value {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "body" => Some(ParameterLocation::Body),
            "formData" => Some(ParameterLocation::FormData),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    /// Pointer of the parameter object itself (after following `$ref`).
    pub pointer: String,
    /// Pointer of the parameter's schema, when it declares one.
    pub schema_pointer: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status_code: String,
    pub schema_pointer: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExampleLink {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct Operation {
    pub operation_id: String,
    pub method: String,
    pub path: String,
    pub parameters: Vec<Parameter>,
    pub responses: IndexMap<String, Response>,
    pub examples: Vec<ExampleLink>,
    pub spec: Arc<SpecDocument>,
}

impl Operation {
    pub fn body_parameter(&self) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.location == ParameterLocation::Body)
    }

    /// Name under which this operation links the example file at `path`.
    pub fn example_name(&self, path: &Path) -> Option<&str> {
        self.examples
            .iter()
            .find(|e| e.path == path)
            .map(|e| e.name.as_str())
    }
}

/// Lookup from operationId to operation and from example file to the
/// operations linking it. Built once by [`OperationIndex::initialize`].
#[derive(Debug, Default)]
pub struct OperationIndex {
    initialized: bool,
    operations: IndexMap<String, Arc<Operation>>,
    example_owners: IndexMap<PathBuf, Vec<Arc<Operation>>>,
}

impl OperationIndex {
    pub fn new() -> OperationIndex {
        OperationIndex::default()
    }

    /// Reads every spec in order and builds the index from them.
    pub async fn load<L: FileLoader>(files: &L, spec_paths: &[PathBuf]) -> Result<OperationIndex, Error> {
        let mut specs = Vec::with_capacity(spec_paths.len());
        for path in spec_paths {
            specs.push(SpecDocument::load(files, path).await?);
        }

        let mut index = OperationIndex::new();
        index.initialize(specs)?;
        Ok(index)
    }

    /// Consumes the given specs. On failure nothing is recorded and the
    /// index stays empty.
    pub fn initialize(&mut self, specs: Vec<SpecDocument>) -> Result<(), Error> {
        if self.is_initialized() {
            return Err(Error::AlreadyInitialized);
        }

        let mut operations: IndexMap<String, Arc<Operation>> = IndexMap::new();
        let mut example_owners: IndexMap<PathBuf, Vec<Arc<Operation>>> = IndexMap::new();

        for spec in specs.into_iter().map(Arc::new) {
            debug!("indexing operations of {}", spec.path.display());

            for operation in read_operations(&spec)? {
                if let Some(existing) = operations.get(&operation.operation_id) {
                    return Err(Error::DuplicateOperationId {
                        operation_id: operation.operation_id.clone(),
                        first_path: existing.path.clone(),
                        second_path: operation.path.clone(),
                    });
                }

                let operation = Arc::new(operation);
                for link in operation.examples.iter() {
                    let owners = example_owners.entry(link.path.clone()).or_default();
                    if !owners.iter().any(|o| Arc::ptr_eq(o, &operation)) {
                        owners.push(operation.clone());
                    }
                }

                trace!(
                    "indexed operation {} ({} {})",
                    operation.operation_id,
                    operation.method,
                    operation.path
                );
                operations.insert(operation.operation_id.clone(), operation);
            }
        }

        self.operations = operations;
        self.example_owners = example_owners;
        self.initialized = true;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn operation(&self, operation_id: &str) -> Option<&Arc<Operation>> {
        self.operations.get(operation_id)
    }

    pub fn operations(&self) -> impl Iterator<Item = &Arc<Operation>> {
        self.operations.values()
    }

    /// Distinct operations linking the example at `path`, in link order.
    pub fn operations_for_example(&self, path: &Path) -> &[Arc<Operation>] {
        self.example_owners
            .get(path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every (operation, example link) pair, in index order.
    pub fn example_links(&self) -> impl Iterator<Item = (&Arc<Operation>, &ExampleLink)> {
        self.operations
            .values()
            .flat_map(|op| op.examples.iter().map(move |link| (op, link)))
    }
}

fn read_operations(spec: &Arc<SpecDocument>) -> Result<Vec<Operation>, Error> {
    let mut results = Vec::new();

    let Some(paths) = spec.document.get("paths").and_then(Value::as_object) else {
        return Ok(results);
    };

    for (path, path_item) in paths {
        let path_pointer = pointer::push("/paths", path);
        let path_parameters = read_parameters(spec, path_item, &path_pointer);

        for method in METHODS {
            let Some(operation) = path_item.get(method) else {
                continue;
            };
            let operation_pointer = pointer::push(&path_pointer, method);

            let operation_id = operation
                .get("operationId")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::MissingOperationId {
                    spec: spec.path.clone(),
                    method: method.to_uppercase(),
                    path: path.clone(),
                })?
                .to_string();

            let mut parameters: Vec<Parameter> = Vec::new();
            let own_parameters = read_parameters(spec, operation, &operation_pointer);
            for parameter in path_parameters.iter() {
                let overridden = own_parameters
                    .iter()
                    .any(|p| p.name == parameter.name && p.location == parameter.location);
                if !overridden {
                    parameters.push(parameter.clone());
                }
            }
            parameters.extend(own_parameters);

            if let Some(body) = read_request_body(spec, operation, &operation_pointer) {
                parameters.push(body);
            }

            let examples = read_examples(spec, operation, &operation_id)?;

            results.push(Operation {
                operation_id,
                method: method.to_string(),
                path: path.clone(),
                parameters,
                responses: read_responses(spec, operation, &operation_pointer),
                examples,
                spec: spec.clone(),
            });
        }
    }

    Ok(results)
}

fn read_parameters(spec: &SpecDocument, owner: &Value, owner_pointer: &str) -> Vec<Parameter> {
    let Some(parameters) = owner.get("parameters").and_then(Value::as_array) else {
        return Vec::new();
    };

    let list_pointer = pointer::push(owner_pointer, "parameters");
    parameters
        .iter()
        .enumerate()
        .filter_map(|(i, parameter)| {
            let (parameter, parameter_pointer) =
                spec.follow_refs(parameter, &pointer::push_index(&list_pointer, i));

            let name = parameter.get("name").and_then(Value::as_str)?;
            let location = parameter
                .get("in")
                .and_then(Value::as_str)
                .and_then(ParameterLocation::parse)?;

            Some(Parameter {
                name: name.to_string(),
                location,
                required: parameter
                    .get("required")
                    .and_then(Value::as_bool)
                    .unwrap_or(location == ParameterLocation::Path),
                schema_pointer: parameter
                    .get("schema")
                    .map(|_| pointer::push(&parameter_pointer, "schema")),
                pointer: parameter_pointer,
            })
        })
        .collect()
}

/// Picks the JSON media type of an OpenAPI 3 `content` map, falling back
/// to the first declared one.
fn content_schema_pointer(content: &Map<String, Value>, content_pointer: &str) -> Option<String> {
    let media_type = content
        .keys()
        .find(|k| k.contains("json"))
        .or_else(|| content.keys().next())?;

    content
        .get(media_type)
        .and_then(|m| m.get("schema"))
        .map(|_| pointer::push(&pointer::push(content_pointer, media_type), "schema"))
}

fn read_request_body(spec: &SpecDocument, operation: &Value, operation_pointer: &str) -> Option<Parameter> {
    let request_body = operation.get("requestBody")?;
    let (request_body, body_pointer) =
        spec.follow_refs(request_body, &pointer::push(operation_pointer, "requestBody"));

    let content = request_body.get("content").and_then(Value::as_object)?;
    let name = operation
        .get(REQUEST_BODY_NAME_EXTENSION)
        .or_else(|| request_body.get(REQUEST_BODY_NAME_EXTENSION))
        .and_then(Value::as_str)
        .unwrap_or("body");

    Some(Parameter {
        name: name.to_string(),
        location: ParameterLocation::Body,
        required: request_body
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        schema_pointer: content_schema_pointer(content, &pointer::push(&body_pointer, "content")),
        pointer: body_pointer,
    })
}

fn read_responses(spec: &SpecDocument, operation: &Value, operation_pointer: &str) -> IndexMap<String, Response> {
    let Some(responses) = operation.get("responses").and_then(Value::as_object) else {
        return IndexMap::new();
    };

    let responses_pointer = pointer::push(operation_pointer, "responses");
    responses
        .iter()
        .map(|(status_code, response)| {
            let (response, response_pointer) =
                spec.follow_refs(response, &pointer::push(&responses_pointer, status_code));

            let schema_pointer = if response.get("schema").is_some() {
                Some(pointer::push(&response_pointer, "schema"))
            } else {
                response
                    .get("content")
                    .and_then(Value::as_object)
                    .and_then(|c| content_schema_pointer(c, &pointer::push(&response_pointer, "content")))
            };

            (
                status_code.clone(),
                Response {
                    status_code: status_code.clone(),
                    schema_pointer,
                },
            )
        })
        .collect()
}

fn read_examples(spec: &SpecDocument, operation: &Value, operation_id: &str) -> Result<Vec<ExampleLink>, Error> {
    let Some(examples) = operation.get(EXAMPLES_EXTENSION).and_then(Value::as_object) else {
        return Ok(Vec::new());
    };

    let directory = spec.directory();
    examples
        .iter()
        .map(|(name, link)| {
            let reference = link
                .as_object()
                .filter(|l| l.len() == 1)
                .and_then(|l| l.get("$ref"))
                .and_then(Value::as_str)
                .filter(|r| !r.is_empty() && !r.contains('#'))
                .ok_or_else(|| Error::InvalidExampleRef {
                    operation_id: operation_id.to_string(),
                    example: name.clone(),
                })?;

            Ok(ExampleLink {
                name: name.clone(),
                path: files::absolutize(&directory, Path::new(reference)),
            })
        })
        .collect()
}
