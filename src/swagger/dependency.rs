use crate::errors::Error;
use crate::files::{self, FileLoader};
use crate::json::pointer;
use crate::swagger::index::{Operation, OperationIndex};
use crate::swagger::schema::{SchemaKind, SchemaModel, SchemaNode};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerOptions {
    /// Drop references to resource types outside the operation's provider.
    pub no_external_dependency_resource_type: bool,
    /// Drop references to the operation's own top-level resource type.
    pub filer_top_level_resource_type: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyRecord {
    pub resource_type: String,
    pub example_json_pointer: String,
    pub swagger_resource_id_json_path: String,
    pub example_file_path: PathBuf,
}

pub type DependencyMap = IndexMap<PathBuf, Vec<DependencyRecord>>;

/// Provider namespace and top-level resource type an operation path
/// addresses, taken from the segment after its last `/providers/`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OwnedResource {
    namespace: String,
    top_level_type: Option<String>,
}

impl OwnedResource {
    fn from_path(path: &str) -> Option<OwnedResource> {
        let lower = path.to_ascii_lowercase();
        let start = lower.rfind("/providers/")? + "/providers/".len();
        let mut segments = path[start..].split('/').filter(|s| !s.is_empty());

        let namespace = segments.next()?.to_string();
        let top_level_type = segments
            .next()
            .filter(|s| !s.starts_with('{'))
            .map(|t| format!("{}/{}", namespace, t));

        Some(OwnedResource {
            namespace,
            top_level_type,
        })
    }
}

pub struct DependencyAnalyzer<'i> {
    index: &'i OperationIndex,
    options: AnalyzerOptions,
}

impl<'i> DependencyAnalyzer<'i> {
    pub fn new(index: &'i OperationIndex, options: AnalyzerOptions) -> DependencyAnalyzer<'i> {
        DependencyAnalyzer { index, options }
    }

    /// Analyzes every (operation, example) pair of the index. Each example
    /// file is read once; unreadable examples are reported and skipped.
    pub async fn analyze_dependency<L: FileLoader>(&self, files: &L) -> Result<DependencyMap, Error> {
        let mut examples: IndexMap<PathBuf, Option<Value>> = IndexMap::new();
        let mut models: IndexMap<PathBuf, SchemaModel> = IndexMap::new();
        let mut results = DependencyMap::new();

        for (operation, link) in self.index.example_links() {
            if !examples.contains_key(&link.path) {
                let loaded = match files::load_document(files, &link.path).await {
                    Ok(document) => Some(document),
                    Err(e) => {
                        warn!("skipping example of {}: {}", operation.operation_id, e);
                        None
                    }
                };
                examples.insert(link.path.clone(), loaded);
            }
            let Some(Some(example)) = examples.get(&link.path) else {
                continue;
            };

            let model = models
                .entry(operation.spec.path.clone())
                .or_insert_with(|| SchemaModel::new(&operation.spec));

            debug!(
                "analyzing example `{}` of {}",
                link.name, operation.operation_id
            );
            let records = self.analyze_example(model, operation, example, &link.path);
            let known = results.entry(link.path.clone()).or_default();
            for record in records {
                // operations sharing an example rediscover the same references
                if !known.contains(&record) {
                    known.push(record);
                }
            }
        }

        Ok(results)
    }

    /// Walks the request parameters and then every declared response of a
    /// single example against the operation's schemas.
    pub fn analyze_example(
        &self,
        model: &SchemaModel,
        operation: &Operation,
        example: &Value,
        example_path: &Path,
    ) -> Vec<DependencyRecord> {
        let mut walk = Walk {
            model,
            example_path,
            owner: OwnedResource::from_path(&operation.path),
            options: self.options,
            records: Vec::new(),
        };

        if let Some(parameters) = example.get("parameters") {
            for parameter in operation.parameters.iter() {
                let Some(value) = parameters.get(&parameter.name) else {
                    continue;
                };

                let schema_pointer = parameter.schema_pointer.as_deref().unwrap_or(&parameter.pointer);
                let Some(schema) = model.node(schema_pointer) else {
                    continue;
                };

                walk.visit(&schema, value, pointer::push("", &parameter.name), true);
            }
        }

        for (status_code, response) in operation.responses.iter() {
            let body = example
                .get("responses")
                .and_then(|r| r.get(status_code))
                .and_then(|r| r.get("body"));
            let schema = response
                .schema_pointer
                .as_deref()
                .and_then(|p| model.node(p));

            if let (Some(body), Some(schema)) = (body, schema) {
                let example_pointer = pointer::push(&pointer::push("/responses", status_code), "body");
                walk.visit(&schema, body, example_pointer, true);
            }
        }

        walk.records
    }
}

struct Walk<'m, 'a> {
    model: &'m SchemaModel<'a>,
    example_path: &'m Path,
    owner: Option<OwnedResource>,
    options: AnalyzerOptions,
    records: Vec<DependencyRecord>,
}

impl<'m, 'a> Walk<'m, 'a> {
    fn visit(&mut self, schema: &SchemaNode<'a>, value: &Value, example_pointer: String, dispatch: bool) {
        if let Some(id) = value.as_str().filter(|s| !s.is_empty()) {
            if let Some(annotation) = self.model.resource_types(schema) {
                debug!("`{}` at {} references {:?}", id, example_pointer, annotation.resource_types);
                for resource_type in annotation.resource_types {
                    self.emit(resource_type, &example_pointer, &annotation.pointer);
                }
            }
        }

        match self.model.classify(schema, dispatch) {
            SchemaKind::Discriminated(d) => {
                let selected = match value.get(&d.property).and_then(Value::as_str) {
                    None => Some(&d.base),
                    Some(kind) => d.subtypes.get(kind),
                };

                match selected {
                    Some(subtype) => self.visit(subtype, value, example_pointer, false),
                    None => warn!(
                        "{}: no subtype of {} matches {} `{}` at {}, skipping",
                        self.example_path.display(),
                        d.base.pointer,
                        d.property,
                        value.get(&d.property).and_then(Value::as_str).unwrap_or_default(),
                        example_pointer
                    ),
                }
            }
            SchemaKind::Object(object) => {
                let Some(map) = value.as_object() else {
                    return;
                };

                for (name, property) in object.properties.iter() {
                    if let Some(v) = map.get(name) {
                        self.visit(property, v, pointer::push(&example_pointer, name), true);
                    }
                }

                if let Some(additional) = object.additional_properties.as_ref() {
                    for (key, v) in map.iter() {
                        if !object.properties.contains_key(key) {
                            self.visit(additional, v, pointer::push(&example_pointer, key), true);
                        }
                    }
                }
            }
            SchemaKind::Array(items) => {
                let Some(list) = value.as_array() else {
                    return;
                };

                for (i, v) in list.iter().enumerate() {
                    self.visit(&items, v, pointer::push_index(&example_pointer, i), true);
                }
            }
            SchemaKind::Leaf => {}
        }
    }

    fn emit(&mut self, resource_type: String, example_pointer: &str, schema_pointer: &str) {
        if let Some(owner) = self.owner.as_ref() {
            let namespace = resource_type.split('/').next().unwrap_or_default();

            if self.options.no_external_dependency_resource_type
                && !namespace.eq_ignore_ascii_case(&owner.namespace)
            {
                debug!("dropping external resource type {}", resource_type);
                return;
            }

            let is_top_level = owner
                .top_level_type
                .as_deref()
                .map(|t| t.eq_ignore_ascii_case(&resource_type))
                .unwrap_or(false);
            if self.options.filer_top_level_resource_type && is_top_level {
                debug!("dropping top level resource type {}", resource_type);
                return;
            }
        }

        self.records.push(DependencyRecord {
            resource_type,
            example_json_pointer: example_pointer.to_string(),
            swagger_resource_id_json_path: schema_pointer.to_string(),
            example_file_path: self.example_path.to_path_buf(),
        });
    }
}
