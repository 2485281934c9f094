use crate::json::pointer;
use crate::swagger::document::SpecDocument;
use indexmap::{IndexMap, IndexSet};
use log::trace;
use serde_json::Value;

const ARM_ID_EXTENSION: &str = "x-ms-arm-id-details";
const DISCRIMINATOR_VALUE_EXTENSION: &str = "x-ms-discriminator-value";
const DEFINITION_ROOTS: [&str; 2] = ["/definitions", "/components/schemas"];

/// A schema node as met during a walk: the node at the place it is
/// declared, which may still be a `$ref`.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode<'a> {
    pub value: &'a Value,
    pub pointer: String,
}

impl<'a> SchemaNode<'a> {
    pub fn new(value: &'a Value, pointer: impl Into<String>) -> SchemaNode<'a> {
        SchemaNode {
            value,
            pointer: pointer.into(),
        }
    }

    fn child(&self, key: &str) -> Option<SchemaNode<'a>> {
        self.value
            .get(key)
            .map(|v| SchemaNode::new(v, pointer::push(&self.pointer, key)))
    }
}

#[derive(Debug, PartialEq)]
pub struct ObjectSchema<'a> {
    pub properties: IndexMap<String, SchemaNode<'a>>,
    pub additional_properties: Option<SchemaNode<'a>>,
}

#[derive(Debug, PartialEq)]
pub struct DiscriminatedSchema<'a> {
    pub property: String,
    pub base: SchemaNode<'a>,
    pub subtypes: IndexMap<String, SchemaNode<'a>>,
}

#[derive(Debug, PartialEq)]
pub enum SchemaKind<'a> {
    Object(ObjectSchema<'a>),
    Array(SchemaNode<'a>),
    Discriminated(DiscriminatedSchema<'a>),
    Leaf,
}

/// Resource type annotation found on a schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceTypeAnnotation {
    pub resource_types: Vec<String>,
    pub pointer: String,
}

/// Schema view over one spec document. Polymorphic hierarchies are
/// discovered once, up front, from `allOf` references between definitions.
pub struct SchemaModel<'a> {
    spec: &'a SpecDocument,
    children: IndexMap<String, Vec<String>>,
}

impl<'a> SchemaModel<'a> {
    pub fn new(spec: &'a SpecDocument) -> SchemaModel<'a> {
        let mut children: IndexMap<String, Vec<String>> = IndexMap::new();

        for root in DEFINITION_ROOTS {
            let Some(definitions) = spec.pointer(root).and_then(Value::as_object) else {
                continue;
            };

            for (name, definition) in definitions {
                let child = pointer::push(root, name);
                let parents = definition
                    .get("allOf")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(|member| member.get("$ref").and_then(Value::as_str))
                    .filter_map(pointer::from_local_ref);

                for parent in parents {
                    children
                        .entry(parent.to_string())
                        .or_default()
                        .push(child.clone());
                }
            }
        }

        SchemaModel { spec, children }
    }

    pub fn node(&self, pointer: &str) -> Option<SchemaNode<'a>> {
        self.spec.pointer(pointer).map(|v| SchemaNode::new(v, pointer))
    }

    pub fn resolve(&self, node: &SchemaNode<'a>) -> SchemaNode<'a> {
        let (value, pointer) = self.spec.follow_refs(node.value, &node.pointer);
        SchemaNode { value, pointer }
    }

    /// Looks for `x-ms-arm-id-details` on the node itself, then on its
    /// `$ref` target.
    pub fn resource_types(&self, node: &SchemaNode<'a>) -> Option<ResourceTypeAnnotation> {
        let resolved = self.resolve(node);
        let annotation = [node, &resolved].into_iter().find_map(|candidate| {
            let allowed = candidate
                .value
                .get(ARM_ID_EXTENSION)?
                .get("allowedResources")?
                .as_array()?;

            let resource_types: Vec<String> = allowed
                .iter()
                .filter_map(|r| r.get("type").and_then(Value::as_str))
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();

            if resource_types.is_empty() {
                None
            } else {
                Some(ResourceTypeAnnotation {
                    resource_types,
                    pointer: candidate.pointer.clone(),
                })
            }
        });
        annotation
    }

    /// Whether the node, or its `$ref` target, is marked `readOnly`.
    pub fn is_read_only(&self, node: &SchemaNode<'a>) -> bool {
        let read_only = |n: &SchemaNode| n.value.get("readOnly").and_then(Value::as_bool) == Some(true);
        read_only(node) || read_only(&self.resolve(node))
    }

    /// Classifies a node for walking. With `dispatch` set, a node declaring
    /// a discriminator is reported as [`SchemaKind::Discriminated`];
    /// otherwise it is treated as the plain object it is.
    pub fn classify(&self, node: &SchemaNode<'a>, dispatch: bool) -> SchemaKind<'a> {
        let resolved = self.resolve(node);

        if dispatch {
            if let Some(property) = discriminator_property(resolved.value) {
                return SchemaKind::Discriminated(DiscriminatedSchema {
                    subtypes: self.subtypes(&resolved),
                    property,
                    base: resolved,
                });
            }
        }

        let value = resolved.value;
        let declared_type = value.get("type").and_then(Value::as_str);

        if declared_type == Some("array") || value.get("items").is_some() {
            return match resolved.child("items") {
                Some(items) => SchemaKind::Array(items),
                None => SchemaKind::Leaf,
            };
        }

        let is_object = declared_type == Some("object")
            || value.get("properties").is_some()
            || value.get("allOf").is_some()
            || value.get("additionalProperties").is_some();
        if !is_object {
            return SchemaKind::Leaf;
        }

        let mut properties = IndexMap::new();
        let mut visited = IndexSet::new();
        self.collect_properties(&resolved, &mut properties, &mut visited);

        SchemaKind::Object(ObjectSchema {
            properties,
            additional_properties: resolved
                .child("additionalProperties")
                .filter(|n| n.value.is_object()),
        })
    }

    fn collect_properties(
        &self,
        node: &SchemaNode<'a>,
        properties: &mut IndexMap<String, SchemaNode<'a>>,
        visited: &mut IndexSet<String>,
    ) {
        if !visited.insert(node.pointer.clone()) {
            return;
        }

        if let Some(members) = node.child("allOf") {
            if let Some(list) = members.value.as_array() {
                for (i, member) in list.iter().enumerate() {
                    let member = SchemaNode::new(member, pointer::push_index(&members.pointer, i));
                    let member = self.resolve(&member);
                    self.collect_properties(&member, properties, visited);
                }
            }
        }

        if let Some(own) = node.child("properties") {
            if let Some(map) = own.value.as_object() {
                for (name, property) in map {
                    properties.insert(
                        name.clone(),
                        SchemaNode::new(property, pointer::push(&own.pointer, name)),
                    );
                }
            }
        }
    }

    /// Every known concrete type of a polymorphic base, keyed by its
    /// discriminator value. The base is included under its own value.
    fn subtypes(&self, base: &SchemaNode<'a>) -> IndexMap<String, SchemaNode<'a>> {
        let mut subtypes = IndexMap::new();

        subtypes.insert(self.discriminator_value(&base.pointer, base.value), base.clone());

        let mut pending = vec![base.pointer.clone()];
        let mut seen = IndexSet::new();
        seen.insert(base.pointer.clone());

        while let Some(parent) = pending.pop() {
            for child in self.children.get(&parent).into_iter().flatten() {
                if !seen.insert(child.clone()) {
                    continue;
                }
                if let Some(node) = self.node(child) {
                    let key = self.discriminator_value(child, node.value);
                    trace!("subtype `{}` of {} at {}", key, base.pointer, child);
                    subtypes.entry(key).or_insert(node);
                }
                pending.push(child.clone());
            }
        }

        let mapping = base
            .value
            .get("discriminator")
            .and_then(|d| d.get("mapping"))
            .and_then(Value::as_object);
        for (key, target) in mapping.into_iter().flatten() {
            let node = target
                .as_str()
                .and_then(pointer::from_local_ref)
                .and_then(|p| self.node(p));
            if let Some(node) = node {
                subtypes.insert(key.clone(), node);
            }
        }

        subtypes
    }

    fn discriminator_value(&self, definition_pointer: &str, definition: &Value) -> String {
        if let Some(value) = definition
            .get(DISCRIMINATOR_VALUE_EXTENSION)
            .and_then(Value::as_str)
        {
            return value.to_string();
        }

        pointer::split(definition_pointer)
            .and_then(|tokens| tokens.last().cloned())
            .unwrap_or_default()
    }
}

/// Swagger 2 uses a bare property name, OpenAPI 3 an object.
fn discriminator_property(schema: &Value) -> Option<String> {
    match schema.get("discriminator")? {
        Value::String(property) => Some(property.clone()),
        Value::Object(d) => d
            .get("propertyName")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
