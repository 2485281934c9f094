use crate::swagger::index::Operation;
use crate::swagger::schema::{SchemaKind, SchemaModel, SchemaNode};
use log::trace;
use serde_json::Value;

/// Shapes a response body taken from an earlier step into the request body
/// of the operation a chained step calls.
pub trait BodyTransformer {
    fn response_to_request(&self, target: &Operation, response_body: &Value) -> Value;
}

/// Removes every property the target's body schema marks `readOnly`,
/// following discriminators, arrays and maps. Bodies of operations without
/// a body schema pass through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadOnlyPruner;

impl BodyTransformer for ReadOnlyPruner {
    fn response_to_request(&self, target: &Operation, response_body: &Value) -> Value {
        let mut body = response_body.clone();

        let schema_pointer = target
            .body_parameter()
            .and_then(|p| p.schema_pointer.as_deref());
        let model = SchemaModel::new(&target.spec);

        if let Some(schema) = schema_pointer.and_then(|p| model.node(p)) {
            prune(&model, &schema, &mut body, true);
        }

        body
    }
}

fn prune<'a>(model: &SchemaModel<'a>, schema: &SchemaNode<'a>, value: &mut Value, dispatch: bool) {
    match model.classify(schema, dispatch) {
        SchemaKind::Discriminated(d) => {
            let selected = match value.get(&d.property).and_then(Value::as_str) {
                None => Some(&d.base),
                Some(kind) => d.subtypes.get(kind),
            };
            if let Some(subtype) = selected {
                prune(model, subtype, value, false);
            }
        }
        SchemaKind::Object(object) => {
            let Some(map) = value.as_object_mut() else {
                return;
            };

            for (name, property) in object.properties.iter() {
                if model.is_read_only(property) {
                    if map.shift_remove(name).is_some() {
                        trace!("pruned read-only property {}", property.pointer);
                    }
                } else if let Some(child) = map.get_mut(name) {
                    prune(model, property, child, true);
                }
            }

            if let Some(additional) = object.additional_properties.as_ref() {
                for (key, child) in map.iter_mut() {
                    if !object.properties.contains_key(key) {
                        prune(model, additional, child, true);
                    }
                }
            }
        }
        SchemaKind::Array(items) => {
            if let Some(list) = value.as_array_mut() {
                for child in list.iter_mut() {
                    prune(model, &items, child, true);
                }
            }
        }
        SchemaKind::Leaf => {}
    }
}
