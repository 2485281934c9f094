use crate::json::pointer;
use log::trace;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use thiserror::Error;

/// A single declarative patch operation as written in a test definition.
/// Each variant is a one-key object naming the operation, e.g.
/// `{add: /properties/tags, value: {}}` or `{copy: /a, path: /b}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatchOperation {
    Add {
        #[serde(rename = "add")]
        path: String,
        value: Value,
    },
    Remove {
        #[serde(rename = "remove")]
        path: String,
    },
    Replace {
        #[serde(rename = "replace")]
        path: String,
        value: Value,
    },
    Copy {
        #[serde(rename = "copy")]
        from: String,
        path: String,
    },
    Move {
        #[serde(rename = "move")]
        from: String,
        path: String,
    },
    Test {
        #[serde(rename = "test")]
        path: String,
        value: Value,
    },
    Merge {
        #[serde(rename = "merge")]
        path: String,
        value: Map<String, Value>,
    },
}

impl PatchOperation {
    pub fn path(&self) -> &str {
        match self {
            PatchOperation::Add { path, .. }
            | PatchOperation::Remove { path }
            | PatchOperation::Replace { path, .. }
            | PatchOperation::Copy { path, .. }
            | PatchOperation::Move { path, .. }
            | PatchOperation::Test { path, .. }
            | PatchOperation::Merge { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("patch operation #{index} at `{path}` failed: {kind}")]
pub struct PatchError {
    /// Position of the failing operation in the list handed to [`apply`].
    pub index: usize,
    pub path: String,
    pub kind: PatchErrorKind,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatchErrorKind {
    #[error("path not found")]
    PathNotFound,
    #[error("test failed, expected {expected}")]
    PatchAssertionFailed { expected: Value, actual: Option<Value> },
    #[error("invalid JSON pointer")]
    InvalidPointer,
    #[error("invalid array index `{0}`")]
    InvalidArrayIndex(String),
    #[error("a value cannot be moved into one of its own children")]
    MoveIntoDescendant,
    #[error("parent of the target location is neither an object nor an array")]
    InvalidTarget,
}

/// Applies `operations` to `document` and returns the patched document.
///
/// `merge` operations are first expanded into one `add` per key of their
/// value, in key order, keeping their position relative to the other
/// operations. The expanded list is then applied with RFC 6902 semantics.
/// The first failing operation aborts the whole patch. An empty list hands
/// back the input itself.
pub fn apply<'a>(
    document: &'a Value,
    operations: &[PatchOperation],
) -> Result<Cow<'a, Value>, PatchError> {
    if operations.is_empty() {
        return Ok(Cow::Borrowed(document));
    }

    let mut patched = document.clone();
    for (index, operation) in expand(operations) {
        trace!("applying patch operation #{} {:?}", index, operation);
        apply_operation(&mut patched, &operation).map_err(|kind| PatchError {
            index,
            path: operation.path().to_string(),
            kind,
        })?;
    }

    Ok(Cow::Owned(patched))
}

fn expand(operations: &[PatchOperation]) -> Vec<(usize, PatchOperation)> {
    let mut expanded = Vec::with_capacity(operations.len());

    for (index, operation) in operations.iter().enumerate() {
        match operation {
            PatchOperation::Merge { path, value } => {
                for (key, item) in value {
                    expanded.push((
                        index,
                        PatchOperation::Add {
                            path: pointer::push(path, key),
                            value: item.clone(),
                        },
                    ));
                }
            }
            other => expanded.push((index, other.clone())),
        }
    }

    expanded
}

fn apply_operation(document: &mut Value, operation: &PatchOperation) -> Result<(), PatchErrorKind> {
    match operation {
        PatchOperation::Add { path, value } => add(document, &tokens(path)?, value.clone()),
        PatchOperation::Remove { path } => remove(document, &tokens(path)?).map(|_| ()),
        PatchOperation::Replace { path, value } => {
            let target = resolve_mut(document, &tokens(path)?).ok_or(PatchErrorKind::PathNotFound)?;
            *target = value.clone();
            Ok(())
        }
        PatchOperation::Copy { from, path } => {
            let value = resolve(document, &tokens(from)?)
                .cloned()
                .ok_or(PatchErrorKind::PathNotFound)?;
            add(document, &tokens(path)?, value)
        }
        PatchOperation::Move { from, path } => {
            let from_tokens = tokens(from)?;
            let path_tokens = tokens(path)?;
            if from_tokens == path_tokens {
                return resolve(document, &from_tokens)
                    .map(|_| ())
                    .ok_or(PatchErrorKind::PathNotFound);
            }
            if path_tokens.starts_with(&from_tokens) {
                return Err(PatchErrorKind::MoveIntoDescendant);
            }

            let value = remove(document, &from_tokens)?;
            add(document, &path_tokens, value)
        }
        PatchOperation::Test { path, value } => {
            let actual = resolve(document, &tokens(path)?);
            if actual.is_some_and(|a| values_equal(a, value)) {
                Ok(())
            } else {
                Err(PatchErrorKind::PatchAssertionFailed {
                    expected: value.clone(),
                    actual: actual.cloned(),
                })
            }
        }
        PatchOperation::Merge { path, value } => {
            for (key, item) in value {
                add(document, &tokens(&pointer::push(path, key))?, item.clone())?;
            }
            Ok(())
        }
    }
}

/// Deep equality where numbers compare by value, so `1` matches `1.0`.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| values_equal(v, w)))
        }
        _ => a == b,
    }
}

fn tokens(path: &str) -> Result<Vec<String>, PatchErrorKind> {
    if path.starts_with('#') {
        return Err(PatchErrorKind::InvalidPointer);
    }
    pointer::split(path).ok_or(PatchErrorKind::InvalidPointer)
}

fn array_index(token: &str) -> Result<usize, PatchErrorKind> {
    let well_formed = !token.is_empty()
        && token.bytes().all(|b| b.is_ascii_digit())
        && (token == "0" || !token.starts_with('0'));

    if !well_formed {
        return Err(PatchErrorKind::InvalidArrayIndex(token.to_string()));
    }

    token
        .parse::<usize>()
        .map_err(|_| PatchErrorKind::InvalidArrayIndex(token.to_string()))
}

fn resolve<'v>(document: &'v Value, tokens: &[String]) -> Option<&'v Value> {
    tokens.iter().try_fold(document, |current, token| match current {
        Value::Object(map) => map.get(token),
        Value::Array(items) => array_index(token).ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn resolve_mut<'v>(document: &'v mut Value, tokens: &[String]) -> Option<&'v mut Value> {
    tokens.iter().try_fold(document, |current, token| match current {
        Value::Object(map) => map.get_mut(token),
        Value::Array(items) => array_index(token).ok().and_then(move |i| items.get_mut(i)),
        _ => None,
    })
}

fn add(document: &mut Value, tokens: &[String], value: Value) -> Result<(), PatchErrorKind> {
    let Some((last, parent_tokens)) = tokens.split_last() else {
        *document = value;
        return Ok(());
    };

    let parent = resolve_mut(document, parent_tokens).ok_or(PatchErrorKind::PathNotFound)?;
    match parent {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            if last == "-" {
                items.push(value);
                return Ok(());
            }

            let index = array_index(last)?;
            if index > items.len() {
                return Err(PatchErrorKind::InvalidArrayIndex(last.clone()));
            }
            items.insert(index, value);
            Ok(())
        }
        _ => Err(PatchErrorKind::InvalidTarget),
    }
}

fn remove(document: &mut Value, tokens: &[String]) -> Result<Value, PatchErrorKind> {
    let Some((last, parent_tokens)) = tokens.split_last() else {
        return Ok(std::mem::take(document));
    };

    let parent = resolve_mut(document, parent_tokens).ok_or(PatchErrorKind::PathNotFound)?;
    match parent {
        Value::Object(map) => map.shift_remove(last).ok_or(PatchErrorKind::PathNotFound),
        Value::Array(items) => {
            let index = array_index(last)?;
            if index >= items.len() {
                return Err(PatchErrorKind::PathNotFound);
            }
            Ok(items.remove(index))
        }
        _ => Err(PatchErrorKind::PathNotFound),
    }
}
