use crate::errors::Error;
use crate::files::{self, FileLoader};
use crate::json::pointer;
use log::debug;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAX_REF_HOPS: usize = 64;

/// A parsed specification document. The document is assumed to be
/// normalized already; only local `$ref`s (`#/...`) are followed, lazily,
/// so every schema node keeps the pointer of the place it is declared.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecDocument {
    pub path: PathBuf,
    pub document: Value,
}

impl SpecDocument {
    pub fn new(path: impl Into<PathBuf>, document: Value) -> SpecDocument {
        SpecDocument {
            path: path.into(),
            document,
        }
    }

    pub async fn load<L: FileLoader>(files: &L, path: &Path) -> Result<SpecDocument, Error> {
        let path = files::absolutize(Path::new("."), path);
        let document = files::load_document(files, &path).await?;
        Ok(SpecDocument::new(path, document))
    }

    pub fn directory(&self) -> PathBuf {
        files::parent_dir(&self.path)
    }

    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.document.pointer(pointer)
    }

    /// Follows a chain of local `$ref`s starting at `node` (declared at
    /// `node_pointer`) and returns the final node with its pointer. External
    /// or dangling references stop the chain at the referring node.
    pub fn follow_refs<'a>(&'a self, node: &'a Value, node_pointer: &str) -> (&'a Value, String) {
        let mut current = node;
        let mut current_pointer = node_pointer.to_string();

        for _ in 0..MAX_REF_HOPS {
            let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
                return (current, current_pointer);
            };

            let target = pointer::from_local_ref(reference)
                .and_then(|p| self.document.pointer(p).map(|node| (node, p)));

            match target {
                Some((node, p)) => {
                    current = node;
                    current_pointer = p.to_string();
                }
                None => {
                    debug!(
                        "unable to follow $ref `{}` at `{}` in {}",
                        reference,
                        current_pointer,
                        self.path.display()
                    );
                    return (current, current_pointer);
                }
            }
        }

        debug!(
            "$ref chain at `{}` in {} is too deep, stopping",
            node_pointer,
            self.path.display()
        );
        (current, current_pointer)
    }
}
