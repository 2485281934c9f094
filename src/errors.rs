use crate::json::patch::PatchError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchTarget {
    Request,
    Response,
}

impl fmt::Display for PatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PatchTarget::Request => write!(f, "request"),
            PatchTarget::Response => write!(f, "response"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("operation index has already been initialized")]
    AlreadyInitialized,

    #[error("operation `{method} {path}` in `{spec}` has no operationId")]
    MissingOperationId {
        spec: PathBuf,
        method: String,
        path: String,
    },

    #[error("duplicate operationId `{operation_id}` declared at `{first_path}` and `{second_path}`")]
    DuplicateOperationId {
        operation_id: String,
        first_path: String,
        second_path: String,
    },

    #[error("example `{example}` of operation `{operation_id}` is not a plain file reference")]
    InvalidExampleRef {
        operation_id: String,
        example: String,
    },

    #[error("step `{step}` references unknown operationId `{operation_id}`")]
    UnknownOperationId { step: String, operation_id: String },

    #[error("unable to read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse `{}`: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("test definition `{}` is invalid at `{pointer}`: {message}", path.display())]
    SchemaValidation {
        path: PathBuf,
        pointer: String,
        message: String,
    },

    #[error("variable name `{name}` is invalid - may only contain alphanumeric characters, hyphens, and underscores")]
    InvalidVariableName { name: String },

    #[error("step `{step}` references unknown fromStep `{from_step}`")]
    UnknownFromStep { step: String, from_step: String },

    #[error("step `{step}` uses fromStep `{from_step}` which is not a rest call step")]
    FromStepNotRestCall { step: String, from_step: String },

    #[error("step `{step}` sets both exampleFile and fromStep")]
    ConflictingStepSource { step: String },

    #[error("step `{step}` sets neither exampleFile nor fromStep")]
    MissingStepSource { step: String },

    #[error("step name `{step}` is already used in this scope")]
    DuplicateStepName { step: String },

    #[error("step `{step}`: example `{}` is not referenced by any operation", example_file.display())]
    ExampleNotReferenced { step: String, example_file: PathBuf },

    #[error("step `{step}`: example `{}` is referenced by multiple operations ({}), set operationId explicitly", example_file.display(), operation_ids.join(", "))]
    AmbiguousExampleOwner {
        step: String,
        example_file: PathBuf,
        operation_ids: Vec<String>,
    },

    #[error("step `{step}`: example `{}` has no response for status code {status_code}", example_file.display())]
    ResponseCodeNotFound {
        step: String,
        example_file: PathBuf,
        status_code: u16,
    },

    #[error("arm template `{}` parameter `{parameter}` has type `{param_type}`, only string parameters may be left unset", template.display())]
    UnsupportedParamType {
        template: PathBuf,
        parameter: String,
        param_type: String,
    },

    #[error("step `{step}`: unable to patch {target}: {source}")]
    Patch {
        step: String,
        target: PatchTarget,
        #[source]
        source: PatchError,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Error {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Error {
        Error::Parse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
