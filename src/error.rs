use thiserror::Error;

/// Failures scoped to a single mesh or to the command line. None of them stop a frame.
#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("unrecognized shader `{0}`")]
    UnknownShader(String),
    #[error("mesh `{path}` references missing vertex {index}")]
    MalformedMesh { path: String, index: usize },
    #[error("option `{0}` expects a value")]
    MissingValue(String),
    #[error("invalid value `{value}` for option `{option}`")]
    InvalidValue { option: String, value: String },
    #[error("unknown option `{0}`")]
    UnknownOption(String),
}
