//! Error taxonomy for topology compilation.
//!
//! Four classes, all fatal at this layer:
//! - [`ParseError`]: the document could not be read or decoded.
//! - [`ValidationError`]: well-formed document, invalid topology.
//! - [`ResolutionError`]: a spout provider rejected its spec.
//! - [`UsageError`]: malformed provider overrides or builder config.

use thiserror::Error;

/// The topology document could not be read or decoded.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse topology document{}: {source}", location_suffix(.source))]
    Yaml {
        #[from]
        source: serde_yaml::Error,
    },

    #[error("failed to read topology document {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn location_suffix(err: &serde_yaml::Error) -> String {
    match err.location() {
        Some(loc) => format!(" at line {} column {}", loc.line(), loc.column()),
        None => String::new(),
    }
}

/// A well-formed topology that violates a structural rule.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("unknown serializer: {value}. Known: json, msgpack")]
    UnknownSerializer { value: String },

    #[error("{context} is missing required field '{field}'")]
    MissingField { context: String, field: String },

    #[error("{context} has invalid '{field}': {reason}")]
    InvalidValue {
        context: String,
        field: String,
        reason: String,
    },

    #[error("topology entry #{index} declares both a bolt and a spout")]
    AmbiguousComponent { index: usize },

    #[error("unknown component at topology entry #{index}: only bolts and spouts are supported")]
    UnknownComponent { index: usize },

    #[error("duplicate component name: {name}")]
    DuplicateComponent { name: String },

    #[error("bolt '{bolt}' uses unknown grouping type: {kind}")]
    UnknownGrouping { bolt: String, kind: String },

    #[error("bolt '{bolt}' has a malformed grouping at position {index}: {reason}")]
    MalformedGrouping {
        bolt: String,
        index: usize,
        reason: String,
    },

    #[error("bolt '{bolt}' subscribes to unknown component '{component}'")]
    DanglingReference { bolt: String, component: String },

    #[error("bolt '{bolt}' subscribes to stream '{stream}' which '{component}' does not declare")]
    UnknownStream {
        bolt: String,
        component: String,
        stream: String,
    },

    #[error(
        "bolt '{bolt}' groups on fields {fields:?} not declared by '{component}' on stream '{stream}'"
    )]
    UndeclaredFields {
        bolt: String,
        component: String,
        stream: String,
        fields: Vec<String>,
    },

    #[error("{context} declares output field '{field}' more than once on stream '{stream}'")]
    DuplicateOutputField {
        context: String,
        stream: String,
        field: String,
    },

    #[error("spout '{spout}' must have output_fields")]
    SpoutWithoutOutputFields { spout: String },

    #[error("component '{name}' is not registered in the graph")]
    UnregisteredComponent { name: String },
}

/// A spout provider refused to produce a spout.
#[derive(Debug, Error, PartialEq)]
pub enum ResolutionError {
    #[error("{provider} spout '{spout}' is missing required option '{option}'")]
    MissingOption {
        provider: String,
        spout: String,
        option: String,
    },

    #[error("{provider} spout '{spout}' has invalid option '{option}': expected {expected}")]
    InvalidOption {
        provider: String,
        spout: String,
        option: String,
        expected: String,
    },
}

/// Startup-time misuse of the control interface.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("invalid provider override '{arg}': expected KIND=REFERENCE")]
    MalformedOverride { arg: String },

    #[error("provider override for '{kind}' names unknown reference '{reference}'")]
    UnknownReference { kind: String, reference: String },

    #[error("failed to read builder config {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse builder config {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Failure while handing a compiled topology to the runtime.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("failed to encode submission: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write submission: {0}")]
    Io(#[from] std::io::Error),
}

/// Any failure produced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;
