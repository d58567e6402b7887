use thiserror::Error;

/// Registry lookup failure for a stage kind nobody registered.
#[derive(Debug, Clone, Error)]
#[error("unknown stage kind '{0}'")]
pub struct UnknownKind(pub String);

/// Structural defect in a [`GraphSpec`](crate::core::graph::GraphSpec).
///
/// Detected by `build()` before any backend resource is touched. Every
/// variant names the offending stage or edge.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("duplicate stage id '{0}'")]
    DuplicateStage(String),

    #[error("stage '{stage}' declares unknown kind '{kind}'")]
    UnknownKind { stage: String, kind: String },

    #[error("edge '{edge}' references undeclared stage '{stage}'")]
    DanglingEdge { edge: String, stage: String },

    #[error("source stage '{stage}' cannot have inbound edge '{edge}'")]
    SourceHasInput { stage: String, edge: String },

    #[error("sink stage '{stage}' cannot have outbound edge '{edge}'")]
    SinkHasOutput { stage: String, edge: String },

    #[error("stage '{stage}' has no port named '{port}'")]
    UnknownPort { stage: String, port: String },

    #[error("output port '{stage}.{port}' is linked more than once")]
    OutputPortReused { stage: String, port: String },

    #[error("input port '{stage}.{port}' is linked more than once")]
    InputPortReused { stage: String, port: String },

    #[error("required input '{stage}.{port}' is not connected")]
    UnconnectedInput { stage: String, port: String },

    #[error("fan-out stage '{stage}' has no output branch")]
    FanOutWithoutBranches { stage: String },

    #[error("graph contains a cycle")]
    Cycle,
}

/// The backing implementation could not create a stage instance, or a
/// created instance refused a lifecycle transition. Environment-dependent
/// (missing capture device, bad configuration value).
#[derive(Debug, Clone, Error)]
#[error("could not instantiate stage '{stage}' (kind '{kind}'): {reason}")]
pub struct InstantiationError {
    pub stage: String,
    pub kind: String,
    pub reason: String,
}

impl InstantiationError {
    pub fn new(
        stage: impl Into<String>,
        kind: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            stage: stage.into(),
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}

/// Two stage ports could not be connected.
#[derive(Debug, Clone, Error)]
pub enum ConnectError {
    #[error("stage '{stage}' has no output port '{port}'")]
    NoSuchOutput { stage: String, port: String },

    #[error("stage '{stage}' has no input port '{port}'")]
    NoSuchInput { stage: String, port: String },

    #[error("port '{stage}.{port}' is already linked")]
    AlreadyLinked { stage: String, port: String },

    #[error("incompatible caps linking '{from}' to '{to}': upstream emits {emitted}, downstream accepts {accepted}")]
    IncompatibleCaps {
        from: String,
        to: String,
        emitted: String,
        accepted: String,
    },

    #[error("connection refused: {0}")]
    Refused(String),
}

/// First failure encountered during activation.
#[derive(Debug, Clone, Error)]
pub enum LinkFailure {
    #[error(transparent)]
    Instantiation(#[from] InstantiationError),

    #[error(transparent)]
    Connect(#[from] ConnectError),
}

/// Aggregate activation failure.
///
/// Wraps the first [`InstantiationError`] or [`ConnectError`] hit while
/// linking; by the time the caller sees this, every stage instantiated so
/// far has already been stopped and destroyed. For an instantiation
/// failure `from_stage` and `to_stage` both name the stage that failed.
#[derive(Debug, Clone, Error)]
#[error("activation failed linking '{from_stage}' to '{to_stage}': {reason}")]
pub struct LinkError {
    pub from_stage: String,
    pub to_stage: String,
    #[source]
    pub reason: LinkFailure,
}

impl LinkError {
    pub fn new(
        from_stage: impl Into<String>,
        to_stage: impl Into<String>,
        reason: impl Into<LinkFailure>,
    ) -> Self {
        Self {
            from_stage: from_stage.into(),
            to_stage: to_stage.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for failures attributable to a single stage.
    pub fn at_stage(stage: impl Into<String>, reason: impl Into<LinkFailure>) -> Self {
        let stage = stage.into();
        Self::new(stage.clone(), stage, reason)
    }
}

#[derive(Debug, Error)]
pub enum JasmError {
    #[error(transparent)]
    UnknownKind(#[from] UnknownKind),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Instantiation(#[from] InstantiationError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("invalid caps string: {0}")]
    Caps(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, JasmError>;
