use thiserror::Error;

/// Structural problems in the record declarations or registrations, detected while planning.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A record declaration uses a field type (or shape) the planner does not support.
    #[error("Unsupported type in '{record}': {reason}")]
    UnsupportedType {
        /// The record declaration.
        record: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A record nests (or extends) itself, directly or through other records.
    #[error("Recursive type: {0}.")]
    RecursiveType(String),

    /// A container of records, which cannot be expressed as flags.
    #[error("Unsupported nesting at '{dest}': {reason}")]
    UnsupportedNesting {
        /// The destination of the offending field.
        dest: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An alias that cannot become an option string.
    #[error("Invalid alias '{alias}' for '{dest}'.")]
    InvalidAlias {
        /// The alias, as declared.
        alias: String,
        /// The destination of the aliased field.
        dest: String,
    },

    /// A collision that the `None` conflict resolution refuses to fix.
    #[error("Option '{option}' conflicts between destinations {destinations:?}; register the records with distinct prefixes or pick another conflict resolution.")]
    ConflictResolution {
        /// The shared option string.
        option: String,
        /// The colliding destinations.
        destinations: Vec<String>,
    },

    /// A collision that cannot be fixed any further.
    #[error("Option '{option}' cannot be disambiguated between destinations {destinations:?}.")]
    UnresolvableConflict {
        /// The shared option string.
        option: String,
        /// The colliding destinations.
        destinations: Vec<String>,
    },

    /// A collision that the `AlwaysMerge` conflict resolution cannot fuse.
    #[error("Option '{option}' cannot merge destinations {destinations:?}: {reason}")]
    InconsistentArgument {
        /// The shared option string.
        option: String,
        /// The colliding destinations.
        destinations: Vec<String>,
        /// Why they cannot be merged.
        reason: String,
    },

    /// Two registrations (or nested fields) share a destination.
    #[error("Cannot duplicate the destination '{0}'.")]
    DuplicateDestination(String),

    /// A registration destination that is not a dotted path.
    #[error("Invalid destination '{0}'.")]
    InvalidDestination(String),
}

/// A user facing error from matching or converting the Cli tokens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Parse error: {0}")]
pub struct ParseError(pub(crate) String);

/// A failure to rebuild a value at a destination.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Cannot reconstruct '{dest}' from '{value}': {message}")]
pub struct ReconstructError {
    /// The destination path.
    pub dest: String,
    /// The offending value.
    pub value: String,
    /// What went wrong (ex: the decoding function's error).
    pub message: String,
}

/// A failure to convert a [`Value`](./enum.Value.html) into a typed Rust value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Decode error: {0}")]
pub struct DecodeError(String);

impl DecodeError {
    /// Create a decode error with the message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Everything that can go wrong in planning, parsing, or reconstructing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// See [`PlanError`].
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// See [`ParseError`].
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// See [`ReconstructError`].
    #[error(transparent)]
    Reconstruct(#[from] ReconstructError),

    /// See [`DecodeError`].
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Help was requested (`-h`/`--help`); carries the rendered help message.
    #[error("{0}")]
    Help(String),
}

impl Error {
    /// The process exit code for this error: `0` for help, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Help(_) => 0,
            _ => 1,
        }
    }
}
