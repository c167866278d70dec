use thiserror::Error;

/// A decode failure: what went wrong, and the byte offset of the item that
/// was being decoded when it did.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} (at offset {offset})")]
pub struct Error {
    pub kind: ErrorKind,
    pub offset: usize,
}

impl Error {
    pub fn new(kind: ErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("Not enough data for encoded value")]
    TruncatedInput,

    #[error("Incorrect type, expecting {expected}, found {found}")]
    InvalidMajorType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid additional-info value {0}")]
    InvalidAdditionalInfo(u8),

    #[error("Value does not fit in the target integer type")]
    IntegerOverflow,

    #[error("Float value cannot be narrowed without loss of precision")]
    FloatPrecisionLoss,

    #[error("Unknown variant {discriminant} for {ty}")]
    UnknownVariant { ty: &'static str, discriminant: u64 },

    #[error("Tag mismatch, expecting {expected}, found {}", found_tag(.found))]
    TagMismatch { expected: u64, found: Option<u64> },

    #[error("Maximum nesting depth exceeded")]
    DepthLimitExceeded,

    #[error("Maximum item count exceeded")]
    ItemCountLimitExceeded,

    #[error("Text string contains invalid UTF-8")]
    MalformedUtf8,

    #[error("Indefinite length is not allowed for this major type")]
    IndefiniteLengthNotSupportedHere,

    #[error("Unexpected break marker")]
    UnexpectedBreak,

    #[error("Chunked string contains an invalid chunk")]
    InvalidChunk,

    #[error("Invalid simple value {0}")]
    InvalidSimpleValue(u8),

    #[error("Map has key but no value")]
    PartialMap,

    #[error("Sequence has additional items")]
    AdditionalItems,

    #[error("Sequence has fewer items than expected")]
    MissingItems,

    #[error("Additional data after the decoded item")]
    TrailingData,

    #[error("Missing field '{0}'")]
    MissingField(&'static str),

    #[error("Value is not in canonical form")]
    NonCanonical,

    #[error("{0}")]
    InvalidValue(String),
}

fn found_tag(tag: &Option<u64>) -> String {
    match tag {
        Some(t) => t.to_string(),
        None => "no tag".to_string(),
    }
}

/// Encode failures are limited to the sink the encoding is written into.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Output buffer too small: {needed} bytes needed, {available} available")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("Write to sink failed: {0}")]
    Io(String),

    #[error("No tag registration for type {0:?}")]
    UnregisteredType(core::any::TypeId),
}

/// Errors in building or installing a tag registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Tag {tag} is already registered to {existing}, cannot register {new}")]
    DuplicateTag {
        tag: u64,
        existing: &'static str,
        new: &'static str,
    },

    #[error("Type {0} is already registered")]
    DuplicateType(&'static str),

    #[error("The process-wide registry has already been installed")]
    AlreadyInstalled,

    #[error("The process-wide registry has not been installed")]
    NotInstalled,
}
