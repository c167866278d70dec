/// Default maximum nesting of arrays, maps and tags.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

/// Default maximum number of data items decoded in one call.
pub const DEFAULT_MAX_ITEM_COUNT: usize = 1 << 24;

/// How record types are laid out on the wire.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FieldEncoding {
    /// Field values in declaration order.
    Array,
    /// Field name to field value.
    #[default]
    Map,
}

/// How an absent optional field is written.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AbsentFields {
    /// Left out of map encodings; written as null in array encodings.
    #[default]
    Omit,
    Null,
    Undefined,
}

/// Codec options, shared by the encoder and the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Options {
    pub max_nesting_depth: usize,
    pub max_item_count: usize,
    pub strict_canonical_decode: bool,
    pub field_encoding: FieldEncoding,
    pub absent_fields: AbsentFields,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            max_item_count: DEFAULT_MAX_ITEM_COUNT,
            strict_canonical_decode: false,
            field_encoding: FieldEncoding::default(),
            absent_fields: AbsentFields::default(),
        }
    }
}

impl Options {
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn with_max_item_count(mut self, count: usize) -> Self {
        self.max_item_count = count;
        self
    }

    pub fn with_strict_canonical_decode(mut self, strict: bool) -> Self {
        self.strict_canonical_decode = strict;
        self
    }

    pub fn with_field_encoding(mut self, encoding: FieldEncoding) -> Self {
        self.field_encoding = encoding;
        self
    }

    pub fn with_absent_fields(mut self, absent: AbsentFields) -> Self {
        self.absent_fields = absent;
        self
    }
}
