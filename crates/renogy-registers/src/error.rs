use thiserror::Error;

pub type Result<T, E = SchemaError> = core::result::Result<T, E>;

/// Defects in a model schema, caught when the schema is built or loaded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("model identifier is empty")]
    EmptyModel,
    #[error("model {model}: field with empty name")]
    EmptyFieldName { model: String },
    #[error("model {model}: duplicate field '{field}'")]
    DuplicateField { model: String, field: String },
    #[error("field '{field}': length {length} outside 1..=8 bytes")]
    InvalidLength { field: String, length: usize },
    #[error("field '{field}': register {register} outside block {start}+{words}")]
    RegisterOutsideBlock {
        field: String,
        register: u16,
        start: u16,
        words: u16,
    },
    #[error("field '{field}': offset {offset} does not match register {register} (expected {expected})")]
    OffsetMismatch {
        field: String,
        register: u16,
        offset: usize,
        expected: usize,
    },
    #[error("field '{field}': ends at byte {end}, block payload is {payload_len} bytes")]
    FieldOutsideBlock {
        field: String,
        end: usize,
        payload_len: usize,
    },
    #[error("duplicate model '{0}'")]
    DuplicateModel(String),
}
