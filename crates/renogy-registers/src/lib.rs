//! renogy-registers: schema-driven decoding of Renogy Modbus-over-BLE payloads
//!
//! A [`RegisterSchema`] maps a model identifier to the byte layout of its
//! payload. [`RenogyParser`] looks the model up and decodes every field
//! that fits in the buffer, reporting short payloads and unknown models
//! through a [`DiagnosticSink`] instead of failing.

mod types;
pub use types::{ByteOrder, FieldSpec, ModelSchema, RegisterBlock};

mod error;
pub use error::{Result, SchemaError};

mod field;
pub use field::{decode_field, raw_words};

mod parser;
pub use parser::{DecodeResult, FieldValue};

mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticSink, RecordingSink, TracingSink};

mod registry;
pub use registry::{load_schema_file, load_schemas_dir, parse_schema_str, RegisterSchema};

mod dispatch;
pub use dispatch::RenogyParser;

mod metrics;
pub use metrics::{DecodeMetrics, MetricsHub};
