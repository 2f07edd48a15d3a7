use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::field::decode_field;
use crate::types::ModelSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(u64),
    Label(String),
}

impl FieldValue {
    pub fn as_int(&self) -> Option<u64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            FieldValue::Label(_) => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            FieldValue::Label(s) => Some(s),
            FieldValue::Int(_) => None,
        }
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Label(s.to_string())
    }
}

/// Field name to decoded value. Holds only fields whose bytes were all present.
pub type DecodeResult = HashMap<String, FieldValue>;

impl ModelSchema {
    /// Decode `buffer` against this schema, logging diagnostics through `tracing`.
    pub fn parse(&self, buffer: &[u8]) -> DecodeResult {
        self.parse_with(buffer, &TracingSink)
    }

    /// Decode `buffer` against this schema.
    ///
    /// Fields that run past the end of `buffer` are left out of the result and
    /// a single [`Diagnostic::PartialParse`] is reported for the whole call.
    pub fn parse_with(&self, buffer: &[u8], sink: &dyn DiagnosticSink) -> DecodeResult {
        let mut out = DecodeResult::with_capacity(self.fields.len());
        let mut skipped = 0usize;

        for field in &self.fields {
            match field.end() {
                Some(end) if end <= buffer.len() => {}
                _ => {
                    skipped += 1;
                    continue;
                }
            }
            let raw = decode_field(buffer, field.offset, field.length, field.byte_order);
            let value = match field.label_for(raw) {
                Some(label) => FieldValue::Label(label.to_string()),
                None => FieldValue::Int(raw),
            };
            out.insert(field.name.clone(), value);
        }

        if skipped > 0 {
            sink.report(&Diagnostic::PartialParse {
                model: self.model.clone(),
                actual_len: buffer.len(),
                required_len: self.required_len(),
                skipped,
            });
        }
        out
    }

    /// Schema fields absent from `result`, in declaration order.
    pub fn missing_fields<'a>(&'a self, result: &DecodeResult) -> Vec<&'a str> {
        self.fields
            .iter()
            .filter(|f| !result.contains_key(&f.name))
            .map(|f| f.name.as_str())
            .collect()
    }
}
