use crate::error::{Result, SchemaError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Significance ordering of the bytes that make up one field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    #[default]
    #[serde(alias = "big_endian")]
    Big,
    #[serde(alias = "little_endian")]
    Little,
}

/// One named field inside a data payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// Holding register the first byte comes from, if the payload is a register read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register: Option<u16>,
    /// Byte offset relative to the start of the data payload.
    pub offset: usize,
    pub length: usize,
    #[serde(default)]
    pub byte_order: ByteOrder,
    #[serde(default, rename = "labels", skip_serializing_if = "BTreeMap::is_empty")]
    pub value_labels: BTreeMap<u64, String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, offset: usize, length: usize, byte_order: ByteOrder) -> Self {
        Self {
            name: name.into(),
            register: None,
            offset,
            length,
            byte_order,
            value_labels: BTreeMap::new(),
        }
    }

    pub fn with_register(mut self, register: u16) -> Self {
        self.register = Some(register);
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (u64, S)>,
        S: Into<String>,
    {
        self.value_labels = labels.into_iter().map(|(k, v)| (k, v.into())).collect();
        self
    }

    /// End of the field's byte range, `None` if it would overflow `usize`.
    pub fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.length)
    }

    pub fn label_for(&self, raw: u64) -> Option<&str> {
        self.value_labels.get(&raw).map(String::as_str)
    }
}

/// Contiguous holding-register read a payload was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterBlock {
    pub start: u16,
    pub words: u16,
}

impl RegisterBlock {
    pub fn payload_len(&self) -> usize {
        usize::from(self.words) * 2
    }

    pub fn contains(&self, register: u16) -> bool {
        register >= self.start && u32::from(register) < u32::from(self.start) + u32::from(self.words)
    }

    /// Payload byte offset of the high byte of `register`.
    pub fn offset_of(&self, register: u16) -> Option<usize> {
        if self.contains(register) {
            Some(usize::from(register - self.start) * 2)
        } else {
            None
        }
    }
}

/// Field layout of one device model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<RegisterBlock>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl ModelSchema {
    /// Build and validate a schema.
    pub fn new(
        model: impl Into<String>,
        block: Option<RegisterBlock>,
        fields: Vec<FieldSpec>,
    ) -> Result<Self> {
        let schema = Self {
            model: model.into(),
            block,
            fields,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Smallest payload length that decodes every field.
    pub fn required_len(&self) -> usize {
        self.fields
            .iter()
            .filter_map(FieldSpec::end)
            .max()
            .unwrap_or(0)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(SchemaError::EmptyModel);
        }
        let mut seen = HashSet::new();
        for f in &self.fields {
            if f.name.trim().is_empty() {
                return Err(SchemaError::EmptyFieldName {
                    model: self.model.clone(),
                });
            }
            if !seen.insert(f.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    model: self.model.clone(),
                    field: f.name.clone(),
                });
            }
            if f.length == 0 || f.length > 8 {
                return Err(SchemaError::InvalidLength {
                    field: f.name.clone(),
                    length: f.length,
                });
            }
            let end = f.end().ok_or_else(|| SchemaError::InvalidLength {
                field: f.name.clone(),
                length: f.length,
            })?;
            if let Some(block) = &self.block {
                self.check_against_block(block, f, end)?;
            }
        }
        Ok(())
    }

    fn check_against_block(&self, block: &RegisterBlock, f: &FieldSpec, end: usize) -> Result<()> {
        if end > block.payload_len() {
            return Err(SchemaError::FieldOutsideBlock {
                field: f.name.clone(),
                end,
                payload_len: block.payload_len(),
            });
        }
        let Some(register) = f.register else {
            return Ok(());
        };
        let base = block
            .offset_of(register)
            .ok_or_else(|| SchemaError::RegisterOutsideBlock {
                field: f.name.clone(),
                register,
                start: block.start,
                words: block.words,
            })?;
        // single-byte fields may sit in the low half of their register
        let low_half = f.length == 1 && f.offset == base + 1;
        if f.offset != base && !low_half {
            return Err(SchemaError::OffsetMismatch {
                field: f.name.clone(),
                register,
                offset: f.offset,
                expected: base,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> RegisterBlock {
        RegisterBlock {
            start: 256,
            words: 35,
        }
    }

    #[test]
    fn register_offsets_follow_block_start() {
        let b = block();
        assert_eq!(b.offset_of(256), Some(0));
        assert_eq!(b.offset_of(260), Some(8));
        assert_eq!(b.offset_of(270), Some(28));
        assert_eq!(b.offset_of(255), None);
        assert_eq!(b.offset_of(291), None);
        assert_eq!(b.payload_len(), 70);
    }

    #[test]
    fn required_len_is_furthest_field_end() {
        let schema = ModelSchema::new(
            "t",
            None,
            vec![
                FieldSpec::new("a", 0, 2, ByteOrder::Big),
                FieldSpec::new("b", 10, 4, ByteOrder::Little),
                FieldSpec::new("c", 4, 1, ByteOrder::Big),
            ],
        )
        .unwrap();
        assert_eq!(schema.required_len(), 14);
    }

    #[test]
    fn duplicate_field_names_rejected() {
        let err = ModelSchema::new(
            "t",
            None,
            vec![
                FieldSpec::new("a", 0, 2, ByteOrder::Big),
                FieldSpec::new("a", 2, 2, ByteOrder::Big),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { ref field, .. } if field == "a"));
    }

    #[test]
    fn zero_and_oversized_lengths_rejected() {
        for length in [0, 9] {
            let err =
                ModelSchema::new("t", None, vec![FieldSpec::new("a", 0, length, ByteOrder::Big)])
                    .unwrap_err();
            assert!(matches!(err, SchemaError::InvalidLength { .. }));
        }
    }

    #[test]
    fn register_must_match_offset() {
        let ok = ModelSchema::new(
            "t",
            Some(block()),
            vec![
                FieldSpec::new("hi", 6, 1, ByteOrder::Big).with_register(259),
                FieldSpec::new("lo", 7, 1, ByteOrder::Big).with_register(259),
                FieldSpec::new("load_voltage", 8, 2, ByteOrder::Big).with_register(260),
            ],
        );
        assert!(ok.is_ok());

        let err = ModelSchema::new(
            "t",
            Some(block()),
            vec![FieldSpec::new("bad", 9, 2, ByteOrder::Big).with_register(260)],
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::OffsetMismatch { expected: 8, .. }));
    }

    #[test]
    fn register_outside_block_rejected() {
        let err = ModelSchema::new(
            "t",
            Some(block()),
            vec![FieldSpec::new("x", 0, 2, ByteOrder::Big).with_register(12)],
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::RegisterOutsideBlock { register: 12, .. }));
    }

    #[test]
    fn field_past_block_end_rejected() {
        let err = ModelSchema::new(
            "t",
            Some(block()),
            vec![FieldSpec::new("x", 68, 4, ByteOrder::Big)],
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::FieldOutsideBlock { end: 72, .. }));
    }
}
