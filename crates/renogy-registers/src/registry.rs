use crate::error::{Result, SchemaError};
use crate::types::ModelSchema;
use anyhow::Context;
use serde_yaml::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const BUILTIN: &[(&str, &str)] = &[
    ("rover.yaml", include_str!("../schemas/rover.yaml")),
    ("shunt.yaml", include_str!("../schemas/shunt.yaml")),
];

/// Read-only lookup from model identifier to its field layout.
#[derive(Debug, Default, Clone)]
pub struct RegisterSchema {
    models: HashMap<String, ModelSchema>,
}

impl RegisterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Models shipped with the crate (`rover`, `shunt`).
    pub fn builtin() -> anyhow::Result<Self> {
        let mut reg = Self::new();
        for (origin, raw) in BUILTIN {
            reg.insert(parse_schema_str(raw, origin)?)?;
        }
        Ok(reg)
    }

    /// Validate and add or replace a model, returning the previous schema.
    pub fn insert(&mut self, schema: ModelSchema) -> Result<Option<ModelSchema>> {
        schema.validate()?;
        Ok(self.models.insert(schema.model.clone(), schema))
    }

    pub fn fields_for(&self, model: &str) -> Option<&ModelSchema> {
        self.models.get(model)
    }

    pub fn models(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.models.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Overlay `other` onto this registry; models in `other` win.
    pub fn extend(&mut self, other: RegisterSchema) {
        self.models.extend(other.models);
    }
}

pub fn parse_schema_str(raw: &str, origin: &str) -> anyhow::Result<ModelSchema> {
    let val: Value =
        serde_yaml::from_str(raw).with_context(|| format!("parsing yaml: {origin}"))?;
    let schema: ModelSchema = serde_yaml::from_value(val)
        .with_context(|| format!("decoding schema: {origin}"))?;
    schema
        .validate()
        .with_context(|| format!("validating schema: {origin}"))?;
    debug!(model = %schema.model, fields = schema.fields.len(), origin, "schema loaded");
    Ok(schema)
}

pub fn load_schema_file(path: impl AsRef<Path>) -> anyhow::Result<ModelSchema> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading schema: {}", path.display()))?;
    parse_schema_str(&raw, &path.display().to_string())
}

/// Load every `.yml`/`.yaml` file in `dir`, in file-name order.
pub fn load_schemas_dir(dir: impl AsRef<Path>) -> anyhow::Result<RegisterSchema> {
    let mut reg = RegisterSchema::default();
    let mut entries: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir.as_ref())
        .with_context(|| format!("reading schema dir: {}", dir.as_ref().display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if let Some(ext) = path.extension() {
            if ext == "yml" || ext == "yaml" {
                entries.push(path);
            }
        }
    }
    entries.sort();
    for p in entries {
        let schema = load_schema_file(&p)?;
        if reg.fields_for(&schema.model).is_some() {
            return Err(SchemaError::DuplicateModel(schema.model))
                .with_context(|| format!("loading {}", p.display()));
        }
        reg.insert(schema)?;
    }
    Ok(reg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ByteOrder, FieldSpec, FieldValue, RenogyParser};
    use std::io::Write;

    fn write(dir: &Path, name: &str, body: &str) {
        let mut f = fs::File::create(dir.join(name)).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    #[test]
    fn builtin_models_load() {
        let reg = RegisterSchema::builtin().unwrap();
        assert_eq!(reg.models(), vec!["rover", "shunt"]);
        let rover = reg.fields_for("rover").unwrap();
        assert_eq!(rover.required_len(), 70);
        assert_eq!(rover.fields.len(), 31);
        let shunt = reg.fields_for("shunt").unwrap();
        assert_eq!(shunt.required_len(), 68);
        assert!(reg.fields_for("inverter").is_none());
    }

    #[test]
    fn rover_registers_map_to_payload_offsets() {
        let reg = RegisterSchema::builtin().unwrap();
        let rover = reg.fields_for("rover").unwrap();
        let block = rover.block.unwrap();
        assert_eq!(block.start, 0x100);
        for (name, register, offset) in [
            ("battery_percentage", 256, 0),
            ("load_voltage", 260, 8),
            ("max_discharging_current_today", 270, 28),
        ] {
            let f = rover.field(name).unwrap();
            assert_eq!(f.register, Some(register));
            assert_eq!(f.offset, offset);
            assert_eq!(block.offset_of(register), Some(offset));
        }
        let state = rover.field("charging_state").unwrap();
        assert_eq!(state.label_for(2), Some("mppt"));
        assert_eq!(state.byte_order, ByteOrder::Big);
    }

    #[test]
    fn parse_yaml_with_labels_and_little_endian() {
        let raw = r#"
model: custom
fields:
  - name: mode
    offset: 0
    length: 1
    labels: { 0: "off", 1: "on" }
  - { name: counter, offset: 1, length: 2, byte_order: little }
"#;
        let schema = parse_schema_str(raw, "inline").unwrap();
        assert_eq!(schema.fields[1].byte_order, ByteOrder::Little);
        let out = schema.parse(&[1, 0x90, 0x01]);
        assert_eq!(out["mode"], FieldValue::from("on"));
        assert_eq!(out["counter"], FieldValue::Int(400));
    }

    #[test]
    fn parse_rejects_duplicate_fields() {
        let raw = r#"
model: dup
fields:
  - { name: a, offset: 0, length: 2 }
  - { name: a, offset: 2, length: 2 }
"#;
        let err = parse_schema_str(raw, "inline").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SchemaError>(),
            Some(SchemaError::DuplicateField { .. })
        ));
    }

    #[test]
    fn parse_rejects_register_offset_mismatch() {
        let raw = r#"
model: bad
block: { start: 256, words: 4 }
fields:
  - { name: a, register: 257, offset: 0, length: 2 }
"#;
        let err = parse_schema_str(raw, "inline").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SchemaError>(),
            Some(SchemaError::OffsetMismatch { expected: 2, .. })
        ));
    }

    #[test]
    fn load_dir_reads_yaml_only() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        write(
            dir,
            "a.yaml",
            "model: one\nfields:\n  - { name: x, offset: 0, length: 2 }\n",
        );
        write(
            dir,
            "b.yml",
            "model: two\nfields:\n  - { name: y, offset: 1, length: 1 }\n",
        );
        write(dir, "notes.txt", "not a schema");
        let reg = load_schemas_dir(dir).unwrap();
        assert_eq!(reg.models(), vec!["one", "two"]);
    }

    #[test]
    fn load_dir_rejects_duplicate_models() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let body = "model: same\nfields:\n  - { name: x, offset: 0, length: 2 }\n";
        write(dir, "a.yaml", body);
        write(dir, "b.yaml", body);
        let err = load_schemas_dir(dir).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SchemaError>(),
            Some(SchemaError::DuplicateModel(m)) if m == "same"
        ));
    }

    #[test]
    fn extend_overrides_builtin() {
        let mut reg = RegisterSchema::builtin().unwrap();
        let mut extra = RegisterSchema::new();
        extra.insert(
            parse_schema_str(
                "model: rover\nfields:\n  - { name: only, offset: 0, length: 1 }\n",
                "inline",
            )
            .unwrap(),
        )
        .unwrap();
        reg.extend(extra);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.fields_for("rover").unwrap().fields.len(), 1);
    }

    #[test]
    fn insert_rejects_unvalidated_duplicate_fields() {
        let mut reg = RegisterSchema::new();
        let dup = ModelSchema {
            model: "dup".into(),
            block: None,
            fields: vec![
                FieldSpec::new("a", 0, 1, ByteOrder::Big),
                FieldSpec::new("a", 1, 1, ByteOrder::Big),
            ],
        };
        let err = reg.insert(dup).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { ref field, .. } if field == "a"));
        assert!(reg.is_empty());

        let parser = RenogyParser::new(reg);
        assert!(parser.parse(&[1, 2], "dup").is_empty());
    }

    #[test]
    fn insert_returns_replaced_schema() {
        let mut reg = RegisterSchema::new();
        let first = ModelSchema::new("m", None, vec![FieldSpec::new("a", 0, 1, ByteOrder::Big)])
            .unwrap();
        let second = ModelSchema::new("m", None, vec![FieldSpec::new("b", 0, 2, ByteOrder::Big)])
            .unwrap();
        assert!(reg.insert(first.clone()).unwrap().is_none());
        assert_eq!(reg.insert(second).unwrap(), Some(first));
        assert_eq!(reg.fields_for("m").unwrap().fields[0].name, "b");
    }
}
