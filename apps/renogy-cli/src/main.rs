use anyhow::Result;
use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::info;

use renogy_registers as regs;

mod config;
use config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "renogy",
    version,
    about = "Decode Renogy BLE payloads",
    disable_help_subcommand = true
)]
struct Cli {
    /// JSON config file (default_model, schema_dir)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode a captured payload
    #[command(group(ArgGroup::new("payload").required(true).args(["data", "hex"])))]
    Decode {
        /// Model identifier (e.g. rover, shunt)
        #[arg(long)]
        model: Option<String>,
        /// Payload bytes as hex, space-separated (e.g. "00 64 00 81")
        #[arg(long, value_delimiter = ' ')]
        data: Vec<String>,
        /// Payload as one compact hex string (e.g. 00640081)
        #[arg(long)]
        hex: Option<String>,
        /// Directory of extra schema YAML files
        #[arg(long)]
        schema_dir: Option<String>,
        /// Print decode counters after the report
        #[arg(long, action = ArgAction::SetTrue)]
        metrics: bool,
    },
    /// List known models
    Models {
        /// Directory of extra schema YAML files
        #[arg(long)]
        schema_dir: Option<String>,
    },
    /// Validate schema YAML files
    Validate {
        /// Single schema file
        #[arg(long)]
        file: Option<String>,
        /// Directory of schema files
        #[arg(long)]
        dir: Option<String>,
        /// Print the parsed schema(s) as JSON
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Print a payload as big-endian 16-bit words
    #[command(group(ArgGroup::new("payload").required(true).args(["data", "hex"])))]
    Words {
        #[arg(long, value_delimiter = ' ')]
        data: Vec<String>,
        #[arg(long)]
        hex: Option<String>,
    },
}

#[derive(Debug, Serialize)]
struct DecodeReport {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ts: Option<String>,
    fields: BTreeMap<String, regs::FieldValue>,
    missing: Vec<String>,
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();
    let cfg = match cli.config.as_deref() {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Decode {
            model,
            data,
            hex,
            schema_dir,
            metrics,
        } => {
            let model = model
                .or_else(|| cfg.default_model.clone())
                .ok_or_else(|| anyhow::anyhow!("provide --model or set default_model"))?;
            let payload = payload_from_args(&data, hex.as_deref())?;
            let schema_dir = schema_dir.or_else(|| cfg.schema_dir.clone());
            decode(&model, &payload, schema_dir.as_deref(), metrics)
        }
        Commands::Models { schema_dir } => {
            let schema_dir = schema_dir.or_else(|| cfg.schema_dir.clone());
            list_models(schema_dir.as_deref())
        }
        Commands::Validate { file, dir, json } => validate(file.as_deref(), dir.as_deref(), json),
        Commands::Words { data, hex } => {
            let payload = payload_from_args(&data, hex.as_deref())?;
            for (i, w) in regs::raw_words(&payload).iter().enumerate() {
                println!("{i:>3}\t0x{w:04X}\t{w}");
            }
            Ok(())
        }
    }
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_schema(schema_dir: Option<&str>) -> Result<regs::RegisterSchema> {
    let mut schema = regs::RegisterSchema::builtin()?;
    if let Some(dir) = schema_dir {
        let extra = regs::load_schemas_dir(dir)?;
        info!(dir, models = extra.len(), "loaded extra schemas");
        schema.extend(extra);
    }
    Ok(schema)
}

fn decode(model: &str, payload: &[u8], schema_dir: Option<&str>, metrics: bool) -> Result<()> {
    let schema = load_schema(schema_dir)?;
    let hub = regs::MetricsHub::new().map_err(|e| anyhow::anyhow!(e))?;
    hub.decode.models_loaded.set(schema.len() as i64);
    let parser = regs::RenogyParser::with_sink(schema, hub.clone());

    let fields = parser.parse(payload, model);
    let missing: Vec<String> = parser
        .schema()
        .fields_for(model)
        .map(|s| {
            s.missing_fields(&fields)
                .into_iter()
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let report = DecodeReport {
        model: model.to_string(),
        ts: OffsetDateTime::now_utc().format(&Rfc3339).ok(),
        fields: fields.into_iter().collect(),
        missing,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    if metrics {
        print!("{}", hub.encode_text());
    }
    Ok(())
}

fn list_models(schema_dir: Option<&str>) -> Result<()> {
    let schema = load_schema(schema_dir)?;
    for id in schema.models() {
        let Some(m) = schema.fields_for(id) else {
            continue;
        };
        let block = m
            .block
            .map(|b| format!("registers={:#06X}+{}", b.start, b.words))
            .unwrap_or_else(|| "registers=-".into());
        println!(
            "{id}\tfields={}\tbytes={}\t{block}",
            m.fields.len(),
            m.required_len()
        );
    }
    Ok(())
}

fn validate(file: Option<&str>, dir: Option<&str>, json: bool) -> Result<()> {
    match (file, dir) {
        (Some(f), None) => {
            let schema = regs::load_schema_file(f)?;
            println!(
                "ok: {} (fields={}, bytes={})",
                schema.model,
                schema.fields.len(),
                schema.required_len()
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
        }
        (None, Some(d)) => {
            let reg = regs::load_schemas_dir(d)?;
            println!("ok: loaded {} models", reg.len());
            if json {
                let all: Vec<_> = reg
                    .models()
                    .into_iter()
                    .filter_map(|id| reg.fields_for(id))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&all)?);
            }
        }
        _ => {
            return Err(anyhow::anyhow!("provide --file <path> or --dir <dir>"));
        }
    }
    Ok(())
}

fn payload_from_args(data: &[String], hex: Option<&str>) -> Result<Vec<u8>> {
    match hex {
        Some(h) => parse_hex_compact(h),
        None => parse_hex_bytes(data),
    }
}

fn parse_hex_bytes(items: &[String]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(items.len());
    for s in items {
        let t = s.trim();
        if t.is_empty() {
            continue;
        }
        let no_prefix = t.strip_prefix("0x").unwrap_or(t);
        let b = u8::from_str_radix(no_prefix, 16)
            .map_err(|e| anyhow::anyhow!("invalid hex byte '{t}': {e}"))?;
        out.push(b);
    }
    Ok(out)
}

fn parse_hex_compact(s: &str) -> Result<Vec<u8>> {
    let t = s.trim();
    let t = t.strip_prefix("0x").unwrap_or(t);
    if t.len() % 2 != 0 {
        return Err(anyhow::anyhow!("odd hex length"));
    }
    let mut out = Vec::with_capacity(t.len() / 2);
    for i in (0..t.len()).step_by(2) {
        let pair = t
            .get(i..i + 2)
            .ok_or_else(|| anyhow::anyhow!("invalid hex at {i}"))?;
        let b = u8::from_str_radix(pair, 16).map_err(|e| anyhow::anyhow!("invalid hex: {e}"))?;
        out.push(b);
    }
    Ok(out)
}
