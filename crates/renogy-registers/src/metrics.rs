use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use prometheus::{IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Clone)]
pub struct DecodeMetrics {
    pub payloads_routed: IntCounter,
    pub partial_parses: IntCounter,
    pub unsupported_models: IntCounter,
    pub models_loaded: IntGauge,
}

/// Prometheus registry that doubles as a diagnostic sink.
///
/// Every diagnostic is counted and then logged through [`TracingSink`].
#[derive(Clone)]
pub struct MetricsHub {
    pub registry: Registry,
    pub decode: DecodeMetrics,
}

impl MetricsHub {
    pub fn new() -> Result<Self, String> {
        let registry = Registry::new();
        let payloads_routed = IntCounter::new(
            "renogy_payloads_routed",
            "Payloads matched to a model schema, decoded or not",
        )
        .map_err(|e| format!("metrics init error: {e}"))?;
        let partial_parses = IntCounter::new(
            "renogy_partial_parses",
            "Payloads too short for at least one field",
        )
        .map_err(|e| format!("metrics init error: {e}"))?;
        let unsupported_models = IntCounter::new(
            "renogy_unsupported_models",
            "Payloads for a model with no schema",
        )
        .map_err(|e| format!("metrics init error: {e}"))?;
        let models_loaded = IntGauge::new("renogy_models_loaded", "Number of model schemas loaded")
            .map_err(|e| format!("metrics init error: {e}"))?;
        let decode = DecodeMetrics {
            payloads_routed,
            partial_parses,
            unsupported_models,
            models_loaded,
        };
        let _ = registry.register(Box::new(decode.payloads_routed.clone()));
        let _ = registry.register(Box::new(decode.partial_parses.clone()));
        let _ = registry.register(Box::new(decode.unsupported_models.clone()));
        let _ = registry.register(Box::new(decode.models_loaded.clone()));
        Ok(Self { registry, decode })
    }

    /// Prometheus text exposition of every registered metric.
    pub fn encode_text(&self) -> String {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .unwrap_or_else(|e| format!("# metrics encoding failed: {e}\n"))
    }
}

impl DiagnosticSink for MetricsHub {
    fn report(&self, diag: &Diagnostic) {
        match diag {
            Diagnostic::PartialParse { .. } => self.decode.partial_parses.inc(),
            Diagnostic::UnsupportedModel { .. } => self.decode.unsupported_models.inc(),
        }
        TracingSink.report(diag);
    }

    fn decoded(&self, model: &str, fields: usize) {
        self.decode.payloads_routed.inc();
        TracingSink.decoded(model, fields);
    }
}
