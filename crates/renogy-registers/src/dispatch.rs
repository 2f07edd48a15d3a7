use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::parser::DecodeResult;
use crate::registry::RegisterSchema;

/// Entry point: routes a payload to its model schema.
///
/// Holds no per-call state, so one parser can be shared between threads
/// when its sink can.
#[derive(Debug, Clone)]
pub struct RenogyParser<S = TracingSink> {
    schema: RegisterSchema,
    sink: S,
}

impl RenogyParser<TracingSink> {
    pub fn new(schema: RegisterSchema) -> Self {
        Self::with_sink(schema, TracingSink)
    }

    /// Parser over the built-in models.
    pub fn builtin() -> anyhow::Result<Self> {
        Ok(Self::new(RegisterSchema::builtin()?))
    }
}

impl<S: DiagnosticSink> RenogyParser<S> {
    pub fn with_sink(schema: RegisterSchema, sink: S) -> Self {
        Self { schema, sink }
    }

    pub fn schema(&self) -> &RegisterSchema {
        &self.schema
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Decode `raw_data` as a payload from `model`.
    ///
    /// An unknown model is reported through the sink and yields an empty
    /// result, the same shape as a payload with nothing decodable.
    pub fn parse(&self, raw_data: &[u8], model: &str) -> DecodeResult {
        let Some(schema) = self.schema.fields_for(model) else {
            self.sink.report(&Diagnostic::UnsupportedModel {
                model: model.to_string(),
            });
            return DecodeResult::new();
        };
        let out = schema.parse_with(raw_data, &self.sink);
        self.sink.decoded(model, out.len());
        out
    }
}
