use crate::model::store::SubjectId;

/// A single cell that could not be read as a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    pub file: String,
    pub subject: SubjectId,
    pub test: String,
    pub event: String,
    pub entry: String,
}

pub trait DiagnosticsSink {
    fn record(&mut self, diagnostic: ParseDiagnostic);
}

impl DiagnosticsSink for Vec<ParseDiagnostic> {
    fn record(&mut self, diagnostic: ParseDiagnostic) {
        self.push(diagnostic);
    }
}

/// Forwards diagnostics to the `ppmi::diagnostics` tracing target.
#[derive(Debug, Default)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn record(&mut self, d: ParseDiagnostic) {
        tracing::warn!(
            target: "ppmi::diagnostics",
            file = %d.file,
            subject = d.subject,
            test = %d.test,
            event = %d.event,
            entry = %d.entry,
            "non-numerical data encountered; cell marked missing"
        );
    }
}
