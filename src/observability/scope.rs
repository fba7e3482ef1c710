//! ObservationScope brackets one operation with BEGIN / COMPLETE / FAILED lines
//!
//! A scope dropped without an explicit outcome logs `{name}_INCOMPLETE`,
//! which in practice means a panic unwound through it.

use std::time::Instant;

use super::logger::Logger;

/// Logs `{name}_BEGIN` on creation and exactly one outcome line afterwards.
pub struct ObservationScope {
    name: &'static str,
    fields: Vec<(&'static str, String)>,
    started: Instant,
    finished: bool,
}

impl ObservationScope {
    /// Open a scope with correlation fields repeated on every line.
    pub fn with_fields(name: &'static str, fields: &[(&'static str, &str)]) -> Self {
        let scope = Self {
            name,
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            started: Instant::now(),
            finished: false,
        };
        Logger::info(&format!("{}_BEGIN", name), &scope.field_refs(&[]));
        scope
    }

    /// Open a scope without fields.
    pub fn new(name: &'static str) -> Self {
        Self::with_fields(name, &[])
    }

    fn field_refs<'a>(&'a self, extra: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        let mut refs: Vec<(&str, &str)> = self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        refs.extend_from_slice(extra);
        refs
    }

    /// Log `{name}_COMPLETE` with extra fields and the elapsed time.
    pub fn complete_with_fields(mut self, extra: &[(&str, &str)]) {
        self.finished = true;
        let elapsed = self.started.elapsed().as_millis().to_string();
        let mut refs = self.field_refs(extra);
        refs.push(("elapsed_ms", &elapsed));
        Logger::info(&format!("{}_COMPLETE", self.name), &refs);
    }

    /// Log `{name}_COMPLETE`.
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Log `{name}_FAILED` at ERROR level.
    pub fn fail(mut self, reason: &str) {
        self.finished = true;
        let mut refs = self.field_refs(&[]);
        refs.push(("reason", reason));
        Logger::error(&format!("{}_FAILED", self.name), &refs);
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.finished {
            let refs = self.field_refs(&[("reason", "scope dropped without outcome")]);
            Logger::warn(&format!("{}_INCOMPLETE", self.name), &refs);
        }
    }
}
