use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// JSON-lines event log for pagination diagnostics: page breaks, strategy
/// escalations, and swallowed fallback errors end up here rather than in
/// the user-facing error.
#[derive(Clone)]
pub struct EventLog {
    inner: Arc<Mutex<EventState>>,
}

struct EventState {
    writer: BufWriter<File>,
    counters: HashMap<String, u64>,
}

impl EventLog {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(EventState {
                writer: BufWriter::new(file),
                counters: HashMap::new(),
            })),
        })
    }

    pub fn page_break(&self, from_page: usize, to_page: usize, unit_index: usize) {
        self.write_line(&format!(
            "{{\"type\":\"paginate.page_break\",\"from_page\":{},\"to_page\":{},\"unit\":{}}}",
            from_page, to_page, unit_index
        ));
        self.increment("paginate.page_break");
    }

    pub fn escalation(&self, primary_error: &str) {
        self.write_line(&format!(
            "{{\"type\":\"paginate.escalation\",\"primary_error\":\"{}\"}}",
            json_escape(primary_error)
        ));
        self.increment("paginate.escalation");
    }

    pub fn swallowed(&self, secondary_error: &str) {
        self.write_line(&format!(
            "{{\"type\":\"paginate.fallback_failed\",\"secondary_error\":\"{}\"}}",
            json_escape(secondary_error)
        ));
        self.increment("paginate.fallback_failed");
    }

    pub fn summary(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let mut counters: Vec<(String, u64)> = state.counters.drain().collect();
            counters.sort_by(|a, b| a.0.cmp(&b.0));
            let mut counts = String::from("{");
            for (index, (key, value)) in counters.iter().enumerate() {
                if index > 0 {
                    counts.push(',');
                }
                counts.push_str(&format!("\"{}\":{}", json_escape(key), value));
            }
            counts.push('}');
            let line = format!(
                "{{\"type\":\"paginate.summary\",\"context\":\"{}\",\"counts\":{}}}",
                json_escape(context),
                counts
            );
            let _ = writeln!(state.writer, "{line}");
            let _ = state.writer.flush();
        }
    }

    fn write_line(&self, line: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{line}");
        }
    }

    fn increment(&self, key: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(1);
        }
    }
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}
