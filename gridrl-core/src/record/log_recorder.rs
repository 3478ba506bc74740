use super::{AggregateRecorder, Record, RecordStorage, RecordValue, Recorder};
use log::info;

/// Writes records through the `log` facade.
///
/// Stored records are aggregated with [`RecordStorage`] and written as one line
/// on every flush. Keys are sorted so that lines of consecutive flushes line up.
pub struct LogRecorder {
    name: String,
    storage: RecordStorage,
}

impl Default for LogRecorder {
    fn default() -> Self {
        Self::new("train")
    }
}

impl LogRecorder {
    /// Constructs a recorder prefixing every line with `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage: RecordStorage::new(),
        }
    }

    fn format(record: &Record) -> String {
        let mut items: Vec<_> = record
            .iter()
            .map(|(k, v)| match v {
                RecordValue::Scalar(v) => format!("{}: {:.4}", k, v),
                RecordValue::String(s) => format!("{}: {}", k, s),
            })
            .collect();
        items.sort();
        items.join(", ")
    }
}

impl Recorder for LogRecorder {
    fn write(&mut self, record: Record) {
        info!("[{}] {}", self.name, Self::format(&record));
    }
}

impl AggregateRecorder for LogRecorder {
    fn store(&mut self, record: Record) {
        self.storage.store(record);
    }

    fn flush(&mut self, step: i64) {
        if self.storage.is_empty() {
            return;
        }
        let record = self.storage.aggregate();
        info!("[{}] episode {}: {}", self.name, step, Self::format(&record));
    }
}
