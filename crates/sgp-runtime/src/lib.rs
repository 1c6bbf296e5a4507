#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const EVENT_LOG_ENV: &str = "SGP_EVENT_LOG_PATH";
pub const EXCELLENT_BELOW: f64 = 1e-9;
pub const GOOD_BELOW: f64 = 1e-5;

/// Outcome of one test case at any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Success,
    Skip,
    Fail,
}

impl CaseStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Skip => "skip",
            Self::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FidelityStatus {
    Excellent,
    Good,
    Review,
}

impl FidelityStatus {
    /// Non-finite metrics are always `Review`.
    #[must_use]
    pub fn from_metric(metric: f64) -> Self {
        if metric.is_nan() || metric.is_infinite() {
            Self::Review
        } else if metric < EXCELLENT_BELOW {
            Self::Excellent
        } else if metric < GOOD_BELOW {
            Self::Good
        } else {
            Self::Review
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Review => "Review",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessEvent {
    pub ts_millis: u128,
    pub level: EventLevel,
    pub stage: String,
    pub case_id: String,
    pub reason_code: String,
    pub message: String,
}

#[must_use]
pub fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

/// In-memory event record with an optional JSONL sink.
#[derive(Debug, Default, Clone)]
pub struct EventLedger {
    events: Vec<HarnessEvent>,
    sink: Option<PathBuf>,
    sink_error: Option<String>,
}

impl EventLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sink(path: impl Into<PathBuf>) -> Self {
        Self {
            sink: Some(path.into()),
            ..Self::default()
        }
    }

    /// Explicit path first, then `SGP_EVENT_LOG_PATH`, else memory only.
    #[must_use]
    pub fn resolve(explicit: Option<&Path>) -> Self {
        let from_env = std::env::var_os(EVENT_LOG_ENV).map(PathBuf::from);
        match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::with_sink(path),
            None => Self::new(),
        }
    }

    #[must_use]
    pub fn sink(&self) -> Option<&Path> {
        self.sink.as_deref()
    }

    /// First sink failure; the sink is dropped after it and events stay in memory.
    #[must_use]
    pub fn sink_error(&self) -> Option<&str> {
        self.sink_error.as_deref()
    }

    pub fn record(&mut self, event: HarnessEvent) {
        if let Some(path) = self.sink.as_deref()
            && let Err(err) = append_jsonl(path, &event)
        {
            self.sink_error = Some(err);
            self.sink = None;
        }
        self.events.push(event);
    }

    pub fn emit(
        &mut self,
        level: EventLevel,
        stage: &str,
        case_id: &str,
        reason_code: &str,
        message: impl Into<String>,
    ) {
        self.record(HarnessEvent {
            ts_millis: now_millis(),
            level,
            stage: stage.to_string(),
            case_id: case_id.to_string(),
            reason_code: reason_code.to_string(),
            message: message.into(),
        });
    }

    pub fn info(&mut self, stage: &str, case_id: &str, message: impl Into<String>) {
        self.emit(EventLevel::Info, stage, case_id, "ok", message);
    }

    pub fn warn(&mut self, stage: &str, case_id: &str, reason_code: &str, message: impl Into<String>) {
        self.emit(EventLevel::Warn, stage, case_id, reason_code, message);
    }

    pub fn error(&mut self, stage: &str, case_id: &str, reason_code: &str, message: impl Into<String>) {
        self.emit(EventLevel::Error, stage, case_id, reason_code, message);
    }

    #[must_use]
    pub fn events(&self) -> &[HarnessEvent] {
        &self.events
    }

    #[must_use]
    pub fn last(&self) -> Option<&HarnessEvent> {
        self.events.last()
    }

    #[must_use]
    pub fn count(&self, level: EventLevel) -> usize {
        self.events.iter().filter(|event| event.level == level).count()
    }
}

/// Appends one serialized record plus newline to `path`.
pub fn append_jsonl<T: Serialize>(path: &Path, entry: &T) -> Result<(), String> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed creating {}: {err}", parent.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| format!("failed opening {}: {err}", path.display()))?;
    let line = serde_json::to_string(entry)
        .map_err(|err| format!("failed serializing log entry: {err}"))?;
    let mut payload = line.into_bytes();
    payload.push(b'\n');
    file.write_all(&payload)
        .map_err(|err| format!("failed appending {}: {err}", path.display()))
}

/// Succeeded/skipped/failed counts for one batch stage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTally {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchTally {
    pub fn record(&mut self, status: CaseStatus) {
        match status {
            CaseStatus::Success => self.succeeded += 1,
            CaseStatus::Skip => self.skipped += 1,
            CaseStatus::Fail => self.failed += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }

    #[must_use]
    pub fn merged(self, other: Self) -> Self {
        Self {
            succeeded: self.succeeded + other.succeeded,
            skipped: self.skipped + other.skipped,
            failed: self.failed + other.failed,
        }
    }

    /// Skips never fail a batch.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(self.failed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::{BatchTally, CaseStatus, EventLedger, EventLevel, FidelityStatus, HarnessEvent};
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file(name: &str) -> PathBuf {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock after epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("sgp_runtime_{name}_{ts}.jsonl"))
    }

    #[test]
    fn fidelity_thresholds() {
        assert_eq!(FidelityStatus::from_metric(0.0), FidelityStatus::Excellent);
        assert_eq!(FidelityStatus::from_metric(9.99e-10), FidelityStatus::Excellent);
        assert_eq!(FidelityStatus::from_metric(1e-9), FidelityStatus::Good);
        assert_eq!(FidelityStatus::from_metric(9.99e-6), FidelityStatus::Good);
        assert_eq!(FidelityStatus::from_metric(1e-5), FidelityStatus::Review);
        assert_eq!(FidelityStatus::from_metric(f64::NAN), FidelityStatus::Review);
        assert_eq!(FidelityStatus::from_metric(f64::INFINITY), FidelityStatus::Review);
    }

    #[test]
    fn ledger_records_in_memory() {
        let mut ledger = EventLedger::new();
        ledger.info("generate", "fft/n64", "written");
        ledger.warn("compare", "fft/n64", "missing_candidate", "no candidate output");
        assert_eq!(ledger.events().len(), 2);
        assert_eq!(ledger.count(EventLevel::Warn), 1);
        let last = ledger.last().expect("event should be present");
        assert_eq!(last.reason_code, "missing_candidate");
    }

    #[test]
    fn ledger_appends_jsonl_lines() {
        let path = temp_file("events");
        let mut ledger = EventLedger::with_sink(&path);
        ledger.error("generate", "filters/butter", "oracle_failed", "boom");
        ledger.info("generate", "filters/cheby1", "ok");
        assert!(ledger.sink_error().is_none());

        let raw = std::fs::read_to_string(&path).expect("log written");
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: HarnessEvent = serde_json::from_str(lines[0]).expect("valid json line");
        assert_eq!(first.level, EventLevel::Error);
        assert_eq!(first.case_id, "filters/butter");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn exit_code_only_counts_failures() {
        let mut tally = BatchTally::default();
        tally.record(CaseStatus::Success);
        tally.record(CaseStatus::Skip);
        assert_eq!(tally.exit_code(), 0);
        tally.record(CaseStatus::Fail);
        assert_eq!(tally.exit_code(), 1);
        assert_eq!(tally.total(), 3);
        let merged = tally.merged(BatchTally {
            succeeded: 2,
            skipped: 0,
            failed: 0,
        });
        assert_eq!(merged.succeeded, 3);
    }
}
