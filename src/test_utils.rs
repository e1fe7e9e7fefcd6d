//! Instrumented manipulation backend shared by the unit tests.
//!
//! Uses `Mutex` and atomics (not `RefCell`) so it is `Sync` and can be driven
//! from the rayon worker pools.

use crate::core::{Dimensions, ImagerError, Result};
use crate::processors::{ImageHandle, ImageManipulator, Operation};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Op(String),
    Write(PathBuf),
}

impl RecordedCall {
    pub fn op(description: &str) -> Self {
        RecordedCall::Op(description.to_string())
    }
}

#[derive(Default)]
struct Counters {
    open_now: AtomicUsize,
    peak: AtomicUsize,
    total_opens: AtomicUsize,
}

pub struct MockManipulator {
    size: Dimensions,
    counters: Arc<Counters>,
    calls: Arc<Mutex<HashMap<String, Vec<RecordedCall>>>>,
    latency: HashMap<String, Duration>,
    failures: Vec<(String, String)>,
}

impl Default for MockManipulator {
    fn default() -> Self {
        Self::with_size(640, 480)
    }
}

impl MockManipulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            size: Dimensions::new(width, height),
            counters: Arc::default(),
            calls: Arc::default(),
            latency: HashMap::new(),
            failures: Vec::new(),
        }
    }

    /// Every operation on handles for `path` sleeps for `delay`.
    pub fn with_latency(mut self, path: &str, delay: Duration) -> Self {
        self.latency.insert(path.to_string(), delay);
        self
    }

    /// Applying `operation` on a handle for `path` fails.
    pub fn failing_on(mut self, path: &str, operation: &str) -> Self {
        self.failures.push((path.to_string(), operation.to_string()));
        self
    }

    pub fn peak_open_handles(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    pub fn open_handles(&self) -> usize {
        self.counters.open_now.load(Ordering::SeqCst)
    }

    pub fn total_opens(&self) -> usize {
        self.counters.total_opens.load(Ordering::SeqCst)
    }

    pub fn operations(&self, path: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_default()
    }
}

impl ImageManipulator for MockManipulator {
    fn open(&self, path: &Path) -> Result<Box<dyn ImageHandle>> {
        let key = path.to_string_lossy().into_owned();
        self.counters.total_opens.fetch_add(1, Ordering::SeqCst);
        let now = self.counters.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(now, Ordering::SeqCst);

        Ok(Box::new(MockHandle {
            latency: self.latency.get(&key).copied(),
            failures: self
                .failures
                .iter()
                .filter(|(p, _)| *p == key)
                .map(|(_, op)| op.clone())
                .collect(),
            key,
            size: self.size,
            counters: Arc::clone(&self.counters),
            calls: Arc::clone(&self.calls),
        }))
    }
}

struct MockHandle {
    key: String,
    size: Dimensions,
    latency: Option<Duration>,
    failures: Vec<String>,
    counters: Arc<Counters>,
    calls: Arc<Mutex<HashMap<String, Vec<RecordedCall>>>>,
}

impl MockHandle {
    fn record(&self, call: RecordedCall) {
        self.calls
            .lock()
            .unwrap()
            .entry(self.key.clone())
            .or_default()
            .push(call);
    }
}

impl ImageHandle for MockHandle {
    fn size(&mut self) -> Result<Dimensions> {
        Ok(self.size)
    }

    fn apply(&mut self, operation: &Operation) -> Result<()> {
        if let Some(delay) = self.latency {
            std::thread::sleep(delay);
        }
        if self.failures.iter().any(|name| name == operation.name()) {
            return Err(ImagerError::ProcessingError(format!(
                "{} failed on {}",
                operation.name(),
                self.key
            )));
        }
        self.record(RecordedCall::Op(operation.to_string()));
        Ok(())
    }

    fn write(&mut self, destination: &Path) -> Result<()> {
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(destination, b"mock image")?;
        self.record(RecordedCall::Write(destination.to_path_buf()));
        Ok(())
    }

    fn stream(&mut self) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(b"mock image".to_vec())))
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.counters.open_now.fetch_sub(1, Ordering::SeqCst);
    }
}
