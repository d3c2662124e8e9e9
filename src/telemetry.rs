//! Per-frame records of raw model output.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::landmark::{AttributeDetection, MeshSubject, PoseSubject};

/// Raw output of all models for one frame, before expressions are reduced.
///
/// A model that was disabled or failed this frame is `None` and serializes as `null`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TelemetryRecord<'a> {
    pub frame: u64,
    pub mesh: Option<&'a [MeshSubject]>,
    pub pose: Option<&'a [PoseSubject]>,
    pub attributes: Option<&'a [AttributeDetection]>,
}

impl TelemetryRecord<'_> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Receives a [`TelemetryRecord`] for every frame processed while the data log is enabled.
pub trait TelemetrySink {
    fn record(&mut self, record: &TelemetryRecord<'_>);
}

impl<S: TelemetrySink + ?Sized> TelemetrySink for Box<S> {
    fn record(&mut self, record: &TelemetryRecord<'_>) {
        (**self).record(record)
    }
}

/// Logs every record as a single line of JSON, with log target `telemetry`.
#[derive(Debug, Default)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn record(&mut self, record: &TelemetryRecord<'_>) {
        match record.to_json() {
            Ok(json) => log::info!(target: "telemetry", "{json}"),
            Err(e) => log::warn!("failed to serialize telemetry for frame {}: {e}", record.frame),
        }
    }
}

/// Buffers serialized records in memory, to be collected and shipped elsewhere in batches.
///
/// Cloning returns another handle to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns all buffered records, oldest first.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TelemetrySink for BufferSink {
    fn record(&mut self, record: &TelemetryRecord<'_>) {
        match record.to_json() {
            Ok(json) => self
                .lines
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(json),
            Err(e) => log::warn!("failed to serialize telemetry for frame {}: {e}", record.frame),
        }
    }
}
