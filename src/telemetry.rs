//! Fire-and-forget analytics events

use serde::Serialize;

use crate::sim::UpgradeKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    LevelStart { level: u32, rebirths: u32 },
    Rebirth { rebirths: u32 },
    Purchase { kind: UpgradeKind, new_level: u8, price: u64 },
}

impl TelemetryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryEvent::LevelStart { .. } => "level_start",
            TelemetryEvent::Rebirth { .. } => "rebirth",
            TelemetryEvent::Purchase { .. } => "purchase",
        }
    }
}

pub trait TelemetrySink {
    fn record(&mut self, event: TelemetryEvent);
}

/// Writes events to the log as JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl TelemetrySink for LogTelemetry {
    fn record(&mut self, event: TelemetryEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => log::info!(target: "telemetry", "{json}"),
            Err(e) => log::warn!("Dropping telemetry event {}: {e}", event.name()),
        }
    }
}

/// Keeps events for inspection
#[derive(Debug, Default, Clone)]
pub struct RecordingTelemetry {
    pub events: Vec<TelemetryEvent>,
}

impl TelemetrySink for RecordingTelemetry {
    fn record(&mut self, event: TelemetryEvent) {
        self.events.push(event);
    }
}
