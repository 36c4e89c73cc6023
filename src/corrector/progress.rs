// ABOUTME: Progress events emitted while correcting an activity and the sinks that receive them
// ABOUTME: Replaces a global logging hook with an explicit sink argument
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt;

use tracing::{debug, info};

use crate::fit::DeviceIdentity;

/// Session aggregate the corrector can derive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// `avg_power`
    Power,
    /// `avg_heart_rate`
    HeartRate,
    /// `avg_cadence`
    Cadence,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Power => "power",
            Self::HeartRate => "heart rate",
            Self::Cadence => "cadence",
        })
    }
}

/// Something the corrector did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectionEvent {
    /// Record pass finished; counts are non-sentinel samples per pool
    SamplesCollected {
        /// Records visited
        records: usize,
        /// Power samples kept
        power: usize,
        /// Heart rate samples kept
        heart_rate: usize,
        /// Cadence samples kept
        cadence: usize,
    },
    /// A missing session aggregate was filled in
    AverageDerived {
        /// Session position in the file
        session: usize,
        /// Which aggregate
        metric: Metric,
        /// Value written
        value: u64,
    },
    /// File identity and every device entry were rewritten
    DeviceSpoofed {
        /// Identity written
        identity: DeviceIdentity,
        /// Number of `device_info` entries rewritten
        devices: usize,
    },
}

/// Receiver for correction progress
pub trait ProgressSink {
    /// Handle one event
    fn emit(&mut self, event: &CorrectionEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(&CorrectionEvent),
{
    fn emit(&mut self, event: &CorrectionEvent) {
        self(event);
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&mut self, _event: &CorrectionEvent) {}
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&mut self, event: &CorrectionEvent) {
        match event {
            CorrectionEvent::SamplesCollected {
                records,
                power,
                heart_rate,
                cadence,
            } => debug!(
                records,
                power,
                heart_rate,
                cadence,
                "Collected samples and cleared record temperature"
            ),
            CorrectionEvent::AverageDerived {
                session,
                metric,
                value,
            } => info!(session, %metric, value, "Derived missing session average"),
            CorrectionEvent::DeviceSpoofed { identity, devices } => info!(
                manufacturer = identity.manufacturer,
                product = identity.product,
                devices,
                "Rewrote device identity"
            ),
        }
    }
}
