// ABOUTME: Repairs producer activity files: derives missing session averages, clears temperature,
// ABOUTME: and rewrites file and device identity to a fixed Garmin watch
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Activity corrector
//!
//! One pass over the records fills three sample pools (power, heart rate,
//! cadence), skipping sentinel values, and resets every record temperature
//! to its sentinel. Each session aggregate that is a sentinel or zero is then
//! replaced with the truncating mean of its pool, provided the pool is not
//! empty. All sessions share the same pools.

/// Progress events and sinks
pub mod progress;

use std::fs;
use std::path::Path;

use fitbridge_core::constants::{fit_invalid, spoof_device};
use fitbridge_core::errors::fit::{FitError, FitResult};
use tracing::{debug, info};

use crate::fit::{ActivityFile, DeviceIdentity};
pub use progress::{CorrectionEvent, Metric, NullSink, ProgressSink, TracingSink};

#[derive(Debug, Default, Clone, Copy)]
struct SamplePool {
    sum: u64,
    count: u64,
}

impl SamplePool {
    fn push(&mut self, value: u64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(self) -> Option<u64> {
        (self.count > 0).then(|| self.sum / self.count)
    }

    const fn len(self) -> usize {
        self.count as usize
    }
}

/// One aggregate the corrector filled in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedAverage {
    /// Session position in the file
    pub session: usize,
    /// Which aggregate
    pub metric: Metric,
    /// Value written
    pub value: u64,
}

/// Summary of one correction pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectionReport {
    /// Records visited
    pub records: usize,
    /// Non-sentinel power samples
    pub power_samples: usize,
    /// Non-sentinel heart rate samples
    pub heart_rate_samples: usize,
    /// Non-sentinel cadence samples
    pub cadence_samples: usize,
    /// Aggregates filled in
    pub derived: Vec<DerivedAverage>,
    /// `device_info` entries rewritten
    pub devices_spoofed: usize,
}

/// Activity repair engine
#[derive(Debug, Clone, Copy)]
pub struct ActivityCorrector {
    identity: DeviceIdentity,
}

impl Default for ActivityCorrector {
    fn default() -> Self {
        Self::new(DeviceIdentity {
            manufacturer: spoof_device::MANUFACTURER,
            product: spoof_device::PRODUCT,
            serial_number: spoof_device::SERIAL_NUMBER,
        })
    }
}

impl ActivityCorrector {
    /// Corrector writing `identity` into every corrected file
    #[must_use]
    pub const fn new(identity: DeviceIdentity) -> Self {
        Self { identity }
    }

    /// Identity written by this corrector
    #[must_use]
    pub const fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    /// Correct an activity in place
    pub fn correct(
        &self,
        activity: &mut ActivityFile,
        sink: &mut dyn ProgressSink,
    ) -> CorrectionReport {
        let mut power = SamplePool::default();
        let mut heart_rate = SamplePool::default();
        let mut cadence = SamplePool::default();

        for record in &mut activity.records {
            if record.power != fit_invalid::UINT16 {
                power.push(u64::from(record.power));
            }
            if record.heart_rate != fit_invalid::UINT8 {
                heart_rate.push(u64::from(record.heart_rate));
            }
            if record.cadence != fit_invalid::UINT8 {
                cadence.push(u64::from(record.cadence));
            }
            record.temperature = fit_invalid::SINT8;
        }

        let mut report = CorrectionReport {
            records: activity.records.len(),
            power_samples: power.len(),
            heart_rate_samples: heart_rate.len(),
            cadence_samples: cadence.len(),
            ..CorrectionReport::default()
        };
        sink.emit(&CorrectionEvent::SamplesCollected {
            records: report.records,
            power: report.power_samples,
            heart_rate: report.heart_rate_samples,
            cadence: report.cadence_samples,
        });

        for (index, session) in activity.sessions.iter_mut().enumerate() {
            if let Some(value) = derive(
                u64::from(session.avg_power),
                u64::from(fit_invalid::UINT16),
                power,
            ) {
                session.avg_power = value as u16;
                record_derived(&mut report, sink, index, Metric::Power, value);
            }
            if let Some(value) = derive(
                u64::from(session.avg_heart_rate),
                u64::from(fit_invalid::UINT8),
                heart_rate,
            ) {
                session.avg_heart_rate = value as u8;
                record_derived(&mut report, sink, index, Metric::HeartRate, value);
            }
            if let Some(value) = derive(
                u64::from(session.avg_cadence),
                u64::from(fit_invalid::UINT8),
                cadence,
            ) {
                session.avg_cadence = value as u8;
                record_derived(&mut report, sink, index, Metric::Cadence, value);
            }
        }

        activity.file_identity = self.identity;
        for device in &mut activity.devices {
            device.identity = self.identity;
        }
        report.devices_spoofed = activity.devices.len();
        sink.emit(&CorrectionEvent::DeviceSpoofed {
            identity: self.identity,
            devices: report.devices_spoofed,
        });

        report
    }

    /// Decode, correct, and re-encode a FIT byte stream
    ///
    /// # Errors
    ///
    /// Returns a [`FitError`] when the input is malformed, not an activity
    /// file, or cannot be re-encoded.
    pub fn correct_bytes(
        &self,
        bytes: &[u8],
        sink: &mut dyn ProgressSink,
    ) -> FitResult<(Vec<u8>, CorrectionReport)> {
        let mut activity = ActivityFile::decode(bytes)?;
        let report = self.correct(&mut activity, sink);
        Ok((activity.encode()?, report))
    }

    /// Correct `input` and write the result to `output`
    ///
    /// # Errors
    ///
    /// Returns a [`FitError`] when either file cannot be accessed or the
    /// input cannot be corrected.
    pub fn fix_file(
        &self,
        input: &Path,
        output: &Path,
        sink: &mut dyn ProgressSink,
    ) -> FitResult<CorrectionReport> {
        debug!(input = %input.display(), "Reading activity file");
        let bytes = fs::read(input)
            .map_err(|e| FitError::io(format!("failed to read {}", input.display()), e))?;
        let (corrected, report) = self.correct_bytes(&bytes, sink)?;
        fs::write(output, corrected)
            .map_err(|e| FitError::io(format!("failed to write {}", output.display()), e))?;
        info!(
            input = %input.display(),
            output = %output.display(),
            derived = report.derived.len(),
            "Corrected activity file"
        );
        Ok(report)
    }
}

/// New value for an aggregate, or `None` to leave it alone
fn derive(current: u64, sentinel: u64, pool: SamplePool) -> Option<u64> {
    if current != sentinel && current != 0 {
        return None;
    }
    pool.mean()
}

fn record_derived(
    report: &mut CorrectionReport,
    sink: &mut dyn ProgressSink,
    session: usize,
    metric: Metric,
    value: u64,
) {
    report.derived.push(DerivedAverage {
        session,
        metric,
        value,
    });
    sink.emit(&CorrectionEvent::AverageDerived {
        session,
        metric,
        value,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_truncates() {
        let mut pool = SamplePool::default();
        for value in [100, 101, 101] {
            pool.push(value);
        }
        assert_eq!(pool.mean(), Some(100));
        assert_eq!(SamplePool::default().mean(), None);
    }

    #[test]
    fn test_derive_only_replaces_missing_values() {
        let mut pool = SamplePool::default();
        pool.push(90);
        assert_eq!(derive(0xFF, 0xFF, pool), Some(90));
        assert_eq!(derive(0, 0xFF, pool), Some(90));
        assert_eq!(derive(85, 0xFF, pool), None);
        assert_eq!(derive(0, 0xFF, SamplePool::default()), None);
    }
}
