// ABOUTME: Output formatting helpers for the fitbridge CLI
// ABOUTME: Renders correction reports, activity summaries, and sync progress on stdout
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::path::Path;

use fitbridge::constants::fit_invalid;
use fitbridge::corrector::CorrectionReport;
use fitbridge::fit::profile::{sport_name, to_utc};
use fitbridge::fit::{ActivityFile, DeviceIdentity};
use fitbridge::sync::{SyncEvent, SyncSummary};

/// Display the outcome of a local repair
pub fn print_report(output: &Path, report: &CorrectionReport) {
    println!("Fixed activity written to {}", output.display());
    println!(
        "   Records: {} (power {}, heart rate {}, cadence {})",
        report.records, report.power_samples, report.heart_rate_samples, report.cadence_samples
    );
    if report.derived.is_empty() {
        println!("   Averages: already present, nothing derived");
    }
    for derived in &report.derived {
        println!(
            "   Session {}: avg {} = {}",
            derived.session, derived.metric, derived.value
        );
    }
    println!("   Devices rewritten: {}", report.devices_spoofed);
}

/// Display identity, devices, and sessions of a decoded activity
pub fn print_activity(path: &Path, activity: &ActivityFile) {
    let header = activity.header();
    println!("{}", path.display());
    println!("{}", "=".repeat(60));
    println!(
        "   Header: {} bytes, protocol 0x{:02X}, profile {}",
        header.header_size, header.protocol_version, header.profile_version
    );
    println!("   File identity: {}", identity(activity.file_identity));
    println!("   Created: {}", timestamp(activity.time_created));
    println!("   Records: {}", activity.records.len());
    println!("   Laps: {}", activity.laps.len());

    println!("\nDevices:");
    for device in &activity.devices {
        let index = device
            .device_index
            .map_or_else(|| "-".to_owned(), |index| index.to_string());
        println!("   [{index}] {}", identity(device.identity));
    }

    println!("\nSessions:");
    for (position, session) in activity.sessions.iter().enumerate() {
        println!(
            "   #{position} {} from {} to {}",
            sport_name(session.sport),
            timestamp(session.start_time),
            timestamp(session.timestamp)
        );
        println!(
            "      avg power {}, avg heart rate {}, avg cadence {}",
            value(u64::from(session.avg_power), u64::from(fit_invalid::UINT16)),
            value(u64::from(session.avg_heart_rate), u64::from(fit_invalid::UINT8)),
            value(u64::from(session.avg_cadence), u64::from(fit_invalid::UINT8))
        );
    }
}

/// Display one sync progress event
pub fn print_sync_event(event: &SyncEvent) {
    match event {
        SyncEvent::FileStarted { index, total, path } => {
            println!("[{index}/{total}] {}", path.display());
        }
        SyncEvent::Uploaded { outcome, .. } => {
            let ids: Vec<String> = outcome.activity_ids.iter().map(ToString::to_string).collect();
            if ids.is_empty() {
                println!("   Uploaded");
            } else {
                println!("   Uploaded as activity {}", ids.join(", "));
            }
        }
        SyncEvent::Duplicate { .. } => println!("   Already on Garmin Connect, marked as synced"),
        SyncEvent::Failed { error, .. } => println!("   Skipped: {error}"),
        SyncEvent::Aborted { error } => println!("   Stopped: {error}"),
    }
}

/// Display batch totals
pub fn print_summary(summary: &SyncSummary) {
    println!("{}", "=".repeat(60));
    println!(
        "Uploaded: {}  Duplicates: {}  Failed: {}",
        summary.uploaded, summary.duplicates, summary.failed
    );
}

fn identity(identity: DeviceIdentity) -> String {
    format!(
        "manufacturer {}, product {}, serial {}",
        identity.manufacturer, identity.product, identity.serial_number
    )
}

fn timestamp(raw: Option<u32>) -> String {
    match raw {
        Some(raw) => to_utc(raw).map_or_else(|| raw.to_string(), |t| t.to_rfc3339()),
        None => "-".to_owned(),
    }
}

fn value(raw: u64, sentinel: u64) -> String {
    if raw == sentinel {
        "missing".to_owned()
    } else {
        raw.to_string()
    }
}
