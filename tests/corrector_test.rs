// ABOUTME: Integration tests for activity correction
// ABOUTME: Covers derived averages, sentinel handling, temperature reset, device spoofing, and idempotence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::fs;

use common::{
    init_test_logging, producer_activity, producer_activity_bytes, steady_samples, Sample,
    SessionAverages, START_TIME,
};
use fitbridge::constants::spoof_device;
use fitbridge::corrector::{ActivityCorrector, CorrectionEvent, Metric, NullSink};
use fitbridge::errors::fit::FitError;
use fitbridge::fit::profile::{file_id, mesg_num, session, TIMESTAMP};
use fitbridge::fit::{encode, ActivityFile, BaseType, DeviceIdentity, Message};

fn spoofed() -> DeviceIdentity {
    DeviceIdentity {
        manufacturer: spoof_device::MANUFACTURER,
        product: spoof_device::PRODUCT,
        serial_number: spoof_device::SERIAL_NUMBER,
    }
}

#[test]
fn test_steady_ride_is_repaired() {
    init_test_logging();
    // Producer leaves power and cadence at their sentinels and writes 0 heart rate
    let input = producer_activity_bytes(
        &steady_samples(),
        SessionAverages {
            heart_rate: Some(0),
            ..SessionAverages::default()
        },
    );

    let (output, report) = ActivityCorrector::default()
        .correct_bytes(&input, &mut NullSink)
        .unwrap();
    let activity = ActivityFile::decode(&output).unwrap();

    let session = &activity.sessions[0];
    assert_eq!(session.avg_power, 200);
    assert_eq!(session.avg_heart_rate, 150);
    assert_eq!(session.avg_cadence, 90);

    assert_eq!(activity.records.len(), 10);
    assert!(activity.records.iter().all(|record| record.temperature == 0x7F));
    assert!(activity.records.iter().all(|record| record.power == 200));

    assert_eq!(activity.file_identity, spoofed());
    assert_eq!(activity.devices.len(), 2);
    assert!(activity.devices.iter().all(|device| device.identity == spoofed()));

    assert_eq!(report.records, 10);
    assert_eq!(report.derived.len(), 3);
    assert_eq!(report.devices_spoofed, 2);
}

#[test]
fn test_correction_is_idempotent() {
    let input = producer_activity_bytes(&steady_samples(), SessionAverages::default());
    let corrector = ActivityCorrector::default();

    let (once, _) = corrector.correct_bytes(&input, &mut NullSink).unwrap();
    let (twice, report) = corrector.correct_bytes(&once, &mut NullSink).unwrap();

    assert_eq!(once, twice);
    assert!(report.derived.is_empty());
}

#[test]
fn test_existing_averages_are_kept() {
    let input = producer_activity_bytes(
        &steady_samples(),
        SessionAverages {
            power: Some(180),
            heart_rate: Some(140),
            cadence: None,
        },
    );

    let (output, report) = ActivityCorrector::default()
        .correct_bytes(&input, &mut NullSink)
        .unwrap();
    let session = &ActivityFile::decode(&output).unwrap().sessions[0];

    assert_eq!(session.avg_power, 180);
    assert_eq!(session.avg_heart_rate, 140);
    assert_eq!(session.avg_cadence, 90);
    assert_eq!(report.derived.len(), 1);
    assert_eq!(report.derived[0].metric, Metric::Cadence);
}

#[test]
fn test_zero_average_counts_as_missing() {
    let input = producer_activity_bytes(
        &steady_samples(),
        SessionAverages {
            power: Some(0),
            heart_rate: Some(0),
            cadence: Some(0),
        },
    );

    let (output, _) = ActivityCorrector::default()
        .correct_bytes(&input, &mut NullSink)
        .unwrap();
    let session = &ActivityFile::decode(&output).unwrap().sessions[0];

    assert_eq!(
        (session.avg_power, session.avg_heart_rate, session.avg_cadence),
        (200, 150, 90)
    );
}

#[test]
fn test_sentinel_samples_are_excluded_and_mean_truncates() {
    let samples = vec![
        Sample::new(100, 120, 80),
        Sample::new(101, 121, 81),
        Sample::empty(),
        Sample {
            power: Some(0),
            heart_rate: None,
            cadence: Some(85),
        },
    ];
    let input = producer_activity_bytes(&samples, SessionAverages::default());

    let (output, report) = ActivityCorrector::default()
        .correct_bytes(&input, &mut NullSink)
        .unwrap();
    let session = &ActivityFile::decode(&output).unwrap().sessions[0];

    // Zero power is a real sample; 0xFFFF is not
    assert_eq!(report.power_samples, 3);
    assert_eq!(session.avg_power, 67);
    assert_eq!(report.heart_rate_samples, 2);
    assert_eq!(session.avg_heart_rate, 120);
    assert_eq!(report.cadence_samples, 3);
    assert_eq!(session.avg_cadence, 82);
}

fn extra_session(start: u64, power: u64, heart_rate: u64, cadence: u64) -> Message {
    Message::new(mesg_num::SESSION)
        .with(TIMESTAMP, BaseType::UINT32, start + 60)
        .with(session::START_TIME, BaseType::UINT32, start)
        .with(session::SPORT, BaseType::ENUM, 2)
        .with(session::AVG_HEART_RATE, BaseType::UINT8, heart_rate)
        .with(session::AVG_CADENCE, BaseType::UINT8, cadence)
        .with(session::AVG_POWER, BaseType::UINT16, power)
}

#[test]
fn test_every_session_is_filled_from_file_wide_pools() {
    let mut file = producer_activity(
        &[Sample::new(100, 120, 80), Sample::new(300, 160, 100)],
        SessionAverages::default(),
    );
    let later = u64::from(START_TIME) + 100;
    file.messages.push(extra_session(later, 0xFFFF, 0xFF, 0xFF));
    file.messages.push(extra_session(later + 100, 180, 140, 85));
    let input = encode(&file).unwrap();

    let (output, report) = ActivityCorrector::default()
        .correct_bytes(&input, &mut NullSink)
        .unwrap();
    let sessions = ActivityFile::decode(&output).unwrap().sessions;

    assert_eq!(sessions.len(), 3);
    for filled in &sessions[..2] {
        assert_eq!(
            (filled.avg_power, filled.avg_heart_rate, filled.avg_cadence),
            (200, 140, 90)
        );
    }
    assert_eq!(
        (
            sessions[2].avg_power,
            sessions[2].avg_heart_rate,
            sessions[2].avg_cadence
        ),
        (180, 140, 85)
    );
    assert_eq!(report.derived.len(), 6);
    assert!(report.derived.iter().all(|derived| derived.session < 2));
}

#[test]
fn test_empty_pool_leaves_sentinel() {
    let input = producer_activity_bytes(&[Sample::empty(); 3], SessionAverages::default());

    let (output, report) = ActivityCorrector::default()
        .correct_bytes(&input, &mut NullSink)
        .unwrap();
    let session = &ActivityFile::decode(&output).unwrap().sessions[0];

    assert!(report.derived.is_empty());
    assert_eq!(session.avg_power, 0xFFFF);
    assert_eq!(session.avg_heart_rate, 0xFF);
    assert_eq!(session.avg_cadence, 0xFF);
}

#[test]
fn test_progress_events_are_emitted_in_order() {
    let input = producer_activity_bytes(&steady_samples(), SessionAverages::default());
    let mut events = Vec::new();
    let mut sink = |event: &CorrectionEvent| events.push(event.clone());

    ActivityCorrector::default()
        .correct_bytes(&input, &mut sink)
        .unwrap();

    assert_eq!(events.len(), 5);
    assert!(matches!(
        events[0],
        CorrectionEvent::SamplesCollected {
            records: 10,
            power: 10,
            heart_rate: 10,
            cadence: 10
        }
    ));
    assert!(matches!(
        events[1],
        CorrectionEvent::AverageDerived {
            session: 0,
            metric: Metric::Power,
            value: 200
        }
    ));
    assert!(matches!(
        events[4],
        CorrectionEvent::DeviceSpoofed { devices: 2, .. }
    ));
}

#[test]
fn test_custom_identity_is_written() {
    let identity = DeviceIdentity {
        manufacturer: 1,
        product: 4000,
        serial_number: 42,
    };
    let input = producer_activity_bytes(&steady_samples(), SessionAverages::default());

    let (output, _) = ActivityCorrector::new(identity)
        .correct_bytes(&input, &mut NullSink)
        .unwrap();
    let activity = ActivityFile::decode(&output).unwrap();

    assert_eq!(activity.file_identity, identity);
    assert!(activity.devices.iter().all(|device| device.identity == identity));
}

#[test]
fn test_non_activity_file_is_rejected() {
    let mut file = producer_activity(&steady_samples(), SessionAverages::default());
    for message in &mut file.messages {
        if message.global == mesg_num::FILE_ID {
            message.set(file_id::TYPE, BaseType::ENUM, 6);
        }
    }
    let input = encode(&file).unwrap();

    let result = ActivityCorrector::default().correct_bytes(&input, &mut NullSink);
    assert!(matches!(result, Err(FitError::NotActivity { .. })));
}

#[test]
fn test_fix_file_writes_output_and_leaves_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("MyNewActivity-3.8.5.fit");
    let output = dir.path().join("fixed.fit");
    let original = producer_activity_bytes(&steady_samples(), SessionAverages::default());
    fs::write(&input, &original).unwrap();

    let report = ActivityCorrector::default()
        .fix_file(&input, &output, &mut NullSink)
        .unwrap();

    assert_eq!(report.records, 10);
    assert_eq!(fs::read(&input).unwrap(), original);
    let fixed = ActivityFile::decode(&fs::read(&output).unwrap()).unwrap();
    assert_eq!(fixed.sessions[0].avg_power, 200);
}

#[test]
fn test_fix_file_reports_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let result = ActivityCorrector::default().fix_file(
        &dir.path().join("missing.fit"),
        &dir.path().join("out.fit"),
        &mut NullSink,
    );
    assert!(matches!(result, Err(FitError::Io { .. })));
}
