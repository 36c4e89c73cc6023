// ABOUTME: Integration tests for the FIT binary codec
// ABOUTME: Validates that untouched messages, developer fields, headers, and trailing bytes survive re-encoding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{producer_activity, steady_samples, SessionAverages};
use fitbridge::errors::fit::FitError;
use fitbridge::fit::crc::checksum;
use fitbridge::fit::{decode, encode, Architecture, BaseType, DeveloperField, Field, FitHeader, Message};

#[test]
fn test_producer_activity_survives_round_trip() {
    let original = producer_activity(&steady_samples(), SessionAverages::default());

    let bytes = encode(&original).unwrap();
    let decoded = decode(&bytes).unwrap();

    assert_eq!(decoded, original);
    assert_eq!(encode(&decoded).unwrap(), bytes);
}

#[test]
fn test_unknown_and_developer_fields_are_preserved() {
    let mut file = producer_activity(&steady_samples(), SessionAverages::default());

    // Unknown manufacturer-specific message, big-endian, with a multi-element field
    let mut unknown = Message::new(0xFF01);
    unknown.architecture = Architecture::BigEndian;
    unknown.fields.push(Field {
        number: 7,
        base_type: BaseType::UINT16,
        bytes: vec![0x12, 0x34, 0xAB, 0xCD],
    });
    unknown.fields.push(Field {
        number: 9,
        base_type: BaseType::STRING,
        bytes: b"MyWhoosh\0".to_vec(),
    });
    file.messages.insert(1, unknown);

    // Developer field on one record
    let record_index = file
        .messages
        .iter()
        .position(|message| message.global == 20)
        .unwrap();
    file.messages[record_index]
        .developer_fields
        .push(DeveloperField {
            number: 0,
            developer_index: 0,
            bytes: vec![1, 2, 3],
        });

    let decoded = decode(&encode(&file).unwrap()).unwrap();

    assert_eq!(decoded, file);
    let unknown = decoded.messages_of(0xFF01).next().unwrap();
    assert_eq!(unknown.architecture, Architecture::BigEndian);
    assert_eq!(unknown.get(7), Some(0x1234));
    assert_eq!(decoded.messages[record_index].developer_fields.len(), 1);
}

#[test]
fn test_header_versions_and_size_are_preserved() {
    let mut file = producer_activity(&steady_samples(), SessionAverages::default());
    file.header = FitHeader {
        header_size: 12,
        protocol_version: 0x10,
        profile_version: 2093,
    };

    let bytes = encode(&file).unwrap();
    assert_eq!(bytes[0], 12);

    let decoded = decode(&bytes).unwrap();
    assert_eq!(decoded.header, file.header);
}

#[test]
fn test_trailing_bytes_are_kept_verbatim() {
    let mut file = producer_activity(&steady_samples(), SessionAverages::default());
    file.trailing = vec![0xDE, 0xAD, 0xBE, 0xEF];

    let decoded = decode(&encode(&file).unwrap()).unwrap();
    assert_eq!(decoded.trailing, vec![0xDE, 0xAD, 0xBE, 0xEF]);
}

#[test]
fn test_written_checksums_validate() {
    let bytes = encode(&producer_activity(&steady_samples(), SessionAverages::default())).unwrap();

    // A file including its own trailing CRC checksums to zero
    assert_eq!(checksum(&bytes), 0);
    assert_eq!(checksum(&bytes[..14]), 0);
}

#[test]
fn test_corrupt_input_is_rejected() {
    let bytes = encode(&producer_activity(&steady_samples(), SessionAverages::default())).unwrap();

    let mut bad_magic = bytes.clone();
    bad_magic[9] = b'X';
    assert!(matches!(decode(&bad_magic), Err(FitError::Decode { .. })));

    let truncated = &bytes[..bytes.len() - 10];
    assert!(matches!(decode(truncated), Err(FitError::Decode { .. })));

    let mut flipped = bytes;
    let last_data = flipped.len() - 3;
    flipped[last_data] ^= 0x01;
    assert!(matches!(decode(&flipped), Err(FitError::Decode { .. })));

    assert!(matches!(decode(b".FIT"), Err(FitError::Decode { .. })));
}
