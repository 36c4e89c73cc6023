// ABOUTME: Global message and field numbers for the FIT messages the corrector touches
// ABOUTME: Deliberately partial: every other message is carried through as raw bytes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};

/// Global message numbers
pub mod mesg_num {
    /// `file_id`
    pub const FILE_ID: u16 = 0;
    /// `session`
    pub const SESSION: u16 = 18;
    /// `lap`
    pub const LAP: u16 = 19;
    /// `record`
    pub const RECORD: u16 = 20;
    /// `device_info`
    pub const DEVICE_INFO: u16 = 23;
    /// `activity`
    pub const ACTIVITY: u16 = 34;
}

/// Field number shared by every message that carries a timestamp
pub const TIMESTAMP: u8 = 253;

/// `file_id` fields
pub mod file_id {
    /// `type` (enum `file`)
    pub const TYPE: u8 = 0;
    /// `manufacturer` (uint16)
    pub const MANUFACTURER: u8 = 1;
    /// `product` (uint16)
    pub const PRODUCT: u8 = 2;
    /// `serial_number` (uint32z)
    pub const SERIAL_NUMBER: u8 = 3;
    /// `time_created` (uint32)
    pub const TIME_CREATED: u8 = 4;
}

/// `device_info` fields
pub mod device_info {
    /// `device_index` (uint8)
    pub const DEVICE_INDEX: u8 = 0;
    /// `manufacturer` (uint16)
    pub const MANUFACTURER: u8 = 2;
    /// `serial_number` (uint32z)
    pub const SERIAL_NUMBER: u8 = 3;
    /// `product` (uint16)
    pub const PRODUCT: u8 = 4;
}

/// `record` fields
pub mod record {
    /// `heart_rate` (uint8, bpm)
    pub const HEART_RATE: u8 = 3;
    /// `cadence` (uint8, rpm)
    pub const CADENCE: u8 = 4;
    /// `power` (uint16, watts)
    pub const POWER: u8 = 7;
    /// `temperature` (sint8, °C)
    pub const TEMPERATURE: u8 = 13;
}

/// `session` fields
pub mod session {
    /// `start_time` (uint32)
    pub const START_TIME: u8 = 2;
    /// `sport` (enum)
    pub const SPORT: u8 = 5;
    /// `avg_heart_rate` (uint8)
    pub const AVG_HEART_RATE: u8 = 16;
    /// `avg_cadence` (uint8)
    pub const AVG_CADENCE: u8 = 18;
    /// `avg_power` (uint16)
    pub const AVG_POWER: u8 = 20;
}

/// `lap` fields
pub mod lap {
    /// `start_time` (uint32)
    pub const START_TIME: u8 = 2;
}

/// `file` enum value for activity files
pub const FILE_TYPE_ACTIVITY: u8 = 4;

/// Human name of a `sport` enum value
#[must_use]
pub const fn sport_name(sport: u8) -> &'static str {
    match sport {
        0 => "generic",
        1 => "running",
        2 => "cycling",
        3 => "transition",
        4 => "fitness_equipment",
        5 => "swimming",
        10 => "training",
        11 => "walking",
        15 => "rowing",
        17 => "hiking",
        0xFF => "invalid",
        _ => "other",
    }
}

/// Seconds between the Unix epoch and the FIT epoch (1989-12-31T00:00:00Z)
pub const FIT_EPOCH_OFFSET: i64 = 631_065_600;

/// Convert a FIT `date_time` to UTC; values below 0x10000000 are relative and yield `None`
#[must_use]
pub fn to_utc(timestamp: u32) -> Option<DateTime<Utc>> {
    if timestamp < 0x1000_0000 {
        return None;
    }
    DateTime::from_timestamp(FIT_EPOCH_OFFSET + i64::from(timestamp), 0)
}
