// ABOUTME: Typed activity view over a decoded FIT file: identity, devices, records, sessions, laps
// ABOUTME: Owned fields are read on construction and written back on into_fit; all else is untouched
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use fitbridge_core::constants::fit_invalid;
use fitbridge_core::errors::fit::{FitError, FitResult};

use super::base_type::BaseType;
use super::profile::{device_info, file_id, lap, mesg_num, record, session, FILE_TYPE_ACTIVITY, TIMESTAMP};
use super::{codec, FitFile, Message};

/// Manufacturer, product, and serial number of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Manufacturer id (`uint16`, 0xFFFF when absent)
    pub manufacturer: u16,
    /// Product id (`uint16`, 0xFFFF when absent)
    pub product: u16,
    /// Serial number (`uint32z`, 0 when absent)
    pub serial_number: u32,
}

impl DeviceIdentity {
    fn read(message: &Message, manufacturer: u8, product: u8, serial_number: u8) -> Self {
        Self {
            manufacturer: message.get_u16(manufacturer).unwrap_or(fit_invalid::UINT16),
            product: message.get_u16(product).unwrap_or(fit_invalid::UINT16),
            serial_number: message.get_u32(serial_number).unwrap_or(fit_invalid::UINT32Z),
        }
    }

    fn write(self, message: &mut Message, manufacturer: u8, product: u8, serial_number: u8) {
        message.set_or_invalidate(manufacturer, BaseType::UINT16, u64::from(self.manufacturer));
        message.set_or_invalidate(product, BaseType::UINT16, u64::from(self.product));
        message.set_or_invalidate(
            serial_number,
            BaseType::UINT32Z,
            u64::from(self.serial_number),
        );
    }
}

/// One `device_info` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    /// Device index, `None` when the message does not carry one
    pub device_index: Option<u8>,
    /// Identity reported for this device
    pub identity: DeviceIdentity,
    message_index: usize,
}

/// One `record` sample; absent values hold their sentinel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    /// FIT timestamp (seconds since 1989-12-31)
    pub timestamp: Option<u32>,
    /// Power in watts, 0xFFFF when absent
    pub power: u16,
    /// Heart rate in bpm, 0xFF when absent
    pub heart_rate: u8,
    /// Cadence in rpm, 0xFF when absent
    pub cadence: u8,
    /// Temperature in °C, 0x7F when absent
    pub temperature: i8,
    message_index: usize,
}

/// One `session` summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Session start
    pub start_time: Option<u32>,
    /// Session end
    pub timestamp: Option<u32>,
    /// `sport` enum value, 0xFF when absent
    pub sport: u8,
    /// Average power, 0xFFFF when absent
    pub avg_power: u16,
    /// Average heart rate, 0xFF when absent
    pub avg_heart_rate: u8,
    /// Average cadence, 0xFF when absent
    pub avg_cadence: u8,
    message_index: usize,
}

/// One `lap`; read only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LapSummary {
    /// Lap start
    pub start_time: Option<u32>,
    /// Lap end
    pub timestamp: Option<u32>,
}

/// Decoded activity file with typed access to the fields the corrector owns
#[derive(Debug, Clone)]
pub struct ActivityFile {
    fit: FitFile,
    file_id_index: usize,
    /// File-level identity from `file_id`
    pub file_identity: DeviceIdentity,
    /// `file_id.time_created`
    pub time_created: Option<u32>,
    /// Every `device_info` entry, in file order
    pub devices: Vec<DeviceEntry>,
    /// Every `record`, in file order
    pub records: Vec<ActivityRecord>,
    /// Every `session`, in file order
    pub sessions: Vec<SessionSummary>,
    /// Every `lap`, in file order
    pub laps: Vec<LapSummary>,
}

impl ActivityFile {
    /// Decode bytes and project them as an activity.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::Decode`] for malformed input and
    /// [`FitError::NotActivity`] when the file is not an activity file.
    pub fn decode(bytes: &[u8]) -> FitResult<Self> {
        Self::from_fit(codec::decode(bytes)?)
    }

    /// Project a decoded file as an activity.
    ///
    /// # Errors
    ///
    /// Returns [`FitError::NotActivity`] when there is no `file_id` message
    /// or its type is not `activity`.
    pub fn from_fit(fit: FitFile) -> FitResult<Self> {
        let (file_id_index, file_id_message) = fit
            .messages
            .iter()
            .enumerate()
            .find(|(_, message)| message.global == mesg_num::FILE_ID)
            .ok_or(FitError::NotActivity {
                file_type: fit_invalid::UINT8,
            })?;

        let file_type = file_id_message
            .get_u8(file_id::TYPE)
            .unwrap_or(fit_invalid::UINT8);
        if file_type != FILE_TYPE_ACTIVITY {
            return Err(FitError::NotActivity { file_type });
        }

        let file_identity = DeviceIdentity::read(
            file_id_message,
            file_id::MANUFACTURER,
            file_id::PRODUCT,
            file_id::SERIAL_NUMBER,
        );
        let time_created = file_id_message.get_u32(file_id::TIME_CREATED);

        let mut devices = Vec::new();
        let mut records = Vec::new();
        let mut sessions = Vec::new();
        let mut laps = Vec::new();

        for (message_index, message) in fit.messages.iter().enumerate() {
            match message.global {
                mesg_num::DEVICE_INFO => devices.push(DeviceEntry {
                    device_index: message.get_u8(device_info::DEVICE_INDEX),
                    identity: DeviceIdentity::read(
                        message,
                        device_info::MANUFACTURER,
                        device_info::PRODUCT,
                        device_info::SERIAL_NUMBER,
                    ),
                    message_index,
                }),
                mesg_num::RECORD => records.push(ActivityRecord {
                    timestamp: message.get_u32(TIMESTAMP),
                    power: message.get_u16(record::POWER).unwrap_or(fit_invalid::UINT16),
                    heart_rate: message
                        .get_u8(record::HEART_RATE)
                        .unwrap_or(fit_invalid::UINT8),
                    cadence: message.get_u8(record::CADENCE).unwrap_or(fit_invalid::UINT8),
                    temperature: message
                        .get_i8(record::TEMPERATURE)
                        .unwrap_or(fit_invalid::SINT8),
                    message_index,
                }),
                mesg_num::SESSION => sessions.push(SessionSummary {
                    start_time: message.get_u32(session::START_TIME),
                    timestamp: message.get_u32(TIMESTAMP),
                    sport: message.get_u8(session::SPORT).unwrap_or(fit_invalid::UINT8),
                    avg_power: message
                        .get_u16(session::AVG_POWER)
                        .unwrap_or(fit_invalid::UINT16),
                    avg_heart_rate: message
                        .get_u8(session::AVG_HEART_RATE)
                        .unwrap_or(fit_invalid::UINT8),
                    avg_cadence: message
                        .get_u8(session::AVG_CADENCE)
                        .unwrap_or(fit_invalid::UINT8),
                    message_index,
                }),
                mesg_num::LAP => laps.push(LapSummary {
                    start_time: message.get_u32(lap::START_TIME),
                    timestamp: message.get_u32(TIMESTAMP),
                }),
                _ => {}
            }
        }

        Ok(Self {
            fit,
            file_id_index,
            file_identity,
            time_created,
            devices,
            records,
            sessions,
            laps,
        })
    }

    /// Protocol and profile version carried from the source file
    #[must_use]
    pub const fn header(&self) -> super::FitHeader {
        self.fit.header
    }

    /// Write owned fields back into the underlying messages
    #[must_use]
    pub fn into_fit(self) -> FitFile {
        let mut fit = self.fit;

        if let Some(message) = fit.messages.get_mut(self.file_id_index) {
            self.file_identity.write(
                message,
                file_id::MANUFACTURER,
                file_id::PRODUCT,
                file_id::SERIAL_NUMBER,
            );
        }

        for device in &self.devices {
            if let Some(message) = fit.messages.get_mut(device.message_index) {
                device.identity.write(
                    message,
                    device_info::MANUFACTURER,
                    device_info::PRODUCT,
                    device_info::SERIAL_NUMBER,
                );
            }
        }

        for sample in &self.records {
            if let Some(message) = fit.messages.get_mut(sample.message_index) {
                message.set_or_invalidate(record::POWER, BaseType::UINT16, u64::from(sample.power));
                message.set_or_invalidate(
                    record::HEART_RATE,
                    BaseType::UINT8,
                    u64::from(sample.heart_rate),
                );
                message.set_or_invalidate(record::CADENCE, BaseType::UINT8, u64::from(sample.cadence));
                message.set_or_invalidate(
                    record::TEMPERATURE,
                    BaseType::SINT8,
                    u64::from(sample.temperature as u8),
                );
            }
        }

        for summary in &self.sessions {
            if let Some(message) = fit.messages.get_mut(summary.message_index) {
                message.set_or_invalidate(
                    session::AVG_POWER,
                    BaseType::UINT16,
                    u64::from(summary.avg_power),
                );
                message.set_or_invalidate(
                    session::AVG_HEART_RATE,
                    BaseType::UINT8,
                    u64::from(summary.avg_heart_rate),
                );
                message.set_or_invalidate(
                    session::AVG_CADENCE,
                    BaseType::UINT8,
                    u64::from(summary.avg_cadence),
                );
            }
        }

        fit
    }

    /// Write owned fields back and encode
    ///
    /// # Errors
    ///
    /// Returns [`FitError::Encode`] if the file cannot be serialized.
    pub fn encode(self) -> FitResult<Vec<u8>> {
        codec::encode(&self.into_fit())
    }
}
