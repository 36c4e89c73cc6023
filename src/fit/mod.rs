// ABOUTME: Message-preserving FIT container model shared by the codec and the activity view
// ABOUTME: Messages keep raw field bytes so untouched data survives a decode/encode pass
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # FIT container model
//!
//! A [`FitFile`] is the header plus every message of a FIT stream, in order.
//! Fields are stored as raw bytes in the architecture of the message that
//! carried them; typed reads and writes go through [`Message`] accessors and
//! only touch the first element of a field. Schema knowledge is limited to
//! the handful of messages listed in [`profile`].

/// Typed projection of an activity file
pub mod activity;
/// Base type table
pub mod base_type;
/// Byte-level decode and encode
pub mod codec;
/// FIT CRC-16
pub mod crc;
/// Message and field numbers this crate understands
pub mod profile;

pub use activity::{ActivityFile, ActivityRecord, DeviceEntry, DeviceIdentity, LapSummary, SessionSummary};
pub use base_type::BaseType;
pub use codec::{decode, encode};

/// Byte order of a message's multi-byte fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Architecture {
    /// Little endian (architecture byte 0)
    #[default]
    LittleEndian,
    /// Big endian (architecture byte 1)
    BigEndian,
}

impl Architecture {
    /// Architecture byte as written in a definition message
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::LittleEndian => 0,
            Self::BigEndian => 1,
        }
    }
}

/// File header fields that must survive re-encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitHeader {
    /// Header length, 12 or 14
    pub header_size: u8,
    /// Protocol version byte (e.g. 0x10 for 1.0, 0x20 for 2.0)
    pub protocol_version: u8,
    /// Profile version (e.g. 2132 for 21.32)
    pub profile_version: u16,
}

impl Default for FitHeader {
    fn default() -> Self {
        Self {
            header_size: 14,
            protocol_version: 0x20,
            profile_version: 2132,
        }
    }
}

/// A field value held as raw bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field definition number
    pub number: u8,
    /// Base type byte from the definition
    pub base_type: BaseType,
    /// Raw bytes in the owning message's architecture
    pub bytes: Vec<u8>,
}

/// A developer data field, carried through untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeveloperField {
    /// Developer field number
    pub number: u8,
    /// Index of the developer data id message that describes it
    pub developer_index: u8,
    /// Raw bytes
    pub bytes: Vec<u8>,
}

/// One data message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Global message number
    pub global: u16,
    /// Byte order of multi-byte fields
    pub architecture: Architecture,
    /// Fields in definition order
    pub fields: Vec<Field>,
    /// Developer fields in definition order
    pub developer_fields: Vec<DeveloperField>,
}

impl Message {
    /// Create an empty little-endian message
    #[must_use]
    pub const fn new(global: u16) -> Self {
        Self {
            global,
            architecture: Architecture::LittleEndian,
            fields: Vec::new(),
            developer_fields: Vec::new(),
        }
    }

    /// Builder-style field setter
    #[must_use]
    pub fn with(mut self, number: u8, base_type: BaseType, value: u64) -> Self {
        self.set(number, base_type, value);
        self
    }

    /// Look up a field
    #[must_use]
    pub fn field(&self, number: u8) -> Option<&Field> {
        self.fields.iter().find(|field| field.number == number)
    }

    /// Read the first element of a field as an unsigned integer.
    ///
    /// Returns `None` when the field is absent or shorter than its base type.
    #[must_use]
    pub fn get(&self, number: u8) -> Option<u64> {
        let field = self.field(number)?;
        let size = field.base_type.size();
        let bytes = field.bytes.get(..size)?;
        Some(read_uint(bytes, self.architecture))
    }

    /// Read a one-byte field
    #[must_use]
    pub fn get_u8(&self, number: u8) -> Option<u8> {
        self.get(number).map(|value| value as u8)
    }

    /// Read a two-byte field
    #[must_use]
    pub fn get_u16(&self, number: u8) -> Option<u16> {
        self.get(number).map(|value| value as u16)
    }

    /// Read a four-byte field
    #[must_use]
    pub fn get_u32(&self, number: u8) -> Option<u32> {
        self.get(number).map(|value| value as u32)
    }

    /// Read a signed one-byte field
    #[must_use]
    pub fn get_i8(&self, number: u8) -> Option<i8> {
        self.get(number).map(|value| value as u8 as i8)
    }

    /// Write the first element of a field.
    ///
    /// An existing field keeps its declared base type and length. A missing
    /// field is appended with `base_type`.
    pub fn set(&mut self, number: u8, base_type: BaseType, value: u64) {
        let architecture = self.architecture;
        if let Some(field) = self.fields.iter_mut().find(|field| field.number == number) {
            let size = field.base_type.size();
            if field.bytes.len() < size {
                field.bytes.resize(size, 0);
            }
            write_uint(&mut field.bytes[..size], value, architecture);
            return;
        }
        let mut bytes = vec![0; base_type.size()];
        write_uint(&mut bytes, value, architecture);
        self.fields.push(Field {
            number,
            base_type,
            bytes,
        });
    }

    /// Write a field whose absence already means `invalid`.
    ///
    /// Writing the invalid value to a missing field leaves the message unchanged.
    pub fn set_or_invalidate(&mut self, number: u8, base_type: BaseType, value: u64) {
        if self.field(number).is_none() && value == base_type.invalid() {
            return;
        }
        self.set(number, base_type, value);
    }
}

/// A decoded FIT file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FitFile {
    /// Header values carried through re-encoding
    pub header: FitHeader,
    /// Data messages in stream order
    pub messages: Vec<Message>,
    /// Bytes after the first file's CRC (chained files), written back verbatim
    pub trailing: Vec<u8>,
}

impl FitFile {
    /// Create an empty file with the given header
    #[must_use]
    pub const fn new(header: FitHeader) -> Self {
        Self {
            header,
            messages: Vec::new(),
            trailing: Vec::new(),
        }
    }

    /// Messages with the given global number
    pub fn messages_of(&self, global: u16) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(move |message| message.global == global)
    }
}

pub(crate) fn read_uint(bytes: &[u8], architecture: Architecture) -> u64 {
    match architecture {
        Architecture::LittleEndian => bytes
            .iter()
            .rev()
            .fold(0_u64, |acc, byte| (acc << 8) | u64::from(*byte)),
        Architecture::BigEndian => bytes
            .iter()
            .fold(0_u64, |acc, byte| (acc << 8) | u64::from(*byte)),
    }
}

pub(crate) fn write_uint(bytes: &mut [u8], value: u64, architecture: Architecture) {
    let len = bytes.len();
    for (index, byte) in bytes.iter_mut().enumerate() {
        let shift = match architecture {
            Architecture::LittleEndian => index * 8,
            Architecture::BigEndian => (len - 1 - index) * 8,
        };
        *byte = (value >> shift) as u8;
    }
}
