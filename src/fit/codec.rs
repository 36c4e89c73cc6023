// ABOUTME: FIT byte stream decoder and encoder preserving every message and field
// ABOUTME: Handles definitions, developer fields, compressed timestamps, and both CRCs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use fitbridge_core::errors::fit::{FitError, FitResult};

use super::base_type::BaseType;
use super::crc::checksum;
use super::profile::TIMESTAMP;
use super::{read_uint, write_uint, Architecture, DeveloperField, Field, FitFile, FitHeader, Message};

const MAGIC: &[u8; 4] = b".FIT";
const LOCAL_TYPES: usize = 16;
const COMPRESSED_TIMESTAMP_HEADER: u8 = 0x80;
const DEFINITION_HEADER: u8 = 0x40;
const DEVELOPER_DATA_FLAG: u8 = 0x20;
const LOCAL_TYPE_MASK: u8 = 0x0F;

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldDefinition {
    number: u8,
    size: u8,
    base_type: BaseType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DeveloperFieldDefinition {
    number: u8,
    size: u8,
    developer_index: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Definition {
    architecture: Architecture,
    global: u16,
    fields: Vec<FieldDefinition>,
    developer_fields: Vec<DeveloperFieldDefinition>,
}

impl Definition {
    fn of(message: &Message) -> FitResult<Self> {
        let field_size = |number: u8, len: usize| {
            u8::try_from(len).map_err(|_| {
                FitError::encode(format!(
                    "field {number} of message {} is {len} bytes, limit is 255",
                    message.global
                ))
            })
        };
        if message.fields.len() > 255 || message.developer_fields.len() > 255 {
            return Err(FitError::encode(format!(
                "message {} has more than 255 fields",
                message.global
            )));
        }

        let fields = message
            .fields
            .iter()
            .map(|field| {
                Ok(FieldDefinition {
                    number: field.number,
                    size: field_size(field.number, field.bytes.len())?,
                    base_type: field.base_type,
                })
            })
            .collect::<FitResult<Vec<_>>>()?;
        let developer_fields = message
            .developer_fields
            .iter()
            .map(|field| {
                Ok(DeveloperFieldDefinition {
                    number: field.number,
                    size: field_size(field.number, field.bytes.len())?,
                    developer_index: field.developer_index,
                })
            })
            .collect::<FitResult<Vec<_>>>()?;

        Ok(Self {
            architecture: message.architecture,
            global: message.global,
            fields,
            developer_fields,
        })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> FitResult<&'a [u8]> {
        let stop = self.pos + len;
        if stop > self.end {
            return Err(FitError::decode(
                self.pos,
                format!("unexpected end of data reading {len} bytes"),
            ));
        }
        let slice = &self.bytes[self.pos..stop];
        self.pos = stop;
        Ok(slice)
    }

    fn byte(&mut self) -> FitResult<u8> {
        Ok(self.take(1)?[0])
    }
}

/// Decode a FIT byte stream.
///
/// Both CRCs are verified (a zero header CRC means "not computed"). Bytes
/// following the first file are kept in [`FitFile::trailing`].
///
/// # Errors
///
/// Returns [`FitError::Decode`] for truncated input, a bad signature,
/// CRC mismatch, or a data message referring to an undefined local type.
pub fn decode(bytes: &[u8]) -> FitResult<FitFile> {
    let (header, data_size) = decode_header(bytes)?;
    let data_start = usize::from(header.header_size);
    let data_end = data_start + data_size;
    let crc_end = data_end + 2;
    if bytes.len() < crc_end {
        return Err(FitError::decode(
            bytes.len(),
            format!("truncated file: header declares {crc_end} bytes"),
        ));
    }

    let stored = u16::from_le_bytes([bytes[data_end], bytes[data_end + 1]]);
    let computed = checksum(&bytes[..data_end]);
    if stored != computed {
        return Err(FitError::decode(
            data_end,
            format!("file CRC mismatch: stored {stored:#06x}, computed {computed:#06x}"),
        ));
    }

    let messages = decode_messages(bytes, data_start, data_end)?;
    Ok(FitFile {
        header,
        messages,
        trailing: bytes[crc_end..].to_vec(),
    })
}

fn decode_header(bytes: &[u8]) -> FitResult<(FitHeader, usize)> {
    if bytes.len() < 12 {
        return Err(FitError::decode(0, "file shorter than a FIT header"));
    }
    let header_size = bytes[0];
    if header_size != 12 && header_size != 14 {
        return Err(FitError::decode(
            0,
            format!("unsupported header size {header_size}"),
        ));
    }
    if bytes.len() < usize::from(header_size) {
        return Err(FitError::decode(0, "truncated header"));
    }
    if &bytes[8..12] != MAGIC {
        return Err(FitError::decode(8, "missing .FIT signature"));
    }
    if header_size == 14 {
        let stored = u16::from_le_bytes([bytes[12], bytes[13]]);
        if stored != 0 && stored != checksum(&bytes[..12]) {
            return Err(FitError::decode(12, "header CRC mismatch"));
        }
    }

    let header = FitHeader {
        header_size,
        protocol_version: bytes[1],
        profile_version: u16::from_le_bytes([bytes[2], bytes[3]]),
    };
    let data_size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    Ok((header, data_size))
}

fn decode_messages(bytes: &[u8], start: usize, end: usize) -> FitResult<Vec<Message>> {
    let mut definitions: [Option<Definition>; LOCAL_TYPES] = Default::default();
    let mut last_timestamp: Option<u32> = None;
    let mut messages = Vec::new();
    let mut reader = Reader {
        bytes,
        pos: start,
        end,
    };

    while reader.pos < end {
        let offset = reader.pos;
        let record_header = reader.byte()?;

        if record_header & COMPRESSED_TIMESTAMP_HEADER != 0 {
            let local = usize::from((record_header >> 5) & 0x03);
            let definition = definitions[local]
                .as_ref()
                .ok_or_else(|| undefined_local_type(offset, local))?;
            let mut message = read_data(&mut reader, definition)?;
            let base = last_timestamp.ok_or_else(|| {
                FitError::decode(offset, "compressed timestamp before any full timestamp")
            })?;
            let timestamp = expand_compressed_timestamp(base, record_header & 0x1F);
            message.set(TIMESTAMP, BaseType::UINT32, u64::from(timestamp));
            last_timestamp = Some(timestamp);
            messages.push(message);
        } else if record_header & DEFINITION_HEADER != 0 {
            let local = usize::from(record_header & LOCAL_TYPE_MASK);
            let has_developer_data = record_header & DEVELOPER_DATA_FLAG != 0;
            definitions[local] = Some(read_definition(&mut reader, has_developer_data)?);
        } else {
            let local = usize::from(record_header & LOCAL_TYPE_MASK);
            let definition = definitions[local]
                .as_ref()
                .ok_or_else(|| undefined_local_type(offset, local))?;
            let message = read_data(&mut reader, definition)?;
            if let Some(timestamp) = message
                .get_u32(TIMESTAMP)
                .filter(|timestamp| u64::from(*timestamp) != BaseType::UINT32.invalid())
            {
                last_timestamp = Some(timestamp);
            }
            messages.push(message);
        }
    }

    Ok(messages)
}

fn undefined_local_type(offset: usize, local: usize) -> FitError {
    FitError::decode(
        offset,
        format!("data message for undefined local type {local}"),
    )
}

fn read_definition(reader: &mut Reader<'_>, has_developer_data: bool) -> FitResult<Definition> {
    let _reserved = reader.byte()?;
    let offset = reader.pos;
    let architecture = match reader.byte()? {
        0 => Architecture::LittleEndian,
        1 => Architecture::BigEndian,
        other => {
            return Err(FitError::decode(
                offset,
                format!("unknown architecture byte {other}"),
            ))
        }
    };
    let global = read_uint(reader.take(2)?, architecture) as u16;

    let field_count = reader.byte()?;
    let mut fields = Vec::with_capacity(usize::from(field_count));
    for _ in 0..field_count {
        let raw = reader.take(3)?;
        fields.push(FieldDefinition {
            number: raw[0],
            size: raw[1],
            base_type: BaseType(raw[2]),
        });
    }

    let mut developer_fields = Vec::new();
    if has_developer_data {
        let developer_count = reader.byte()?;
        developer_fields.reserve(usize::from(developer_count));
        for _ in 0..developer_count {
            let raw = reader.take(3)?;
            developer_fields.push(DeveloperFieldDefinition {
                number: raw[0],
                size: raw[1],
                developer_index: raw[2],
            });
        }
    }

    Ok(Definition {
        architecture,
        global,
        fields,
        developer_fields,
    })
}

fn read_data(reader: &mut Reader<'_>, definition: &Definition) -> FitResult<Message> {
    let mut message = Message::new(definition.global);
    message.architecture = definition.architecture;
    for field in &definition.fields {
        message.fields.push(Field {
            number: field.number,
            base_type: field.base_type,
            bytes: reader.take(usize::from(field.size))?.to_vec(),
        });
    }
    for field in &definition.developer_fields {
        message.developer_fields.push(DeveloperField {
            number: field.number,
            developer_index: field.developer_index,
            bytes: reader.take(usize::from(field.size))?.to_vec(),
        });
    }
    Ok(message)
}

/// Rebuild a full timestamp from the 5-bit offset of a compressed header
#[must_use]
pub fn expand_compressed_timestamp(last_timestamp: u32, offset: u8) -> u32 {
    let offset = u32::from(offset & 0x1F);
    let mut timestamp = (last_timestamp & !0x1F).wrapping_add(offset);
    if offset < last_timestamp & 0x1F {
        timestamp = timestamp.wrapping_add(0x20);
    }
    timestamp
}

/// Encode a [`FitFile`] back to bytes.
///
/// Every message is written with a normal header. Definitions are emitted
/// only when a message's layout differs from the one held by a local type,
/// rotating through the 16 local types.
///
/// # Errors
///
/// Returns [`FitError::Encode`] when the header size is not 12 or 14, a
/// field is longer than 255 bytes, or the data section exceeds 4 GiB.
pub fn encode(file: &FitFile) -> FitResult<Vec<u8>> {
    let header = file.header;
    if header.header_size != 12 && header.header_size != 14 {
        return Err(FitError::encode(format!(
            "unsupported header size {}",
            header.header_size
        )));
    }

    let mut data = Vec::new();
    let mut slots: Vec<Definition> = Vec::with_capacity(LOCAL_TYPES);
    let mut next_slot = 0_usize;

    for message in &file.messages {
        let definition = Definition::of(message)?;
        let local = if let Some(local) = slots.iter().position(|slot| *slot == definition) {
            local
        } else {
            let local = next_slot;
            next_slot = (next_slot + 1) % LOCAL_TYPES;
            write_definition(&mut data, local as u8, &definition);
            if local < slots.len() {
                slots[local] = definition;
            } else {
                slots.push(definition);
            }
            local
        };

        data.push(local as u8);
        for field in &message.fields {
            data.extend_from_slice(&field.bytes);
        }
        for field in &message.developer_fields {
            data.extend_from_slice(&field.bytes);
        }
    }

    let data_size = u32::try_from(data.len())
        .map_err(|_| FitError::encode("data section exceeds 4 GiB"))?;

    let mut out =
        Vec::with_capacity(usize::from(header.header_size) + data.len() + 2 + file.trailing.len());
    out.push(header.header_size);
    out.push(header.protocol_version);
    out.extend_from_slice(&header.profile_version.to_le_bytes());
    out.extend_from_slice(&data_size.to_le_bytes());
    out.extend_from_slice(MAGIC);
    if header.header_size == 14 {
        let header_crc = checksum(&out);
        out.extend_from_slice(&header_crc.to_le_bytes());
    }
    out.extend_from_slice(&data);
    let file_crc = checksum(&out);
    out.extend_from_slice(&file_crc.to_le_bytes());
    out.extend_from_slice(&file.trailing);
    Ok(out)
}

fn write_definition(out: &mut Vec<u8>, local: u8, definition: &Definition) {
    let mut record_header = DEFINITION_HEADER | (local & LOCAL_TYPE_MASK);
    if !definition.developer_fields.is_empty() {
        record_header |= DEVELOPER_DATA_FLAG;
    }
    out.push(record_header);
    out.push(0);
    out.push(definition.architecture.as_byte());
    let mut global = [0_u8; 2];
    write_uint(&mut global, u64::from(definition.global), definition.architecture);
    out.extend_from_slice(&global);

    out.push(definition.fields.len() as u8);
    for field in &definition.fields {
        out.extend_from_slice(&[field.number, field.size, field.base_type.0]);
    }
    if !definition.developer_fields.is_empty() {
        out.push(definition.developer_fields.len() as u8);
        for field in &definition.developer_fields {
            out.extend_from_slice(&[field.number, field.size, field.developer_index]);
        }
    }
}
