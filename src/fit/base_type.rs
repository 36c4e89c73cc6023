// ABOUTME: FIT base type byte with size and invalid-value lookup
// ABOUTME: Unknown base types are carried as single bytes so their fields survive untouched
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Base type byte of a field definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BaseType(pub u8);

impl BaseType {
    /// `enum`
    pub const ENUM: Self = Self(0x00);
    /// `sint8`
    pub const SINT8: Self = Self(0x01);
    /// `uint8`
    pub const UINT8: Self = Self(0x02);
    /// `sint16`
    pub const SINT16: Self = Self(0x83);
    /// `uint16`
    pub const UINT16: Self = Self(0x84);
    /// `sint32`
    pub const SINT32: Self = Self(0x85);
    /// `uint32`
    pub const UINT32: Self = Self(0x86);
    /// `string`
    pub const STRING: Self = Self(0x07);
    /// `float32`
    pub const FLOAT32: Self = Self(0x88);
    /// `float64`
    pub const FLOAT64: Self = Self(0x89);
    /// `uint8z`
    pub const UINT8Z: Self = Self(0x0A);
    /// `uint16z`
    pub const UINT16Z: Self = Self(0x8B);
    /// `uint32z`
    pub const UINT32Z: Self = Self(0x8C);
    /// `byte`
    pub const BYTE: Self = Self(0x0D);
    /// `sint64`
    pub const SINT64: Self = Self(0x8E);
    /// `uint64`
    pub const UINT64: Self = Self(0x8F);
    /// `uint64z`
    pub const UINT64Z: Self = Self(0x90);

    /// Size in bytes of one element
    #[must_use]
    pub const fn size(self) -> usize {
        match self.0 & 0x1F {
            0x03 | 0x04 | 0x0B => 2,
            0x05 | 0x06 | 0x08 | 0x0C => 4,
            0x09 | 0x0E | 0x0F | 0x10 => 8,
            _ => 1,
        }
    }

    /// The reserved "absent" value for this type, as raw bits
    #[must_use]
    pub const fn invalid(self) -> u64 {
        match self.0 & 0x1F {
            0x01 => 0x7F,
            0x03 => 0x7FFF,
            0x04 => 0xFFFF,
            0x05 => 0x7FFF_FFFF,
            0x06 | 0x08 => 0xFFFF_FFFF,
            0x07 | 0x0A | 0x0B | 0x0C | 0x10 => 0,
            0x09 | 0x0F => u64::MAX,
            0x0E => 0x7FFF_FFFF_FFFF_FFFF,
            _ => 0xFF,
        }
    }
}
