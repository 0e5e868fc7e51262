//! Frames, the bounds-checked field reader, and packet encode/decode traits.

use bytes::{BufMut, Bytes, BytesMut};

use crate::common::error::ProtocolError;

/// Header kind, identified by the first byte of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// `C1 size opcode`, one-byte length.
    C1,
    /// `C2 size-hi size-lo opcode`, two-byte big-endian length.
    C2,
    /// Encrypted variant of C1 (framed identically).
    C3,
    /// Encrypted variant of C2 (framed identically).
    C4,
}

impl FrameKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0xC1 => Some(Self::C1),
            0xC2 => Some(Self::C2),
            0xC3 => Some(Self::C3),
            0xC4 => Some(Self::C4),
            _ => None,
        }
    }

    pub fn byte(self) -> u8 {
        match self {
            Self::C1 => 0xC1,
            Self::C2 => 0xC2,
            Self::C3 => 0xC3,
            Self::C4 => 0xC4,
        }
    }

    /// True for the word-length headers (C2/C4).
    pub fn is_wide(self) -> bool {
        matches!(self, Self::C2 | Self::C4)
    }

    /// Bytes before the opcode: type + length.
    pub fn length_prefix(self) -> usize {
        if self.is_wide() {
            3
        } else {
            2
        }
    }

    /// Offset of the opcode byte within the frame.
    pub fn opcode_offset(self) -> usize {
        self.length_prefix()
    }

    /// Smallest frame the dispatcher will look at.
    pub fn min_dispatch_len(self) -> usize {
        if self.is_wide() {
            5
        } else {
            3
        }
    }
}

/// Largest body a C1 frame can carry behind its 3-byte header.
pub const MAX_C1_BODY: usize = u8::MAX as usize - 3;

/// A complete MU protocol frame.
///
/// `raw` holds the whole frame including its header, so decoders address
/// fields by absolute offset.
#[derive(Debug, Clone)]
pub struct Packet {
    pub kind: FrameKind,
    pub opcode: u8,
    pub raw: Bytes,
}

impl Packet {
    /// Wrap a complete frame. Returns None if the header is unknown or the
    /// frame has no opcode byte.
    pub fn from_frame(raw: impl Into<Bytes>) -> Option<Self> {
        let raw = raw.into();
        let kind = FrameKind::from_byte(*raw.first()?)?;
        let opcode = *raw.get(kind.opcode_offset())?;
        Some(Self { kind, opcode, raw })
    }

    /// Build a C1 frame around `body`, filling in the length byte.
    pub fn c1(opcode: u8, body: &[u8]) -> Self {
        debug_assert!(
            body.len() <= MAX_C1_BODY,
            "C1 body of {} bytes does not fit the length byte",
            body.len()
        );
        let mut buf = BytesMut::with_capacity(3 + body.len());
        buf.put_u8(0xC1);
        buf.put_u8((3 + body.len()) as u8);
        buf.put_u8(opcode);
        buf.put_slice(body);
        Self {
            kind: FrameKind::C1,
            opcode,
            raw: buf.freeze(),
        }
    }

    /// Build a C2 frame around `body`, filling in the big-endian length.
    pub fn c2(opcode: u8, body: &[u8]) -> Self {
        let size = 4 + body.len();
        debug_assert!(
            size <= u16::MAX as usize,
            "C2 frame of {} bytes does not fit the length field",
            size
        );
        let mut buf = BytesMut::with_capacity(size);
        buf.put_u8(0xC2);
        buf.put_u16(size as u16);
        buf.put_u8(opcode);
        buf.put_slice(body);
        Self {
            kind: FrameKind::C2,
            opcode,
            raw: buf.freeze(),
        }
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn reader(&self) -> PacketReader<'_> {
        PacketReader::new(&self.raw)
    }
}

/// Bounds-checked absolute-offset reads over a frame.
///
/// Every accessor returns `None` instead of reading past the end, which is
/// how decoders stop partway through a truncated list.
#[derive(Debug, Clone, Copy)]
pub struct PacketReader<'a> {
    data: &'a [u8],
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when `size` bytes starting at `off` are inside the frame.
    pub fn has(&self, off: usize, size: usize) -> bool {
        off.checked_add(size).map_or(false, |end| end <= self.data.len())
    }

    pub fn bytes(&self, off: usize, size: usize) -> Option<&'a [u8]> {
        if self.has(off, size) {
            Some(&self.data[off..off + size])
        } else {
            None
        }
    }

    fn array<const N: usize>(&self, off: usize) -> Option<[u8; N]> {
        self.bytes(off, N)?.try_into().ok()
    }

    pub fn u8(&self, off: usize) -> Option<u8> {
        self.data.get(off).copied()
    }

    pub fn u16_be(&self, off: usize) -> Option<u16> {
        self.array(off).map(u16::from_be_bytes)
    }

    pub fn u16_le(&self, off: usize) -> Option<u16> {
        self.array(off).map(u16::from_le_bytes)
    }

    pub fn i16_le(&self, off: usize) -> Option<i16> {
        self.array(off).map(i16::from_le_bytes)
    }

    pub fn u32_le(&self, off: usize) -> Option<u32> {
        self.array(off).map(u32::from_le_bytes)
    }

    pub fn f32_le(&self, off: usize) -> Option<f32> {
        self.array(off).map(f32::from_le_bytes)
    }

    /// Fixed-width, null-padded string. Invalid UTF-8 is replaced.
    pub fn fixed_str(&self, off: usize, width: usize) -> Option<String> {
        let raw = self.bytes(off, width)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Some(String::from_utf8_lossy(&raw[..end]).into_owned())
    }

    /// Iterate fixed-size list entries, stopping at the first one that
    /// does not fit entirely inside the frame.
    pub fn entries(
        &self,
        start: usize,
        count: usize,
        stride: usize,
    ) -> impl Iterator<Item = PacketReader<'a>> + 'a {
        let data = self.data;
        (0..count)
            .map(move |i| start + i * stride)
            .take_while(move |off| off + stride <= data.len())
            .map(move |off| PacketReader::new(&data[off..off + stride]))
    }
}

/// Trait for types that can be encoded into a frame body.
pub trait PacketEncode {
    fn encode(&self, buf: &mut BytesMut);
}

/// Trait for types that can be decoded from a frame.
pub trait PacketDecode: Sized {
    type Error;
    fn decode(packet: &Packet) -> Result<Self, Self::Error>;
}

/// Decode a fixed-layout frame, mapping any out-of-bounds read to
/// `PacketTooShort { needed }`.
pub fn decode_fixed<T>(
    packet: &Packet,
    needed: usize,
    parse: impl FnOnce(PacketReader<'_>) -> Option<T>,
) -> Result<T, ProtocolError> {
    parse(packet.reader()).ok_or(ProtocolError::PacketTooShort {
        needed,
        got: packet.len(),
    })
}

/// Helper for fixed-width null-padded string fields.
pub fn put_fixed_str(buf: &mut BytesMut, value: &str, width: usize) {
    let bytes = value.as_bytes();
    let n = bytes.len().min(width);
    buf.put_slice(&bytes[..n]);
    buf.put_bytes(0, width - n);
}
