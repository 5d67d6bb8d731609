//! Parsing utility functions

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::Error;

/// Largest value a variable byte integer can hold
pub const VARINT_MAX: usize = 268_435_455;

/// Variable Byte Integer
///
/// An unsigned integer that is encoded in one to four bytes.
///
/// In MQTT 3.1.1, it is used only for the `Remaining Length` in the fixed header.
/// In MQTT 5.0, it is formalized and used in multiple places.
///
/// See [specification](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901011).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VarInt {
    value: u32,
    length: u8,
}

impl PartialOrd<usize> for VarInt {
    fn partial_cmp(&self, other: &usize) -> Option<std::cmp::Ordering> {
        Some(self.value().cmp(other))
    }
}

impl PartialEq<usize> for VarInt {
    fn eq(&self, other: &usize) -> bool {
        self.value().eq(other)
    }
}

impl From<VarInt> for u32 {
    fn from(val: VarInt) -> Self {
        val.value
    }
}

impl VarInt {
    /// Creates a new variable byte integer
    ///
    /// # Errors
    /// This will return an error if the value is too large to be encoded
    pub fn new(value: usize) -> Result<Self, Error> {
        let length = match value {
            0..=127 => 1,
            128..=16_383 => 2,
            16_384..=2_097_151 => 3,
            2_097_152..=VARINT_MAX => 4,
            _ => return Err(Error::VariableByteIntegerOutOfRange(value)),
        };
        Ok(Self {
            value: value as u32,
            length,
        })
    }

    /// The numeric value of the variable byte integer
    pub const fn value(&self) -> usize {
        self.value as usize
    }

    /// The number of bytes required to encode this variable byte integer
    pub const fn length(&self) -> usize {
        self.length as usize
    }

    /// Read a variable byte integer from the start of `stream`
    ///
    /// The returned value also carries the number of bytes that have been read.
    pub fn read(stream: &[u8]) -> Result<Self, Error> {
        let mut value: u32 = 0;
        let mut length = 0;
        let mut shift = 0;

        // Use continuation bit at position 7 to continue reading next byte to frame 'length'.
        // Stream 0b1xxx_xxxx 0b1yyy_yyyy 0b1zzz_zzzz 0b0www_wwww will
        // be framed as number 0bwww_wwww_zzz_zzzz_yyy_yyyy_xxx_xxxx
        for &byte in stream {
            value += ((byte & 0b0111_1111) as u32) << shift;
            length += 1;
            shift += 7;

            // stop when continuation bit is 0
            if (byte & 0b1000_0000) == 0 {
                return Ok(Self { value, length });
            }

            // Only a max of 4 bytes allowed, a fifth one is never looked at
            if length >= 4 {
                return Err(Error::MalformedVariableByteInteger);
            }
        }

        // Not enough bytes in stream to finish the integer
        Err(Error::TruncatedPacket(1))
    }

    /// Write a variable byte integer to the stream
    pub fn write(&self, stream: &mut BytesMut) {
        let mut x = self.value;
        let mut done = false;

        while !done {
            let mut byte = (x % 128) as u8;
            x >>= 7;
            if x > 0 {
                byte |= 128;
            } else {
                done = true;
            }

            stream.put_u8(byte);
        }
    }
}

/// A read position into a packet buffer.
///
/// Reads go through [`bytes::Buf`] on a view of the unread part of `frame`.
/// The position only ever moves forward and never past the end of the frame.
/// A read that would cross the end fails with [`Error::TruncatedPacket`]
/// and leaves the position where it was.
#[derive(Debug, Clone)]
pub struct Cursor {
    frame: Bytes,
    stream: Bytes,
}

impl Cursor {
    pub fn new(frame: Bytes) -> Self {
        Cursor {
            stream: frame.clone(),
            frame,
        }
    }

    /// Creates a cursor over `frame` that starts reading at `pos`
    pub fn at(frame: Bytes, pos: usize) -> Result<Self, Error> {
        if pos > frame.len() {
            return Err(Error::TruncatedPacket(pos - frame.len()));
        }

        Ok(Cursor {
            stream: frame.slice(pos..),
            frame,
        })
    }

    /// Offset of the next byte to read, relative to the start of the frame
    #[inline]
    pub fn position(&self) -> usize {
        self.frame.len() - self.stream.remaining()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.stream.remaining()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.stream.has_remaining()
    }

    /// Fails unless at least `len` bytes are left
    fn require(&self, len: usize) -> Result<(), Error> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(Error::TruncatedPacket(len - remaining));
        }

        Ok(())
    }

    /// Takes the next `len` bytes without copying them
    pub fn take(&mut self, len: usize) -> Result<Bytes, Error> {
        self.require(len)?;
        Ok(self.stream.copy_to_bytes(len))
    }

    /// Skips over the next `len` bytes
    pub fn skip(&mut self, len: usize) -> Result<(), Error> {
        self.require(len)?;
        self.stream.advance(len);
        Ok(())
    }

    /// A cursor at the current position that cannot read past offset `end`
    pub fn limit(&self, end: usize) -> Result<Cursor, Error> {
        if end > self.frame.len() {
            return Err(Error::TruncatedPacket(end - self.frame.len()));
        }

        Cursor::at(self.frame.slice(..end), self.position())
    }
}

/// Read a [`VarInt`] and move past it
pub fn read_varint(stream: &mut Cursor) -> Result<VarInt, Error> {
    let varint = VarInt::read(stream.stream.chunk())?;
    stream.stream.advance(varint.length());
    Ok(varint)
}

/// Read [Binary Data][1] from a byte stream.
///
/// [1]: https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901012
pub fn read_mqtt_bytes(stream: &mut Cursor) -> Result<Bytes, Error> {
    // Only commit the length prefix once the whole field is known to be there
    let mut probe = stream.clone();
    let len = read_u16(&mut probe)? as usize;
    let bytes = probe.take(len)?;

    *stream = probe;
    Ok(bytes)
}

/// Read a [UTF-8 Encoded String][1] from a byte stream.
///
/// [1]: https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901010
pub fn read_mqtt_string(stream: &mut Cursor) -> Result<String, Error> {
    let mut probe = stream.clone();
    let s = std::str::from_utf8(&read_mqtt_bytes(&mut probe)?)?.to_owned();

    *stream = probe;
    Ok(s)
}

/// Write [Binary Data][1] to a byte stream.
///
/// [1]: https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901012
pub fn write_mqtt_bytes(stream: &mut BytesMut, bytes: &[u8]) -> Result<(), Error> {
    let len = u16::try_from(bytes.len()).map_err(|_| Error::FieldTooLarge(bytes.len()))?;
    stream.put_u16(len);
    stream.extend_from_slice(bytes);
    Ok(())
}

/// Write a [UTF-8 Encoded String][1] to a byte stream.
///
/// [1]: https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901010
pub fn write_mqtt_string(stream: &mut BytesMut, string: &str) -> Result<(), Error> {
    write_mqtt_bytes(stream, string.as_bytes())
}

/// Encoded size of a length-prefixed field
#[inline]
pub fn field_len(bytes: &[u8]) -> usize {
    2 + bytes.len()
}

/// A checked version of [`bytes::Buf::get_u8`]
pub fn read_u8(stream: &mut Cursor) -> Result<u8, Error> {
    stream.require(1)?;
    Ok(stream.stream.get_u8())
}

/// A checked version of [`bytes::Buf::get_u16`]
pub fn read_u16(stream: &mut Cursor) -> Result<u16, Error> {
    stream.require(2)?;
    Ok(stream.stream.get_u16())
}

/// A checked version of [`bytes::Buf::get_u32`]
pub fn read_u32(stream: &mut Cursor) -> Result<u32, Error> {
    stream.require(4)?;
    Ok(stream.stream.get_u32())
}
