//! Functionality for dealing with fixed headers of MQTT packets.

use bytes::{BufMut, BytesMut};

use crate::parse::*;
use crate::{Error, PacketType, QoS};

/// Fixed header of an MQTT Control Packet
///
/// See [specification](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901021).
///
/// ```text
///           7                          3                          0
///           +--------------------------+--------------------------+
/// byte 1    | MQTT Control Packet Type |   Flags for each type    |
///           +--------------------------+--------------------------+
/// bytes 2.. |            Remaining Length (1 to 4 bytes)          |
///           +-----------------------------------------------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd)]
pub struct FixedHeader {
    /// Contains the packet type and several flags
    pub control_field: u8,
    /// Remaining length of the packet.
    ///
    /// This does not include the fixed header bytes.
    /// It represents the variable header + payload.
    pub remaining_len: VarInt,
}

impl FixedHeader {
    pub fn new(byte1: u8, remaining_len: VarInt) -> FixedHeader {
        FixedHeader {
            control_field: byte1,
            remaining_len,
        }
    }

    /// Parse the [PacketType] from the control field
    ///
    /// Only the reserved type `0` fails.
    pub fn packet_type(&self) -> Result<PacketType, Error> {
        PacketType::try_from(self.control_field >> 4)
    }

    /// Get the flag bits from the control field
    #[inline]
    pub fn flags(&self) -> u8 {
        self.control_field & 0x0F
    }

    /// Returns the size of the fixed header
    #[inline]
    pub fn size(&self) -> usize {
        1 + self.remaining_len.length()
    }

    /// Returns the size of full packet (fixed header + variable header + payload)
    ///
    /// Fixed header is enough to get the size of a frame in the stream
    #[inline]
    pub fn packet_size(&self) -> usize {
        self.size() + self.remaining_len.value()
    }

    /// Checks if the stream has enough bytes to frame a packet and returns fixed header
    /// only if a packet can be framed with existing bytes in the `stream`.
    ///
    /// The stream itself is not consumed, so a failed check can simply be
    /// repeated once more bytes have arrived.
    pub fn check(stream: &[u8], max_packet_size: u32) -> Result<Self, Error> {
        let fixed_header = Self::read(stream)?;

        // Don't let rogue connections attack with huge payloads.
        // Disconnect them before reading all that data
        if fixed_header.remaining_len > max_packet_size as usize {
            return Err(Error::PayloadSizeLimitExceeded {
                pkt_size: fixed_header.remaining_len.into(),
                max: max_packet_size,
            });
        }

        let frame_length = fixed_header.packet_size();
        if stream.len() < frame_length {
            return Err(Error::TruncatedPacket(frame_length - stream.len()));
        }

        Ok(fixed_header)
    }

    /// Tries to read a [FixedHeader] from the start of the stream
    pub fn read(stream: &[u8]) -> Result<Self, Error> {
        let (&byte1, rest) = stream.split_first().ok_or(Error::TruncatedPacket(2))?;
        let remaining_len = VarInt::read(rest)?;

        Ok(Self::new(byte1, remaining_len))
    }

    /// Writes the control field and a freshly encoded remaining length
    pub fn write(&self, stream: &mut BytesMut) {
        stream.put_u8(self.control_field);
        self.remaining_len.write(stream);
    }
}

/// Flags carried in the fixed header of a PUBLISH packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishFlags {
    pub dup: bool,
    /// Raw QoS bits, `3` is malformed but reported as is
    pub qos: u8,
    pub retain: bool,
}

impl PublishFlags {
    pub fn from_flags(flags: u8) -> Self {
        PublishFlags {
            dup: (flags >> 3) & 1 == 1,
            qos: (flags >> 1) & 0b11,
            retain: flags & 1 == 1,
        }
    }

    /// The QoS level, if the bits hold a valid one
    pub fn qos(&self) -> Result<QoS, Error> {
        QoS::try_from(self.qos)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn connect_header_frames_packet() {
        let stream = [0x10, 0x02, 0x00, 0x00, 0xFF];
        let header = FixedHeader::check(&stream, 1024).unwrap();

        assert_eq!(header.packet_type().unwrap(), PacketType::Connect);
        assert_eq!(header.flags(), 0);
        assert_eq!(header.size(), 2);
        assert_eq!(header.packet_size(), 4);
    }

    #[test]
    fn partial_frame_reports_missing_bytes() {
        assert!(matches!(
            FixedHeader::check(&[0x10, 0x0A, 0x00], 1024),
            Err(Error::TruncatedPacket(9))
        ));
        assert!(matches!(
            FixedHeader::check(&[0x10], 1024),
            Err(Error::TruncatedPacket(1))
        ));
        assert!(matches!(
            FixedHeader::check(&[], 1024),
            Err(Error::TruncatedPacket(2))
        ));
    }

    #[test]
    fn oversized_frame_is_refused() {
        assert!(matches!(
            FixedHeader::check(&[0x10, 0x80, 0x01], 100),
            Err(Error::PayloadSizeLimitExceeded {
                pkt_size: 128,
                max: 100
            })
        ));
    }

    #[test]
    fn publish_flags_are_split() {
        let header = FixedHeader::read(&[0x3D, 0x00]).unwrap();
        assert_eq!(header.packet_type().unwrap(), PacketType::Publish);

        let flags = PublishFlags::from_flags(header.flags());
        assert_eq!(
            flags,
            PublishFlags {
                dup: true,
                qos: 2,
                retain: true
            }
        );
        assert_eq!(flags.qos().unwrap(), QoS::ExactlyOnce);
        assert!(PublishFlags::from_flags(0b0110).qos().is_err());
    }

    #[test]
    fn reserved_type_is_reported() {
        let header = FixedHeader::read(&[0x00, 0x00]).unwrap();
        assert!(matches!(
            header.packet_type(),
            Err(Error::InvalidPacketType(0))
        ));
    }
}
