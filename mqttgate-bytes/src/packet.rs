//! This module defines the packets an intermediary gets to see during the MQTT handshake.
//!
//! At the heart of this module is the [`Packet`] enum. Only CONNECT is decoded
//! in full, every other packet is reported with its fixed header so that the
//! host can decide whether to pass it through. PUBLISH additionally has its
//! header flags split into dup, QoS and retain.
//!
//! ## Usage
//!
//! [`parse_packet`] turns one buffer into a [`Packet`]. The property blocks of
//! a CONNECT are decoded on demand with [`decode_properties`]. The encoders
//! for the handshake live on the packet structs: [`Connect::write`] rebuilds a
//! CONNECT with substituted credentials and [`ConnAck::write`] produces the
//! rejection reply.

use bytes::Bytes;

use crate::{Error, FixedHeader, Properties, PublishFlags};

mod connack;
mod connect;

pub use connack::{build_reject, ConnAck, ConnectReasonCode, ConnectReturnCode};
pub use connect::{build_connect, Connect, ConnectFlags, LastWill, PropertySection, PropertySpan};

/// MQTT Control Packet
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Packet {
    Connect(Box<Connect>),
    Publish(Publish),
    /// Any other packet, including the reserved type `0`
    Other(FixedHeader),
}

impl Packet {
    pub fn fixed_header(&self) -> FixedHeader {
        match self {
            Packet::Connect(connect) => connect.fixed_header(),
            Packet::Publish(publish) => publish.fixed_header,
            Packet::Other(fixed_header) => *fixed_header,
        }
    }

    /// The packet type, `None` for the reserved type `0`
    pub fn packet_type(&self) -> Option<PacketType> {
        self.fixed_header().packet_type().ok()
    }
}

/// The envelope of a PUBLISH packet
///
/// Topic and payload are not decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Publish {
    pub fixed_header: FixedHeader,
    pub flags: PublishFlags,
}

/// MQTT packet types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// Connection request
    Connect = 1,
    /// Connect acknowledgment
    ConnAck,
    /// Publish message
    Publish,
    /// Publish acknowledgment (QoS 1)
    PubAck,
    /// Publish received (QoS 2 delivery part 1)
    PubRec,
    /// Publish release (QoS 2 delivery part 2)
    PubRel,
    /// Publish complete (QoS 2 delivery part 3)
    PubComp,
    /// Subscribe request
    Subscribe,
    /// Subscribe acknowledgment
    SubAck,
    /// Unsubscribe request
    Unsubscribe,
    /// Unsubscribe acknowledgment
    UnsubAck,
    /// PING request
    PingReq,
    /// PING response
    PingResp,
    /// Disconnect notification
    Disconnect,
    /// Authentication exchange (reserved in MQTT 3.1.1)
    Auth,
}

impl PacketType {
    pub const fn name(self) -> &'static str {
        match self {
            PacketType::Connect => "CONNECT",
            PacketType::ConnAck => "CONNACK",
            PacketType::Publish => "PUBLISH",
            PacketType::PubAck => "PUBACK",
            PacketType::PubRec => "PUBREC",
            PacketType::PubRel => "PUBREL",
            PacketType::PubComp => "PUBCOMP",
            PacketType::Subscribe => "SUBSCRIBE",
            PacketType::SubAck => "SUBACK",
            PacketType::Unsubscribe => "UNSUBSCRIBE",
            PacketType::UnsubAck => "UNSUBACK",
            PacketType::PingReq => "PINGREQ",
            PacketType::PingResp => "PINGRESP",
            PacketType::Disconnect => "DISCONNECT",
            PacketType::Auth => "AUTH",
        }
    }
}

impl std::fmt::Display for PacketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for PacketType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PacketType::Connect),
            2 => Ok(PacketType::ConnAck),
            3 => Ok(PacketType::Publish),
            4 => Ok(PacketType::PubAck),
            5 => Ok(PacketType::PubRec),
            6 => Ok(PacketType::PubRel),
            7 => Ok(PacketType::PubComp),
            8 => Ok(PacketType::Subscribe),
            9 => Ok(PacketType::SubAck),
            10 => Ok(PacketType::Unsubscribe),
            11 => Ok(PacketType::UnsubAck),
            12 => Ok(PacketType::PingReq),
            13 => Ok(PacketType::PingResp),
            14 => Ok(PacketType::Disconnect),
            15 => Ok(PacketType::Auth),
            x => Err(Error::InvalidPacketType(x)),
        }
    }
}

/// Parse the packet at the start of `buffer`
///
/// A CONNECT must be complete, otherwise [`Error::TruncatedPacket`] tells how
/// many bytes are still missing. Once it is, a field crossing its remaining
/// length is [`Error::MalformedPacket`]. Other packet types only need their
/// fixed header.
/// Bytes after the first packet are ignored.
pub fn parse_packet(buffer: Bytes) -> Result<Packet, Error> {
    let fixed_header = FixedHeader::read(&buffer)?;

    let packet = match fixed_header.packet_type() {
        Ok(PacketType::Connect) => {
            let packet_size = fixed_header.packet_size();
            if buffer.len() < packet_size {
                return Err(Error::TruncatedPacket(packet_size - buffer.len()));
            }

            let connect = Connect::read(fixed_header, buffer.slice(..packet_size)).map_err(
                |e| match e {
                    // More bytes cannot fix a complete frame
                    Error::TruncatedPacket(_) => Error::MalformedPacket,
                    e => e,
                },
            )?;
            Packet::Connect(Box::new(connect))
        }
        Ok(PacketType::Publish) => Packet::Publish(Publish {
            fixed_header,
            flags: PublishFlags::from_flags(fixed_header.flags()),
        }),
        _ => Packet::Other(fixed_header),
    };

    Ok(packet)
}

/// Decode one of the property blocks of a parsed CONNECT
///
/// Returns `None` for packets other than CONNECT, for MQTT 3.1/3.1.1 and
/// for a will block when no will is present.
pub fn decode_properties(
    packet: &Packet,
    section: PropertySection,
) -> Result<Option<Properties>, Error> {
    match packet {
        Packet::Connect(connect) => connect.decode_properties(section),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn publish_envelope_is_reported() {
        // QoS 1, retain, remaining length larger than what was delivered
        let packet = parse_packet(Bytes::from_static(&[0x33, 0x7F, 0x00])).unwrap();

        let publish = match packet {
            Packet::Publish(publish) => publish,
            other => panic!("expected publish, got {other:?}"),
        };
        assert_eq!(publish.fixed_header.remaining_len.value(), 127);
        assert_eq!(publish.fixed_header.size(), 2);
        assert!(publish.flags.retain);
        assert!(!publish.flags.dup);
        assert_eq!(publish.flags.qos, 1);
    }

    #[test]
    fn other_packets_pass_through() {
        let packet = parse_packet(Bytes::from_static(&[0xC0, 0x00])).unwrap();
        assert_eq!(packet.packet_type(), Some(PacketType::PingReq));
        assert_eq!(decode_properties(&packet, PropertySection::Connect).unwrap(), None);

        let packet = parse_packet(Bytes::from_static(&[0x05, 0x00])).unwrap();
        assert_eq!(packet.packet_type(), None);
        assert_eq!(packet.fixed_header().flags(), 5);
    }

    #[test]
    fn incomplete_connect_is_recoverable() {
        let err = parse_packet(Bytes::from_static(&[0x10, 0x10, 0x00, 0x04])).unwrap_err();
        assert!(matches!(err, Error::TruncatedPacket(14)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn packet_names() {
        assert_eq!(PacketType::PingResp.to_string(), "PINGRESP");
        assert_eq!(PacketType::try_from(15).unwrap().name(), "AUTH");
    }
}
