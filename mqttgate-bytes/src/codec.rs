use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::{parse_packet, ConnAck, Connect, Error, FixedHeader, Packet, ProtocolVersion};

/// A type that implements the [Encoder] and [Decoder] traits for the MQTT handshake.
///
/// Decoding frames one packet at a time, fully decoding CONNECT and reporting
/// every other packet by its fixed header.
#[derive(Debug, Clone)]
pub struct Codec {
    /// Maximum packet size allowed from the client
    pub max_incoming_size: u32,
    /// Version used to encode a [ConnAck]
    pub protocol_version: ProtocolVersion,
}

impl Codec {
    /// Creates a new codec that encodes MQTT 5.0 replies
    pub fn new(max_incoming_size: u32) -> Self {
        Self {
            max_incoming_size,
            protocol_version: ProtocolVersion::V5,
        }
    }
}

impl Decoder for Codec {
    type Item = Packet;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match FixedHeader::check(src, self.max_incoming_size) {
            Ok(fixed_header) => {
                let frame = src.split_to(fixed_header.packet_size()).freeze();
                parse_packet(frame).map(Some)
            }
            Err(Error::TruncatedPacket(b)) => {
                // Get more bytes to construct the incomplete packet
                src.reserve(b);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl Encoder<Connect> for Codec {
    type Error = Error;

    fn encode(&mut self, item: Connect, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.write(dst)?;

        Ok(())
    }
}

impl Encoder<ConnAck> for Codec {
    type Error = Error;

    fn encode(&mut self, item: ConnAck, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match self.protocol_version {
            ProtocolVersion::V5 => item.write(dst)?,
            ProtocolVersion::V3 | ProtocolVersion::V4 => item.write_v4(dst)?,
        };

        Ok(())
    }
}
