//! MQTT handshake serialization and deserialization
//!
//! This crate decodes the CONNECT packet of MQTT 3.1, 3.1.1 and 5.0 and
//! produces the packets an intermediary needs to answer it: a CONNECT with
//! substituted credentials to pass on to the broker, or a CONNACK that turns
//! the client down. Other packets are only recognized by their fixed header.
//!
//! It is mainly intended to be used by the mqttgate connection filter.

mod codec;
mod error;
mod header;
mod packet;
mod parse;
mod property;
pub mod reason;

pub use codec::Codec;
pub use error::Error;
pub use header::{FixedHeader, PublishFlags};
pub use packet::*;
pub use parse::{VarInt, VARINT_MAX};
pub use property::{
    read_property, write_property, Properties, PropertyType, PropertyValue, Values, WireType,
};
pub use reason::reason_name;

/// The supported MQTT protocol versions.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProtocolVersion {
    /// MQTT 3.1
    V3 = 3,
    /// MQTT 3.1.1
    V4 = 4,
    /// MQTT 5.0
    V5 = 5,
}

impl TryFrom<u8> for ProtocolVersion {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            3 => Ok(ProtocolVersion::V3),
            4 => Ok(ProtocolVersion::V4),
            5 => Ok(ProtocolVersion::V5),
            version => Err(Error::UnsupportedVersion(version)),
        }
    }
}

/// Quality of Service levels for packet delivery.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd)]
#[allow(clippy::enum_variant_names)]
pub enum QoS {
    #[default]
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QoS {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            qos => Err(Error::InvalidQoS(qos)),
        }
    }
}
