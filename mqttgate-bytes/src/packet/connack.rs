use bytes::{BufMut, Bytes, BytesMut};

use crate::parse::*;
use crate::property::{write_property, PropertyType, PropertyValue};
use crate::{reason, Error, FixedHeader};

/// Connect acknowledgment
///
/// Packet sent by the server in response to a CONNECT packet received from a client.
/// An intermediary only ever sends one to turn a connection down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnAck {
    pub session_present: bool,
    pub code: ConnectReasonCode,
    /// Sent as the `ReasonString` property, MQTT 5.0 only
    pub reason_string: Option<String>,
}

/// MQTT 5.0 reason codes
///
/// A subset of these codes are used in MQTT 3.1.1 as well.
/// This means a [ConnectReturnCode] can always be converted to a [ConnectReasonCode],
/// but the conversion in the other direction is fallible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectReasonCode {
    Success = reason::SUCCESS,
    UnspecifiedError = reason::UNSPECIFIED_ERROR,
    MalformedPacket = reason::MALFORMED_PACKET,
    ProtocolError = reason::PROTOCOL_ERROR,
    ImplementationSpecificError = reason::IMPLEMENTATION_SPECIFIC_ERROR,
    UnsupportedProtocolVersion = reason::UNSUPPORTED_PROTOCOL_VERSION,
    ClientIdentifierNotValid = reason::CLIENT_IDENTIFIER_NOT_VALID,
    BadUserNamePassword = reason::BAD_USER_NAME_OR_PASSWORD,
    NotAuthorized = reason::NOT_AUTHORIZED,
    ServerUnavailable = reason::SERVER_UNAVAILABLE,
    ServerBusy = reason::SERVER_BUSY,
    Banned = reason::BANNED,
    BadAuthenticationMethod = reason::BAD_AUTHENTICATION_METHOD,
    TopicNameInvalid = reason::TOPIC_NAME_INVALID,
    PacketTooLarge = reason::PACKET_TOO_LARGE,
    QuotaExceeded = reason::QUOTA_EXCEEDED,
    PayloadFormatInvalid = reason::PAYLOAD_FORMAT_INVALID,
    RetainNotSupported = reason::RETAIN_NOT_SUPPORTED,
    QoSNotSupported = reason::QOS_NOT_SUPPORTED,
    UseAnotherServer = reason::USE_ANOTHER_SERVER,
    ServerMoved = reason::SERVER_MOVED,
    ConnectionRateExceeded = reason::CONNECTION_RATE_EXCEEDED,
}

/// MQTT 3.1.1 return codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectReturnCode {
    Success = 0,
    RefusedProtocolVersion,
    BadClientId,
    ServiceUnavailable,
    BadUserNamePassword,
    NotAuthorized,
}

impl ConnAck {
    /// Create a new ConnAck packet
    pub fn new(code: ConnectReasonCode) -> Self {
        Self {
            session_present: false,
            code,
            reason_string: None,
        }
    }

    /// Create a new ConnAck packet from a [ConnectReturnCode]
    pub fn from_return_code(code: ConnectReturnCode) -> Self {
        Self::new(code.into())
    }

    /// Create a new ConnAck packet with a reason string
    pub fn with_reason(code: ConnectReasonCode, reason: &str) -> Self {
        Self {
            session_present: false,
            code,
            reason_string: Some(reason.to_owned()),
        }
    }

    /// Write the packet in its MQTT 5.0 form
    ///
    /// The properties hold a single `ReasonString` if a non-empty reason was
    /// given, otherwise the properties length is `0`.
    pub fn write(&self, buffer: &mut BytesMut) -> Result<usize, Error> {
        let mut properties = BytesMut::new();
        if let Some(reason) = self.reason_string.as_deref().filter(|r| !r.is_empty()) {
            let value = PropertyValue::String(reason.to_owned());
            write_property(&mut properties, PropertyType::ReasonString, &value)?;
        }
        let properties_len = VarInt::new(properties.len())?;

        let len = 1  // connect acknowledge flags
                + 1  // connect reason code
                + properties_len.length()
                + properties_len.value();

        let fixed_header = FixedHeader::new(0x20, VarInt::new(len)?);
        fixed_header.write(buffer);
        // connect acknowledge flags
        buffer.put_u8(self.session_present as u8);
        // reason code
        buffer.put_u8(self.code as u8);
        // properties
        properties_len.write(buffer);
        buffer.extend_from_slice(&properties);

        Ok(fixed_header.packet_size())
    }

    /// Write the packet in its MQTT 3.1/3.1.1 form
    ///
    /// Reason codes without a 3.1.1 counterpart fail with
    /// [`Error::InvalidConnectReturnCode`]. The reason string is not sent.
    pub fn write_v4(&self, buffer: &mut BytesMut) -> Result<usize, Error> {
        let code = ConnectReturnCode::try_from(self.code)?;

        // packet type and flags
        buffer.put_u8(0x20);
        // remaining length: session present + code
        let len = VarInt::new(1 + 1)?;
        len.write(buffer);
        // connect acknowledge flags
        buffer.put_u8(self.session_present as u8);
        // return code
        buffer.put_u8(code as u8);

        Ok(1 + len.length() + len.value())
    }
}

/// Build the CONNACK an intermediary sends to turn a client down
///
/// An empty `reason` is left out of the packet.
pub fn build_reject(code: ConnectReasonCode, reason: &str) -> Result<Bytes, Error> {
    let mut buffer = BytesMut::new();
    ConnAck::with_reason(code, reason).write(&mut buffer)?;
    Ok(buffer.freeze())
}

impl TryFrom<u8> for ConnectReasonCode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let code = match value {
            reason::SUCCESS => Self::Success,
            reason::UNSPECIFIED_ERROR => Self::UnspecifiedError,
            reason::MALFORMED_PACKET => Self::MalformedPacket,
            reason::PROTOCOL_ERROR => Self::ProtocolError,
            reason::IMPLEMENTATION_SPECIFIC_ERROR => Self::ImplementationSpecificError,
            reason::UNSUPPORTED_PROTOCOL_VERSION => Self::UnsupportedProtocolVersion,
            reason::CLIENT_IDENTIFIER_NOT_VALID => Self::ClientIdentifierNotValid,
            reason::BAD_USER_NAME_OR_PASSWORD => Self::BadUserNamePassword,
            reason::NOT_AUTHORIZED => Self::NotAuthorized,
            reason::SERVER_UNAVAILABLE => Self::ServerUnavailable,
            reason::SERVER_BUSY => Self::ServerBusy,
            reason::BANNED => Self::Banned,
            reason::BAD_AUTHENTICATION_METHOD => Self::BadAuthenticationMethod,
            reason::TOPIC_NAME_INVALID => Self::TopicNameInvalid,
            reason::PACKET_TOO_LARGE => Self::PacketTooLarge,
            reason::QUOTA_EXCEEDED => Self::QuotaExceeded,
            reason::PAYLOAD_FORMAT_INVALID => Self::PayloadFormatInvalid,
            reason::RETAIN_NOT_SUPPORTED => Self::RetainNotSupported,
            reason::QOS_NOT_SUPPORTED => Self::QoSNotSupported,
            reason::USE_ANOTHER_SERVER => Self::UseAnotherServer,
            reason::SERVER_MOVED => Self::ServerMoved,
            reason::CONNECTION_RATE_EXCEEDED => Self::ConnectionRateExceeded,
            num => return Err(Error::InvalidConnectReturnCode(num)),
        };

        Ok(code)
    }
}

impl TryFrom<u8> for ConnectReturnCode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let code = match value {
            0 => Self::Success,
            1 => Self::RefusedProtocolVersion,
            2 => Self::BadClientId,
            3 => Self::ServiceUnavailable,
            4 => Self::BadUserNamePassword,
            5 => Self::NotAuthorized,
            num => return Err(Error::InvalidConnectReturnCode(num)),
        };

        Ok(code)
    }
}

impl From<ConnectReturnCode> for ConnectReasonCode {
    fn from(value: ConnectReturnCode) -> Self {
        match value {
            ConnectReturnCode::Success => Self::Success,
            ConnectReturnCode::RefusedProtocolVersion => Self::UnsupportedProtocolVersion,
            ConnectReturnCode::BadClientId => Self::ClientIdentifierNotValid,
            ConnectReturnCode::ServiceUnavailable => Self::ServerUnavailable,
            ConnectReturnCode::BadUserNamePassword => Self::BadUserNamePassword,
            ConnectReturnCode::NotAuthorized => Self::NotAuthorized,
        }
    }
}

impl TryFrom<ConnectReasonCode> for ConnectReturnCode {
    type Error = Error;

    fn try_from(value: ConnectReasonCode) -> Result<Self, Self::Error> {
        let code = match value {
            ConnectReasonCode::Success => Self::Success,
            ConnectReasonCode::UnsupportedProtocolVersion => Self::RefusedProtocolVersion,
            ConnectReasonCode::ClientIdentifierNotValid => Self::BadClientId,
            ConnectReasonCode::ServerUnavailable => Self::ServiceUnavailable,
            ConnectReasonCode::BadUserNamePassword => Self::BadUserNamePassword,
            ConnectReasonCode::NotAuthorized => Self::NotAuthorized,
            // MQTT 3.1.1 does not support all MQTT 5.0 reason codes
            _ => return Err(Error::InvalidConnectReturnCode(value as u8)),
        };

        Ok(code)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::property::Properties;
    use crate::{reason_name, PacketType};

    #[test]
    fn reject_with_reason_string() {
        let packet = build_reject(ConnectReasonCode::NotAuthorized, "bad-token").unwrap();

        let expected = [
            0x20, // Packet type
            0x0F, // Remaining length
            0x00, // Connect acknowledge flags
            0x87, // Reason code
            0x0C, // Properties length
            0x1F, 0x00, 0x09, b'b', b'a', b'd', b'-', b't', b'o', b'k', b'e', b'n', // Reason string
        ];
        assert_eq!(&packet[..], &expected[..]);

        let mut cursor = Cursor::at(packet.clone(), 5).unwrap();
        let properties = Properties::read(&mut cursor, packet.len()).unwrap();
        assert_eq!(
            properties.get(PropertyType::ReasonString).and_then(|v| v.first()),
            Some(&PropertyValue::String("bad-token".to_owned()))
        );
    }

    #[test]
    fn reject_without_reason_string() {
        let packet = build_reject(ConnectReasonCode::Banned, "").unwrap();
        assert_eq!(&packet[..], &[0x20, 0x03, 0x00, 0x8A, 0x00]);
        assert_eq!(reason_name(PacketType::ConnAck, packet[3]), Some("Banned"));

        let mut buffer = BytesMut::new();
        let written = ConnAck::new(ConnectReasonCode::ServerBusy).write(&mut buffer).unwrap();
        assert_eq!(written, 5);
        assert_eq!(&buffer[..], &[0x20, 0x03, 0x00, 0x89, 0x00]);
    }

    #[test]
    fn long_reason_string_needs_two_length_bytes() {
        let reason = "r".repeat(200);
        let packet = build_reject(ConnectReasonCode::NotAuthorized, &reason).unwrap();

        let header = FixedHeader::read(&packet).unwrap();
        assert_eq!(header.size(), 3);
        assert_eq!(header.packet_size(), packet.len());
        // flags + code + 2 byte properties length + id + field
        assert_eq!(header.remaining_len.value(), 1 + 1 + 2 + 1 + 2 + 200);
    }

    #[test]
    fn oversized_reason_string_is_refused() {
        let mut buffer = BytesMut::new();
        let connack = ConnAck::with_reason(ConnectReasonCode::NotAuthorized, &"r".repeat(65_536));
        assert!(matches!(
            connack.write(&mut buffer),
            Err(Error::FieldTooLarge(65_536))
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn v4_reject_uses_return_code() {
        let mut buffer = BytesMut::new();
        let connack = ConnAck::from_return_code(ConnectReturnCode::BadUserNamePassword);
        assert_eq!(connack.code, ConnectReasonCode::BadUserNamePassword);

        let written = connack.write_v4(&mut buffer).unwrap();
        assert_eq!(written, 4);
        assert_eq!(&buffer[..], &[0x20, 0x02, 0x00, 0x04]);

        let mut buffer = BytesMut::new();
        let connack = ConnAck::with_reason(ConnectReasonCode::NotAuthorized, "ignored");
        connack.write_v4(&mut buffer).unwrap();
        assert_eq!(&buffer[..], &[0x20, 0x02, 0x00, 0x05]);
    }

    #[test]
    fn v5_only_codes_have_no_return_code() {
        let mut buffer = BytesMut::new();
        assert!(matches!(
            ConnAck::new(ConnectReasonCode::Banned).write_v4(&mut buffer),
            Err(Error::InvalidConnectReturnCode(0x8A))
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn codes_convert_both_ways() {
        for code in 0..=5 {
            let return_code = ConnectReturnCode::try_from(code).unwrap();
            let reason_code = ConnectReasonCode::from(return_code);
            assert_eq!(ConnectReturnCode::try_from(reason_code).unwrap(), return_code);
        }
        assert_eq!(
            ConnectReasonCode::try_from(0x87).unwrap(),
            ConnectReasonCode::NotAuthorized
        );
        assert!(matches!(
            ConnectReasonCode::try_from(0x10),
            Err(Error::InvalidConnectReturnCode(0x10))
        ));
        assert!(matches!(
            ConnectReturnCode::try_from(6),
            Err(Error::InvalidConnectReturnCode(6))
        ));
    }
}
