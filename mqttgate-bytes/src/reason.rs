//! MQTT 5.0 reason codes
//!
//! The same numeric code can mean different things depending on the packet
//! that carries it, so the symbolic names are kept in one table per packet type.
//!
//! See [specification](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901031).

use crate::PacketType;

pub const SUCCESS: u8 = 0x00;
pub const NORMAL_DISCONNECTION: u8 = 0x00;
pub const GRANTED_QOS_0: u8 = 0x00;
pub const GRANTED_QOS_1: u8 = 0x01;
pub const GRANTED_QOS_2: u8 = 0x02;
pub const DISCONNECT_WITH_WILL_MESSAGE: u8 = 0x04;
pub const NO_MATCHING_SUBSCRIBERS: u8 = 0x10;
pub const NO_SUBSCRIPTION_EXISTED: u8 = 0x11;
pub const CONTINUE_AUTHENTICATION: u8 = 0x18;
pub const RE_AUTHENTICATE: u8 = 0x19;
pub const UNSPECIFIED_ERROR: u8 = 0x80;
pub const MALFORMED_PACKET: u8 = 0x81;
pub const PROTOCOL_ERROR: u8 = 0x82;
pub const IMPLEMENTATION_SPECIFIC_ERROR: u8 = 0x83;
pub const UNSUPPORTED_PROTOCOL_VERSION: u8 = 0x84;
pub const CLIENT_IDENTIFIER_NOT_VALID: u8 = 0x85;
pub const BAD_USER_NAME_OR_PASSWORD: u8 = 0x86;
pub const NOT_AUTHORIZED: u8 = 0x87;
pub const SERVER_UNAVAILABLE: u8 = 0x88;
pub const SERVER_BUSY: u8 = 0x89;
pub const BANNED: u8 = 0x8A;
pub const SERVER_SHUTTING_DOWN: u8 = 0x8B;
pub const BAD_AUTHENTICATION_METHOD: u8 = 0x8C;
pub const KEEP_ALIVE_TIMEOUT: u8 = 0x8D;
pub const SESSION_TAKEN_OVER: u8 = 0x8E;
pub const TOPIC_FILTER_INVALID: u8 = 0x8F;
pub const TOPIC_NAME_INVALID: u8 = 0x90;
pub const PACKET_IDENTIFIER_IN_USE: u8 = 0x91;
pub const PACKET_IDENTIFIER_NOT_FOUND: u8 = 0x92;
pub const RECEIVE_MAXIMUM_EXCEEDED: u8 = 0x93;
pub const TOPIC_ALIAS_INVALID: u8 = 0x94;
pub const PACKET_TOO_LARGE: u8 = 0x95;
pub const MESSAGE_RATE_TOO_HIGH: u8 = 0x96;
pub const QUOTA_EXCEEDED: u8 = 0x97;
pub const ADMINISTRATIVE_ACTION: u8 = 0x98;
pub const PAYLOAD_FORMAT_INVALID: u8 = 0x99;
pub const RETAIN_NOT_SUPPORTED: u8 = 0x9A;
pub const QOS_NOT_SUPPORTED: u8 = 0x9B;
pub const USE_ANOTHER_SERVER: u8 = 0x9C;
pub const SERVER_MOVED: u8 = 0x9D;
pub const SHARED_SUBSCRIPTIONS_NOT_SUPPORTED: u8 = 0x9E;
pub const CONNECTION_RATE_EXCEEDED: u8 = 0x9F;
pub const MAXIMUM_CONNECT_TIME: u8 = 0xA0;
pub const SUBSCRIPTION_IDENTIFIERS_NOT_SUPPORTED: u8 = 0xA1;
pub const WILDCARD_SUBSCRIPTIONS_NOT_SUPPORTED: u8 = 0xA2;

type Table = &'static [(u8, &'static str)];

const CONNACK: Table = &[
    (SUCCESS, "Success"),
    (UNSPECIFIED_ERROR, "UnspecifiedError"),
    (MALFORMED_PACKET, "MalformedPacket"),
    (PROTOCOL_ERROR, "ProtocolError"),
    (IMPLEMENTATION_SPECIFIC_ERROR, "ImplementationSpecificError"),
    (UNSUPPORTED_PROTOCOL_VERSION, "UnsupportedProtocolVersion"),
    (CLIENT_IDENTIFIER_NOT_VALID, "ClientIdentifierNotValid"),
    (BAD_USER_NAME_OR_PASSWORD, "BadUserNameOrPassword"),
    (NOT_AUTHORIZED, "NotAuthorized"),
    (SERVER_UNAVAILABLE, "ServerUnavailable"),
    (SERVER_BUSY, "ServerBusy"),
    (BANNED, "Banned"),
    (BAD_AUTHENTICATION_METHOD, "BadAuthenticationMethod"),
    (TOPIC_NAME_INVALID, "TopicNameInvalid"),
    (PACKET_TOO_LARGE, "PacketTooLarge"),
    (QUOTA_EXCEEDED, "QuotaExceeded"),
    (PAYLOAD_FORMAT_INVALID, "PayloadFormatInvalid"),
    (RETAIN_NOT_SUPPORTED, "RetainNotSupported"),
    (QOS_NOT_SUPPORTED, "QoSNotSupported"),
    (USE_ANOTHER_SERVER, "UseAnotherServer"),
    (SERVER_MOVED, "ServerMoved"),
    (CONNECTION_RATE_EXCEEDED, "ConnectionRateExceeded"),
];

// PUBACK and PUBREC share their codes
const PUBACK: Table = &[
    (SUCCESS, "Success"),
    (NO_MATCHING_SUBSCRIBERS, "NoMatchingSubscribers"),
    (UNSPECIFIED_ERROR, "UnspecifiedError"),
    (IMPLEMENTATION_SPECIFIC_ERROR, "ImplementationSpecificError"),
    (NOT_AUTHORIZED, "NotAuthorized"),
    (TOPIC_NAME_INVALID, "TopicNameInvalid"),
    (PACKET_IDENTIFIER_IN_USE, "PacketIdentifierInUse"),
    (QUOTA_EXCEEDED, "QuotaExceeded"),
    (PAYLOAD_FORMAT_INVALID, "PayloadFormatInvalid"),
];

// PUBREL and PUBCOMP share their codes
const PUBREL: Table = &[
    (SUCCESS, "Success"),
    (PACKET_IDENTIFIER_NOT_FOUND, "PacketIdentifierNotFound"),
];

const SUBACK: Table = &[
    (GRANTED_QOS_0, "GrantedQoS0"),
    (GRANTED_QOS_1, "GrantedQoS1"),
    (GRANTED_QOS_2, "GrantedQoS2"),
    (UNSPECIFIED_ERROR, "UnspecifiedError"),
    (IMPLEMENTATION_SPECIFIC_ERROR, "ImplementationSpecificError"),
    (NOT_AUTHORIZED, "NotAuthorized"),
    (TOPIC_FILTER_INVALID, "TopicFilterInvalid"),
    (PACKET_IDENTIFIER_IN_USE, "PacketIdentifierInUse"),
    (QUOTA_EXCEEDED, "QuotaExceeded"),
    (
        SHARED_SUBSCRIPTIONS_NOT_SUPPORTED,
        "SharedSubscriptionsNotSupported",
    ),
    (
        SUBSCRIPTION_IDENTIFIERS_NOT_SUPPORTED,
        "SubscriptionIdentifiersNotSupported",
    ),
    (
        WILDCARD_SUBSCRIPTIONS_NOT_SUPPORTED,
        "WildcardSubscriptionsNotSupported",
    ),
];

const UNSUBACK: Table = &[
    (SUCCESS, "Success"),
    (NO_SUBSCRIPTION_EXISTED, "NoSubscriptionExisted"),
    (UNSPECIFIED_ERROR, "UnspecifiedError"),
    (IMPLEMENTATION_SPECIFIC_ERROR, "ImplementationSpecificError"),
    (NOT_AUTHORIZED, "NotAuthorized"),
    (TOPIC_FILTER_INVALID, "TopicFilterInvalid"),
    (PACKET_IDENTIFIER_IN_USE, "PacketIdentifierInUse"),
];

const DISCONNECT: Table = &[
    (NORMAL_DISCONNECTION, "NormalDisconnection"),
    (DISCONNECT_WITH_WILL_MESSAGE, "DisconnectWithWillMessage"),
    (UNSPECIFIED_ERROR, "UnspecifiedError"),
    (MALFORMED_PACKET, "MalformedPacket"),
    (PROTOCOL_ERROR, "ProtocolError"),
    (IMPLEMENTATION_SPECIFIC_ERROR, "ImplementationSpecificError"),
    (NOT_AUTHORIZED, "NotAuthorized"),
    (SERVER_BUSY, "ServerBusy"),
    (SERVER_SHUTTING_DOWN, "ServerShuttingDown"),
    (KEEP_ALIVE_TIMEOUT, "KeepAliveTimeout"),
    (SESSION_TAKEN_OVER, "SessionTakenOver"),
    (TOPIC_FILTER_INVALID, "TopicFilterInvalid"),
    (TOPIC_NAME_INVALID, "TopicNameInvalid"),
    (RECEIVE_MAXIMUM_EXCEEDED, "ReceiveMaximumExceeded"),
    (TOPIC_ALIAS_INVALID, "TopicAliasInvalid"),
    (PACKET_TOO_LARGE, "PacketTooLarge"),
    (MESSAGE_RATE_TOO_HIGH, "MessageRateTooHigh"),
    (QUOTA_EXCEEDED, "QuotaExceeded"),
    (ADMINISTRATIVE_ACTION, "AdministrativeAction"),
    (PAYLOAD_FORMAT_INVALID, "PayloadFormatInvalid"),
    (RETAIN_NOT_SUPPORTED, "RetainNotSupported"),
    (QOS_NOT_SUPPORTED, "QoSNotSupported"),
    (USE_ANOTHER_SERVER, "UseAnotherServer"),
    (SERVER_MOVED, "ServerMoved"),
    (
        SHARED_SUBSCRIPTIONS_NOT_SUPPORTED,
        "SharedSubscriptionsNotSupported",
    ),
    (CONNECTION_RATE_EXCEEDED, "ConnectionRateExceeded"),
    (MAXIMUM_CONNECT_TIME, "MaximumConnectTime"),
    (
        SUBSCRIPTION_IDENTIFIERS_NOT_SUPPORTED,
        "SubscriptionIdentifiersNotSupported",
    ),
    (
        WILDCARD_SUBSCRIPTIONS_NOT_SUPPORTED,
        "WildcardSubscriptionsNotSupported",
    ),
];

const AUTH: Table = &[
    (SUCCESS, "Success"),
    (CONTINUE_AUTHENTICATION, "ContinueAuthentication"),
    (RE_AUTHENTICATE, "ReAuthenticate"),
];

/// Symbolic name of a reason code as carried by the given packet type
///
/// Returns `None` for packets that carry no reason code and for codes that
/// are not defined for that packet type.
pub fn reason_name(packet_type: PacketType, code: u8) -> Option<&'static str> {
    let table = match packet_type {
        PacketType::ConnAck => CONNACK,
        PacketType::PubAck | PacketType::PubRec => PUBACK,
        PacketType::PubRel | PacketType::PubComp => PUBREL,
        PacketType::SubAck => SUBACK,
        PacketType::UnsubAck => UNSUBACK,
        PacketType::Disconnect => DISCONNECT,
        PacketType::Auth => AUTH,
        _ => return None,
    };

    table
        .iter()
        .find(|(value, _)| *value == code)
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn same_code_differs_per_packet() {
        assert_eq!(
            reason_name(PacketType::ConnAck, 0x00),
            Some("Success")
        );
        assert_eq!(
            reason_name(PacketType::Disconnect, 0x00),
            Some("NormalDisconnection")
        );
        assert_eq!(
            reason_name(PacketType::SubAck, 0x02),
            Some("GrantedQoS2")
        );
        assert_eq!(
            reason_name(PacketType::ConnAck, NOT_AUTHORIZED),
            Some("NotAuthorized")
        );
    }

    #[test]
    fn unknown_codes_have_no_name() {
        assert_eq!(reason_name(PacketType::PubRel, NOT_AUTHORIZED), None);
        assert_eq!(reason_name(PacketType::ConnAck, 0x04), None);
        assert_eq!(reason_name(PacketType::Connect, SUCCESS), None);
    }
}
