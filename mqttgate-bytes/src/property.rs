//! Module for working with MQTT properties

use bytes::{BufMut, Bytes, BytesMut};

use crate::parse::*;
use crate::{Error, VarInt};

/// Identifiers of the different properties used in MQTT 5.0
///
/// See [specification](https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901029).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    PayloadFormatIndicator = 1,
    MessageExpiryInterval = 2,
    ContentType = 3,
    ResponseTopic = 8,
    CorrelationData = 9,
    SubscriptionIdentifier = 11,
    SessionExpiryInterval = 17,
    AssignedClientIdentifier = 18,
    ServerKeepAlive = 19,
    AuthenticationMethod = 21,
    AuthenticationData = 22,
    RequestProblemInformation = 23,
    WillDelayInterval = 24,
    RequestResponseInformation = 25,
    ResponseInformation = 26,
    ServerReference = 28,
    ReasonString = 31,
    ReceiveMaximum = 33,
    TopicAliasMaximum = 34,
    TopicAlias = 35,
    MaximumQos = 36,
    RetainAvailable = 37,
    UserProperty = 38,
    MaximumPacketSize = 39,
    WildcardSubscriptionAvailable = 40,
    SubscriptionIdentifierAvailable = 41,
    SharedSubscriptionAvailable = 42,
}

/// How the value of a property is laid out on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Byte,
    TwoByteInteger,
    FourByteInteger,
    VariableByteInteger,
    Utf8String,
    BinaryData,
    Utf8StringPair,
}

impl PropertyType {
    /// Every defined property, in identifier order
    pub const ALL: [PropertyType; 27] = [
        PropertyType::PayloadFormatIndicator,
        PropertyType::MessageExpiryInterval,
        PropertyType::ContentType,
        PropertyType::ResponseTopic,
        PropertyType::CorrelationData,
        PropertyType::SubscriptionIdentifier,
        PropertyType::SessionExpiryInterval,
        PropertyType::AssignedClientIdentifier,
        PropertyType::ServerKeepAlive,
        PropertyType::AuthenticationMethod,
        PropertyType::AuthenticationData,
        PropertyType::RequestProblemInformation,
        PropertyType::WillDelayInterval,
        PropertyType::RequestResponseInformation,
        PropertyType::ResponseInformation,
        PropertyType::ServerReference,
        PropertyType::ReasonString,
        PropertyType::ReceiveMaximum,
        PropertyType::TopicAliasMaximum,
        PropertyType::TopicAlias,
        PropertyType::MaximumQos,
        PropertyType::RetainAvailable,
        PropertyType::UserProperty,
        PropertyType::MaximumPacketSize,
        PropertyType::WildcardSubscriptionAvailable,
        PropertyType::SubscriptionIdentifierAvailable,
        PropertyType::SharedSubscriptionAvailable,
    ];

    pub const fn wire_type(self) -> WireType {
        match self {
            PropertyType::PayloadFormatIndicator
            | PropertyType::RequestProblemInformation
            | PropertyType::RequestResponseInformation
            | PropertyType::MaximumQos
            | PropertyType::RetainAvailable
            | PropertyType::WildcardSubscriptionAvailable
            | PropertyType::SubscriptionIdentifierAvailable
            | PropertyType::SharedSubscriptionAvailable => WireType::Byte,
            PropertyType::ServerKeepAlive
            | PropertyType::ReceiveMaximum
            | PropertyType::TopicAliasMaximum
            | PropertyType::TopicAlias => WireType::TwoByteInteger,
            PropertyType::MessageExpiryInterval
            | PropertyType::SessionExpiryInterval
            | PropertyType::WillDelayInterval
            | PropertyType::MaximumPacketSize => WireType::FourByteInteger,
            PropertyType::SubscriptionIdentifier => WireType::VariableByteInteger,
            PropertyType::ContentType
            | PropertyType::ResponseTopic
            | PropertyType::AssignedClientIdentifier
            | PropertyType::AuthenticationMethod
            | PropertyType::ResponseInformation
            | PropertyType::ServerReference
            | PropertyType::ReasonString => WireType::Utf8String,
            PropertyType::CorrelationData | PropertyType::AuthenticationData => {
                WireType::BinaryData
            }
            PropertyType::UserProperty => WireType::Utf8StringPair,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            PropertyType::PayloadFormatIndicator => "PayloadFormatIndicator",
            PropertyType::MessageExpiryInterval => "MessageExpiryInterval",
            PropertyType::ContentType => "ContentType",
            PropertyType::ResponseTopic => "ResponseTopic",
            PropertyType::CorrelationData => "CorrelationData",
            PropertyType::SubscriptionIdentifier => "SubscriptionIdentifier",
            PropertyType::SessionExpiryInterval => "SessionExpiryInterval",
            PropertyType::AssignedClientIdentifier => "AssignedClientIdentifier",
            PropertyType::ServerKeepAlive => "ServerKeepAlive",
            PropertyType::AuthenticationMethod => "AuthenticationMethod",
            PropertyType::AuthenticationData => "AuthenticationData",
            PropertyType::RequestProblemInformation => "RequestProblemInformation",
            PropertyType::WillDelayInterval => "WillDelayInterval",
            PropertyType::RequestResponseInformation => "RequestResponseInformation",
            PropertyType::ResponseInformation => "ResponseInformation",
            PropertyType::ServerReference => "ServerReference",
            PropertyType::ReasonString => "ReasonString",
            PropertyType::ReceiveMaximum => "ReceiveMaximum",
            PropertyType::TopicAliasMaximum => "TopicAliasMaximum",
            PropertyType::TopicAlias => "TopicAlias",
            PropertyType::MaximumQos => "MaximumQos",
            PropertyType::RetainAvailable => "RetainAvailable",
            PropertyType::UserProperty => "UserProperty",
            PropertyType::MaximumPacketSize => "MaximumPacketSize",
            PropertyType::WildcardSubscriptionAvailable => "WildcardSubscriptionAvailable",
            PropertyType::SubscriptionIdentifierAvailable => "SubscriptionIdentifierAvailable",
            PropertyType::SharedSubscriptionAvailable => "SharedSubscriptionAvailable",
        }
    }
}

impl TryFrom<u8> for PropertyType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        PropertyType::ALL
            .into_iter()
            .find(|property| *property as u8 == value)
            .ok_or(Error::InvalidPropertyType(value))
    }
}

/// Decoded value of a single property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Byte(u8),
    TwoByteInteger(u16),
    FourByteInteger(u32),
    VariableByteInteger(VarInt),
    String(String),
    Binary(Bytes),
    Pair(String, String),
}

impl PropertyValue {
    pub fn wire_type(&self) -> WireType {
        match self {
            PropertyValue::Byte(_) => WireType::Byte,
            PropertyValue::TwoByteInteger(_) => WireType::TwoByteInteger,
            PropertyValue::FourByteInteger(_) => WireType::FourByteInteger,
            PropertyValue::VariableByteInteger(_) => WireType::VariableByteInteger,
            PropertyValue::String(_) => WireType::Utf8String,
            PropertyValue::Binary(_) => WireType::BinaryData,
            PropertyValue::Pair(_, _) => WireType::Utf8StringPair,
        }
    }

    /// Encoded size of the value, without the identifier byte
    fn len(&self) -> usize {
        match self {
            PropertyValue::Byte(_) => 1,
            PropertyValue::TwoByteInteger(_) => 2,
            PropertyValue::FourByteInteger(_) => 4,
            PropertyValue::VariableByteInteger(varint) => varint.length(),
            PropertyValue::String(s) => field_len(s.as_bytes()),
            PropertyValue::Binary(b) => field_len(b),
            PropertyValue::Pair(name, value) => {
                field_len(name.as_bytes()) + field_len(value.as_bytes())
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            PropertyValue::Byte(v) => Some(*v as u32),
            PropertyValue::TwoByteInteger(v) => Some(*v as u32),
            PropertyValue::FourByteInteger(v) => Some(*v),
            PropertyValue::VariableByteInteger(v) => Some((*v).into()),
            _ => None,
        }
    }
}

/// The value(s) stored under one key of [Properties]
///
/// A key seen once holds a single value. Seeing it again turns the entry
/// into a list of every value, in the order they were decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Values<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Values<T> {
    fn push(&mut self, value: T) {
        let values = match std::mem::replace(self, Values::Many(Vec::new())) {
            Values::One(first) => vec![first, value],
            Values::Many(mut values) => {
                values.push(value);
                values
            }
        };

        *self = Values::Many(values);
    }

    /// The value that was decoded first
    pub fn first(&self) -> Option<&T> {
        match self {
            Values::One(value) => Some(value),
            Values::Many(values) => values.first(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Values::One(_) => 1,
            Values::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Values::One(value) => std::slice::from_ref(value).iter(),
            Values::Many(values) => values.iter(),
        }
    }
}

/// A decoded property block
///
/// Standard properties are kept by identifier and user properties by name,
/// both in the order their keys were first seen.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Properties {
    standard: Vec<(PropertyType, Values<PropertyValue>)>,
    user: Vec<(String, Values<String>)>,
}

impl Properties {
    /// Create a new empty [Properties] instance.
    pub const fn new() -> Self {
        Properties {
            standard: Vec::new(),
            user: Vec::new(),
        }
    }

    /// Add a property, turning an existing entry into a list if the key repeats
    ///
    /// `UserProperty` pairs go to the user properties, keyed by name.
    /// The value has to match the wire type the table lists for `property`.
    pub fn insert(&mut self, property: PropertyType, value: PropertyValue) -> Result<(), Error> {
        if value.wire_type() != property.wire_type() {
            return Err(Error::PropertyTypeMismatch(property as u8));
        }

        if let PropertyValue::Pair(name, value) = value {
            match self.user.iter_mut().find(|(key, _)| *key == name) {
                Some((_, values)) => values.push(value),
                None => self.user.push((name, Values::One(value))),
            }
            return Ok(());
        }

        match self.standard.iter_mut().find(|(key, _)| *key == property) {
            Some((_, values)) => values.push(value),
            None => self.standard.push((property, Values::One(value))),
        }

        Ok(())
    }

    pub fn get(&self, property: PropertyType) -> Option<&Values<PropertyValue>> {
        self.standard
            .iter()
            .find(|(key, _)| *key == property)
            .map(|(_, values)| values)
    }

    /// Value(s) of the user property called `name`
    pub fn user(&self, name: &str) -> Option<&Values<String>> {
        self.user
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, values)| values)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PropertyType, &Values<PropertyValue>)> {
        self.standard.iter().map(|(key, values)| (*key, values))
    }

    pub fn user_properties(&self) -> impl Iterator<Item = (&str, &Values<String>)> {
        self.user.iter().map(|(key, values)| (key.as_str(), values))
    }

    pub fn is_empty(&self) -> bool {
        self.standard.is_empty() && self.user.is_empty()
    }

    /// Decode the properties between the cursor and offset `end`.
    ///
    /// Decoding has to finish exactly at `end`, a property that reaches past
    /// it makes the whole block malformed. On success the cursor is left at `end`.
    pub fn read(stream: &mut Cursor, end: usize) -> Result<Self, Error> {
        let mut block = stream.limit(end)?;
        let mut properties = Properties::new();

        while !block.is_empty() {
            let (property, value) = read_property(&mut block).map_err(|e| match e {
                Error::TruncatedPacket(_) => Error::MalformedProperties,
                e => e,
            })?;
            properties.insert(property, value)?;
        }

        stream.skip(block.position() - stream.position())?;
        Ok(properties)
    }

    /// Write the block, prefixed with its length
    ///
    /// Nothing is written if any of the properties cannot be encoded.
    pub fn write(&self, stream: &mut BytesMut) -> Result<usize, Error> {
        let varint = self.len()?;
        let mut block = BytesMut::with_capacity(varint.length() + varint.value());
        varint.write(&mut block);

        for (property, values) in &self.standard {
            for value in values.iter() {
                write_property(&mut block, *property, value)?;
            }
        }

        for (name, values) in &self.user {
            for value in values.iter() {
                block.put_u8(PropertyType::UserProperty as u8);
                write_mqtt_string(&mut block, name)?;
                write_mqtt_string(&mut block, value)?;
            }
        }

        stream.extend_from_slice(&block);
        Ok(block.len())
    }

    /// The size, as a variable byte integer, of the properties after serialization.
    pub fn len(&self) -> Result<VarInt, Error> {
        let mut properties_len = 0;
        for (_, values) in &self.standard {
            // property id + property length
            properties_len += values.iter().map(|v| 1 + v.len()).sum::<usize>();
        }

        for (name, values) in &self.user {
            properties_len += values
                .iter()
                .map(|v| 1 + field_len(name.as_bytes()) + field_len(v.as_bytes()))
                .sum::<usize>();
        }

        VarInt::new(properties_len)
    }
}

/// Read one property: its identifier, then the value laid out as the table says
pub fn read_property(stream: &mut Cursor) -> Result<(PropertyType, PropertyValue), Error> {
    let property = PropertyType::try_from(read_u8(stream)?)?;

    let value = match property.wire_type() {
        WireType::Byte => PropertyValue::Byte(read_u8(stream)?),
        WireType::TwoByteInteger => PropertyValue::TwoByteInteger(read_u16(stream)?),
        WireType::FourByteInteger => PropertyValue::FourByteInteger(read_u32(stream)?),
        WireType::VariableByteInteger => PropertyValue::VariableByteInteger(read_varint(stream)?),
        WireType::Utf8String => PropertyValue::String(read_mqtt_string(stream)?),
        WireType::BinaryData => PropertyValue::Binary(read_mqtt_bytes(stream)?),
        WireType::Utf8StringPair => {
            let name = read_mqtt_string(stream)?;
            let value = read_mqtt_string(stream)?;
            PropertyValue::Pair(name, value)
        }
    };

    Ok((property, value))
}

/// Write one property, returning the number of bytes written
///
/// The value has to match the wire type the table lists for `property`.
/// Nothing is written on error.
pub fn write_property(
    stream: &mut BytesMut,
    property: PropertyType,
    value: &PropertyValue,
) -> Result<usize, Error> {
    if value.wire_type() != property.wire_type() {
        return Err(Error::PropertyTypeMismatch(property as u8));
    }

    let mut buf = BytesMut::with_capacity(1 + value.len());
    buf.put_u8(property as u8);
    match value {
        PropertyValue::Byte(v) => buf.put_u8(*v),
        PropertyValue::TwoByteInteger(v) => buf.put_u16(*v),
        PropertyValue::FourByteInteger(v) => buf.put_u32(*v),
        PropertyValue::VariableByteInteger(v) => v.write(&mut buf),
        PropertyValue::String(s) => write_mqtt_string(&mut buf, s)?,
        PropertyValue::Binary(b) => write_mqtt_bytes(&mut buf, b)?,
        PropertyValue::Pair(name, value) => {
            write_mqtt_string(&mut buf, name)?;
            write_mqtt_string(&mut buf, value)?;
        }
    }

    stream.extend_from_slice(&buf);
    Ok(buf.len())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample(property: PropertyType) -> PropertyValue {
        match property.wire_type() {
            WireType::Byte => PropertyValue::Byte(1),
            WireType::TwoByteInteger => PropertyValue::TwoByteInteger(0x1234),
            WireType::FourByteInteger => PropertyValue::FourByteInteger(0x0102_0304),
            WireType::VariableByteInteger => {
                PropertyValue::VariableByteInteger(VarInt::new(16_384).unwrap())
            }
            WireType::Utf8String => PropertyValue::String(property.name().to_owned()),
            WireType::BinaryData => PropertyValue::Binary(Bytes::from_static(&[0, 1, 2])),
            WireType::Utf8StringPair => {
                PropertyValue::Pair("sw_version".to_owned(), "1.2.0".to_owned())
            }
        }
    }

    fn decode(block: &[u8]) -> Result<Properties, Error> {
        let mut cursor = Cursor::new(Bytes::copy_from_slice(block));
        let properties = Properties::read(&mut cursor, block.len())?;
        assert_eq!(cursor.position(), block.len());
        Ok(properties)
    }

    #[test]
    fn every_property_survives_the_table() {
        for property in PropertyType::ALL {
            let value = sample(property);
            let mut stream = BytesMut::new();
            let written = write_property(&mut stream, property, &value).unwrap();
            assert_eq!(written, stream.len());
            assert_eq!(stream[0], property as u8);

            let properties = decode(&stream).unwrap();
            match value {
                PropertyValue::Pair(name, value) => {
                    assert_eq!(properties.user(&name), Some(&Values::One(value)));
                    assert_eq!(properties.get(property), None);
                }
                value => assert_eq!(properties.get(property), Some(&Values::One(value))),
            }
        }
    }

    #[test]
    fn identifiers_map_back_to_their_type() {
        for property in PropertyType::ALL {
            assert_eq!(PropertyType::try_from(property as u8).unwrap(), property);
        }
        assert!(matches!(
            PropertyType::try_from(0x04),
            Err(Error::InvalidPropertyType(0x04))
        ));
    }

    #[test]
    fn repeated_property_becomes_a_list() {
        let block = [
            0x1F, 0x00, 0x01, b'a', // Reason string
            0x21, 0x00, 0x0A, // Receive maximum
            0x1F, 0x00, 0x01, b'b', // Reason string again
        ];
        let properties = decode(&block).unwrap();

        assert_eq!(
            properties.get(PropertyType::ReasonString),
            Some(&Values::Many(vec![
                PropertyValue::String("a".to_owned()),
                PropertyValue::String("b".to_owned()),
            ]))
        );
        assert_eq!(
            properties.get(PropertyType::ReceiveMaximum),
            Some(&Values::One(PropertyValue::TwoByteInteger(10)))
        );
        let order: Vec<_> = properties.iter().map(|(key, _)| key).collect();
        assert_eq!(
            order,
            vec![PropertyType::ReasonString, PropertyType::ReceiveMaximum]
        );
    }

    #[test]
    fn user_properties_are_kept_by_name() {
        let block = [
            0x26, 0x00, 0x01, b'k', 0x00, 0x01, b'1', // k = 1
            0x26, 0x00, 0x01, b'j', 0x00, 0x01, b'x', // j = x
            0x26, 0x00, 0x01, b'k', 0x00, 0x01, b'2', // k = 2
        ];
        let properties = decode(&block).unwrap();

        assert_eq!(
            properties.user("k"),
            Some(&Values::Many(vec!["1".to_owned(), "2".to_owned()]))
        );
        assert_eq!(properties.user("j"), Some(&Values::One("x".to_owned())));
        assert_eq!(properties.user("missing"), None);
        assert_eq!(properties.iter().count(), 0);
    }

    #[test]
    fn property_crossing_block_end_is_malformed() {
        // Session expiry interval needs 4 bytes, block ends after 2
        let block = [0x11, 0x00, 0x00, 0x04, 0xD2];
        let mut cursor = Cursor::new(Bytes::copy_from_slice(&block));
        assert!(matches!(
            Properties::read(&mut cursor, 3),
            Err(Error::MalformedProperties)
        ));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn unknown_property_is_rejected() {
        assert!(matches!(
            decode(&[0x7F, 0x00]),
            Err(Error::InvalidPropertyType(0x7F))
        ));
    }

    #[test]
    fn block_write_matches_length() {
        let mut properties = Properties::new();
        properties
            .insert(
                PropertyType::SessionExpiryInterval,
                PropertyValue::FourByteInteger(1234),
            )
            .unwrap();
        properties
            .insert(
                PropertyType::ReasonString,
                PropertyValue::String("test".to_owned()),
            )
            .unwrap();
        properties
            .insert(
                PropertyType::UserProperty,
                PropertyValue::Pair("test".to_owned(), "test".to_owned()),
            )
            .unwrap();

        let mut stream = BytesMut::new();
        let written = properties.write(&mut stream).unwrap();

        let expected = [
            0x19, // Properties length
            0x11, 0x00, 0x00, 0x04, 0xd2, // Session expiry interval
            0x1F, 0x00, 0x04, 0x74, 0x65, 0x73, 0x74, // Reason string
            0x26, 0x00, 0x04, 0x74, 0x65, 0x73, 0x74, 0x00, 0x04, 0x74, 0x65, 0x73,
            0x74, // User properties
        ];
        assert_eq!(&stream[..], &expected[..]);
        assert_eq!(written, expected.len());
        assert_eq!(decode(&expected[1..]).unwrap(), properties);
    }

    #[test]
    fn mismatched_value_is_not_written() {
        let mut stream = BytesMut::new();
        assert!(matches!(
            write_property(
                &mut stream,
                PropertyType::ReasonString,
                &PropertyValue::Byte(1)
            ),
            Err(Error::PropertyTypeMismatch(0x1F))
        ));
        assert!(stream.is_empty());
    }

    #[test]
    fn insert_checks_the_wire_type() {
        let mut properties = Properties::new();
        assert!(matches!(
            properties.insert(
                PropertyType::ReasonString,
                PropertyValue::Pair("a".to_owned(), "b".to_owned())
            ),
            Err(Error::PropertyTypeMismatch(0x1F))
        ));
        assert!(matches!(
            properties.insert(PropertyType::UserProperty, PropertyValue::Byte(1)),
            Err(Error::PropertyTypeMismatch(0x26))
        ));
        assert!(properties.is_empty());
    }

    #[test]
    fn oversized_property_leaves_stream_untouched() {
        let long = PropertyValue::String("x".repeat(65_536));

        let mut stream = BytesMut::from(&[0xAA][..]);
        assert!(matches!(
            write_property(&mut stream, PropertyType::ReasonString, &long),
            Err(Error::FieldTooLarge(65_536))
        ));
        assert_eq!(&stream[..], &[0xAA]);

        let mut properties = Properties::new();
        properties
            .insert(PropertyType::ReceiveMaximum, PropertyValue::TwoByteInteger(10))
            .unwrap();
        properties.insert(PropertyType::ReasonString, long).unwrap();
        assert!(matches!(
            properties.write(&mut stream),
            Err(Error::FieldTooLarge(65_536))
        ));
        assert_eq!(&stream[..], &[0xAA]);
    }

    #[test]
    fn binary_value_shares_the_frame() {
        let frame = Bytes::from_static(&[0x09, 0x00, 0x03, 0x01, 0x02, 0x03]);
        let mut cursor = Cursor::new(frame.clone());
        let properties = Properties::read(&mut cursor, frame.len()).unwrap();

        match properties.get(PropertyType::CorrelationData) {
            Some(Values::One(PropertyValue::Binary(data))) => {
                assert_eq!(&data[..], &[0x01, 0x02, 0x03]);
                assert_eq!(data.as_ptr(), frame[3..].as_ptr());
            }
            values => panic!("expected correlation data, got {values:?}"),
        }
    }
}
