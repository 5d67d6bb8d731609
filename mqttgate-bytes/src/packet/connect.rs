use std::ops::Range;

use bytes::{BufMut, Bytes, BytesMut};

use crate::parse::*;
use crate::{Error, FixedHeader, Properties, ProtocolVersion};

/// Protocol names accepted in a CONNECT, the second one is used by MQTT 3.1
const PROTOCOL_NAMES: [&[u8]; 2] = [b"MQTT", b"MQIsdp"];

/// Connection request
///
/// The first packet a client sends after establishing a network connection.
///
/// The record keeps the frame it was parsed from. Property blocks are only
/// located during parsing and decoded on demand with [`Connect::decode_properties`],
/// and [`Connect::write`] copies the untouched part of the frame verbatim.
/// Apart from the flags and the credentials, the fields cannot be changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connect {
    /// The complete frame, fixed header included
    frame: Bytes,
    fixed_header: FixedHeader,
    protocol_name: String,
    protocol_version: ProtocolVersion,
    keep_alive: u16,
    properties: Option<PropertySpan>,
    client_id: String,
    last_will: Option<LastWill>,
    /// Keep alive up to the end of the will message
    variable_header: Range<usize>,
    /// Offset at which parsing stopped
    parsed_len: usize,
    /// Connect flags. Decide which credentials [`Connect::write`] emits
    pub flags: ConnectFlags,
    /// User name, as parsed or as overridden by the host
    pub username: Option<String>,
    /// Password, as parsed or as overridden by the host
    pub password: Option<String>,
}

/// LastWill that broker forwards on behalf of the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastWill {
    /// Will properties, MQTT 5.0 only
    pub properties: Option<PropertySpan>,
    pub topic: String,
    pub message: Bytes,
}

/// Location of a property block inside the frame
///
/// `offset` points past the block's length prefix, `len` is the value of that prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySpan {
    pub offset: usize,
    pub len: usize,
}

impl PropertySpan {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Selects which property block of a CONNECT to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertySection {
    Connect,
    Will,
}

/// The connect flags byte
///
/// ```text
///   7          6          5            4   3      2       1            0
/// +----------+----------+------------+----------+-------+------------+----------+
/// | Username | Password | Will Retain | Will QoS | Will  | Clean Start | Reserved |
/// +----------+----------+------------+----------+-------+------------+----------+
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectFlags(u8);

impl ConnectFlags {
    const CLEAN_START: u8 = 0b0000_0010;
    const WILL: u8 = 0b0000_0100;
    const WILL_QOS: u8 = 0b0001_1000;
    const WILL_RETAIN: u8 = 0b0010_0000;
    const PASSWORD: u8 = 0b0100_0000;
    const USERNAME: u8 = 0b1000_0000;

    pub const fn new(bits: u8) -> Self {
        ConnectFlags(bits)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn clean_start(&self) -> bool {
        self.0 & Self::CLEAN_START != 0
    }

    pub const fn will(&self) -> bool {
        self.0 & Self::WILL != 0
    }

    /// Raw QoS bits of the will message
    pub const fn will_qos(&self) -> u8 {
        (self.0 & Self::WILL_QOS) >> 3
    }

    pub const fn will_retain(&self) -> bool {
        self.0 & Self::WILL_RETAIN != 0
    }

    pub const fn password(&self) -> bool {
        self.0 & Self::PASSWORD != 0
    }

    pub const fn username(&self) -> bool {
        self.0 & Self::USERNAME != 0
    }

    pub fn set_username(&mut self, present: bool) {
        self.set(Self::USERNAME, present);
    }

    pub fn set_password(&mut self, present: bool) {
        self.set(Self::PASSWORD, present);
    }

    fn set(&mut self, bit: u8, present: bool) {
        if present {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }
}

impl Connect {
    /// Parse a CONNECT from `frame`, which holds exactly one packet
    ///
    /// No field may reach past the remaining length, doing so fails with
    /// [`Error::TruncatedPacket`].
    pub fn read(fixed_header: FixedHeader, frame: Bytes) -> Result<Connect, Error> {
        let mut stream = Cursor::at(frame.clone(), fixed_header.size())?;

        let protocol_name = read_mqtt_bytes(&mut stream)?;
        if !PROTOCOL_NAMES.contains(&&protocol_name[..]) {
            return Err(Error::NotMqtt(
                String::from_utf8_lossy(&protocol_name).into_owned(),
            ));
        }
        let protocol_name = std::str::from_utf8(&protocol_name)?.to_owned();

        let protocol_version = ProtocolVersion::try_from(read_u8(&mut stream)?)?;

        let flags = ConnectFlags::new(read_u8(&mut stream)?);
        let variable_header_start = stream.position();
        let keep_alive = read_u16(&mut stream)?;

        // Properties are only located here, decoding is up to the host
        let properties = match protocol_version {
            ProtocolVersion::V5 => Some(skip_properties(&mut stream)?),
            _ => None,
        };

        let client_id = read_mqtt_string(&mut stream)?;

        let last_will = match flags.will() {
            true => {
                let properties = match protocol_version {
                    ProtocolVersion::V5 => Some(skip_properties(&mut stream)?),
                    _ => None,
                };
                let topic = read_mqtt_string(&mut stream)?;
                let message = read_mqtt_bytes(&mut stream)?;

                Some(LastWill {
                    properties,
                    topic,
                    message,
                })
            }
            false => None,
        };

        let variable_header = variable_header_start..stream.position();

        let username = match flags.username() {
            true => Some(read_mqtt_string(&mut stream)?),
            false => None,
        };

        let password = match flags.password() {
            true => Some(read_mqtt_string(&mut stream)?),
            false => None,
        };

        let parsed_len = stream.position();

        Ok(Connect {
            frame,
            fixed_header,
            protocol_name,
            protocol_version,
            keep_alive,
            properties,
            client_id,
            last_will,
            variable_header,
            parsed_len,
            flags,
            username,
            password,
        })
    }

    /// Serialize the packet with the current flags and credentials
    ///
    /// Everything from the keep alive up to the end of the will message is
    /// copied from the original frame. Protocol name, version and flags are
    /// rewritten from the record. A user name and a password are appended
    /// only if their flag is set, a flag without a value yields an empty field.
    /// The remaining length is computed again.
    pub fn write(&self, buffer: &mut BytesMut) -> Result<usize, Error> {
        let mut payload = BytesMut::with_capacity(self.frame.len());

        write_mqtt_string(&mut payload, &self.protocol_name)?;
        payload.put_u8(self.protocol_version as u8);
        payload.put_u8(self.flags.bits());
        payload.extend_from_slice(&self.frame[self.variable_header.clone()]);

        if self.flags.username() {
            write_mqtt_string(&mut payload, self.username.as_deref().unwrap_or_default())?;
        }

        if self.flags.password() {
            write_mqtt_string(&mut payload, self.password.as_deref().unwrap_or_default())?;
        }

        let fixed_header = FixedHeader::new(
            self.fixed_header.control_field,
            VarInt::new(payload.len())?,
        );
        fixed_header.write(buffer);
        buffer.extend_from_slice(&payload);

        Ok(fixed_header.packet_size())
    }

    /// Decode a property block of this packet
    ///
    /// Returns `None` before MQTT 5.0, and for [`PropertySection::Will`]
    /// when the packet carries no will.
    pub fn decode_properties(&self, section: PropertySection) -> Result<Option<Properties>, Error> {
        let span = match section {
            PropertySection::Connect => self.properties,
            PropertySection::Will => self.last_will.as_ref().and_then(|w| w.properties),
        };

        let Some(span) = span else {
            return Ok(None);
        };

        let mut stream = Cursor::at(self.frame.clone(), span.offset)?;
        Properties::read(&mut stream, span.offset + span.len).map(Some)
    }

    /// Replace the user name and set or clear its flag accordingly
    pub fn set_username(&mut self, username: Option<String>) {
        self.flags.set_username(username.is_some());
        self.username = username;
    }

    /// Replace the password and set or clear its flag accordingly
    pub fn set_password(&mut self, password: Option<String>) {
        self.flags.set_password(password.is_some());
        self.password = password;
    }

    pub fn fixed_header(&self) -> FixedHeader {
        self.fixed_header
    }

    /// "MQTT", or "MQIsdp" for MQTT 3.1
    pub fn protocol_name(&self) -> &str {
        &self.protocol_name
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        self.protocol_version
    }

    pub fn keep_alive(&self) -> u16 {
        self.keep_alive
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn last_will(&self) -> Option<&LastWill> {
        self.last_will.as_ref()
    }

    /// Location of the CONNECT properties, MQTT 5.0 only
    pub fn properties(&self) -> Option<PropertySpan> {
        self.properties
    }

    /// Offsets of the part of the frame that is copied by [`Connect::write`]
    pub fn variable_header(&self) -> Range<usize> {
        self.variable_header.clone()
    }

    /// The frame this packet was parsed from
    pub fn frame(&self) -> &Bytes {
        &self.frame
    }

    /// Number of bytes consumed by parsing.
    ///
    /// Less than the frame length if the client sent trailing bytes.
    pub fn parsed_len(&self) -> usize {
        self.parsed_len
    }
}

/// Rebuild a CONNECT with the credentials currently held by `connect`
pub fn build_connect(connect: &Connect) -> Result<Bytes, Error> {
    let mut buffer = BytesMut::new();
    connect.write(&mut buffer)?;
    Ok(buffer.freeze())
}

/// Read a property length and move past the block it announces
fn skip_properties(stream: &mut Cursor) -> Result<PropertySpan, Error> {
    let len = read_varint(stream)?.value();
    let offset = stream.position();
    stream.skip(len)?;

    Ok(PropertySpan { offset, len })
}
