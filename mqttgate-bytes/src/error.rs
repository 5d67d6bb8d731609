/// Error during serialization or deserialization
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Protocol name is not MQTT = {0:?}")]
    NotMqtt(String),
    #[error("Unsupported protocol version = {0}")]
    UnsupportedVersion(u8),
    #[error("Variable byte integer is longer than 4 bytes")]
    MalformedVariableByteInteger,
    #[error("Value {0} does not fit in a variable byte integer")]
    VariableByteIntegerOutOfRange(usize),
    /// More bytes required to finish reading the packet. Argument
    /// implies minimum additional bytes required to proceed further
    #[error("Insufficient number of bytes to read packet, {0} more bytes required")]
    TruncatedPacket(usize),
    /// A field reaches past the remaining length of a packet that is complete
    #[error("Malformed packet, a field crosses the remaining length")]
    MalformedPacket,
    #[error("Property block is malformed")]
    MalformedProperties,
    #[error("Invalid property type = {0}")]
    InvalidPropertyType(u8),
    #[error("Value does not match the wire type of property {0}")]
    PropertyTypeMismatch(u8),
    #[error("String is not UTF-8 encoded = {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("Field of {0} bytes does not fit a 16 bit length prefix")]
    FieldTooLarge(usize),
    #[error("Invalid packet type = {0}")]
    InvalidPacketType(u8),
    #[error("Invalid QoS level = {0}")]
    InvalidQoS(u8),
    #[error("Invalid return code for connect = {0}")]
    InvalidConnectReturnCode(u8),
    #[error("Max Payload size of {max:?} has been exceeded by packet of {pkt_size:?} bytes")]
    PayloadSizeLimitExceeded { pkt_size: u32, max: u32 },
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the same packet may still parse once more bytes are available.
    ///
    /// Every other kind is terminal for the packet being parsed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::TruncatedPacket(_))
    }
}
