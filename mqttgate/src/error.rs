/// Errors while filtering a connection
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Mqtt serialization/deserialization error: {0}")]
    Codec(#[from] mqttgate_bytes::Error),
    /// The first packet of the connection was not a CONNECT
    #[error("Received unexpected packet type+flags {0:#010b} before CONNECT")]
    UnexpectedPacket(u8),
    /// A CONNACK refusing the client has already been produced
    #[error("Connection has been rejected")]
    Rejected,
    /// An earlier delivery could not be handled, the connection has to be dropped
    #[error("Connection has already failed")]
    Failed,
}
