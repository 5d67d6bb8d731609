use bytes::{Bytes, BytesMut};
use mqttgate_bytes::{
    build_connect, reason_name, Codec, ConnAck, Connect, ConnectReasonCode, Packet, PacketType,
    PropertySection, ProtocolVersion,
};
use tokio_util::codec::{Decoder, Encoder};

use crate::options::DEFAULT_ROUTE;
use crate::{GateError, GateOptions};

/// What the host has to do with the bytes it delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Not enough bytes yet, call again once more have arrived
    NeedMoreData,
    /// The handshake is over, forward the delivered bytes untouched
    Pass,
    /// Send this CONNACK to the client and close the connection
    Reject(Bytes),
    /// Send this CONNECT to the broker in place of the client's one
    Forward(Bytes),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    AwaitConnect,
    Connected,
    Rejected,
    Failed,
}

/// State of one client connection.
///
/// The first packet has to be a CONNECT. It is checked against [`GateOptions`]
/// and either turned down or forwarded, possibly with new credentials.
/// Everything after it passes through.
// Methods only modify the state, sending bytes is up to the host
#[derive(Debug, Clone)]
pub struct ConnectionState {
    options: GateOptions,
    codec: Codec,
    stage: Stage,
    /// Deliveries handled since the CONNECT arrived, the CONNECT included
    messages: usize,
    client_id: Option<String>,
    username: Option<String>,
    route: Option<String>,
    protocol_version: Option<ProtocolVersion>,
}

impl ConnectionState {
    pub fn new(options: GateOptions) -> Self {
        ConnectionState {
            codec: Codec::new(options.max_packet_size()),
            options,
            stage: Stage::AwaitConnect,
            messages: 0,
            client_id: None,
            username: None,
            route: None,
            protocol_version: None,
        }
    }

    /// Handle bytes sent by the client
    ///
    /// Until the CONNECT is complete the bytes are left in `stream`. Once it
    /// is, the CONNECT is split off and bytes that follow it stay in `stream`.
    /// `identity` is the peer identity established by the transport, such as
    /// the subject of a client certificate.
    pub fn handle_upstream(
        &mut self,
        stream: &mut BytesMut,
        identity: Option<&str>,
    ) -> Result<Verdict, GateError> {
        match self.stage {
            Stage::Rejected => return Err(GateError::Rejected),
            Stage::Failed => return Err(GateError::Failed),
            Stage::Connected if stream.is_empty() => return Ok(Verdict::NeedMoreData),
            Stage::Connected => {
                self.messages += 1;
                return Ok(Verdict::Pass);
            }
            Stage::AwaitConnect => (),
        }

        if stream.is_empty() {
            log::debug!("No buffer yet");
            return Ok(Verdict::NeedMoreData);
        }

        let packet = match self.codec.decode(stream) {
            Ok(Some(packet)) => packet,
            Ok(None) => {
                log::debug!("Incomplete packet, {} bytes buffered", stream.len());
                return Ok(Verdict::NeedMoreData);
            }
            Err(e) => {
                log::error!("Unable to parse CONNECT: {e}");
                self.stage = Stage::Failed;
                return Err(e.into());
            }
        };

        let connect = match packet {
            Packet::Connect(connect) => connect,
            packet => {
                let control_field = packet.fixed_header().control_field;
                log::error!("Received unexpected MQTT packet type+flags: {control_field:08b}");
                self.stage = Stage::Failed;
                return Err(GateError::UnexpectedPacket(control_field));
            }
        };

        log_connect(&connect);
        self.protocol_version = Some(connect.protocol_version());
        self.codec.protocol_version = connect.protocol_version();
        self.client_id = Some(connect.client_id().to_owned());
        self.username = connect.username.clone();

        if let Some(verdict) = self.check_policy(&connect, identity)? {
            return Ok(verdict);
        }

        let mut connect = *connect;
        let rewritten = self.options.rewrites() && self.rewrite(&mut connect, identity);
        let forward = match rewritten {
            true => build_connect(&connect)?,
            false => connect.frame().clone(),
        };

        self.username = connect.username;
        self.stage = Stage::Connected;
        self.messages += 1;
        log::info!(
            "Forwarding CONNECT of {:?}, {} bytes",
            self.client_id.as_deref().unwrap_or_default(),
            forward.len()
        );

        Ok(Verdict::Forward(forward))
    }

    /// Run the checks in order, returning the rejection of the first one that fails
    fn check_policy(
        &mut self,
        connect: &Connect,
        identity: Option<&str>,
    ) -> Result<Option<Verdict>, GateError> {
        if self.options.require_v5() && connect.protocol_version() != ProtocolVersion::V5 {
            log::warn!("ACCESS DENIED: Invalid MQTT Version");
            let verdict = self.reject(ConnectReasonCode::UnsupportedProtocolVersion, "")?;
            return Ok(Some(verdict));
        }

        if let Some(chars) = self.options.client_id_match() {
            let matched = identity
                .map(|identity| tail(connect.client_id(), chars) == tail(identity, chars))
                .unwrap_or(false);

            log::debug!("Subject DN value = {identity:?}");
            if !matched {
                log::warn!("ACCESS DENIED: ClientId/Subject Mismatch");
                let verdict = self.reject(ConnectReasonCode::NotAuthorized, "")?;
                return Ok(Some(verdict));
            }
        }

        if let Some(name) = self.options.route_property() {
            let properties = connect.decode_properties(PropertySection::Connect)?;
            log::debug!("Properties: {properties:?}");

            let route = properties
                .as_ref()
                .and_then(|properties| properties.user(name))
                .and_then(|values| values.first())
                .map_or(DEFAULT_ROUTE, String::as_str)
                .to_owned();

            let rejected = self.options.rejected_routes().iter().any(|r| *r == route);
            self.route = Some(route);
            if rejected {
                log::warn!("ACCESS DENIED: Route {:?} is rejected", self.route);
                let reason = self.options.reject_reason().to_owned();
                let verdict = self.reject(ConnectReasonCode::NotAuthorized, &reason)?;
                return Ok(Some(verdict));
            }
        }

        Ok(None)
    }

    /// Apply the credential rewrite, returns whether the packet changed
    fn rewrite(&self, connect: &mut Connect, identity: Option<&str>) -> bool {
        let mut rewritten = false;

        if self.options.username_from_identity() {
            match identity {
                Some(identity) => {
                    connect.set_username(Some(identity.to_owned()));
                    rewritten = true;
                }
                None => log::warn!("No peer identity to use as username"),
            }
        }

        if self.options.strip_password() && connect.flags.password() {
            connect.set_password(None);
            rewritten = true;
        }

        rewritten
    }

    fn reject(&mut self, code: ConnectReasonCode, reason: &str) -> Result<Verdict, GateError> {
        let mut buffer = BytesMut::new();
        let connack = match reason.is_empty() {
            true => ConnAck::new(code),
            false => ConnAck::with_reason(code, reason),
        };
        self.codec.encode(connack, &mut buffer)?;
        self.stage = Stage::Rejected;

        log::info!(
            "Rejecting Connection with {}: {:02x?}",
            reason_name(PacketType::ConnAck, code as u8).unwrap_or("unknown reason"),
            &buffer[..]
        );
        Ok(Verdict::Reject(buffer.freeze()))
    }

    /// Client identifier of the CONNECT
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Username sent to the broker, or the one the client sent if it was turned down
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Route selected by the route property
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Number of deliveries handled since the CONNECT, the CONNECT included
    pub fn messages(&self) -> usize {
        self.messages
    }

    pub fn protocol_version(&self) -> Option<ProtocolVersion> {
        self.protocol_version
    }

    pub fn is_rejected(&self) -> bool {
        self.stage == Stage::Rejected
    }
}

fn log_connect(connect: &Connect) {
    let fixed_header = connect.fixed_header();
    log::debug!("MQTT packet type+flags = {:08b}", fixed_header.control_field);
    log::debug!("Payload Length = {}", fixed_header.remaining_len.value());
    log::debug!(
        "Protocol = {} version {:?}",
        connect.protocol_name(),
        connect.protocol_version()
    );
    log::debug!("Connect Flags = {:08b}", connect.flags.bits());
    if connect.flags.clean_start() {
        log::debug!("Clean Start flag is set");
    }
    log::debug!("Keep Alive = {}", connect.keep_alive());
    if let Some(span) = connect.properties() {
        log::debug!("CONNECT Properties = {} bytes", span.len);
    }
    log::debug!("ClientId value = {}", connect.client_id());
    if let Some(will) = connect.last_will() {
        if let Some(span) = will.properties {
            log::debug!("Will Properties = {} bytes", span.len);
        }
        log::debug!("Will Topic = {}", will.topic);
        log::debug!("Will Payload = {} bytes", will.message.len());
    }
    if let Some(username) = &connect.username {
        log::debug!("Client User Name = {username}");
    }
    if connect.password.is_some() {
        log::debug!("Client Password is present");
    }
    log::debug!(
        "Expected length: {} Parsed Length: {}",
        fixed_header.packet_size(),
        connect.parsed_len()
    );
}

/// The last `chars` characters of `s`
fn tail(s: &str, chars: usize) -> &str {
    if chars == 0 {
        return "";
    }

    s.char_indices()
        .rev()
        .nth(chars - 1)
        .map_or(s, |(i, _)| &s[i..])
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::OptionBuilder;

    // MQTT 3.1.1, clean start, client id "dev1"
    const CONNECT_V4: [u8; 18] = [
        0x10, 0x10, 0x00, 0x04, b'M', b'Q', b'T', b'T', 0x04, 0x02, 0x00, 0x3C, 0x00, 0x04, b'd',
        b'e', b'v', b'1',
    ];

    #[test]
    fn tail_counts_characters() {
        assert_eq!(tail("CN=device-42", 4), "e-42");
        assert_eq!(tail("ab", 9), "ab");
        assert_eq!(tail("grüße", 3), "üße");
        assert_eq!(tail("abc", 0), "");
    }

    #[test]
    fn empty_delivery_needs_more_data() {
        let mut state = ConnectionState::new(GateOptions::default());
        let mut stream = BytesMut::new();

        assert_eq!(
            state.handle_upstream(&mut stream, None).unwrap(),
            Verdict::NeedMoreData
        );
        assert_eq!(state.messages(), 0);
    }

    #[test]
    fn unchanged_connect_is_forwarded_as_is() {
        let mut state = ConnectionState::new(GateOptions::default());
        let mut stream = BytesMut::from(&CONNECT_V4[..]);

        let verdict = state.handle_upstream(&mut stream, None).unwrap();
        assert_eq!(verdict, Verdict::Forward(Bytes::from_static(&CONNECT_V4)));
        assert!(stream.is_empty());
        assert_eq!(state.client_id(), Some("dev1"));
        assert_eq!(state.protocol_version(), Some(ProtocolVersion::V4));
        assert_eq!(state.route(), None);
        assert_eq!(state.messages(), 1);

        stream.extend_from_slice(&[0xC0, 0x00]);
        assert_eq!(state.handle_upstream(&mut stream, None).unwrap(), Verdict::Pass);
        assert_eq!(stream.len(), 2);
        assert_eq!(state.messages(), 2);
    }

    #[test]
    fn v4_client_is_refused_with_return_code() {
        let options = OptionBuilder::new().require_v5(true).finalize();
        let mut state = ConnectionState::new(options);
        let mut stream = BytesMut::from(&CONNECT_V4[..]);

        let verdict = state.handle_upstream(&mut stream, None).unwrap();
        assert_eq!(
            verdict,
            Verdict::Reject(Bytes::from_static(&[0x20, 0x02, 0x00, 0x01]))
        );
        assert!(state.is_rejected());
        assert!(matches!(
            state.handle_upstream(&mut stream, None),
            Err(GateError::Rejected)
        ));
    }

    #[test]
    fn first_packet_must_be_connect() {
        let mut state = ConnectionState::new(GateOptions::default());
        let mut stream = BytesMut::from(&[0xC0, 0x00][..]);

        assert!(matches!(
            state.handle_upstream(&mut stream, None),
            Err(GateError::UnexpectedPacket(0xC0))
        ));

        // A CONNECT arriving later does not revive the connection
        stream.extend_from_slice(&CONNECT_V4);
        assert!(matches!(
            state.handle_upstream(&mut stream, None),
            Err(GateError::Failed)
        ));
    }
}
