//! A connection filter for the MQTT handshake
//!
//! `mqttgate` sits between MQTT clients and a broker. It inspects the CONNECT
//! packet each client sends first and, according to [`GateOptions`], turns the
//! client down with a CONNACK or forwards the CONNECT to the broker, possibly
//! with the username replaced by the peer identity and the password removed.
//!
//! The gate performs no I/O. The host hands every delivery from the client to
//! [`ConnectionState::handle_upstream`] and acts on the returned [`Verdict`].
//!
//! ```
//! use bytes::BytesMut;
//! use mqttgate::{ConnectionState, OptionBuilder, Verdict};
//!
//! let options = OptionBuilder::new().username_from_identity(true).finalize();
//! let mut state = ConnectionState::new(options);
//!
//! let mut stream = BytesMut::from(
//!     &[0x10, 0x0C, 0x00, 0x04, b'M', b'Q', b'T', b'T', 0x04, 0x02, 0x00, 0x3C, 0x00, 0x00][..],
//! );
//! match state.handle_upstream(&mut stream, Some("CN=device")).unwrap() {
//!     Verdict::Forward(connect) => assert_eq!(connect[9], 0x82),
//!     verdict => panic!("unexpected {verdict:?}"),
//! }
//! assert_eq!(state.username(), Some("CN=device"));
//! ```

mod error;
mod options;
mod state;

pub use error::GateError;
pub use options::{GateOptions, OptionBuilder, DEFAULT_ROUTE};
pub use state::{ConnectionState, Verdict};

pub use mqttgate_bytes;
