use mqttgate_bytes::VARINT_MAX;

/// Route assigned to a connection that does not carry the route property
pub const DEFAULT_ROUTE: &str = "-";

/// Policy applied to the CONNECT of every connection
///
/// Construct this using an [`OptionBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOptions {
    /// Maximum size of an incoming packet
    ///
    /// This is used when verifying the remaining length of a packet
    pub(crate) max_packet_size: u32,
    /// Refuse clients that do not speak MQTT 5.0
    pub(crate) require_v5: bool,
    /// Number of trailing characters of the client id that must match the peer identity
    pub(crate) client_id_match: Option<usize>,
    /// Replace the username with the peer identity
    pub(crate) username_from_identity: bool,
    /// Drop the password before the CONNECT reaches the broker
    pub(crate) strip_password: bool,
    /// User property whose value selects the route
    pub(crate) route_property: Option<String>,
    /// Routes whose clients are refused
    pub(crate) rejected_routes: Vec<String>,
    /// Reason string sent to clients on a rejected route
    pub(crate) reject_reason: String,
}

impl GateOptions {
    /// Maximum packet size
    pub fn max_packet_size(&self) -> u32 {
        self.max_packet_size
    }

    pub fn require_v5(&self) -> bool {
        self.require_v5
    }

    pub fn client_id_match(&self) -> Option<usize> {
        self.client_id_match
    }

    pub fn username_from_identity(&self) -> bool {
        self.username_from_identity
    }

    pub fn strip_password(&self) -> bool {
        self.strip_password
    }

    pub fn route_property(&self) -> Option<&str> {
        self.route_property.as_deref()
    }

    pub fn rejected_routes(&self) -> &[String] {
        &self.rejected_routes
    }

    pub fn reject_reason(&self) -> &str {
        &self.reject_reason
    }

    /// Whether the CONNECT has to be rebuilt before it is forwarded
    pub(crate) fn rewrites(&self) -> bool {
        self.username_from_identity || self.strip_password
    }
}

impl Default for GateOptions {
    fn default() -> Self {
        OptionBuilder::new().finalize()
    }
}

/// Create [`GateOptions`] using a builder pattern.
#[derive(Debug, Clone)]
pub struct OptionBuilder {
    max_packet_size: u32,
    require_v5: bool,
    client_id_match: Option<usize>,
    username_from_identity: bool,
    strip_password: bool,
    route_property: Option<String>,
    rejected_routes: Vec<String>,
    reject_reason: String,
}

impl Default for OptionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionBuilder {
    /// Create a new `OptionBuilder` that lets every well formed CONNECT through unchanged
    pub fn new() -> Self {
        Self {
            max_packet_size: VARINT_MAX as u32,
            require_v5: false,
            client_id_match: None,
            username_from_identity: false,
            strip_password: false,
            route_property: None,
            rejected_routes: Vec::new(),
            reject_reason: "Unsupported Software Version".to_owned(),
        }
    }

    /// Finalize the builder and create the [`GateOptions`]
    pub fn finalize(self) -> GateOptions {
        if self.client_id_match == Some(0) {
            log::warn!("Matching 0 characters of the client id accepts every client.");
        }

        if self.route_property.is_none() && !self.rejected_routes.is_empty() {
            // Every connection ends up on the default route
            log::warn!(
                "Rejected routes {:?} are never matched without a route property.",
                self.rejected_routes
            );
        }

        GateOptions {
            max_packet_size: self.max_packet_size,
            require_v5: self.require_v5,
            client_id_match: self.client_id_match,
            username_from_identity: self.username_from_identity,
            strip_password: self.strip_password,
            route_property: self.route_property,
            rejected_routes: self.rejected_routes,
            reject_reason: self.reject_reason,
        }
    }

    /// Set the maximum size of an incoming packet
    pub fn max_packet_size(mut self, max_size: u32) -> Self {
        self.max_packet_size = max_size;
        self
    }

    /// Refuse clients that connect with MQTT 3.1 or 3.1.1
    pub fn require_v5(mut self, require: bool) -> Self {
        self.require_v5 = require;
        self
    }

    /// Require the last `chars` characters of the client id to equal those of the peer identity
    pub fn client_id_match(mut self, chars: usize) -> Self {
        self.client_id_match = Some(chars);
        self
    }

    /// Add a username holding the peer identity, or overwrite the existing one
    pub fn username_from_identity(mut self, enable: bool) -> Self {
        self.username_from_identity = enable;
        self
    }

    /// Remove the password field
    pub fn strip_password(mut self, enable: bool) -> Self {
        self.strip_password = enable;
        self
    }

    /// Use the first value of the given user property as route
    pub fn route_property<S: Into<String>>(mut self, name: S) -> Self {
        self.route_property = Some(name.into());
        self
    }

    /// Refuse clients on the given routes, sending `reason` in the CONNACK
    pub fn reject_routes<I, S>(mut self, routes: I, reason: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rejected_routes = routes.into_iter().map(Into::into).collect();
        self.reject_reason = reason.into();
        self
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_pass_everything() {
        let options = GateOptions::default();

        assert_eq!(options.max_packet_size(), 268_435_455);
        assert!(!options.require_v5());
        assert_eq!(options.client_id_match(), None);
        assert_eq!(options.route_property(), None);
        assert!(options.rejected_routes().is_empty());
        assert!(!options.rewrites());
    }

    #[test]
    fn builder_sets_policy() {
        let options = OptionBuilder::new()
            .max_packet_size(1024)
            .require_v5(true)
            .client_id_match(9)
            .username_from_identity(true)
            .strip_password(true)
            .route_property("sw_version")
            .reject_routes(["0.9", "1.0"], "Too old")
            .finalize();

        assert_eq!(options.max_packet_size(), 1024);
        assert!(options.require_v5());
        assert_eq!(options.client_id_match(), Some(9));
        assert!(options.rewrites());
        assert_eq!(options.route_property(), Some("sw_version"));
        assert_eq!(options.rejected_routes(), &["0.9".to_owned(), "1.0".to_owned()]);
        assert_eq!(options.reject_reason(), "Too old");
    }
}
