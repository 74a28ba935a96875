/// Endpoint derivation for the websocket channel.
///
/// The bridge assumes the server exposes its websocket as a sibling of the
/// page that serves the terminal: same host, same port, same path, with a
/// fixed `ws/` segment appended.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// The serving location: a host, host:port, or full http(s)/ws(s) URL.
    pub location: String,
}

const ENDPOINT_SEGMENT: &str = "ws/";

impl EndpointConfig {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }

    /// Build the full websocket URL.
    ///
    /// The secure scheme is always used, except for loopback hosts so local
    /// servers and tests can run without TLS.
    pub fn ws_url(&self) -> String {
        let stripped = self
            .location
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_start_matches("wss://")
            .trim_start_matches("ws://");

        // Normalize localhost to avoid IPv6 issues
        let stripped = if stripped.starts_with("localhost") {
            stripped.replacen("localhost", "127.0.0.1", 1)
        } else {
            stripped.to_owned()
        };

        let scheme = if stripped.starts_with("127.0.0.1") {
            "ws"
        } else {
            "wss"
        };

        let mut url = format!("{}://{}", scheme, stripped);
        if !url.ends_with('/') {
            url.push('/');
        }
        url.push_str(ENDPOINT_SEGMENT);
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_endpoint_segment_to_serving_path() {
        let config = EndpointConfig::new("https://example.com:8443/term");
        assert_eq!(config.ws_url(), "wss://example.com:8443/term/ws/");
    }

    #[test]
    fn bare_host_gets_secure_scheme() {
        let config = EndpointConfig::new("example.com");
        assert_eq!(config.ws_url(), "wss://example.com/ws/");
    }

    #[test]
    fn trailing_slash_is_not_doubled() {
        let config = EndpointConfig::new("https://example.com/term/");
        assert_eq!(config.ws_url(), "wss://example.com/term/ws/");
    }

    #[test]
    fn loopback_skips_tls() {
        let config = EndpointConfig::new("127.0.0.1:8080");
        assert_eq!(config.ws_url(), "ws://127.0.0.1:8080/ws/");
    }

    #[test]
    fn localhost_is_normalized_to_ipv4() {
        let config = EndpointConfig::new("http://localhost:8080/term");
        assert_eq!(config.ws_url(), "ws://127.0.0.1:8080/term/ws/");
    }
}
