#![forbid(unsafe_code)]

pub mod endpoint {
	/// Schemes accepted for service endpoints.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
	pub enum Scheme {
		Http,
		Https,
		Ws,
		Wss,
	}

	impl Scheme {
		pub const fn as_str(self) -> &'static str {
			match self {
				Scheme::Http => "http",
				Scheme::Https => "https",
				Scheme::Ws => "ws",
				Scheme::Wss => "wss",
			}
		}

		pub const fn is_websocket(self) -> bool {
			matches!(self, Scheme::Ws | Scheme::Wss)
		}
	}

	/// Parsed `scheme://host:port` endpoint.
	#[derive(Debug, Clone, PartialEq, Eq, Hash)]
	pub struct ServiceEndpoint {
		pub scheme: Scheme,
		pub host: String,
		pub port: u16,
	}

	impl ServiceEndpoint {
		/// Returns `scheme://host:port` (host preserved, IPv6 stays bracketed).
		pub fn base(&self) -> String {
			format!("{}://{}:{}", self.scheme.as_str(), self.host, self.port)
		}

		/// Parse an endpoint string in the form `scheme://host:port`.
		pub fn parse(s: &str) -> Result<Self, String> {
			let s = s.trim();
			if s.is_empty() {
				return Err("endpoint must be non-empty (expected scheme://host:port)".to_string());
			}

			let (scheme, rest) = match s.split_once("://") {
				Some(("http", rest)) => (Scheme::Http, rest),
				Some(("https", rest)) => (Scheme::Https, rest),
				Some(("ws", rest)) => (Scheme::Ws, rest),
				Some(("wss", rest)) => (Scheme::Wss, rest),
				Some((other, _)) => {
					return Err(format!("unsupported endpoint scheme {other} (expected http/https/ws/wss): {s}"));
				}
				None => return Err(format!("invalid endpoint (expected scheme://host:port): {s}")),
			};

			if rest.contains('/') || rest.contains('?') || rest.contains('#') {
				return Err(format!(
					"invalid endpoint (expected scheme://host:port without path/query/fragment): {s}"
				));
			}

			let (host, port_str) = rest
				.rsplit_once(':')
				.ok_or_else(|| format!("invalid endpoint (missing :port, expected scheme://host:port): {s}"))?;

			let host = host.trim();
			if host.is_empty() {
				return Err(format!("invalid endpoint host (expected scheme://host:port): {s}"));
			}

			if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
				return Err(format!(
					"invalid endpoint host (IPv6 must be bracketed like ws://[::1]:8080): {s}"
				));
			}

			let port: u16 = port_str
				.trim()
				.parse()
				.map_err(|_| format!("invalid endpoint port (expected 1..=65535): {s}"))?;

			if port == 0 {
				return Err(format!("invalid endpoint port (expected 1..=65535): {s}"));
			}

			Ok(Self {
				scheme,
				host: host.to_string(),
				port,
			})
		}
	}

	/// Validate an `http://`/`https://` endpoint.
	pub fn validate_http_endpoint(s: &str) -> Result<(), String> {
		let e = ServiceEndpoint::parse(s)?;
		if e.scheme.is_websocket() {
			return Err(format!("expected an http(s) endpoint, got {}: {s}", e.scheme.as_str()));
		}
		Ok(())
	}

	/// Validate a `ws://`/`wss://` endpoint.
	pub fn validate_ws_endpoint(s: &str) -> Result<(), String> {
		let e = ServiceEndpoint::parse(s)?;
		if !e.scheme.is_websocket() {
			return Err(format!("expected a ws(s) endpoint, got {}: {s}", e.scheme.as_str()));
		}
		Ok(())
	}

	#[cfg(test)]
	mod tests {
		use super::*;

		#[test]
		fn parses_dns_hostname() {
			let e = ServiceEndpoint::parse("https://askroom.example.com:443").unwrap();
			assert_eq!(e.scheme, Scheme::Https);
			assert_eq!(e.host, "askroom.example.com");
			assert_eq!(e.port, 443);
			assert_eq!(e.base(), "https://askroom.example.com:443");
		}

		#[test]
		fn parses_ipv4_ws() {
			let e = ServiceEndpoint::parse("ws://127.0.0.1:8080").unwrap();
			assert_eq!(e.scheme, Scheme::Ws);
			assert_eq!(e.base(), "ws://127.0.0.1:8080");
		}

		#[test]
		fn parses_bracketed_ipv6() {
			let e = ServiceEndpoint::parse("ws://[::1]:8080").unwrap();
			assert_eq!(e.host, "[::1]");
			assert_eq!(e.port, 8080);
		}

		#[test]
		fn rejects_unbracketed_ipv6() {
			let err = ServiceEndpoint::parse("ws://::1:8080").unwrap_err();
			assert!(err.to_lowercase().contains("ipv6"));
		}

		#[test]
		fn rejects_unknown_scheme_and_missing_scheme() {
			assert!(ServiceEndpoint::parse("quic://127.0.0.1:8080").is_err());
			assert!(ServiceEndpoint::parse("127.0.0.1:8080").is_err());
		}

		#[test]
		fn rejects_path_query_fragment() {
			assert!(ServiceEndpoint::parse("http://127.0.0.1:8080/").is_err());
			assert!(ServiceEndpoint::parse("http://127.0.0.1:8080?x=y").is_err());
			assert!(ServiceEndpoint::parse("http://127.0.0.1:8080#frag").is_err());
		}

		#[test]
		fn rejects_port_zero_and_missing_port() {
			assert!(ServiceEndpoint::parse("ws://127.0.0.1:0").is_err());
			assert!(ServiceEndpoint::parse("ws://127.0.0.1").is_err());
		}

		#[test]
		fn scheme_family_validators() {
			assert!(validate_http_endpoint("http://localhost:8080").is_ok());
			assert!(validate_http_endpoint("ws://localhost:8080").is_err());
			assert!(validate_ws_endpoint("ws://localhost:8080").is_ok());
			assert!(validate_ws_endpoint("https://localhost:8080").is_err());
		}
	}
}
