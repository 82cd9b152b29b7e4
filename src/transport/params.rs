//! Connection parameters for the camera stream.

use std::fmt;
use std::str::FromStr;

use crate::core::{ConfigError, DEFAULT_CAMERA_HOST, DEFAULT_CAMERA_PORT};

/// Kind of stream transport.
///
/// Closed set: adding a stream type adds a variant here and a transport
/// implementation, without touching the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportKind {
    /// Raw Annex-B H.264 over a TCP socket.
    #[default]
    H264Tcp,
}

impl TransportKind {
    /// Short name used in URLs and configuration.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::H264Tcp => "h264",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "h264" | "h264-tcp" | "h264+tcp" | "tcp" => Ok(Self::H264Tcp),
            other => Err(ConfigError::UnsupportedTransport(other.to_string())),
        }
    }
}

/// Where and how to reach the camera.
///
/// Immutable once handed to a session manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionParameters {
    kind: TransportKind,
    host: String,
    port: u16,
}

impl ConnectionParameters {
    /// Create connection parameters.
    pub fn new(kind: TransportKind, host: impl Into<String>, port: u16) -> Self {
        Self {
            kind,
            host: host.into(),
            port,
        }
    }

    /// H.264-over-TCP parameters.
    pub fn h264(host: impl Into<String>, port: u16) -> Self {
        Self::new(TransportKind::H264Tcp, host, port)
    }

    /// Check that the parameters can form an endpoint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.host.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(ConfigError::InvalidHost(self.host.clone()));
        }
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        Ok(())
    }

    /// Transport kind.
    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Camera host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Camera port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` form suitable for dialling (IPv6 hosts are bracketed).
    pub fn endpoint(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for ConnectionParameters {
    fn default() -> Self {
        Self::h264(DEFAULT_CAMERA_HOST, DEFAULT_CAMERA_PORT)
    }
}

impl fmt::Display for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.kind, self.endpoint())
    }
}

/// Parses `kind://host:port`, or a bare `host:port` (H.264 over TCP).
impl FromStr for ConnectionParameters {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = match s.split_once("://") {
            Some((kind, rest)) => (kind.parse()?, rest),
            None => (TransportKind::default(), s),
        };

        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::InvalidPort(String::new()))?;
        let port: u16 = port
            .parse()
            .map_err(|_| ConfigError::InvalidPort(port.to_string()))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');

        let params = Self::new(kind, host, port);
        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters() {
        let params = ConnectionParameters::default();
        assert_eq!(params.kind(), TransportKind::H264Tcp);
        assert_eq!(params.host(), "172.20.10.1");
        assert_eq!(params.port(), 4444);
        assert_eq!(params.to_string(), "h264://172.20.10.1:4444");
    }

    #[test]
    fn test_transport_kind_parse() {
        assert_eq!("h264".parse::<TransportKind>(), Ok(TransportKind::H264Tcp));
        assert_eq!(" H264+TCP ".parse::<TransportKind>(), Ok(TransportKind::H264Tcp));
        assert_eq!(
            "rtsp".parse::<TransportKind>(),
            Err(ConfigError::UnsupportedTransport("rtsp".into()))
        );
    }

    #[test]
    fn test_validate() {
        assert!(ConnectionParameters::h264("cam.local", 4444).validate().is_ok());
        assert_eq!(
            ConnectionParameters::h264("", 4444).validate(),
            Err(ConfigError::EmptyHost)
        );
        assert_eq!(
            ConnectionParameters::h264("cam local", 4444).validate(),
            Err(ConfigError::InvalidHost("cam local".into()))
        );
        assert_eq!(
            ConnectionParameters::h264("cam.local", 0).validate(),
            Err(ConfigError::ZeroPort)
        );
    }

    #[test]
    fn test_parse_url_forms() {
        let params: ConnectionParameters = "h264://10.0.0.2:5000".parse().unwrap();
        assert_eq!(params, ConnectionParameters::h264("10.0.0.2", 5000));

        let bare: ConnectionParameters = "10.0.0.2:5000".parse().unwrap();
        assert_eq!(bare, params);

        let v6: ConnectionParameters = "h264://[fe80::1]:4444".parse().unwrap();
        assert_eq!(v6.host(), "fe80::1");
        assert_eq!(v6.endpoint(), "[fe80::1]:4444");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            "rtmp://cam:1935".parse::<ConnectionParameters>(),
            Err(ConfigError::UnsupportedTransport(_))
        ));
        assert!(matches!(
            "h264://cam:notaport".parse::<ConnectionParameters>(),
            Err(ConfigError::InvalidPort(_))
        ));
        assert!(matches!(
            "h264://cam".parse::<ConnectionParameters>(),
            Err(ConfigError::InvalidPort(_))
        ));
        assert_eq!(
            "h264://cam:0".parse::<ConnectionParameters>(),
            Err(ConfigError::ZeroPort)
        );
    }
}
