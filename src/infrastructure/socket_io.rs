// Socket.IO v4 / Engine.IO v4 text packet codec (websocket transport)
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_NAMESPACE: &str = "/";
pub const PONG: &str = "3";

#[derive(Debug, Error, PartialEq)]
pub enum EndpointError {
    #[error("unsupported endpoint scheme '{0}'")]
    UnsupportedScheme(String),
    #[error("endpoint '{0}' has no host")]
    MissingHost(String),
}

#[derive(Debug, Error)]
pub enum PacketError {
    #[error("empty packet")]
    Empty,
    #[error("unknown packet type '{0}'")]
    UnknownType(char),
    #[error("binary packets are not supported")]
    Binary,
    #[error("invalid packet data: {0}")]
    InvalidData(#[from] serde_json::Error),
    #[error("event packet has no name")]
    MissingEventName,
}

/// Where to open the websocket and which namespace to join
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEndpoint {
    pub url: String,
    pub namespace: String,
}

impl FeedEndpoint {
    /// Map `http(s)://host[:port][/namespace]` to the Engine.IO websocket URL.
    /// A URL path selects the namespace; the transport path is always `/socket.io/`.
    pub fn parse(endpoint: &str) -> Result<Self, EndpointError> {
        let trimmed = endpoint.trim();
        let (scheme, rest) = match trimmed.split_once("://") {
            Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
            None => ("http".to_string(), trimmed),
        };

        let ws_scheme = match scheme.as_str() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            _ => return Err(EndpointError::UnsupportedScheme(scheme)),
        };

        let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let authority = &rest[..authority_end];
        if authority.is_empty() {
            return Err(EndpointError::MissingHost(endpoint.to_string()));
        }

        let path = rest[authority_end..]
            .split(['?', '#'])
            .next()
            .unwrap_or("")
            .trim_end_matches('/');
        let namespace = if path.is_empty() {
            DEFAULT_NAMESPACE.to_string()
        } else {
            path.to_string()
        };

        Ok(Self {
            url: format!("{}://{}/socket.io/?EIO=4&transport=websocket", ws_scheme, authority),
            namespace,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    #[serde(default)]
    pub sid: String,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    /// Payload is echoed back in the pong
    Ping(String),
    Pong,
    Message(String),
    Upgrade,
    Noop,
}

pub fn decode_engine(text: &str) -> Result<EnginePacket, PacketError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(PacketError::Empty)?;
    let body = chars.as_str();

    Ok(match kind {
        '0' => EnginePacket::Open(serde_json::from_str(body)?),
        '1' => EnginePacket::Close,
        '2' => EnginePacket::Ping(body.to_string()),
        '3' => EnginePacket::Pong,
        '4' => EnginePacket::Message(body.to_string()),
        '5' => EnginePacket::Upgrade,
        '6' => EnginePacket::Noop,
        other => return Err(PacketError::UnknownType(other)),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    /// Acks are never requested by this client, so only the namespace is kept
    Ack {
        namespace: String,
    },
    ConnectError {
        namespace: String,
        data: Option<Value>,
    },
}

/// Decode the Socket.IO packet carried by an Engine.IO message:
/// `<type>[<namespace>,][<ack id>][JSON data]`
pub fn decode_socket(text: &str) -> Result<SocketPacket, PacketError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(PacketError::Empty)?;
    let mut rest = chars.as_str();

    if matches!(kind, '5' | '6') {
        return Err(PacketError::Binary);
    }
    if !matches!(kind, '0'..='4') {
        return Err(PacketError::UnknownType(kind));
    }

    let mut namespace = DEFAULT_NAMESPACE.to_string();
    if rest.starts_with('/') {
        let end = rest.find(',').unwrap_or(rest.len());
        namespace = rest[..end].to_string();
        rest = rest.get(end + 1..).unwrap_or("");
    }

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let id = if digits > 0 {
        rest[..digits].parse().ok()
    } else {
        None
    };
    rest = &rest[digits..];

    let data: Option<Value> = if rest.is_empty() {
        None
    } else {
        Some(serde_json::from_str(rest)?)
    };

    Ok(match kind {
        '0' => SocketPacket::Connect { namespace, data },
        '1' => SocketPacket::Disconnect { namespace },
        '2' => {
            let mut args = match data {
                Some(Value::Array(items)) => items,
                _ => return Err(PacketError::MissingEventName),
            };
            if args.is_empty() {
                return Err(PacketError::MissingEventName);
            }
            let name = match args.remove(0) {
                Value::String(name) => name,
                _ => return Err(PacketError::MissingEventName),
            };
            SocketPacket::Event {
                namespace,
                id,
                name,
                args,
            }
        }
        '3' => SocketPacket::Ack { namespace },
        _ => SocketPacket::ConnectError { namespace, data },
    })
}

fn namespace_prefix(namespace: &str) -> String {
    if namespace == DEFAULT_NAMESPACE {
        String::new()
    } else {
        format!("{},", namespace)
    }
}

/// Engine.IO message carrying a Socket.IO CONNECT
pub fn encode_connect(namespace: &str) -> String {
    format!("40{}", namespace_prefix(namespace))
}

/// Engine.IO message carrying a Socket.IO DISCONNECT
pub fn encode_disconnect(namespace: &str) -> String {
    format!("41{}", namespace_prefix(namespace))
}
