//! SSH endpoint (`user@host[:port]`) parsing

static ENDPOINT_RE: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
    regex::Regex::new(r"^(?P<user>[^@]+)@(?P<host>\[[^\]]+\]|[^:\[\]@]+)(?::(?P<port>\d+))?$")
        .expect("endpoint regex must compile")
});

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid server {value:?}: {reason}")]
pub struct ParseError {
    pub value: String,
    pub reason: String,
}

/// Remote host and the identity used to log into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub user: String,
    pub host: String,
    pub port: Option<u16>,
}

impl Endpoint {
    pub const DEFAULT_PORT: u16 = 22;

    /// Parse `user@host`, `user@host:port` or `user@[v6addr]:port`.
    pub fn parse(value: &str) -> Result<Self, ParseError> {
        let error = |reason: &str| ParseError {
            value: value.to_string(),
            reason: reason.to_string(),
        };
        let captures = ENDPOINT_RE
            .captures(value)
            .ok_or_else(|| error("expected the form user@host or user@host:port"))?;
        let user = captures["user"].to_string();
        let host = captures["host"].to_string();
        let port = match captures.name("port") {
            Some(port) => Some(
                port.as_str()
                    .parse::<u16>()
                    .map_err(|_| error("port must be a number between 1 and 65535"))?,
            ),
            None => None,
        };
        if port == Some(0) {
            return Err(error("port must be a number between 1 and 65535"));
        }
        Ok(Self { user, host, port })
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(Self::DEFAULT_PORT)
    }

    /// Host in the form accepted by socket address resolution (IPv6 brackets removed)
    #[must_use]
    pub fn socket_host(&self) -> &str {
        self.host
            .strip_prefix('[')
            .and_then(|host| host.strip_suffix(']'))
            .unwrap_or(&self.host)
    }
}

impl std::str::FromStr for Endpoint {
    type Err = ParseError;
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}@{}:{}", self.user, self.host, port),
            None => write!(f, "{}@{}", self.user, self.host),
        }
    }
}
