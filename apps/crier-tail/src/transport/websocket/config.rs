use url::{Host, ParseError, Url};

/// Where the tail client connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSocketConfig {
    /// Full `ws://`/`wss://` URL or a bare `host:port`.
    pub url: String,
    /// Optional path suffix (e.g. "/ws").
    pub path: Option<String>,
    /// Whether a bare address should become `wss://` rather than `ws://`.
    pub use_tls: bool,
}

impl WebSocketConfig {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        // Explicit scheme wins; bare addresses get TLS unless they are loopback.
        let use_tls = match scheme_of(&url) {
            Some("wss") => true,
            Some(_) => false,
            None => !bare_host_is_loopback(&url),
        };

        Self {
            url,
            path: None,
            use_tls,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Normalised endpoint: scheme added to bare addresses, path appended,
    /// and a literal `localhost` host pinned to `127.0.0.1`. Nothing outside
    /// the host component is rewritten.
    pub fn build_url(&self) -> Result<Url, ParseError> {
        let mut raw = match scheme_of(&self.url) {
            Some(_) => self.url.clone(),
            None if self.use_tls => format!("wss://{}", self.url),
            None => format!("ws://{}", self.url),
        };

        if let Some(ref path) = self.path {
            if !raw.ends_with('/') && !path.starts_with('/') {
                raw.push('/');
            }
            raw.push_str(path);
        }

        let mut url = Url::parse(&raw)?;
        // Avoid resolving localhost to ::1 when the producer binds IPv4 only.
        if url.host_str() == Some("localhost") {
            url.set_host(Some("127.0.0.1"))?;
        }
        Ok(url)
    }
}

fn scheme_of(url: &str) -> Option<&'static str> {
    if url.starts_with("wss://") {
        Some("wss")
    } else if url.starts_with("ws://") {
        Some("ws")
    } else {
        None
    }
}

fn bare_host_is_loopback(bare: &str) -> bool {
    Url::parse(&format!("ws://{bare}"))
        .map(|url| is_loopback(&url))
        .unwrap_or(false)
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}
