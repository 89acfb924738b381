//! Socket endpoint derivation

use url::Url;

use crate::error::ChannelError;

/// Fixed path of the socket endpoint on the backend
pub const SOCKET_PATH: &str = "/ws";

/// Derive the socket endpoint from a page origin.
///
/// `http` becomes `ws` and `https` becomes `wss`; the path is always
/// [`SOCKET_PATH`] and any query or fragment is dropped.
pub fn socket_endpoint(origin: &str) -> Result<Url, ChannelError> {
    let invalid = |message: String| ChannelError::InvalidOrigin {
        origin: origin.to_string(),
        message,
    };

    let mut url = Url::parse(origin).map_err(|e| invalid(e.to_string()))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    };

    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    url.set_scheme(scheme)
        .map_err(|_| invalid(format!("cannot switch scheme to '{}'", scheme)))?;
    url.set_path(SOCKET_PATH);
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}
