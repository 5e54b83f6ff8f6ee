//! Connection target

use url::Url;

use crate::error::{ClientError, Result};

/// Build the event stream URL from its parts, e.g. `ws://localhost:8080/event`
pub fn event_url(scheme: &str, address: &str, path: &str) -> Result<Url> {
    let raw = format!("{}://{}{}", scheme, address, path);
    let url = Url::parse(&raw).map_err(|e| ClientError::InvalidEndpoint {
        url: raw.clone(),
        reason: e.to_string(),
    })?;

    if url.host_str().is_none() {
        return Err(ClientError::InvalidEndpoint {
            url: raw,
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_target() {
        let url = event_url("ws", "localhost:8080", "/event").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8080/event");
        assert_eq!(url.port(), Some(8080));
    }

    #[test]
    fn test_secure_scheme() {
        let url = event_url("wss", "events.example.com", "/event").unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.path(), "/event");
    }

    #[test]
    fn test_rejects_garbage_address() {
        assert!(event_url("ws", "", "/event").is_err());
        assert!(event_url("ws", "bad host:99999", "/event").is_err());
    }
}
