//! URL construction for the monitor backend

use url::Url;

use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::resource::ResourceId;

/// Base URLs for REST and live feed traffic plus the resource encoding
#[derive(Debug, Clone)]
pub struct BackendEndpoint {
    http_base: Url,
    ws_base: Url,
    placeholder: char,
}

impl BackendEndpoint {
    /// Build from scheme/host/prefix parts
    pub fn new(
        http_scheme: &str,
        ws_scheme: &str,
        host: &str,
        api_prefix: &str,
        placeholder: char,
    ) -> Result<Self> {
        Ok(Self {
            http_base: base_url(http_scheme, host, api_prefix)?,
            ws_base: base_url(ws_scheme, host, api_prefix)?,
            placeholder,
        })
    }

    /// Build from the loaded configuration
    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        Self::new(
            &config.backend.http_scheme,
            &config.backend.ws_scheme,
            &config.backend.host,
            &config.backend.api_prefix,
            config.live_feed.placeholder,
        )
    }

    /// Placeholder used for resource encoding
    pub fn placeholder(&self) -> char {
        self.placeholder
    }

    /// `<ws-scheme>://<host>/<prefix>/monitor/<encoded>/ws`
    pub fn feed_url(&self, resource: &ResourceId) -> Result<Url> {
        self.monitor_url(&self.ws_base, resource, &["ws"])
    }

    /// REST URL under `/monitor/<encoded>/...`
    pub fn resource_url(&self, resource: &ResourceId, tail: &[&str]) -> Result<Url> {
        self.monitor_url(&self.http_base, resource, tail)
    }

    /// REST URL under the API prefix, not tied to a monitor
    pub fn api_url(&self, segments: &[&str]) -> Result<Url> {
        join(&self.http_base, segments)
    }

    fn monitor_url(&self, base: &Url, resource: &ResourceId, tail: &[&str]) -> Result<Url> {
        if resource.is_empty() {
            return Err(DashboardError::EmptyResourceId);
        }

        // `.` and `..` would be collapsed away as dot segments
        let encoded = resource.encode(self.placeholder);
        if encoded == "." || encoded == ".." {
            return Err(DashboardError::validation(format!(
                "resource identifier {:?} cannot be used as a path segment",
                resource.as_str()
            )));
        }

        let mut segments = vec!["monitor", encoded.as_str()];
        segments.extend_from_slice(tail);
        join(base, &segments)
    }
}

fn base_url(scheme: &str, host: &str, api_prefix: &str) -> Result<Url> {
    let root = Url::parse(&format!("{}://{}/", scheme, host.trim_end_matches('/')))?;
    let prefix: Vec<&str> = api_prefix.split('/').filter(|s| !s.is_empty()).collect();
    join(&root, &prefix)
}

fn join(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| DashboardError::internal(format!("URL cannot be a base: {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(prefix: &str) -> BackendEndpoint {
        BackendEndpoint::new("http", "ws", "localhost:8000", prefix, ',').unwrap()
    }

    #[test]
    fn test_feed_url_without_prefix() {
        let id = ResourceId::new("udpserver://0.0.0.0:8099");
        let url = endpoint("").feed_url(&id).unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8000/monitor/udpserver,,,0.0.0.0,8099/ws");
    }

    #[test]
    fn test_feed_url_with_prefix() {
        let id = ResourceId::new("udpserver://0.0.0.0:8099");
        let url = endpoint("/api/").feed_url(&id).unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8000/api/monitor/udpserver,,,0.0.0.0,8099/ws");
    }

    #[test]
    fn test_resource_url_escapes_reserved_characters() {
        let id = ResourceId::new("cam 1?x");
        let url = endpoint("api").resource_url(&id, &["status"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/monitor/cam%201%3Fx/status");
    }

    #[test]
    fn test_empty_resource_rejected() {
        let err = endpoint("").feed_url(&ResourceId::new("")).unwrap_err();
        assert!(matches!(err, DashboardError::EmptyResourceId));
    }

    #[test]
    fn test_dot_segment_resources_rejected() {
        for raw in [".", ".."] {
            let err = endpoint("").feed_url(&ResourceId::new(raw)).unwrap_err();
            assert!(matches!(err, DashboardError::Validation(_)), "{:?} accepted", raw);

            let err = endpoint("api").resource_url(&ResourceId::new(raw), &["status"]).unwrap_err();
            assert_eq!(err.category(), "validation");
        }

        let url = endpoint("").feed_url(&ResourceId::new("...")).unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8000/monitor/.../ws");
    }

    #[test]
    fn test_api_url() {
        let url = endpoint("api").api_url(&["face_signin"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/face_signin");
    }
}
