//! Resilient remote media resolution.
//!
//! Image references on transcript entries are fetched with a two-stage
//! policy: a direct fetch of the original reference, then exactly one retry
//! through the backend's same-origin proxy. Direct references are commonly
//! blocked by mixed-content or CORS policy while the proxy is not, so the
//! single retry recovers most failures without risking a retry loop.

use crate::transcript::{EntryId, Transcript};
use tracing::{debug, warn};

/// Terminal outcome of resolving one image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaOutcome {
    /// The image bytes were fetched (directly or via proxy).
    Rendered(Vec<u8>),
    /// Both attempts failed; the entry carries the failure marker.
    Failed,
    /// The entry had no pending image to resolve.
    Nothing,
}

/// Fetches transcript media with the direct-then-proxy policy.
pub struct MediaResolver {
    client: reqwest::Client,
    /// HTTP base URL of the backend hosting the proxy endpoint.
    base_url: String,
    /// Proxy path, normally `/proxy_image`.
    proxy_path: String,
}

impl MediaResolver {
    /// Create a resolver targeting the given backend.
    #[must_use]
    pub fn new(base_url: impl Into<String>, proxy_path: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            proxy_path: proxy_path.into(),
        }
    }

    /// The proxy URL for an original image reference.
    #[must_use]
    pub fn proxy_url(&self, image_ref: &str) -> String {
        format!(
            "{}{}?url={}",
            self.base_url.trim_end_matches('/'),
            self.proxy_path,
            urlencoding::encode(image_ref)
        )
    }

    /// Drive one entry's render state machine to a terminal outcome.
    ///
    /// Direct fetch first; on failure the entry moves to the proxy-retry
    /// state and the proxied URL is fetched once. A second failure marks the
    /// entry failed permanently. Entries whose reference is not an HTTP URL
    /// (e.g. inline data URLs) need no fetching and resolve to `Nothing`.
    pub async fn resolve_entry(
        &self,
        transcript: &mut Transcript,
        id: EntryId,
    ) -> MediaOutcome {
        let Some(image_ref) = transcript
            .entry(id)
            .and_then(|e| e.image_ref.clone())
        else {
            return MediaOutcome::Nothing;
        };

        if !image_ref.starts_with("http://") && !image_ref.starts_with("https://") {
            return MediaOutcome::Nothing;
        }

        match self.fetch(&image_ref).await {
            Ok(bytes) => return MediaOutcome::Rendered(bytes),
            Err(e) => {
                debug!("direct image load failed, retrying via proxy: {e}");
            }
        }

        // One-shot proxy retry. The transcript refuses a second retry for the
        // same entry, so a re-entrant resolve cannot loop.
        let Some(original) = transcript.begin_proxy_retry(id) else {
            return MediaOutcome::Nothing;
        };

        match self.fetch(&self.proxy_url(&original)).await {
            Ok(bytes) => MediaOutcome::Rendered(bytes),
            Err(e) => {
                warn!("proxied image load failed, giving up: {e}");
                transcript.mark_failed(id);
                MediaOutcome::Failed
            }
        }
    }

    /// GET a URL and return the body bytes, treating non-success statuses as
    /// failures.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("status {}", response.status()));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| format!("body read failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::transcript::{RenderState, Role, FAILURE_MARKER};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn proxy_url_percent_encodes_reference() {
        let resolver = MediaResolver::new("http://localhost:5000", "/proxy_image");
        let url = resolver.proxy_url("http://cdn.example.com/a image.png?v=1&x=2");
        assert!(url.starts_with("http://localhost:5000/proxy_image?url="));
        assert!(url.contains("http%3A%2F%2Fcdn.example.com%2Fa%20image.png%3Fv%3D1%26x%3D2"));
    }

    #[tokio::test]
    async fn direct_success_does_not_touch_proxy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png-bytes".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = MediaResolver::new(server.uri(), "/proxy_image");
        let mut transcript = Transcript::new();
        let id = transcript.append(Role::Sami, "pic", Some(format!("{}/img.png", server.uri())));

        let outcome = resolver.resolve_entry(&mut transcript, id).await;
        assert_eq!(outcome, MediaOutcome::Rendered(b"png-bytes".to_vec()));
        assert_eq!(
            transcript.entry(id).unwrap().render_state,
            RenderState::Direct
        );
    }

    #[tokio::test]
    async fn direct_failure_recovers_via_proxy() {
        let server = MockServer::start().await;
        let image_url = format!("{}/blocked.png", server.uri());

        Mock::given(method("GET"))
            .and(path("/blocked.png"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/proxy_image"))
            .and(query_param("url", image_url.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"proxied".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = MediaResolver::new(server.uri(), "/proxy_image");
        let mut transcript = Transcript::new();
        let id = transcript.append(Role::Sami, "pic", Some(image_url));

        let outcome = resolver.resolve_entry(&mut transcript, id).await;
        // Ends displayed, never a failure marker.
        assert_eq!(outcome, MediaOutcome::Rendered(b"proxied".to_vec()));
        assert_eq!(
            transcript.entry(id).unwrap().render_state,
            RenderState::RetryingProxy
        );
        assert!(!transcript.entry(id).unwrap().display_text().contains(FAILURE_MARKER));
    }

    #[tokio::test]
    async fn double_failure_is_terminal_with_one_marker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/proxy_image"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let resolver = MediaResolver::new(server.uri(), "/proxy_image");
        let mut transcript = Transcript::new();
        let id = transcript.append(Role::Sami, "pic", Some(format!("{}/gone.png", server.uri())));

        let outcome = resolver.resolve_entry(&mut transcript, id).await;
        assert_eq!(outcome, MediaOutcome::Failed);
        assert_eq!(
            transcript.entry(id).unwrap().render_state,
            RenderState::Failed
        );
        let text = transcript.entry(id).unwrap().display_text();
        assert_eq!(text.matches(FAILURE_MARKER).count(), 1);

        // A re-resolve of the same entry cannot restart the retry cycle.
        let again = resolver.resolve_entry(&mut transcript, id).await;
        assert_eq!(again, MediaOutcome::Nothing);
        let text = transcript.entry(id).unwrap().display_text();
        assert_eq!(text.matches(FAILURE_MARKER).count(), 1);
    }

    #[tokio::test]
    async fn data_urls_need_no_fetch() {
        let resolver = MediaResolver::new("http://localhost:5000", "/proxy_image");
        let mut transcript = Transcript::new();
        let id = transcript.append(
            Role::User,
            "preview",
            Some("data:image/jpeg;base64,AAAA".into()),
        );

        let outcome = resolver.resolve_entry(&mut transcript, id).await;
        assert_eq!(outcome, MediaOutcome::Nothing);
    }
}
