//! Blocking client for a Girder REST API.

use base64::Engine as _;
use serde_json::Value;
use std::fs::File;
use std::io;
use std::path::Path;
use std::time::Duration;

use super::{Params, RegistryClient, RegistryError};

/// Header carrying the session token on authenticated calls
const TOKEN_HEADER: &str = "Girder-Token";

/// Upper bound on a JSON reply; annotation listings can be large
const MAX_JSON_BYTES: u64 = 512 * 1024 * 1024;

/// Girder client over `ureq`.
///
/// `api_url` is the REST root, e.g. `http://my.girder.com/api/v1`; every
/// path passed to [`RegistryClient::get`] is relative to it.
#[derive(Debug)]
pub struct GirderClient {
    agent: ureq::Agent,
    api_url: String,
    user_agent: String,
    token: Option<String>,
}

impl GirderClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder().timeout_global(Some(timeout)).build();
        let agent: ureq::Agent = config.into();
        let api_url = api_url.into().trim_end_matches('/').to_string();

        Self {
            agent,
            api_url,
            user_agent: format!("overlay-labels/{}", env!("CARGO_PKG_VERSION")),
            token: None,
        }
    }

    /// Set the User-Agent header
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Log in with HTTP basic credentials and keep the returned session token.
    pub fn authenticate(&mut self, username: &str, password: &str) -> Result<(), RegistryError> {
        let path = "user/authentication";
        let credentials =
            base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", username, password));

        let mut response = self.request(path, &[], Some(&format!("Basic {}", credentials)))?;
        let body = read_json(path, &mut response)?;

        let token = body
            .pointer("/authToken/token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                RegistryError::Auth(format!("no token returned for user {}", username))
            })?;
        self.token = Some(token.to_string());
        tracing::debug!(username, "authenticated against {}", self.api_url);
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    fn request(
        &self,
        path: &str,
        params: Params<'_>,
        authorization: Option<&str>,
    ) -> Result<ureq::http::Response<ureq::Body>, RegistryError> {
        let mut request = self.agent.get(&self.url(path)).header("User-Agent", &self.user_agent);

        for (key, value) in params {
            request = request.query(*key, *value);
        }
        if let Some(auth) = authorization {
            request = request.header("Authorization", auth);
        }
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }

        tracing::debug!(path, ?params, "registry GET");
        request.call().map_err(|e| map_call_error(path, e))
    }
}

fn map_call_error(path: &str, err: ureq::Error) -> RegistryError {
    match err {
        ureq::Error::StatusCode(status) => RegistryError::Status { status, path: path.to_string() },
        other => RegistryError::Transport { path: path.to_string(), message: other.to_string() },
    }
}

fn read_json(
    path: &str,
    response: &mut ureq::http::Response<ureq::Body>,
) -> Result<Value, RegistryError> {
    let bytes = response
        .body_mut()
        .with_config()
        .limit(MAX_JSON_BYTES)
        .read_to_vec()
        .map_err(|e| RegistryError::Transport { path: path.to_string(), message: e.to_string() })?;

    serde_json::from_slice(&bytes)
        .map_err(|e| RegistryError::Decode { path: path.to_string(), message: e.to_string() })
}

impl RegistryClient for GirderClient {
    fn get(&self, path: &str, params: Params<'_>) -> Result<Value, RegistryError> {
        let mut response = self.request(path, params, None)?;
        read_json(path, &mut response)
    }

    fn download_file(&self, file_id: &str, local_path: &Path) -> Result<(), RegistryError> {
        let path = format!("file/{}/download", file_id);
        let response = self.request(&path, &[], None)?;

        let io_err = |source: io::Error| RegistryError::Io { file_id: file_id.to_string(), source };
        let mut file = File::create(local_path).map_err(io_err)?;
        let mut reader = response.into_body().into_reader();
        let written = io::copy(&mut reader, &mut file).map_err(io_err)?;

        tracing::debug!(file_id, bytes = written, "downloaded overlay file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Serve one canned response per connection; returns the raw request heads.
    fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/api/v1", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let mut heads = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&buf[..n]);
                }
                heads.push(String::from_utf8_lossy(&head).into_owned());

                let reply = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(reply.as_bytes()).unwrap();
            }
            heads
        });

        (url, handle)
    }

    #[test]
    fn test_get_builds_query_and_parses_json() {
        let (url, server) = serve(vec![(200, r#"[{"itemId": "a", "overlayItemId": "b"}]"#)]);
        let client = GirderClient::new(format!("{}/", url), Duration::from_secs(5));

        let reply = client.get("overlay", &[("itemId", "a")]).unwrap();
        assert_eq!(reply[0]["overlayItemId"], "b");

        let heads = server.join().unwrap();
        assert!(heads[0].starts_with("GET /api/v1/overlay?itemId=a HTTP/1.1"));
    }

    #[test]
    fn test_bad_request_is_client_error() {
        let (url, server) = serve(vec![(400, r#"{"message": "bad"}"#)]);
        let client = GirderClient::new(url, Duration::from_secs(5));

        let err = client.get("annotation/item/a", &[]).unwrap_err();
        assert!(err.is_client_error());
        server.join().unwrap();
    }

    #[test]
    fn test_authenticate_then_send_token() {
        let (url, server) = serve(vec![
            (200, r#"{"authToken": {"token": "tok123"}}"#),
            (200, r#"{"_id": "i1"}"#),
        ]);
        let mut client = GirderClient::new(url, Duration::from_secs(5));

        client.authenticate("alice", "secret").unwrap();
        assert!(client.is_authenticated());
        client.get_item("i1").unwrap();

        let heads = server.join().unwrap();
        let expected = base64::engine::general_purpose::STANDARD.encode("alice:secret");
        assert!(heads[0].contains(&format!("Basic {}", expected)));
        assert!(heads[1].starts_with("GET /api/v1/item/i1 "));
        assert!(heads[1].to_ascii_lowercase().contains("girder-token: tok123"));
    }

    #[test]
    fn test_authenticate_without_token_fails() {
        let (url, server) = serve(vec![(200, r#"{"user": {}}"#)]);
        let mut client = GirderClient::new(url, Duration::from_secs(5));

        assert!(matches!(client.authenticate("bob", "pw"), Err(RegistryError::Auth(_))));
        server.join().unwrap();
    }

    #[test]
    fn test_download_streams_to_file() {
        let (url, server) = serve(vec![(200, "PIXELS")]);
        let client = GirderClient::new(url, Duration::from_secs(5));
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("overlay.png");

        client.download_file("f1", &target).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"PIXELS");

        let heads = server.join().unwrap();
        assert!(heads[0].starts_with("GET /api/v1/file/f1/download "));
    }
}
