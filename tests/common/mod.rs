//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::time::Duration;

use party_downloader::{AttachmentRef, ClientSettings, PartyApi};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Serves byte ranges of a fixed body the way a file host does.
pub struct RangeResponder {
    pub body: Vec<u8>,
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let len = self.body.len() as u64;
        let Some(range) = request
            .headers
            .get("range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("bytes="))
        else {
            return ResponseTemplate::new(200).set_body_bytes(self.body.clone());
        };

        let (start, end) = range.split_once('-').unwrap_or((range, ""));
        let start: u64 = start.parse().unwrap_or(0);
        if start >= len {
            return ResponseTemplate::new(416);
        }
        let end: u64 = end.parse().map(|e: u64| e.min(len - 1)).unwrap_or(len - 1);

        ResponseTemplate::new(206)
            .insert_header("content-range", format!("bytes {}-{}/{}", start, end, len).as_str())
            .set_body_bytes(self.body[start as usize..=end as usize].to_vec())
    }
}

/// Client for the mock server with short timeouts.
pub fn api(server: &MockServer) -> PartyApi {
    let settings = ClientSettings {
        timeout: Duration::from_secs(10),
        connect_timeout: Duration::from_secs(5),
        ..ClientSettings::default()
    };
    PartyApi::new(&server.uri(), &settings).unwrap()
}

/// Attachment whose server path is `/{name}`.
pub fn attachment(name: &str) -> AttachmentRef {
    AttachmentRef::new(name, &format!("/{}", name))
}

/// Mount probe and ranged GET handlers for `/data/{name}`.
pub async fn mount_file(server: &MockServer, name: &str, etag: &str, body: &[u8]) {
    mount_probe(server, name, etag, body).await;
    Mock::given(method("GET"))
        .and(path(format!("/data/{}", name)))
        .respond_with(RangeResponder {
            body: body.to_vec(),
        })
        .mount(server)
        .await;
}

/// Mount only the probe handler; the body sets the declared content length.
pub async fn mount_probe(server: &MockServer, name: &str, etag: &str, body: &[u8]) {
    Mock::given(method("HEAD"))
        .and(path(format!("/data/{}", name)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", etag)
                .set_body_bytes(body.to_vec()),
        )
        .mount(server)
        .await;
}

/// Requests the server saw for `/data/{name}` with the given method.
pub async fn requests_for(server: &MockServer, verb: &str, name: &str) -> Vec<Request> {
    let target = format!("/data/{}", name);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == target)
        .collect()
}

/// Deterministic file content of `len` bytes.
pub fn content(seed: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
}
