//! End-to-end pulls with a canned post listing.

mod common;

use std::path::Path;

use async_trait::async_trait;
use party_downloader::config::INFO_FILE;
use party_downloader::fs::{EMBEDDED_FILE, POSTS_FILE};
use party_downloader::download::{dump_path, dump_posts};
use party_downloader::{
    pull_creator, Creator, Error, Post, PostSource, PullInfo, RunOptions, TransferStatus,
};
use serde_json::{json, Value};
use wiremock::MockServer;

use common::{api, content, mount_file, requests_for};

struct FakeSource {
    posts: Vec<Post>,
}

#[async_trait]
impl PostSource for FakeSource {
    async fn fetch_posts(
        &self,
        _creator: &Creator,
        limit: Option<usize>,
    ) -> party_downloader::Result<Vec<Post>> {
        let take = limit.unwrap_or(self.posts.len());
        Ok(self.posts.iter().take(take).cloned().collect())
    }
}

fn posts() -> Vec<Post> {
    serde_json::from_value(json!([
        {
            "id": "100",
            "title": "First",
            "embed": {},
            "file": {"name": "cover.jpg", "path": "/cover.jpg"},
            "attachments": [
                {"name": "a.png", "path": "/a.png"},
                {"name": "layers.psd", "path": "/layers.psd"}
            ]
        },
        {
            "id": "101",
            "title": "Second",
            "embed": {"url": "https://video.example/watch"},
            "file": {},
            "attachments": [{"name": "c.png", "path": "/c.png"}]
        }
    ]))
    .unwrap()
}

fn creator() -> Creator {
    Creator::new("1", "artist", "patreon")
}

async fn mount_all(server: &MockServer) {
    mount_file(server, "a.png", "\"a\"", &content(1, 20)).await;
    mount_file(server, "cover.jpg", "\"cover\"", &content(2, 30)).await;
    mount_file(server, "c.png", "\"c\"", &content(3, 25)).await;
    mount_file(server, "layers.psd", "\"psd\"", &content(4, 10)).await;
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_pull_writes_artefacts_and_files() {
    let server = MockServer::start().await;
    mount_all(&server).await;

    let tmp = tempfile::tempdir().unwrap();
    let directory = tmp.path().join("artist");
    let options = RunOptions {
        site: server.uri(),
        directory: Some(directory.clone()),
        workers: 2,
        exclude_extensions: vec!["psd".to_string()],
        ..RunOptions::default()
    };
    let source = FakeSource { posts: posts() };

    let summary = pull_creator(&api(&server), &source, &creator(), &options, false)
        .await
        .unwrap();

    assert_eq!(summary.directory, directory);
    assert_eq!(summary.posts, 2);
    assert_eq!(summary.attachments, 3);
    assert_eq!(summary.report.tally().count(TransferStatus::Success), 3);

    assert_eq!(std::fs::read(directory.join("a.png")).unwrap(), content(1, 20));
    assert_eq!(std::fs::read(directory.join("cover.jpg")).unwrap(), content(2, 30));
    assert_eq!(std::fs::read(directory.join("c.png")).unwrap(), content(3, 25));
    assert!(!directory.join("layers.psd").exists());
    assert!(requests_for(&server, "HEAD", "layers.psd").await.is_empty());

    let info = PullInfo::load(&directory).unwrap();
    assert_eq!(info.user.id, "1");
    assert_eq!(info.options.site, server.uri());
    assert_eq!(info.options.directory.as_deref(), Some(directory.as_path()));
    assert!(directory.join(INFO_FILE).is_file());

    let listed = read_json(&directory.join(POSTS_FILE));
    assert_eq!(listed.as_array().unwrap().len(), 2);

    let embeds = read_json(&directory.join(EMBEDDED_FILE));
    assert_eq!(embeds, json!([{"url": "https://video.example/watch"}]));
}

#[tokio::test]
async fn test_pull_respects_limit_and_skips_empty_embeds() {
    let server = MockServer::start().await;
    mount_all(&server).await;

    let tmp = tempfile::tempdir().unwrap();
    let directory = tmp.path().join("artist");
    let options = RunOptions {
        site: server.uri(),
        directory: Some(directory.clone()),
        limit: Some(1),
        files: false,
        file_format: "{post_id}_{filename}".to_string(),
        ..RunOptions::default()
    };
    let source = FakeSource { posts: posts() };

    let summary = pull_creator(&api(&server), &source, &creator(), &options, false)
        .await
        .unwrap();

    assert_eq!(summary.posts, 1);
    assert_eq!(summary.attachments, 2);
    assert!(directory.join("100_a.png").is_file());
    assert!(directory.join("100_layers.psd").is_file());
    assert!(!directory.join("100_cover.jpg").exists());
    assert!(!directory.join(EMBEDDED_FILE).exists());
}

#[tokio::test]
async fn test_second_pull_downloads_nothing() {
    let server = MockServer::start().await;
    mount_all(&server).await;

    let tmp = tempfile::tempdir().unwrap();
    let options = RunOptions {
        site: server.uri(),
        directory: Some(tmp.path().join("artist")),
        ..RunOptions::default()
    };
    let source = FakeSource { posts: posts() };
    let api = api(&server);

    pull_creator(&api, &source, &creator(), &options, false)
        .await
        .unwrap();
    let seen = server.received_requests().await.unwrap().len();

    let again = pull_creator(&api, &source, &creator(), &options, false)
        .await
        .unwrap();
    assert_eq!(
        again.report.tally().count(TransferStatus::AlreadyExists),
        again.attachments as u64
    );
    assert_eq!(server.received_requests().await.unwrap().len(), seen);
}

#[tokio::test]
async fn test_invalid_options_touch_nothing() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let directory = tmp.path().join("artist");
    let options = RunOptions {
        site: server.uri(),
        directory: Some(directory.clone()),
        workers: 0,
        ..RunOptions::default()
    };
    let source = FakeSource { posts: posts() };

    let result = pull_creator(&api(&server), &source, &creator(), &options, false).await;

    assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    assert!(!directory.exists());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_dump_posts_writes_listing_only() {
    let tmp = tempfile::tempdir().unwrap();
    let source = FakeSource { posts: posts() };

    let output = dump_path(tmp.path(), "artist", true);
    assert_eq!(output, tmp.path().join("artist").join(POSTS_FILE));

    let written = dump_posts(&source, &creator(), None, &output).await.unwrap();
    assert_eq!(written, 2);
    let listed = read_json(&output);
    assert_eq!(listed[0]["id"], "100");
    assert_eq!(listed[1]["attachments"][0]["name"], "c.png");

    // nothing but the dump lands in the folder
    let entries = std::fs::read_dir(tmp.path().join("artist")).unwrap().count();
    assert_eq!(entries, 1);
}

#[tokio::test]
async fn test_dump_posts_beside_cwd_with_limit() {
    let tmp = tempfile::tempdir().unwrap();
    let source = FakeSource { posts: posts() };

    let output = dump_path(tmp.path(), "artist", false);
    assert_eq!(output, tmp.path().join(".posts_artist"));

    let written = dump_posts(&source, &creator(), Some(1), &output).await.unwrap();
    assert_eq!(written, 1);
    assert_eq!(read_json(&output).as_array().unwrap().len(), 1);
    assert!(!tmp.path().join("artist").exists());
}
