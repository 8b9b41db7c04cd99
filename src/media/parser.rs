//! Attachment extraction from post records.

use regex::Regex;
use serde_json::Value;

use crate::api::{FileDescriptor, Post};
use crate::config::RunOptions;
use crate::error::Result;
use crate::fs::naming::format_filenames;
use crate::media::item::AttachmentRef;

/// Pull every attachment (and optionally the primary file) out of `posts`,
/// stamping post id, title and in-post index.
pub fn extract_attachments(posts: &[Post], include_files: bool, sluglify: bool) -> Vec<AttachmentRef> {
    let mut attachments = Vec::new();

    for post in posts {
        let files = post
            .attachments
            .iter()
            .chain(include_files.then_some(&post.file));

        for (index, descriptor) in files.enumerate() {
            let Some(mut attachment) = AttachmentRef::from_descriptor(descriptor) else {
                continue;
            };
            attachment.post_id = post.id.clone();
            attachment.post_title = post.title.clone();
            attachment.index = index;
            attachment.sluglify = sluglify;
            attachments.push(attachment);
        }
    }

    attachments
}

/// Whether the attachment's name ends in one of the excluded extensions.
pub fn is_excluded_extension(attachment: &AttachmentRef, excluded: &[String]) -> bool {
    let name = attachment.name.to_lowercase();
    excluded.iter().any(|ext| {
        let ext = ext.trim_start_matches('.').to_lowercase();
        !ext.is_empty() && name.ends_with(&ext)
    })
}

/// Attachment and primary-file counts across `posts`, after extension
/// exclusion.
pub fn count_files(posts: &[Post], excluded: &[String]) -> (usize, usize) {
    let kept = |descriptor: &&FileDescriptor| {
        AttachmentRef::from_descriptor(descriptor)
            .is_some_and(|a| !is_excluded_extension(&a, excluded))
    };
    let attachments = posts
        .iter()
        .flat_map(|p| p.attachments.iter())
        .filter(kept)
        .count();
    let files = posts.iter().map(|p| &p.file).filter(kept).count();
    (attachments, files)
}

/// Non-empty embed objects, for the `.embedded` artefact.
pub fn collect_embeds(posts: &[Post]) -> Vec<serde_json::Value> {
    posts
        .iter()
        .filter(|p| p.has_embed())
        .map(|p| p.embed.clone())
        .collect()
}

/// Every match of `pattern` across post contents, in post order.
///
/// Without capture groups each item is the whole match; with one group it is
/// that group; with several it is an array of the groups (unmatched ones
/// empty).
pub fn find_in_content(posts: &[Post], pattern: &Regex) -> Vec<Value> {
    let groups = pattern.captures_len() - 1;
    let group = |caps: &regex::Captures<'_>, i: usize| {
        Value::String(caps.get(i).map_or("", |m| m.as_str()).to_string())
    };

    posts
        .iter()
        .flat_map(|post| pattern.captures_iter(&post.content))
        .map(|caps| match groups {
            0 => group(&caps, 0),
            1 => group(&caps, 1),
            n => Value::Array((1..=n).map(|i| group(&caps, i)).collect()),
        })
        .collect()
}

/// Turn fetched posts into the final, filtered and named download list.
pub fn prepare_attachments(posts: &[Post], options: &RunOptions) -> Result<Vec<AttachmentRef>> {
    let extracted = extract_attachments(posts, options.files, options.sluglify);
    let total = extracted.len();

    let filtered: Vec<AttachmentRef> = extracted
        .into_iter()
        .filter(|a| !is_excluded_extension(a, &options.exclude_extensions))
        .filter(|a| !(options.exclude_external && a.external))
        .collect();

    let formatted = format_filenames(filtered, &options.file_format)?;
    tracing::debug!(
        "Prepared {} of {} attachments from {} posts",
        formatted.len(),
        total,
        posts.len()
    );

    Ok(formatted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, json_files: &str) -> Post {
        let json = format!(
            r#"{{"id": "{}", "title": "Post {}", "embed": {{}}, {}}}"#,
            id, id, json_files
        );
        serde_json::from_str(&json).unwrap()
    }

    fn sample_posts() -> Vec<Post> {
        vec![
            post(
                "10",
                r#""file": {"name": "cover.png", "path": "/aa/cover.png"},
                   "attachments": [
                     {"name": "page1.png", "path": "/aa/p1.png"},
                     {"name": "notes.psd", "path": "/aa/notes.psd"},
                     {"name": "https://drive.example/x/video.mp4", "path": "/aa/v.mp4"}
                   ]"#,
            ),
            post(
                "11",
                r#""file": {}, "attachments": [{"name": "page1.png", "path": "/bb/p1.png"}]"#,
            ),
        ]
    }

    #[test]
    fn test_extract_stamps_post_and_index() {
        let attachments = extract_attachments(&sample_posts(), true, false);
        assert_eq!(attachments.len(), 5);
        assert_eq!(attachments[0].post_id, "10");
        assert_eq!(attachments[0].post_title, "Post 10");
        assert_eq!(attachments[1].index, 1);
        // primary file comes after the attachments
        assert_eq!(attachments[3].name, "cover.png");
        assert_eq!(attachments[3].index, 3);
    }

    #[test]
    fn test_extract_without_files() {
        let attachments = extract_attachments(&sample_posts(), false, false);
        assert_eq!(attachments.len(), 4);
        assert!(attachments.iter().all(|a| a.name != "cover.png"));
    }

    #[test]
    fn test_prepare_filters_and_dedups() {
        let options = RunOptions {
            exclude_extensions: vec![".psd".to_string()],
            exclude_external: true,
            files: true,
            ..RunOptions::default()
        };
        let prepared = prepare_attachments(&sample_posts(), &options).unwrap();
        let names: Vec<String> = prepared.iter().map(|a| a.filename()).collect();
        // duplicate page1.png from post 11 collapses into the first one
        assert_eq!(names, vec!["page1.png", "cover.png"]);
    }

    #[test]
    fn test_prepare_keeps_external_when_allowed() {
        let options = RunOptions {
            exclude_external: false,
            files: false,
            file_format: "{post_id}_{filename}".to_string(),
            ..RunOptions::default()
        };
        let prepared = prepare_attachments(&sample_posts(), &options).unwrap();
        let names: Vec<String> = prepared.iter().map(|a| a.filename()).collect();
        assert!(names.contains(&"10_video.mp4".to_string()));
        assert!(names.contains(&"11_page1.png".to_string()));
    }

    #[test]
    fn test_count_files() {
        assert_eq!(count_files(&sample_posts(), &[]), (4, 1));
        assert_eq!(count_files(&sample_posts(), &["png".to_string()]), (2, 0));
    }

    #[test]
    fn test_find_in_content() {
        let mut posts = sample_posts();
        posts[0].content = "see https://a.example/1 and https://b.example/2".to_string();
        posts[1].content = "mirror: https://c.example/3".to_string();

        let whole = Regex::new(r"https://\S+").unwrap();
        assert_eq!(
            find_in_content(&posts, &whole),
            vec![
                Value::from("https://a.example/1"),
                Value::from("https://b.example/2"),
                Value::from("https://c.example/3"),
            ]
        );

        let host = Regex::new(r"https://([a-z]+)\.example").unwrap();
        assert_eq!(
            find_in_content(&posts, &host),
            vec![Value::from("a"), Value::from("b"), Value::from("c")]
        );

        let pairs = Regex::new(r"https://([a-z]+)\.example/(\d)").unwrap();
        assert_eq!(find_in_content(&posts[1..], &pairs), vec![serde_json::json!(["c", "3"])]);
    }

    #[test]
    fn test_collect_embeds() {
        let mut posts = sample_posts();
        posts[1].embed = serde_json::json!({"url": "https://youtu.be/x"});
        let embeds = collect_embeds(&posts);
        assert_eq!(embeds.len(), 1);
    }
}
