//! Filename generation and manipulation.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::media::AttachmentRef;

/// Fields a file format template may reference.
pub const TEMPLATE_FIELDS: &[&str] = &[
    "post_id",
    "post_title",
    "filename",
    "name",
    "index",
    "extension",
];

/// Default template: the attachment's own filename.
pub const DEFAULT_FILE_FORMAT: &str = "{filename}";

/// `--post-id` preset.
pub const POST_ID_FORMAT: &str = "{post_id}_{filename}";

/// `--post-title` preset.
pub const POST_TITLE_FORMAT: &str = "{post_title}_{filename}";

/// `--ordered-short` preset.
pub const ORDERED_SHORT_FORMAT: &str = "{post_id}_{index:03}.{extension}";

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // `{field}`, `{field:03}` and the legacy `{ref.field}` spelling.
    PATTERN.get_or_init(|| {
        Regex::new(r"\{(?:ref\.)?([A-Za-z_]+)(?::(0?)(\d+))?\}").expect("static regex")
    })
}

/// Replace characters that cannot appear in a single path component.
///
/// Separators never survive, and names that would resolve to the current or
/// parent directory are replaced outright.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = sanitized.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        return "_".to_string();
    }

    sanitized
}

/// Lowercase slug: drop non-word characters, collapse whitespace and hyphens.
pub fn slugify(value: &str) -> String {
    static STRIP: OnceLock<Regex> = OnceLock::new();
    static COLLAPSE: OnceLock<Regex> = OnceLock::new();

    let strip = STRIP.get_or_init(|| Regex::new(r"[^\w\s-]").expect("static regex"));
    let collapse = COLLAPSE.get_or_init(|| Regex::new(r"[-\s]+").expect("static regex"));

    let lowered = value.to_lowercase();
    let stripped = strip.replace_all(&lowered, "");
    collapse
        .replace_all(stripped.trim(), "-")
        .trim_matches(|c| c == '-' || c == '_')
        .to_string()
}

/// List the fields a template references, rejecting unknown ones.
pub fn template_fields(template: &str) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    for caps in placeholder_pattern().captures_iter(template) {
        let field = &caps[1];
        if !TEMPLATE_FIELDS.contains(&field) {
            return Err(Error::Template(format!(
                "unknown field '{}' in '{}' (expected one of: {})",
                field,
                template,
                TEMPLATE_FIELDS.join(", ")
            )));
        }
        fields.push(field.to_string());
    }

    if fields.is_empty() {
        return Err(Error::Template(format!(
            "'{}' references no attachment fields",
            template
        )));
    }

    Ok(fields)
}

/// Render a template for one attachment.
pub fn format_filename(template: &str, attachment: &AttachmentRef) -> Result<String> {
    template_fields(template)?;

    let rendered = placeholder_pattern().replace_all(template, |caps: &regex::Captures<'_>| {
        let zero_pad = caps.get(2).is_some_and(|m| !m.as_str().is_empty());
        let width: usize = caps
            .get(3)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);

        match &caps[1] {
            "index" if zero_pad => format!("{:0width$}", attachment.index, width = width),
            "index" => format!("{:width$}", attachment.index, width = width),
            "post_id" => attachment.post_id.clone(),
            "post_title" => attachment.post_title.clone(),
            "filename" => attachment.default_filename(),
            "name" => attachment.name.clone(),
            "extension" => attachment.extension().unwrap_or_default(),
            _ => String::new(),
        }
    });

    Ok(sanitize_filename(&rendered))
}

/// Apply a template to every attachment and collapse entries that end up
/// with the same final filename (first occurrence wins).
pub fn format_filenames(
    attachments: Vec<AttachmentRef>,
    template: &str,
) -> Result<Vec<AttachmentRef>> {
    let mut formatted = Vec::with_capacity(attachments.len());
    for mut attachment in attachments {
        if template != DEFAULT_FILE_FORMAT {
            let filename = format_filename(template, &attachment)?;
            attachment.set_filename(filename);
        }
        formatted.push(attachment);
    }

    Ok(dedup_by_filename(formatted))
}

/// Drop attachments whose final filename was already seen.
pub fn dedup_by_filename(attachments: Vec<AttachmentRef>) -> Vec<AttachmentRef> {
    let mut seen = HashSet::new();
    attachments
        .into_iter()
        .filter(|a| seen.insert(a.filename()))
        .collect()
}
