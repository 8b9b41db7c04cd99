//! Attachment representation and extraction from posts.

pub mod item;
pub mod parser;

pub use item::AttachmentRef;
pub use parser::{
    collect_embeds, count_files, extract_attachments, find_in_content, is_excluded_extension,
    prepare_attachments,
};
