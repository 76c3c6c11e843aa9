use serde::{Deserialize, Serialize};

use crate::metadata::LinkMetadata;

// ── Block model ────────────────────────────────────────────────────────────

/// A top-level document block. Serialized as a tagged union so the editor
/// surface can render each variant without per-class dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Block {
    Text {
        markdown: String,
    },
    Image {
        src: String,
    },
    #[serde(rename = "youtube")]
    #[serde(rename_all = "camelCase")]
    YouTubeEmbed {
        video_id: String,
    },
    #[serde(rename_all = "camelCase")]
    LinkPreview {
        /// Stable identity allocated at insertion time; async metadata is
        /// resolved against this id, never against the URL text.
        id: u64,
        url: String,
        metadata: Option<LinkMetadata>,
    },
}

impl Block {
    pub fn to_markdown(&self) -> String {
        match self {
            Block::Text { markdown } => markdown.clone(),
            Block::Image { src } => format!("![image]({})", src),
            Block::YouTubeEmbed { video_id } => {
                format!("[YouTube video](https://www.youtube.com/watch?v={})", video_id)
            }
            Block::LinkPreview { url, metadata, .. } => {
                let label = metadata
                    .as_ref()
                    .map(|m| m.title.as_str())
                    .filter(|title| !title.is_empty())
                    .unwrap_or(url.as_str());
                format!("[{}]({})", label, url)
            }
        }
    }
}

// ── Paste classification ───────────────────────────────────────────────────

/// What the paste pipeline did with a piece of pasted text. `Unhandled`
/// means the editor's default paste behavior should apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteOutcome {
    YouTubeEmbed { video_id: String },
    LinkPreview { id: u64, url: String },
    Unhandled,
}

/// Extract an 11-character YouTube video id from watch, short and embed
/// style URLs.
fn youtube_video_id(text: &str) -> Option<String> {
    let re = regex::Regex::new(
        r"^https?://(?:www\.)?(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([A-Za-z0-9_-]{11})(?:[?&#/].*)?$",
    )
    .unwrap();
    re.captures(text.trim()).map(|caps| caps[1].to_string())
}

fn is_url(text: &str) -> bool {
    let re = regex::Regex::new(r"^https?://\S+$").unwrap();
    re.is_match(text.trim())
}

// ── Document ───────────────────────────────────────────────────────────────

/// The live document: an ordered list of top-level blocks plus a cursor
/// marking where the next insertion lands. There is no persistence; the
/// document lives for the process lifetime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    blocks: Vec<Block>,
    cursor: usize,
    #[serde(skip)]
    next_preview_id: u64,
}

impl Document {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor, clamped to the current block count.
    pub fn set_cursor(&mut self, index: usize) {
        self.cursor = index.min(self.blocks.len());
    }

    fn insert_at_cursor(&mut self, block: Block) {
        let at = self.cursor.min(self.blocks.len());
        self.blocks.insert(at, block);
        self.cursor = at + 1;
    }

    /// Classify pasted text, first match wins: YouTube URL → embed block;
    /// generic URL → link-preview placeholder (metadata arrives later);
    /// anything else is left to the editor's default paste handling.
    pub fn paste_text(&mut self, text: &str) -> PasteOutcome {
        if let Some(video_id) = youtube_video_id(text) {
            self.insert_at_cursor(Block::YouTubeEmbed {
                video_id: video_id.clone(),
            });
            return PasteOutcome::YouTubeEmbed { video_id };
        }

        if is_url(text) {
            let url = text.trim().to_string();
            let id = self.next_preview_id;
            self.next_preview_id += 1;
            self.insert_at_cursor(Block::LinkPreview {
                id,
                url: url.clone(),
                metadata: None,
            });
            return PasteOutcome::LinkPreview { id, url };
        }

        PasteOutcome::Unhandled
    }

    /// Committed text content from the editor surface (default paste /
    /// typing), stored as raw markdown.
    pub fn insert_text(&mut self, markdown: String) {
        self.insert_at_cursor(Block::Text { markdown });
    }

    /// A pasted image that finished reading as a data URL. Reads run
    /// concurrently, so insertion order follows completion order.
    pub fn insert_image(&mut self, src: String) {
        self.insert_at_cursor(Block::Image { src });
    }

    /// Attach fetched metadata to the placeholder with the given id.
    /// Returns false when the placeholder was removed before the fetch
    /// completed (or was already resolved); that is a clean no-op.
    pub fn resolve_preview(&mut self, id: u64, metadata: LinkMetadata) -> bool {
        for block in &mut self.blocks {
            if let Block::LinkPreview {
                id: block_id,
                metadata: slot,
                ..
            } = block
            {
                if *block_id == id && slot.is_none() {
                    *slot = Some(metadata);
                    return true;
                }
            }
        }
        false
    }

    pub fn remove_block(&mut self, index: usize) -> Option<Block> {
        if index >= self.blocks.len() {
            return None;
        }
        let removed = self.blocks.remove(index);
        if self.cursor > index {
            self.cursor -= 1;
        }
        Some(removed)
    }

    pub fn to_markdown(&self) -> String {
        self.blocks
            .iter()
            .map(Block::to_markdown)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Markdown for submission, or None when the document serializes to
    /// nothing but whitespace (no submission fires).
    pub fn submit_markdown(&self) -> Option<String> {
        let markdown = self.to_markdown();
        if markdown.trim().is_empty() {
            None
        } else {
            Some(markdown)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata;

    #[test]
    fn test_youtube_video_id_variants() {
        assert_eq!(
            youtube_video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            youtube_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(youtube_video_id("https://example.com/watch?v=abc"), None);
        assert_eq!(youtube_video_id("plain text"), None);
    }

    #[test]
    fn test_paste_youtube_inserts_embed_only() {
        let mut doc = Document::default();
        let outcome = doc.paste_text("https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(
            outcome,
            PasteOutcome::YouTubeEmbed {
                video_id: "dQw4w9WgXcQ".to_string()
            }
        );
        assert_eq!(doc.blocks().len(), 1);
        assert!(matches!(doc.blocks()[0], Block::YouTubeEmbed { .. }));
    }

    #[test]
    fn test_paste_url_inserts_placeholder_with_null_metadata() {
        let mut doc = Document::default();
        let outcome = doc.paste_text("https://example.com/page");
        let PasteOutcome::LinkPreview { id, url } = outcome else {
            panic!("expected a link preview outcome");
        };
        assert_eq!(url, "https://example.com/page");
        assert_eq!(doc.blocks().len(), 1);
        assert_eq!(
            doc.blocks()[0],
            Block::LinkPreview {
                id,
                url,
                metadata: None
            }
        );
    }

    #[test]
    fn test_paste_plain_text_is_unhandled() {
        let mut doc = Document::default();
        assert_eq!(doc.paste_text("just some words"), PasteOutcome::Unhandled);
        assert!(doc.blocks().is_empty());
    }

    #[test]
    fn test_duplicate_urls_resolve_independently() {
        let mut doc = Document::default();
        let PasteOutcome::LinkPreview { id: first, .. } =
            doc.paste_text("https://example.com/page")
        else {
            panic!("expected link preview");
        };
        let PasteOutcome::LinkPreview { id: second, .. } =
            doc.paste_text("https://example.com/page")
        else {
            panic!("expected link preview");
        };
        assert_ne!(first, second);

        assert!(doc.resolve_preview(first, metadata::fallback("https://example.com/page")));
        let resolved: Vec<bool> = doc
            .blocks()
            .iter()
            .map(|block| match block {
                Block::LinkPreview { metadata, .. } => metadata.is_some(),
                _ => false,
            })
            .collect();
        assert_eq!(resolved, vec![true, false]);

        assert!(doc.resolve_preview(second, metadata::fallback("https://example.com/page")));
        // A second resolution of the same placeholder is refused.
        assert!(!doc.resolve_preview(first, metadata::fallback("https://example.com/page")));
    }

    #[test]
    fn test_resolve_after_removal_is_noop() {
        let mut doc = Document::default();
        let PasteOutcome::LinkPreview { id, .. } = doc.paste_text("https://example.com/gone")
        else {
            panic!("expected link preview");
        };
        doc.remove_block(0);
        assert!(!doc.resolve_preview(id, metadata::fallback("https://example.com/gone")));
    }

    #[test]
    fn test_cursor_insertion_order() {
        let mut doc = Document::default();
        doc.insert_text("first".to_string());
        doc.insert_text("third".to_string());
        doc.set_cursor(1);
        doc.insert_text("second".to_string());
        let markdown: Vec<String> = doc.blocks().iter().map(Block::to_markdown).collect();
        assert_eq!(markdown, vec!["first", "second", "third"]);
        // Cursor follows the insertion.
        assert_eq!(doc.cursor(), 2);
    }

    #[test]
    fn test_remove_block_adjusts_cursor() {
        let mut doc = Document::default();
        doc.insert_text("a".to_string());
        doc.insert_text("b".to_string());
        assert_eq!(doc.cursor(), 2);
        assert!(doc.remove_block(0).is_some());
        assert_eq!(doc.cursor(), 1);
        assert!(doc.remove_block(5).is_none());
    }

    #[test]
    fn test_submit_suppresses_whitespace_only() {
        let mut doc = Document::default();
        assert_eq!(doc.submit_markdown(), None);
        doc.insert_text("   \n".to_string());
        assert_eq!(doc.submit_markdown(), None);
    }

    #[test]
    fn test_submit_passes_markdown_through() {
        let mut doc = Document::default();
        doc.insert_text("# Hello".to_string());
        assert_eq!(doc.submit_markdown().as_deref(), Some("# Hello"));
    }

    #[test]
    fn test_block_markdown_export() {
        assert_eq!(
            Block::Image {
                src: "data:image/png;base64,AAAA".to_string()
            }
            .to_markdown(),
            "![image](data:image/png;base64,AAAA)"
        );
        assert_eq!(
            Block::YouTubeEmbed {
                video_id: "dQw4w9WgXcQ".to_string()
            }
            .to_markdown(),
            "[YouTube video](https://www.youtube.com/watch?v=dQw4w9WgXcQ)"
        );

        let unresolved = Block::LinkPreview {
            id: 0,
            url: "https://example.com".to_string(),
            metadata: None,
        };
        assert_eq!(unresolved.to_markdown(), "[https://example.com](https://example.com)");

        let resolved = Block::LinkPreview {
            id: 0,
            url: "https://example.com".to_string(),
            metadata: Some(crate::metadata::LinkMetadata {
                url: "https://example.com".to_string(),
                title: "Example".to_string(),
                description: String::new(),
                image: None,
                domain: "example.com".to_string(),
            }),
        };
        assert_eq!(resolved.to_markdown(), "[Example](https://example.com)");
    }

    #[test]
    fn test_block_serialization_tags() {
        let block = Block::YouTubeEmbed {
            video_id: "dQw4w9WgXcQ".to_string(),
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "youtube");
        assert_eq!(json["videoId"], "dQw4w9WgXcQ");

        let block = Block::LinkPreview {
            id: 3,
            url: "https://example.com".to_string(),
            metadata: None,
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "linkPreview");
        assert_eq!(json["id"], 3);
        assert!(json["metadata"].is_null());
    }
}
