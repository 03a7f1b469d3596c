//! Fenced Block Finder
//!
//! Locates ```lang ... ``` blocks in model text. The language tag is the word
//! directly after the opening fence, so single-line blocks such as
//! "```json {...} ```" work too. A fence that is never closed runs to the end
//! of the text (truncated output).

/// A fenced block found in text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock<'a> {
    /// Lowercased language tag, if any
    pub lang: Option<String>,
    /// Text between the tag and the closing fence
    pub body: &'a str,
    /// Byte offset of the opening fence
    pub start: usize,
    /// Byte offset just past the closing fence, or the text length
    pub end: usize,
    /// Whether a closing fence was found
    pub closed: bool,
}

impl FencedBlock<'_> {
    /// Whether the block looks like it carries a structured payload
    pub fn is_structured(&self) -> bool {
        let json_tag = matches!(
            self.lang.as_deref(),
            Some("json" | "json5" | "jsonc" | "javascript" | "js")
        );
        let trimmed = self.body.trim_start();
        (json_tag && trimmed.contains('{')) || trimmed.starts_with('{')
    }
}

const FENCE: &str = "```";

/// All fenced blocks, in order of appearance
pub fn find_fenced_blocks(text: &str) -> Vec<FencedBlock<'_>> {
    let mut blocks = Vec::new();
    let mut offset = 0;

    while let Some(rel) = text[offset..].find(FENCE) {
        let start = offset + rel;
        let after_fence = start + FENCE.len();
        let rest = &text[after_fence..];

        // Tag: leading run of word characters, not the payload itself
        let tag_len = rest
            .char_indices()
            .find(|(_, c)| c.is_whitespace() || *c == '{' || *c == '[' || *c == '`')
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let lang = if tag_len > 0 {
            Some(rest[..tag_len].to_lowercase())
        } else {
            None
        };

        let body_start = after_fence + tag_len;
        match text[body_start..].find(FENCE) {
            Some(rel_end) => {
                let body_end = body_start + rel_end;
                blocks.push(FencedBlock {
                    lang,
                    body: &text[body_start..body_end],
                    start,
                    end: body_end + FENCE.len(),
                    closed: true,
                });
                offset = body_end + FENCE.len();
            }
            None => {
                blocks.push(FencedBlock {
                    lang,
                    body: &text[body_start..],
                    start,
                    end: text.len(),
                    closed: false,
                });
                break;
            }
        }
    }

    blocks
}

/// The last block that looks structured
pub fn last_structured_block(text: &str) -> Option<FencedBlock<'_>> {
    find_fenced_blocks(text)
        .into_iter()
        .rev()
        .find(|b| b.is_structured())
}
