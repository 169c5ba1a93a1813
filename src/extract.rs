// ABOUTME: Extracts fenced code blocks from Markdown-formatted model responses.
// ABOUTME: Fence-free text collapses into a single "text" entry carrying the input verbatim.

use lazy_static::lazy_static;
use regex::Regex;

use crate::detail::CodeBlock;

lazy_static! {
    static ref FENCE: Regex = Regex::new(r"(?s)```(?P<language>[\w\-]*)\n(?P<code>.*?)\n```")
        .expect("fence regex is valid");
}

/// Extract all fenced code blocks from `text`. A response with no fences
/// yields a single `text` entry carrying the input verbatim.
pub fn extract_code_blocks(text: &str) -> Vec<CodeBlock> {
    let blocks: Vec<CodeBlock> = FENCE
        .captures_iter(text)
        .map(|captures| CodeBlock {
            language: captures["language"].to_string(),
            code: Some(captures["code"].trim().to_string()),
        })
        .collect();

    if blocks.is_empty() {
        vec![CodeBlock {
            language: "text".to_string(),
            code: Some(text.to_string()),
        }]
    } else {
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_tagged_block() {
        let text = "Here you go:\n```javascript\nexpect(page).toBeVisible();\n```\nDone.";
        let blocks = extract_code_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, "javascript");
        assert_eq!(blocks[0].code.as_deref(), Some("expect(page).toBeVisible();"));
    }

    #[test]
    fn plain_prose_becomes_one_text_entry() {
        let text = "The image appears to be a stylized audio waveform, likely representing \
                    sound frequencies over time. If you have questions, feel free to ask!";
        let blocks = extract_code_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, "text");
        assert_eq!(blocks[0].code.as_deref(), Some(text));
    }

    #[test]
    fn extracts_multiple_blocks_in_order() {
        let text = "```python\nassert True\n```\nand also\n```typescript\nexpect(1).toBe(1);\n```";
        let blocks = extract_code_blocks(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].language, "python");
        assert_eq!(blocks[1].language, "typescript");
    }

    #[test]
    fn code_body_is_trimmed() {
        let text = "```js\n  const a = 1;  \n```";
        let blocks = extract_code_blocks(text);
        assert_eq!(blocks[0].code.as_deref(), Some("const a = 1;"));
    }

    #[test]
    fn untagged_fence_keeps_empty_language() {
        let text = "```\nplain snippet\n```";
        let blocks = extract_code_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, "");
        assert_eq!(blocks[0].code.as_deref(), Some("plain snippet"));
    }

    #[test]
    fn hyphenated_language_tags_are_accepted() {
        let text = "```objective-c\nNSLog(@\"hi\");\n```";
        let blocks = extract_code_blocks(text);
        assert_eq!(blocks[0].language, "objective-c");
    }
}
