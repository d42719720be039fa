//! Strips markdown code fences from model output before JSON decoding.

const FENCE: &str = "```";

struct FencedBlock<'a> {
    lang: &'a str,
    body: &'a str,
}

/// Return the JSON payload of a model response.
///
/// A fence tagged `json` wins over any other fence; an untagged or
/// differently tagged fence is used next; text without fences is returned
/// trimmed but otherwise untouched. An unterminated fence runs to the end
/// of the text.
pub fn strip_code_fence(text: &str) -> &str {
    let blocks = fenced_blocks(text);

    if let Some(block) = blocks.iter().find(|b| b.lang.eq_ignore_ascii_case("json")) {
        return block.body;
    }
    if let Some(block) = blocks.first() {
        return block.body;
    }
    text.trim()
}

/// Sanitize and decode a model response into a JSON value.
pub fn parse_response(text: &str) -> serde_json::Result<serde_json::Value> {
    serde_json::from_str(strip_code_fence(text))
}

fn fenced_blocks(text: &str) -> Vec<FencedBlock<'_>> {
    let mut blocks = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find(FENCE) {
        let open_end = pos + offset + FENCE.len();
        let rest = &text[open_end..];

        // info string: the language tag directly after the opening fence
        let lang_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '+'))
            .unwrap_or(rest.len());
        let lang = &rest[..lang_len];
        let body_start = open_end + lang_len;

        match text[body_start..].find(FENCE) {
            Some(close) => {
                let body_end = body_start + close;
                blocks.push(FencedBlock {
                    lang,
                    body: text[body_start..body_end].trim(),
                });
                pos = body_end + FENCE.len();
            }
            None => {
                blocks.push(FencedBlock {
                    lang,
                    body: text[body_start..].trim(),
                });
                break;
            }
        }
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_json_is_returned_trimmed() {
        assert_eq!(strip_code_fence("  {\"skip\":true}\n"), "{\"skip\":true}");
    }

    #[test]
    fn json_fence_and_bare_text_decode_identically() {
        let fenced = parse_response("```json\n{\"skip\":true}\n```").expect("fenced");
        let bare = parse_response("{\"skip\":true}").expect("bare");
        assert_eq!(fenced, bare);
        assert_eq!(bare, json!({"skip": true}));
    }

    #[test]
    fn untagged_fence_is_used() {
        let text = "Here you go:\n```\n{\"topic\": \"LLMs\"}\n```\nThanks";
        assert_eq!(strip_code_fence(text), "{\"topic\": \"LLMs\"}");
    }

    #[test]
    fn json_tag_beats_earlier_fence() {
        let text = "```text\nnot this\n```\n```JSON\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(text), "{\"a\": 1}");
    }

    #[test]
    fn unterminated_fence_runs_to_end() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn single_line_fence() {
        assert_eq!(strip_code_fence("```json{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn prose_without_fence_fails_to_parse() {
        assert!(parse_response("I cannot classify this article.").is_err());
    }
}
