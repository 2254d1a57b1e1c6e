//! Plain-text fallback for daemons without `body-markup`

/// Remove markup tags and decode entities.
///
/// `<br>` becomes a newline. Unknown entities and unterminated tags are kept
/// verbatim.
pub fn strip_rich_text(input: &str) -> String {
    if !input.contains(|c: char| c == '<' || c == '&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(|c: char| c == '<' || c == '&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with('<') {
            match tail.find('>') {
                Some(end) => {
                    if is_line_break(&tail[1..end]) {
                        out.push('\n');
                    }
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push_str(tail);
                    rest = "";
                }
            }
        } else {
            match tail.find(';').and_then(|end| decode_entity(&tail[1..end]).map(|c| (end, c))) {
                Some((end, decoded)) => {
                    out.push(decoded);
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push('&');
                    rest = &tail[1..];
                }
            }
        }
    }

    out.push_str(rest);
    out
}

fn is_line_break(tag: &str) -> bool {
    tag.trim().trim_end_matches('/').trim().eq_ignore_ascii_case("br")
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let numeric = name.strip_prefix('#')?;
            let code = match numeric.strip_prefix('x').or_else(|| numeric.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(strip_rich_text("Build finished"), "Build finished");
    }

    #[test]
    fn test_tags_removed() {
        assert_eq!(
            strip_rich_text("<b>Build</b> <i>finished</i>"),
            "Build finished"
        );
        assert_eq!(
            strip_rich_text("see <a href=\"https://example.org\">log</a>"),
            "see log"
        );
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(strip_rich_text("one<br>two<BR/>three"), "one\ntwo\nthree");
    }

    #[test]
    fn test_entities() {
        assert_eq!(strip_rich_text("a &lt; b &amp;&amp; c"), "a < b && c");
        assert_eq!(strip_rich_text("&#65;&#x42;"), "AB");
        assert_eq!(strip_rich_text("fish & chips"), "fish & chips");
        assert_eq!(strip_rich_text("&bogus; x"), "&bogus; x");
    }

    #[test]
    fn test_unterminated_tag_kept() {
        assert_eq!(strip_rich_text("1 <2"), "1 <2");
    }
}
