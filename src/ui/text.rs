//! Plain-text cleanup for the HTML snippets the Steam store returns
//!
//! Requirements and language lists arrive as HTML fragments; the terminal wants
//! plain text with one requirement per line.

use std::sync::LazyLock;

use regex::Regex;

static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*/?\s*(br|li|p|ul|ol|div)\b[^>]*>").expect("valid block tag pattern")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

static REPEATED_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(Minimum:\s*Minimum:|Recommended:\s*Recommended:|Optimal:\s*Optimal:)")
        .expect("valid header pattern")
});

static REQUIREMENT_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(OS|Processor|Memory|Graphics|Storage|DirectX|Network|Sound|Additional Notes|Additional):",
    )
    .expect("valid label pattern")
});

/// HTML entities the store actually uses; `&amp;` goes last
const ENTITIES: [(&str, &str); 7] = [
    ("&nbsp;", " "),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&amp;", "&"),
];

/// Strips tags and entities from a store HTML fragment
///
/// Whitespace is collapsed, doubled section headers ("Minimum: Minimum:") are
/// merged, and requirement labels such as `OS:` or `Memory:` start a new line.
pub fn clean_html_text(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let text = BLOCK_TAG.replace_all(html, " ");
    let mut text = TAG.replace_all(&text, "").into_owned();
    for (entity, replacement) in ENTITIES {
        text = text.replace(entity, replacement);
    }

    let text = WHITESPACE.replace_all(&text, " ");
    let text = REPEATED_HEADER.replace_all(&text, |caps: &regex::Captures| {
        let header = &caps[0];
        header[..header.find(':').map_or(header.len(), |i| i + 1)].to_string()
    });
    let text = REQUIREMENT_LABEL.replace_all(&text, "\n$1:");

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(clean_html_text(""), "");
    }

    #[test]
    fn test_strips_tags_and_collapses_whitespace() {
        let html = "<p>Hello   <b>world</b></p>\n\n<i>again</i>";
        assert_eq!(clean_html_text(html), "Hello world again");
    }

    #[test]
    fn test_decodes_entities() {
        assert_eq!(
            clean_html_text("Tom &amp; Jerry &quot;Deluxe&quot; &lt;3"),
            "Tom & Jerry \"Deluxe\" <3"
        );
    }

    #[test]
    fn test_requirement_labels_start_new_lines() {
        let html = "<strong>Minimum:</strong><br><ul class=\"bb_ul\"><li><strong>OS:</strong> Windows 10<br></li><li><strong>Processor:</strong> 2 GHz<br></li><li><strong>Memory:</strong> 4 GB RAM</li></ul>";
        assert_eq!(
            clean_html_text(html),
            "Minimum:\nOS: Windows 10\nProcessor: 2 GHz\nMemory: 4 GB RAM"
        );
    }

    #[test]
    fn test_merges_repeated_header() {
        let html = "<strong>Minimum:</strong> Minimum: <strong>OS:</strong> Linux";
        assert_eq!(clean_html_text(html), "Minimum:\nOS: Linux");
    }

    #[test]
    fn test_languages_list() {
        let html = "English<strong>*</strong>, French<br><strong>*</strong>languages with full audio support";
        assert_eq!(
            clean_html_text(html),
            "English*, French *languages with full audio support"
        );
    }
}
