//! Just enough HTML handling to turn pages and search results into text a
//! model can read.

const SKIPPED_BLOCKS: &[&str] = &["script", "style", "noscript", "head", "svg", "template"];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "tr", "table", "h1", "h2", "h3", "h4", "h5", "h6",
    "section", "article", "header", "footer", "nav", "blockquote", "pre", "hr", "title",
];

pub fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Strips markup, keeping one line per block element.
pub fn html_to_text(html: &str) -> String {
    let mut text = html.to_string();
    for tag in SKIPPED_BLOCKS {
        text = remove_blocks(&text, tag);
    }

    let mut stripped = String::with_capacity(text.len());
    let mut rest = text.as_str();
    while let Some(open) = rest.find('<') {
        stripped.push_str(&rest[..open]);
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        let tag = &rest[open + 1..open + close];
        stripped.push(if is_block_tag(tag) { '\n' } else { ' ' });
        rest = &rest[open + close + 1..];
    }
    if !rest.contains('<') {
        stripped.push_str(rest);
    }

    decode_entities(&stripped)
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_block_tag(tag: &str) -> bool {
    let name: String = tag
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    BLOCK_TAGS.contains(&name.as_str())
}

/// Removes `<tag ...>...</tag>` regions, matching the tag name exactly so
/// `head` does not swallow `header`.
fn remove_blocks(html: &str, tag: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let mut out = String::with_capacity(html.len());
    let mut pos = 0;

    while let Some(found) = lower[pos..].find(&open) {
        let start = pos + found;
        let after = start + open.len();

        let at_boundary = lower[after..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_ascii_alphanumeric());
        if !at_boundary {
            out.push_str(&html[pos..after]);
            pos = after;
            continue;
        }

        out.push_str(&html[pos..start]);
        match lower[after..].find(&close) {
            Some(end) => pos = after + end + close.len(),
            None => {
                pos = html.len();
                break;
            }
        }
    }

    out.push_str(&html[pos..]);
    out
}
