//! Text extraction from uploaded files

use infer::MatcherType;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// Binary format text cannot be read from
    #[error("Unsupported file format: {0}")]
    Unsupported(String),

    #[error("Document contains no text")]
    Empty,
}

/// Extract plain text from uploaded bytes
///
/// Accepts UTF-8 text (BOM stripped, line endings normalised to `\n`).
/// HTML is reduced to its visible text.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<String, ExtractError> {
    if let Some(kind) = infer::get(bytes) {
        if kind.matcher_type() != MatcherType::Text {
            return Err(ExtractError::Unsupported(kind.mime_type().to_string()));
        }
    }

    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if bytes.contains(&0) {
        return Err(ExtractError::Unsupported("binary data".to_string()));
    }
    let raw = std::str::from_utf8(bytes)
        .map_err(|_| ExtractError::Unsupported("text is not valid UTF-8".to_string()))?;

    let normalised = raw.replace("\r\n", "\n").replace('\r', "\n");
    let text = if looks_like_html(&normalised, filename) {
        html_to_text(&normalised)
    } else {
        normalised.trim().to_string()
    };

    if text.is_empty() {
        Err(ExtractError::Empty)
    } else {
        Ok(text)
    }
}

fn looks_like_html(text: &str, filename: &str) -> bool {
    let ext = legalease_common::models::file_type(filename);
    if ext == "html" || ext == "htm" {
        return true;
    }
    let head: String = text.trim_start().chars().take(64).collect::<String>().to_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

const BLOCK_TAGS: &[&str] = &[
    "p", "br", "div", "li", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article",
    "header", "footer", "ul", "ol", "table", "blockquote",
];

/// Visible text of an HTML document
pub fn html_to_text(html: &str) -> String {
    let without_code = remove_element(&remove_element(html, "script"), "style");
    let mut out = String::with_capacity(without_code.len());
    let mut rest = without_code.as_str();

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        match rest[open..].find('>') {
            Some(close) => {
                let tag = &rest[open + 1..open + close];
                let name: String = tag
                    .trim_start_matches('/')
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric())
                    .collect::<String>()
                    .to_ascii_lowercase();
                if BLOCK_TAGS.contains(&name.as_str()) {
                    out.push('\n');
                } else {
                    out.push(' ');
                }
                rest = &rest[open + close + 1..];
            }
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);

    let decoded = decode_entities(&out);
    let mut lines: Vec<String> = Vec::new();
    for line in decoded.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            if lines.last().map_or(false, |l| !l.is_empty()) {
                lines.push(String::new());
            }
        } else {
            lines.push(collapsed);
        }
    }
    lines.join("\n").trim().to_string()
}

/// Drop `<name ...>...</name>` blocks, case-insensitively
fn remove_element(html: &str, name: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let open_pat = format!("<{}", name);
    let close_pat = format!("</{}>", name);
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;

    while let Some(rel) = lower[pos..].find(&open_pat) {
        let start = pos + rel;
        out.push_str(&html[pos..start]);
        match lower[start..].find(&close_pat) {
            Some(end_rel) => pos = start + end_rel + close_pat.len(),
            None => {
                pos = html.len();
                break;
            }
        }
    }
    if pos < html.len() {
        out.push_str(&html[pos..]);
    }
    out
}

/// Decode named and numeric character references
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after
            .find(';')
            .filter(|semi| *semi <= 10)
            .and_then(|semi| decode_entity(&after[..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "sect" => Some('§'),
        "copy" => Some('©'),
        "reg" => Some('®'),
        "trade" => Some('™'),
        "mdash" => Some('—'),
        "ndash" => Some('–'),
        "hellip" => Some('…'),
        "rsquo" | "lsquo" => Some('\''),
        "rdquo" | "ldquo" => Some('"'),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
