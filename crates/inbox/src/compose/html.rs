//! Plain text to HTML conversion for outgoing replies

/// Markup placed between the reply text and the signature
pub const SIGNATURE_SEPARATOR: &str = "<br><br>--<br>";

/// Escape the characters HTML treats as markup
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Convert plain text to HTML, turning every line break into `<br>`
pub fn text_to_html(text: &str) -> String {
    escape_html(text)
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', "<br>")
}

/// Build a reply body: the converted text, then the signature if there is one
///
/// A blank signature counts as no signature.
pub fn reply_html(text: &str, signature_html: Option<&str>) -> String {
    let mut html = text_to_html(text);
    if let Some(signature) = signature_html.filter(|s| !s.trim().is_empty()) {
        html.push_str(SIGNATURE_SEPARATOR);
        html.push_str(signature);
    }
    html
}
