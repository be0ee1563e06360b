pub use lif::type_suffix;

/// Text processing utilities
pub mod text {
    use std::ops::Range;

    /// Length in characters, the unit LIF offsets are expressed in.
    pub fn char_len(text: &str) -> usize {
        text.chars().count()
    }

    /// Slice `text` by character offsets. The range must already be checked
    /// against `char_len(text)`.
    pub fn char_slice(text: &str, range: Range<usize>) -> String {
        text.chars()
            .skip(range.start)
            .take(range.end - range.start)
            .collect()
    }

    /// Lowercased first three characters, used to tag entity types.
    pub fn abbreviate(kind: &str) -> String {
        kind.chars().take(3).collect::<String>().to_lowercase()
    }

    pub fn escape_html(text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&#39;"),
                other => escaped.push(other),
            }
        }
        escaped
    }
}

/// URL utilities
pub mod url {
    use url::{ParseError, Url};

    /// `<base>/<identifier>[/<action>]`.
    ///
    /// Identifiers look like `anc:gate.tokenizer_2.2.0`, so they are joined as
    /// `./<identifier>` to keep the part before the colon from being read as a
    /// URL scheme.
    pub fn service_url(base: &str, identifier: &str, action: Option<&str>) -> Result<Url, ParseError> {
        let base = Url::parse(&format!("{}/", base.trim_end_matches('/')))?;
        let mut relative = format!("./{}", identifier);
        if let Some(action) = action {
            relative.push('/');
            relative.push_str(action);
        }
        base.join(&relative)
    }

    pub fn is_remote(location: &str) -> bool {
        match Url::parse(location) {
            Ok(url) => url.scheme() == "http" || url.scheme() == "https",
            Err(_) => false,
        }
    }
}
