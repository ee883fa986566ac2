use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;

/// Key recorded for a visit with an empty path.
pub const ROOT_KEY: &str = "root";

const B64_TAG: &str = "B64:";

/// How segments containing `-` are treated by [`KeyCodec::encode`].
///
/// Under [`HyphenPolicy::Encode`] a hyphenated segment goes through the
/// tagged Base64 path, keeping keys inside `[a-zA-Z0-9_:]`. Under
/// [`HyphenPolicy::Keep`] such segments stay verbatim, which reads better
/// in the dashboard but widens the key alphabet to include `-`. Only use
/// `Keep` when the backing store accepts hyphens in key names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HyphenPolicy {
    #[default]
    Encode,
    Keep,
}

/// Maps URL paths to store-safe keys and back.
///
/// The store only accepts keys made of `[a-zA-Z0-9_:]`, so plain
/// alphanumeric segments are kept as-is and everything else is stored as a
/// `B64:`-tagged Base64 block with `+` and `/` rewritten to `:A` and `:B`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyCodec {
    hyphens: HyphenPolicy,
}

impl KeyCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hyphen_policy(hyphens: HyphenPolicy) -> Self {
        Self { hyphens }
    }

    /// Encode a URL path into a store key.
    ///
    /// Normalizes first: a trailing `.html` and a trailing `/` are dropped
    /// and a leading `/` is added, so `/a`, `/a/` and `/a.html` all count
    /// as the same page. An empty path maps to [`ROOT_KEY`].
    pub fn encode(&self, path: &str) -> String {
        if path.is_empty() {
            return ROOT_KEY.to_string();
        }

        let mut p = path;
        if let Some(stripped) = p.strip_suffix(".html") {
            p = stripped;
        }
        if p.len() > 1 {
            p = p.strip_suffix('/').unwrap_or(p);
        }
        let with_slash;
        let p = if p.starts_with('/') {
            p
        } else {
            with_slash = format!("/{p}");
            &with_slash
        };

        let segments = p
            .split('/')
            .filter(|seg| !seg.is_empty())
            .map(|seg| self.encode_segment(seg))
            .collect::<Vec<_>>();

        format!("_{}", segments.join("_"))
    }

    /// Decode a key produced by [`KeyCodec::encode`] into a display path.
    ///
    /// Never fails: a malformed Base64 block or non-UTF-8 payload degrades
    /// to the raw token, and a key without the leading `_` (for example a
    /// hand-authored one) is returned unchanged. Because `_` is both the
    /// segment delimiter and a legal store character, a literal underscore
    /// in a hand-authored key is indistinguishable from a segment boundary
    /// and decodes as one.
    pub fn decode(&self, key: &str) -> String {
        if key == ROOT_KEY {
            return "/".to_string();
        }

        let Some(body) = key.strip_prefix('_') else {
            return key.to_string();
        };

        let tokens = body
            .split('_')
            .map(decode_token)
            .collect::<Vec<_>>();

        format!("/{}", tokens.join("/"))
    }

    fn encode_segment(&self, seg: &str) -> String {
        if self.is_plain(seg) {
            return seg.to_string();
        }

        let block = STANDARD_NO_PAD
            .encode(seg.as_bytes())
            .replace('+', ":A")
            .replace('/', ":B");

        format!("{B64_TAG}{block}")
    }

    fn is_plain(&self, seg: &str) -> bool {
        match self.hyphens {
            HyphenPolicy::Encode => seg.chars().all(|c| c.is_ascii_alphanumeric()),
            HyphenPolicy::Keep => seg.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'),
        }
    }
}

fn decode_token(token: &str) -> String {
    let Some(block) = token.strip_prefix(B64_TAG) else {
        return token.to_string();
    };

    let b64 = block.replace(":A", "+").replace(":B", "/");
    match STANDARD_NO_PAD.decode(b64.as_bytes()) {
        Ok(bytes) => String::from_utf8(bytes).unwrap_or_else(|_| token.to_string()),
        Err(_) => token.to_string(),
    }
}
