use std::fmt;
use std::path::PathBuf;

use crate::AbsPathBuf;

/// Errors produced while parsing or resolving source identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UriError {
    #[error("uri has no scheme")]
    MissingScheme,

    #[error("invalid uri scheme {scheme:?}")]
    InvalidScheme { scheme: String },

    #[error("invalid percent-encoding in uri")]
    InvalidPercentEncoding,

    #[error("no resolver registered for uri scheme {scheme:?}")]
    UnsupportedScheme { scheme: String },

    #[error("file uri names remote host {host:?}")]
    RemoteHost { host: String },

    #[error("uri body does not name an absolute path: {body}")]
    NotAbsolute { body: String },

    #[error("no project root contains {}", .hint.display())]
    NoProjectRoot { hint: PathBuf },
}

/// A parsed source identifier of the form `scheme:[//authority]body`.
///
/// The body is stored percent-decoded; [`fmt::Display`] re-encodes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uri {
    scheme: String,
    authority: String,
    body: String,
}

impl Uri {
    pub fn new(
        scheme: impl Into<String>,
        authority: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, UriError> {
        let scheme = scheme.into();
        if !is_valid_scheme(&scheme) {
            return Err(UriError::InvalidScheme { scheme });
        }
        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            authority: authority.into(),
            body: body.into(),
        })
    }

    pub fn parse(text: &str) -> Result<Self, UriError> {
        let Some((scheme, rest)) = text.split_once(':') else {
            return Err(UriError::MissingScheme);
        };
        if scheme.is_empty() {
            return Err(UriError::MissingScheme);
        }
        if !is_valid_scheme(scheme) {
            return Err(UriError::InvalidScheme {
                scheme: scheme.to_string(),
            });
        }

        let (authority, body) = match rest.strip_prefix("//") {
            Some(after) => match after.find('/') {
                Some(slash) => (&after[..slash], &after[slash..]),
                None => (after, ""),
            },
            None => ("", rest),
        };

        let decode = |part: &str| decode_escapes(part).ok_or(UriError::InvalidPercentEncoding);
        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            authority: decode(authority)?,
            body: decode(body)?,
        })
    }

    /// Build a `file:` URI for an absolute path.
    pub fn from_path(path: &AbsPathBuf) -> Self {
        let mut body = path.as_path().to_string_lossy().replace('\\', "/");
        if !body.starts_with('/') {
            // Windows drive paths: `C:/x` becomes `/C:/x`.
            body.insert(0, '/');
        }
        Self {
            scheme: "file".to_string(),
            authority: String::new(),
            body,
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if !self.authority.is_empty() || self.scheme == "file" {
            write!(f, "//{}", percent_encode(&self.authority))?;
        }
        f.write_str(&percent_encode(&self.body))
    }
}

impl std::str::FromStr for Uri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut bytes = scheme.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'.' | b'-'))
}

/// Decode `%XX` escapes. `None` for a truncated or non-hex escape, or when the
/// decoded bytes are not UTF-8.
fn decode_escapes(text: &str) -> Option<String> {
    let mut decoded = Vec::with_capacity(text.len());
    let mut rest = text.as_bytes();
    while let Some((&byte, tail)) = rest.split_first() {
        if byte != b'%' {
            decoded.push(byte);
            rest = tail;
            continue;
        }
        let digits = tail.get(..2)?;
        if !digits.iter().all(u8::is_ascii_hexdigit) {
            return None;
        }
        let hex = std::str::from_utf8(digits).ok()?;
        decoded.push(u8::from_str_radix(hex, 16).ok()?);
        rest = &tail[2..];
    }
    String::from_utf8(decoded).ok()
}

fn percent_encode(s: &str) -> String {
    fn keep(b: u8) -> bool {
        b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~' | b'/' | b':' | b'+')
    }

    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    if s.bytes().all(keep) {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len() + 8);
    for b in s.bytes() {
        if keep(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}
