//! varcache-codec: the on-disk text format for varcache files.
//!
//! A variables file holds one entry per line:
//!
//! ```text
//! key=value
//! ```
//!
//! The key runs up to the first `=`. Everything after it is the value, with
//! carriage returns, line feeds and backslashes escaped so that every entry
//! stays on a single line. Nothing here touches the filesystem.
//!
//! # Compatibility
//!
//! Escaping backslashes is a deliberate break from the older varcache
//! format, which escaped only carriage returns and line feeds. Files written
//! by older tools still load, but a value stored there as `C:\\dir` now
//! decodes to `C:\dir`: each `\\` pair reads as a single backslash.
//! Unknown escape sequences and a lone trailing backslash are kept verbatim.
//!
//! # Example
//!
//! ```rust
//! use varcache_codec::{decode, encode, Entries};
//!
//! let mut entries = Entries::new();
//! entries.insert("some".to_string(), "thing\nhere".to_string());
//!
//! let text = encode(&entries);
//! assert_eq!(text, "some=thing\\nhere\n");
//! assert_eq!(decode(text.as_bytes()).unwrap(), entries);
//! ```
//!
//! # Ordering
//!
//! [`Entries`] is a `BTreeMap`, so [`encode`] always emits lines sorted by
//! key. Encoding the same mapping twice yields identical bytes.

use std::collections::BTreeMap;

mod error;
mod escape;
pub mod key;

pub use error::CodecError;
pub use escape::{escape, unescape};

/// Separates a key from its value on each line.
pub const DELIMITER: char = '=';

/// The in-memory form of a variables file.
pub type Entries = BTreeMap<String, String>;

/// Encode entries as `key=escaped-value` lines, each terminated by `\n`.
///
/// Keys are written verbatim and are expected to have passed
/// [`key::validate`] already.
pub fn encode(entries: &Entries) -> String {
    let mut out = String::new();
    for (key, value) in entries {
        out.push_str(key);
        out.push(DELIMITER);
        out.push_str(&escape(value));
        out.push('\n');
    }
    out
}

/// Decode the contents of a variables file.
///
/// Empty input and blank lines are fine. A line without a delimiter fails
/// with [`CodecError::MalformedEntry`]. When a key appears twice the later
/// line wins.
pub fn decode(bytes: &[u8]) -> Result<Entries, CodecError> {
    let text = std::str::from_utf8(bytes).map_err(|source| CodecError::InvalidUtf8 { source })?;

    let mut entries = Entries::new();
    for (index, line) in text.split('\n').enumerate() {
        // Tolerate CRLF from files edited by hand; encoded CRs are always escaped.
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once(DELIMITER) else {
            return Err(CodecError::MalformedEntry {
                line: index + 1,
                content: line.to_string(),
            });
        };
        entries.insert(key.to_string(), unescape(value));
    }

    Ok(entries)
}
