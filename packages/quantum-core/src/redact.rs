//! Secret redaction for logs, error messages and serialized output.
//!
//! The wallet's signing key is the only secret the client handles. Wrap it in
//! [`Redacted`] wherever it could reach a formatter.

use std::fmt::{self, Debug, Display};

/// Wrapper that prints `<redacted>` instead of its inner value.
///
/// ```ignore
/// use quantum_core::redact::Redacted;
///
/// let key = "0xac09...";
/// tracing::debug!(key = %Redacted(key), "Loaded wallet");
/// // Logs: key = <redacted>
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Redacted<T>(pub T);

impl<T> Redacted<T> {
    /// Access the wrapped secret
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> serde::Serialize for Redacted<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        "<redacted>".serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_never_formatted() {
        let key = Redacted("0xdeadbeef".to_string());
        assert_eq!(format!("{}", key), "<redacted>");
        assert_eq!(format!("{:?}", key), "<redacted>");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"<redacted>\"");
        assert_eq!(key.expose(), "0xdeadbeef");
    }
}
