//! Event identifiers
//!
//! Events are delimited by marker records in every input and output stream.
//! In text streams the marker is the full identifier line (starting with `#`),
//! in binary streams it is the `0xEE` tag followed by an int32. Binary input
//! identifiers are rendered as `#<id>` so both sources look the same to the
//! rest of the pipeline.

use std::fmt;

/// Identifier of one event, as it appears on the marker line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct EventId {
    label: String,
}

impl EventId {
    /// Wrap a marker line (including the leading `#`)
    pub fn from_label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// Identifier for a numeric binary marker
    ///
    /// # Example
    /// ```
    /// use g4ants_session_core::EventId;
    ///
    /// let id = EventId::from_index(7);
    /// assert_eq!(id.label(), "#7");
    /// assert_eq!(id.index(), Some(7));
    /// ```
    pub fn from_index(index: i32) -> Self {
        Self {
            label: format!("#{}", index),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Numeric form used by binary markers
    ///
    /// The text after the leading `#` must be an int32 (surrounding whitespace
    /// is ignored). Labels such as `# event1` have no numeric form.
    pub fn index(&self) -> Option<i32> {
        self.label.strip_prefix('#')?.trim().parse().ok()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_label() {
        assert_eq!(EventId::from_label("#42").index(), Some(42));
        assert_eq!(EventId::from_label("# 42").index(), Some(42));
        assert_eq!(EventId::from_label("#-3").index(), Some(-3));
    }

    #[test]
    fn test_non_numeric_label() {
        assert_eq!(EventId::from_label("# event1").index(), None);
        assert_eq!(EventId::from_label("#end").index(), None);
        assert_eq!(EventId::from_label("42").index(), None);
    }
}
