//! Ephemeral identities for repeated (looped) nodes.
//!
//! A node bound to a list renders once per item. Index 0 uses the node's own
//! id; every further repetition is addressed as `<sourceId>__loop__<index>`.
//! These ids never exist in the tree, so every lookup strips them first.

/// Separator between the source id and the repetition index.
pub const LOOP_MARKER: &str = "__loop__";

/// A parsed node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopInstance<'a> {
    pub source_id: &'a str,
    /// `None` when the id is a plain node id.
    pub index: Option<usize>,
}

impl LoopInstance<'_> {
    /// Whether this id may write data back to the source node.
    ///
    /// Only the first repetition owns the source's measurements.
    pub fn is_primary(&self) -> bool {
        matches!(self.index, None | Some(0))
    }
}

/// Parse an id. Anything that does not end in a canonical decimal index after
/// a non-empty source id is treated as a plain id.
pub fn parse(id: &str) -> LoopInstance<'_> {
    let plain = LoopInstance {
        source_id: id,
        index: None,
    };
    let Some(at) = id.find(LOOP_MARKER) else {
        return plain;
    };
    if at == 0 {
        return plain;
    }
    let tail = &id[at + LOOP_MARKER.len()..];
    match tail.parse::<usize>() {
        Ok(index) if index.to_string() == tail => LoopInstance {
            source_id: &id[..at],
            index: Some(index),
        },
        _ => plain,
    }
}

/// The real node id behind a possibly-looped id.
pub fn source_id(id: &str) -> &str {
    parse(id).source_id
}

pub fn is_instance(id: &str) -> bool {
    parse(id).index.is_some()
}

/// The id rendering uses for repetition `index` of `source_id`.
pub fn instance_id(source_id: &str, index: usize) -> String {
    if index == 0 {
        source_id.to_string()
    } else {
        format!("{source_id}{LOOP_MARKER}{index}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_id() {
        let parsed = parse("button_1");
        assert_eq!(parsed.source_id, "button_1");
        assert_eq!(parsed.index, None);
        assert!(parsed.is_primary());
    }

    #[test]
    fn test_instance_id_round_trip() {
        let id = instance_id("card", 3);
        assert_eq!(id, "card__loop__3");
        let parsed = parse(&id);
        assert_eq!(parsed.source_id, "card");
        assert_eq!(parsed.index, Some(3));
        assert!(!parsed.is_primary());
        assert_eq!(instance_id("card", 0), "card");
    }

    #[test]
    fn test_rejects_malformed_tails() {
        assert!(!is_instance("card__loop__"));
        assert!(!is_instance("card__loop__01"));
        assert!(!is_instance("card__loop__x"));
        assert!(!is_instance("card__loop__-1"));
        assert!(!is_instance("__loop__2"));
        assert_eq!(source_id("__loop__2"), "__loop__2");
    }

    #[test]
    fn test_zero_index_is_primary() {
        let parsed = parse("card__loop__0");
        assert_eq!(parsed.index, Some(0));
        assert!(parsed.is_primary());
    }
}
