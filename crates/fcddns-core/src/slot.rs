//! Slot markers
//!
//! Ownership of a record is encoded in its free-text comment as
//! `[fcddns-slot:<N>]`. A comment carrying any marker at all makes the record
//! managed; which slots it belongs to is answered by [`SlotTag::carries`],
//! which looks for the exact wire form of the slot's marker. A comment may
//! carry several markers.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static SLOT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[fcddns-slot:\d+\]").expect("slot marker pattern is valid"));

/// Ownership of a record as derived from its comment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotTag<'a> {
    /// No marker: someone else owns the record
    Unmanaged,
    /// Written by fcddns; holds the comment the markers were found in
    Managed(&'a str),
}

impl<'a> SlotTag<'a> {
    /// Classify a record comment
    pub fn parse(comment: Option<&'a str>) -> Self {
        match comment {
            Some(comment) if SLOT_MARKER.is_match(comment) => SlotTag::Managed(comment),
            _ => SlotTag::Unmanaged,
        }
    }

    pub fn is_managed(&self) -> bool {
        matches!(self, SlotTag::Managed(_))
    }

    /// Whether the comment holds the marker of `slot`, verbatim
    pub fn carries(&self, slot: u32) -> bool {
        match self {
            SlotTag::Managed(comment) => comment.contains(&SlotMarker(slot).to_string()),
            SlotTag::Unmanaged => false,
        }
    }
}

/// The wire form of a slot marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotMarker(pub u32);

impl fmt::Display for SlotMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[fcddns-slot:{}]", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_wire_format() {
        assert_eq!(SlotMarker(0).to_string(), "[fcddns-slot:0]");
        assert_eq!(SlotMarker(12).to_string(), "[fcddns-slot:12]");
    }

    #[test]
    fn written_marker_is_carried() {
        let comment = SlotMarker(3).to_string();
        let tag = SlotTag::parse(Some(&comment));
        assert!(tag.is_managed());
        assert!(tag.carries(3));
        assert!(!tag.carries(0));
        assert!(!tag.carries(30));
    }

    #[test]
    fn marker_inside_longer_comment() {
        let tag = SlotTag::parse(Some("home router [fcddns-slot:1] do not edit"));
        assert!(tag.carries(1));
    }

    #[test]
    fn missing_or_foreign_comment_is_unmanaged() {
        assert_eq!(SlotTag::parse(None), SlotTag::Unmanaged);
        assert_eq!(SlotTag::parse(Some("")), SlotTag::Unmanaged);
        assert_eq!(SlotTag::parse(Some("managed by terraform")), SlotTag::Unmanaged);
        assert_eq!(SlotTag::parse(Some("[fcddns-slot:]")), SlotTag::Unmanaged);
        assert_eq!(SlotTag::parse(Some("[fcddns-slot:-1]")), SlotTag::Unmanaged);
        assert!(!SlotTag::Unmanaged.carries(0));
    }

    #[test]
    fn every_marker_in_a_comment_counts() {
        let tag = SlotTag::parse(Some("[fcddns-slot:0][fcddns-slot:1]"));
        assert!(tag.carries(0));
        assert!(tag.carries(1));
        assert!(!tag.carries(2));
    }

    #[test]
    fn overflowing_marker_is_still_managed() {
        let tag = SlotTag::parse(Some("[fcddns-slot:99999999999]"));
        assert!(tag.is_managed());
        assert!(!tag.carries(0));
    }

    #[test]
    fn leading_zero_is_not_the_same_slot() {
        let tag = SlotTag::parse(Some("[fcddns-slot:01]"));
        assert!(tag.is_managed());
        assert!(!tag.carries(1));
        assert!(!tag.carries(0));
    }
}
