//! Enum-backed class labels
//!
//! The original format ties the class attribute to a fixed application
//! enumeration. Implement [`ClassLabels`] on a plain Rust enum (or any unit
//! type) to register it as an enum-backed nominal attribute.

/// A fixed, named label set with underlying ordinals.
///
/// `LABELS` lists every `(label, ordinal)` pair. Ordinals are the class-id
/// values reported for this attribute; the label whose ordinal is `0` acts
/// as the default rendering for an unset record. Declaration order in the
/// ARFF header is lexicographic by label, regardless of `LABELS` order.
pub trait ClassLabels {
    const LABELS: &'static [(&'static str, i64)];
}
