//! Pure keyword-sniffing function mapping provider response fields to
//! [`RiskTag`]s (spec.md §9 Design Notes).
//!
//! The keyword table is pinned from
//! `original_source/app/providers/blockchair.py`'s tag-derivation logic, the
//! one place SPEC_FULL.md's supplemented-features note calls out by name.
//! Centralizing it here is the point of `TagExtractor`: no other module
//! should do its own substring scanning over provider text.

use crate::model::RiskTag;
use std::collections::BTreeSet;

const KEYWORDS: &[(&str, RiskTag)] = &[
    ("mixer", RiskTag::Mixer),
    ("tumbler", RiskTag::Mixer),
    ("darknet", RiskTag::Darknet),
    ("hack", RiskTag::Hack),
    ("hacker", RiskTag::Hack),
    ("stolen", RiskTag::Hack),
    ("casino", RiskTag::Gambling),
    ("gambling", RiskTag::Gambling),
    ("exchange", RiskTag::Exchange),
    ("whale", RiskTag::Whale),
    ("phishing", RiskTag::Scam),
    ("scam", RiskTag::Scam),
    ("ofac", RiskTag::Sanctioned),
    ("sanctioned", RiskTag::Sanctioned),
    ("ransomware", RiskTag::Ransomware),
    ("ransom", RiskTag::Ransomware),
    ("terrorist", RiskTag::TerroristFinancing),
];

pub struct TagExtractor;

impl TagExtractor {
    /// Scans free-text label/context fields from a provider response and
    /// returns every [`RiskTag`] whose keyword appears as a substring
    /// (case-insensitive).
    pub fn extract<'a>(fields: impl IntoIterator<Item = &'a str>) -> BTreeSet<RiskTag> {
        let mut tags = BTreeSet::new();
        for field in fields {
            let lowered = field.to_lowercase();
            for (keyword, tag) in KEYWORDS {
                if lowered.contains(keyword) {
                    tags.insert(*tag);
                }
            }
        }
        tags
    }
}
