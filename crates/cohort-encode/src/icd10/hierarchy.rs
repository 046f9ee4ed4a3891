use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use cohort_ingest::CodingEntry;
use cohort_model::{CohortError, Result, strip_quotes};

/// Published block ranges that omit codes actually used in hospital
/// records, with the range that replaces them.
pub const RANGE_OVERRIDES: [(&str, &str); 4] = [
    ("M20-M25", "M20-M36"),
    ("A80-A89", "A80-A91"),
    ("U00-U49", "U00-U81"),
    ("U82-U85", "U82-U89"),
];

static RANGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z])(\d{2})-([A-Z])(\d{2})$").expect("block range pattern is valid")
});

/// The corrected form of a published range; unchanged when no override applies.
pub fn corrected_range(published: &str) -> &str {
    RANGE_OVERRIDES
        .iter()
        .find(|(from, _)| *from == published)
        .map_or(published, |(_, to)| to)
}

/// A contiguous run of 3-character codes sharing one letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub letter: char,
    pub low: u8,
    pub high: u8,
}

impl BlockRange {
    pub fn parse(raw: &str) -> Result<Self> {
        let captures = RANGE_PATTERN
            .captures(raw)
            .ok_or_else(|| CohortError::hierarchy(format!("malformed block range {raw:?}")))?;
        let letter = |idx: usize| captures[idx].chars().next().unwrap_or_default();
        let number = |idx: usize| {
            captures[idx]
                .parse::<u8>()
                .map_err(|_| CohortError::hierarchy(format!("malformed block range {raw:?}")))
        };
        let (start_letter, end_letter) = (letter(1), letter(3));
        let (low, high) = (number(2)?, number(4)?);
        if start_letter != end_letter {
            return Err(CohortError::hierarchy(format!(
                "block range {raw:?} spans two letters"
            )));
        }
        if low > high {
            return Err(CohortError::hierarchy(format!(
                "block range {raw:?} ends before it starts"
            )));
        }
        Ok(Self {
            letter: start_letter,
            low,
            high,
        })
    }

    /// Every 3-character code in the range, inclusive.
    pub fn codes(&self) -> impl Iterator<Item = String> + '_ {
        (self.low..=self.high).map(|number| format!("{}{number:02}", self.letter))
    }

    pub fn contains(&self, other: &BlockRange) -> bool {
        self.letter == other.letter && self.low <= other.low && other.high <= self.high
    }

    /// Whether one range lies entirely inside the other.
    pub fn nests_with(&self, other: &BlockRange) -> bool {
        self.contains(other) || other.contains(self)
    }
}

impl fmt::Display for BlockRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{0}{1:02}-{0}{2:02}", self.letter, self.low, self.high)
    }
}

/// Two-level lookup from 3-character codes to output categories.
#[derive(Debug, Clone, Default)]
pub struct CodeHierarchy {
    level1_categories: Vec<String>,
    level1_lookup: BTreeMap<String, usize>,
    level2_categories: Vec<String>,
    level2_lookup: BTreeMap<String, usize>,
    applied_overrides: Vec<String>,
}

impl CodeHierarchy {
    /// Block labels that kept at least one code, in the order their first
    /// code was produced.
    pub fn level1_categories(&self) -> &[String] {
        &self.level1_categories
    }

    pub fn level2_categories(&self) -> &[String] {
        &self.level2_categories
    }

    pub fn level1_index(&self, code: &str) -> Option<usize> {
        self.level1_lookup.get(code).copied()
    }

    pub fn level1_category(&self, code: &str) -> Option<&str> {
        self.level1_index(code)
            .map(|idx| self.level1_categories[idx].as_str())
    }

    pub fn level2_index(&self, code: &str) -> Option<usize> {
        self.level2_lookup.get(code).copied()
    }

    /// Number of 3-character codes covered by level 1.
    pub fn expanded_code_count(&self) -> usize {
        self.level1_lookup.len()
    }

    /// Published ranges that were replaced while building.
    pub fn applied_overrides(&self) -> &[String] {
        &self.applied_overrides
    }
}

/// Build the hierarchy from coding entries.
///
/// Entries whose coding mentions "Block" define level 1: the second word is
/// the range, corrected through [`RANGE_OVERRIDES`] and expanded into its
/// 3-character codes. A later block nested in (or around) an earlier one
/// takes over the codes they share, so chapter-wide blocks yield to the
/// specific ones listed after them. Entries whose coding is exactly three
/// characters define level 2. Everything else (chapters, 4-character codes)
/// is ignored.
pub fn build_hierarchy(entries: &[CodingEntry]) -> Result<CodeHierarchy> {
    let mut hierarchy = CodeHierarchy::default();
    let mut code_order: Vec<String> = Vec::new();
    let mut assigned: BTreeMap<String, BlockRange> = BTreeMap::new();
    let mut blocks: Vec<BlockRange> = Vec::new();

    for entry in entries {
        let coding = strip_quotes(entry.coding.trim());
        if coding.contains("Block") || coding.contains("block") {
            let published = coding.split_whitespace().nth(1).ok_or_else(|| {
                CohortError::hierarchy(format!("block entry {coding:?} has no range"))
            })?;
            let corrected = corrected_range(published);
            if corrected != published {
                debug!(published, corrected, "block range corrected");
                hierarchy
                    .applied_overrides
                    .push(format!("{published} -> {corrected}"));
            }
            let range = BlockRange::parse(corrected)?;
            if !blocks.contains(&range) {
                blocks.push(range);
            }
            for code in range.codes() {
                match assigned.get(&code).copied() {
                    None => code_order.push(code.clone()),
                    Some(existing) if existing.nests_with(&range) => {}
                    Some(existing) => {
                        return Err(CohortError::hierarchy(format!(
                            "blocks {existing} and {range} partially overlap at {code}"
                        )));
                    }
                }
                assigned.insert(code, range);
            }
        } else if coding.chars().count() == 3 && !hierarchy.level2_lookup.contains_key(coding) {
            hierarchy
                .level2_lookup
                .insert(coding.to_string(), hierarchy.level2_categories.len());
            hierarchy.level2_categories.push(coding.to_string());
        }
    }

    if blocks.is_empty() {
        return Err(CohortError::hierarchy("coding table defines no blocks"));
    }
    let mut label_index: BTreeMap<String, usize> = BTreeMap::new();
    for code in code_order {
        let Some(range) = assigned.get(&code) else {
            continue;
        };
        let label = range.to_string();
        let next = label_index.len();
        let category = *label_index.entry(label.clone()).or_insert(next);
        if category == next {
            hierarchy.level1_categories.push(label);
        }
        hierarchy.level1_lookup.insert(code, category);
    }
    let superseded = blocks.len() - hierarchy.level1_categories.len();
    if superseded > 0 {
        debug!(superseded, "blocks fully covered by nested blocks");
    }
    let uncovered: Vec<&str> = hierarchy
        .level2_categories
        .iter()
        .map(String::as_str)
        .filter(|code| !hierarchy.level1_lookup.contains_key(*code))
        .collect();
    if !uncovered.is_empty() {
        let sample: Vec<&str> = uncovered.iter().take(10).copied().collect();
        return Err(CohortError::hierarchy(format!(
            "{} 3-character codes fall outside every block: {}",
            uncovered.len(),
            sample.join(", ")
        )));
    }

    info!(
        level1_categories = hierarchy.level1_categories.len(),
        level2_categories = hierarchy.level2_categories.len(),
        expanded_codes = hierarchy.expanded_code_count(),
        overrides = hierarchy.applied_overrides.len(),
        "diagnosis hierarchy built"
    );
    Ok(hierarchy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(rows: &[(&str, &str)]) -> Vec<CodingEntry> {
        rows.iter()
            .map(|(coding, meaning)| CodingEntry {
                coding: (*coding).to_string(),
                meaning: (*meaning).to_string(),
            })
            .collect()
    }

    #[test]
    fn builds_both_levels() {
        let hierarchy = build_hierarchy(&entries(&[
            ("Chapter IX", "Diseases of the circulatory system"),
            ("Block I20-I25", "Ischaemic heart diseases"),
            ("I21", "Acute myocardial infarction"),
            ("I210", "Acute transmural myocardial infarction of anterior wall"),
            ("Block E10-E14", "Diabetes mellitus"),
            ("E11", "Non-insulin-dependent diabetes mellitus"),
        ]))
        .unwrap();
        assert_eq!(hierarchy.level1_categories(), ["I20-I25", "E10-E14"]);
        assert_eq!(hierarchy.level2_categories(), ["I21", "E11"]);
        assert_eq!(hierarchy.level1_category("I23"), Some("I20-I25"));
        assert_eq!(hierarchy.level1_category("I26"), None);
        assert_eq!(hierarchy.expanded_code_count(), 11);
    }

    #[test]
    fn overrides_extend_published_ranges() {
        let hierarchy = build_hierarchy(&entries(&[
            ("Block M20-M25", "Other joint disorders"),
            ("Block U82-U85", "Resistance to antimicrobial drugs"),
            ("M30", "Polyarteritis nodosa"),
        ]))
        .unwrap();
        assert_eq!(hierarchy.level1_categories(), ["M20-M36", "U82-U89"]);
        assert_eq!(hierarchy.level1_category("M30"), Some("M20-M36"));
        assert_eq!(hierarchy.level1_category("U88"), Some("U82-U89"));
        assert_eq!(hierarchy.applied_overrides().len(), 2);
        for (from, to) in RANGE_OVERRIDES {
            assert_eq!(corrected_range(from), to);
        }
    }

    #[test]
    fn partially_overlapping_blocks_are_rejected() {
        let error = build_hierarchy(&entries(&[
            ("Block I20-I25", "Ischaemic heart diseases"),
            ("Block I25-I28", "Overlapping"),
        ]))
        .unwrap_err();
        assert!(matches!(error, CohortError::Hierarchy { .. }));
        assert!(error.to_string().contains("I25"));
    }

    #[test]
    fn nested_blocks_yield_to_the_later_block() {
        let hierarchy = build_hierarchy(&entries(&[
            ("Chapter II", "Neoplasms"),
            ("Block C00-C97", "Malignant neoplasms"),
            ("Block C00-C75", "Malignant neoplasms, stated or presumed to be primary"),
            ("Block C00-C14", "Lip, oral cavity and pharynx"),
            ("C00", "Malignant neoplasm of lip"),
            ("Block C15-C26", "Digestive organs"),
            ("C15", "Malignant neoplasm of oesophagus"),
        ]))
        .unwrap();
        assert_eq!(
            hierarchy.level1_categories(),
            ["C00-C14", "C15-C26", "C00-C75", "C00-C97"]
        );
        assert_eq!(hierarchy.level1_category("C00"), Some("C00-C14"));
        assert_eq!(hierarchy.level1_category("C15"), Some("C15-C26"));
        assert_eq!(hierarchy.level1_category("C50"), Some("C00-C75"));
        assert_eq!(hierarchy.level1_category("C90"), Some("C00-C97"));
        assert_eq!(hierarchy.expanded_code_count(), 98);
    }

    #[test]
    fn fully_covered_block_has_no_category() {
        let hierarchy = build_hierarchy(&entries(&[
            ("Block D50-D53", "Nutritional anaemias"),
            ("Block D50-D51", "Deficiency anaemias"),
            ("Block D52-D53", "Other nutritional anaemias"),
            ("D50", "Iron deficiency anaemia"),
        ]))
        .unwrap();
        assert_eq!(hierarchy.level1_categories(), ["D50-D51", "D52-D53"]);
        assert_eq!(hierarchy.level1_category("D50"), Some("D50-D51"));
    }

    #[test]
    fn repeated_block_is_not_an_overlap() {
        let hierarchy = build_hierarchy(&entries(&[
            ("Block I20-I25", "Ischaemic heart diseases"),
            ("Block I20-I25", "Ischaemic heart diseases"),
        ]))
        .unwrap();
        assert_eq!(hierarchy.level1_categories().len(), 1);
    }

    #[test]
    fn uncovered_level2_code_is_rejected() {
        let error = build_hierarchy(&entries(&[
            ("Block I20-I25", "Ischaemic heart diseases"),
            ("M30", "Polyarteritis nodosa"),
        ]))
        .unwrap_err();
        assert!(error.to_string().contains("M30"));
    }

    #[test]
    fn malformed_ranges_are_rejected() {
        for raw in ["I2-I25", "I25-I20", "A00-B99", "i20-i25"] {
            assert!(BlockRange::parse(raw).is_err(), "{raw} should not parse");
        }
        let range = BlockRange::parse("C00-C02").unwrap();
        assert_eq!(range.codes().collect::<Vec<_>>(), ["C00", "C01", "C02"]);
        assert!(build_hierarchy(&entries(&[("Block", "no range")])).is_err());
    }
}
