//! Alias lookup built once per schema.

/// One alias of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    /// Index of the owning field in schema order.
    pub field: usize,
    /// Alias, lowercased.
    pub alias: String,
    /// Alias reduced to lowercase alphanumeric words, single-spaced.
    pub normalized: String,
}

/// An alias occurrence on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliasHit<'a> {
    pub field: usize,
    pub alias: &'a str,
    /// Byte range of the occurrence within the line.
    pub start: usize,
    pub end: usize,
}

/// All aliases of a schema, longest first.
#[derive(Debug, Clone, Default)]
pub struct AliasIndex {
    entries: Vec<AliasEntry>,
}

impl AliasIndex {
    /// Build the index from `(field index, aliases)` pairs.
    pub fn build<'a, I, A>(fields: I) -> Self
    where
        I: IntoIterator<Item = (usize, A)>,
        A: IntoIterator<Item = &'a str>,
    {
        let mut entries: Vec<AliasEntry> = Vec::new();
        for (field, aliases) in fields {
            for alias in aliases {
                let alias = alias.trim().to_lowercase();
                let duplicate = entries.iter().any(|e| e.field == field && e.alias == alias);
                if alias.is_empty() || duplicate {
                    continue;
                }
                entries.push(AliasEntry {
                    field,
                    normalized: normalize_label(&alias),
                    alias,
                });
            }
        }
        entries.sort_by(|a, b| {
            b.alias
                .len()
                .cmp(&a.alias.len())
                .then_with(|| a.field.cmp(&b.field))
                .then_with(|| a.alias.cmp(&b.alias))
        });
        Self { entries }
    }

    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }

    /// Aliases of one field, longest first.
    pub fn for_field(&self, field: usize) -> impl Iterator<Item = &AliasEntry> {
        self.entries.iter().filter(move |e| e.field == field)
    }

    /// Find alias occurrences on a line.
    ///
    /// Matching ignores ASCII case and requires non-alphanumeric characters
    /// (or the line edge) on both sides. Longer aliases claim their span
    /// first; a shorter alias overlapping a claimed span is dropped. The same
    /// alias text shared by two fields yields one hit per field. Hits are
    /// returned in line order.
    pub fn find<'a>(&'a self, line: &str) -> Vec<AliasHit<'a>> {
        let lower = line.to_ascii_lowercase();
        let bytes = lower.as_bytes();
        let mut hits: Vec<AliasHit<'a>> = Vec::new();

        for entry in &self.entries {
            for (start, _) in lower.match_indices(entry.alias.as_str()) {
                let end = start + entry.alias.len();
                let bounded_left = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
                let bounded_right = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
                if !bounded_left || !bounded_right {
                    continue;
                }
                let overlaps = hits.iter().any(|h| {
                    h.start < end && start < h.end && !(h.start == start && h.end == end)
                });
                if overlaps || hits.iter().any(|h| h.field == entry.field && h.start == start) {
                    continue;
                }
                hits.push(AliasHit {
                    field: entry.field,
                    alias: &entry.alias,
                    start,
                    end,
                });
            }
        }

        hits.sort_by_key(|h| (h.start, h.field));
        hits
    }
}

/// Lowercase, keep alphanumeric words, join with single spaces.
pub fn normalize_label(s: &str) -> String {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn index() -> AliasIndex {
        AliasIndex::build([
            (0, vec!["policy no", "policy number"]),
            (1, vec!["insured", "insured name"]),
            (2, vec!["premium", "total premium"]),
            (3, vec!["gross premium", "total amount"]),
            (4, vec!["total amount"]),
        ])
    }

    #[test]
    fn test_longest_alias_wins() {
        let idx = index();
        let hits = idx.find("Insured Name: John Doe");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].field, 1);
        assert_eq!(hits[0].alias, "insured name");
        assert_eq!((hits[0].start, hits[0].end), (0, 12));
    }

    #[test]
    fn test_overlap_suppressed() {
        let idx = index();
        let hits = idx.find("Gross Premium: 1,200");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].field, 3);
    }

    #[test]
    fn test_word_boundaries() {
        let idx = index();
        assert!(idx.find("Uninsured motorist").is_empty());
        assert!(idx.find("Policy Nos").is_empty());
        assert_eq!(idx.find("POLICY NO.").len(), 1);
    }

    #[test]
    fn test_shared_alias_hits_every_field() {
        let idx = index();
        let fields: Vec<usize> = idx.find("Total Amount | 500").iter().map(|h| h.field).collect();
        assert_eq!(fields, vec![3, 4]);
    }

    #[test]
    fn test_multiple_hits_in_line_order() {
        let idx = index();
        let hits = idx.find("Policy No | Insured Name");
        let fields: Vec<usize> = hits.iter().map(|h| h.field).collect();
        assert_eq!(fields, vec![0, 1]);
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  Policy-No. :"), "policy no");
        assert_eq!(normalize_label("Polcy  No"), "polcy no");
    }
}
