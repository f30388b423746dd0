use crate::FHashMap;

/// PRCS revision id to git commit, in conversion order. Entries are never
/// replaced or removed.
pub(super) struct RevisionMap {
    entries: Vec<(String, gix_hash::ObjectId)>,
    index: FHashMap<String, usize>,
}

impl RevisionMap {
    pub(super) fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: FHashMap::default(),
        }
    }

    /// Returns `false` (and keeps the existing entry) if `rev` was already
    /// recorded.
    pub(super) fn insert(&mut self, rev: &str, commit: gix_hash::ObjectId) -> bool {
        if self.index.contains_key(rev) {
            return false;
        }
        self.index.insert(rev.into(), self.entries.len());
        self.entries.push((rev.into(), commit));
        true
    }

    pub(super) fn get(&self, rev: &str) -> Option<gix_hash::ObjectId> {
        self.index.get(rev).map(|&i| self.entries[i].1)
    }

    #[inline]
    pub(super) fn contains(&self, rev: &str) -> bool {
        self.index.contains_key(rev)
    }

    #[inline]
    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(super) fn iter(&self) -> impl Iterator<Item = (&str, gix_hash::ObjectId)> + '_ {
        self.entries
            .iter()
            .map(|(rev, commit)| (rev.as_str(), *commit))
    }
}

#[cfg(test)]
mod tests {
    use super::RevisionMap;

    fn oid(n: u32) -> gix_hash::ObjectId {
        gix_hash::ObjectId::from_hex(format!("{n:040x}").as_bytes()).unwrap()
    }

    #[test]
    fn test_append_only() {
        let mut map = RevisionMap::new();
        assert!(map.insert("0.1", oid(1)));
        assert!(map.insert("0.2", oid(2)));
        assert!(!map.insert("0.1", oid(3)));

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("0.1"), Some(oid(1)));
        assert!(map.contains("0.2"));
        assert!(!map.contains("0.3"));
        assert_eq!(
            map.iter().collect::<Vec<_>>(),
            vec![("0.1", oid(1)), ("0.2", oid(2))],
        );
    }
}
