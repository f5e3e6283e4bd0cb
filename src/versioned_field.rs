use crate::version::Version;
use arrayvec::ArrayVec;

/// A single attribute of a fat node: a base value plus a bounded journal of
/// `(version, value)` records layered on top of it.
///
/// Records are only ever appended, in non-decreasing version order, so every
/// value that was readable at some version stays readable at that version for
/// as long as the field exists. When the journal is full, `set` refuses the
/// write and leaves it to the owner to produce a compacted copy.
#[derive(Debug, Clone)]
pub struct VersionedField<T, const CAP: usize> {
    base: T,
    records: ArrayVec<(Version, T), CAP>,
}

impl<T: Copy, const CAP: usize> VersionedField<T, CAP> {
    pub fn new(base: T) -> Self {
        VersionedField {
            base,
            records: ArrayVec::new(),
        }
    }

    /// The value as of `version`: the record with the greatest version not
    /// after `version`, or the base value if there is none.
    pub fn get(&self, version: Version) -> T {
        let mut value = self.base;
        let mut found: Option<Version> = None;
        for &(at, recorded) in &self.records {
            if at <= version && found.map_or(true, |best| at >= best) {
                value = recorded;
                found = Some(at);
            }
        }
        value
    }

    /// Records `value` at `version`. A second write at the newest recorded
    /// version replaces that record. Returns `false` when the journal has no
    /// free slot.
    #[must_use]
    pub fn set(&mut self, version: Version, value: T) -> bool {
        if let Some(last) = self.records.last_mut() {
            debug_assert!(last.0 <= version, "journal written out of version order");
            if last.0 == version {
                last.1 = value;
                return true;
            }
        }
        self.records.try_push((version, value)).is_ok()
    }

    /// The most recently written value, regardless of version.
    pub fn latest(&self) -> T {
        self.records.last().map_or(self.base, |&(_, value)| value)
    }

    /// A fresh field whose base is the latest value and whose journal is empty.
    pub fn compact(&self) -> Self {
        VersionedField::new(self.latest())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}
