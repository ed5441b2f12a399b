use std::collections::HashSet;

use crate::model::catalog::Item;

/// Indices of the items currently marked for installation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    selected: HashSet<usize>,
}

impl SelectionSet {
    /// Strips deselect markers in one pass. Unmarked entries start selected.
    pub fn initialize<S: AsRef<str>>(entries: &[S]) -> (Vec<String>, Self) {
        let mut selected = HashSet::with_capacity(entries.len());
        let processed = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let item = Item::parse(entry.as_ref());
                if item.preselected {
                    selected.insert(idx);
                }
                item.display_name
            })
            .collect();

        (processed, Self { selected })
    }

    /// Caller guarantees `index` is within the current list.
    pub fn toggle(&mut self, index: usize) {
        if !self.selected.remove(&index) {
            self.selected.insert(index);
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Selected items in ascending index order. The set itself is unordered,
    /// so the indices are sorted explicitly; out-of-range ones are skipped.
    pub fn materialize<S: AsRef<str>>(&self, items: &[S]) -> Vec<String> {
        let mut indices: Vec<usize> = self
            .selected
            .iter()
            .copied()
            .filter(|&idx| idx < items.len())
            .collect();
        indices.sort_unstable();

        indices
            .into_iter()
            .map(|idx| items[idx].as_ref().to_string())
            .collect()
    }
}
