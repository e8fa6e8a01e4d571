use std::collections::{BTreeMap, BTreeSet};

/// The bijection between the rooms observed in a run and contiguous indices `0..k`.
///
/// Indices are assigned following the lexicographic order of the distinct room names, so the
/// same set of rooms always yields the same assignment no matter the order they were seen in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSpace {
    idx_to_room: Vec<String>,
    room_to_idx: BTreeMap<String, usize>,
}

impl LabelSpace {
    /// Builds the label space from every observed target.
    pub fn from_targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = targets
            .into_iter()
            .map(|target| target.as_ref().to_string())
            .collect();

        let idx_to_room: Vec<String> = distinct.into_iter().collect();
        let room_to_idx = idx_to_room
            .iter()
            .enumerate()
            .map(|(idx, room)| (room.clone(), idx))
            .collect();

        Self {
            idx_to_room,
            room_to_idx,
        }
    }

    /// The amount of classes, `k`.
    pub fn len(&self) -> usize {
        self.idx_to_room.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idx_to_room.is_empty()
    }

    pub fn index(&self, room: &str) -> Option<usize> {
        self.room_to_idx.get(room).copied()
    }

    pub fn room(&self, idx: usize) -> Option<&str> {
        self.idx_to_room.get(idx).map(String::as_str)
    }

    /// The rooms in index order.
    pub fn rooms(&self) -> &[String] {
        &self.idx_to_room
    }

    pub fn room_to_idx(&self) -> &BTreeMap<String, usize> {
        &self.room_to_idx
    }

    /// The index to room mapping, keyed by index.
    pub fn idx_to_room(&self) -> BTreeMap<usize, String> {
        self.idx_to_room.iter().cloned().enumerate().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_lexicographic_order() {
        let labels = LabelSpace::from_targets(["office", "hall", "kitchen", "hall"]);

        let expected: BTreeMap<String, usize> = [("hall", 0), ("kitchen", 1), ("office", 2)]
            .into_iter()
            .map(|(room, idx)| (room.to_string(), idx))
            .collect();

        assert_eq!(labels.room_to_idx(), &expected);
        assert_eq!(labels.len(), 3);
    }

    #[test]
    fn assignment_is_independent_of_input_order() {
        let a = LabelSpace::from_targets(["kitchen", "hall", "office"]);
        let b = LabelSpace::from_targets(["office", "office", "kitchen", "hall"]);
        assert_eq!(a, b);
    }

    #[test]
    fn both_directions_agree() {
        let labels = LabelSpace::from_targets(["b", "c", "a"]);

        for (idx, room) in labels.idx_to_room() {
            assert_eq!(labels.index(&room), Some(idx));
            assert_eq!(labels.room(idx), Some(room.as_str()));
        }
        assert_eq!(labels.room(3), None);
        assert_eq!(labels.index("z"), None);
    }

    #[test]
    fn no_targets_no_labels() {
        let labels = LabelSpace::from_targets(Vec::<String>::new());
        assert!(labels.is_empty());
    }
}
