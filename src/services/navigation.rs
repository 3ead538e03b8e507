//! Back/forward navigation history.
//!
//! Three slots: `back` (most recently left at the tail), `current`, and
//! `forward` (most recently undone at the tail). Together they always form
//! a gap-free chronological ordering:
//!
//! ```text
//! back[0] .. back[n-1], current, forward[m-1] .. forward[0]
//! ```
//!
//! A new destination clears `forward`, like a browser.

use crate::models::{LocationInfo, Navigation};
use std::collections::VecDeque;
use tracing::debug;

/// Default bound on each stack.
pub const DEFAULT_MAX_NAVIGATION_DEPTH: usize = 100;

/// Back/forward history stacks for the navigation bar.
#[derive(Debug, Clone)]
pub struct NavigationHistoryStacks {
    back: VecDeque<LocationInfo>,
    current: Option<LocationInfo>,
    forward: VecDeque<LocationInfo>,
    max_depth: usize,
}

impl Default for NavigationHistoryStacks {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NAVIGATION_DEPTH)
    }
}

impl NavigationHistoryStacks {
    /// Creates empty stacks bounded to `max_depth` entries each.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            back: VecDeque::new(),
            current: None,
            forward: VecDeque::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Applies a navigation. Returns `true` if `current` changed.
    ///
    /// `Back` and `Forward` are no-ops when the matching stack is empty.
    pub fn navigate(&mut self, navigation: Navigation) -> bool {
        let kind = navigation.kind();
        let changed = match navigation {
            Navigation::Direct(to) => self.visit(to),
            Navigation::Back => self.go_back(),
            Navigation::Forward => self.go_forward(),
            Navigation::HistoryPick(to) => self.pick(to),
        };

        if changed {
            metrics::counter!("navigation_total", "via" => kind).increment(1);
            debug!(
                via = kind,
                back = self.back.len(),
                forward = self.forward.len(),
                "Navigation applied"
            );
        }
        changed
    }

    fn visit(&mut self, to: LocationInfo) -> bool {
        if self.current.as_ref() == Some(&to) {
            return false;
        }
        if let Some(previous) = self.current.replace(to) {
            Self::push_bounded(&mut self.back, previous, self.max_depth);
        }
        self.forward.clear();
        true
    }

    fn go_back(&mut self) -> bool {
        let Some(previous) = self.back.pop_back() else {
            return false;
        };
        if let Some(current) = self.current.replace(previous) {
            Self::push_bounded(&mut self.forward, current, self.max_depth);
        }
        true
    }

    fn go_forward(&mut self) -> bool {
        let Some(next) = self.forward.pop_back() else {
            return false;
        };
        if let Some(current) = self.current.replace(next) {
            Self::push_bounded(&mut self.back, current, self.max_depth);
        }
        true
    }

    /// Jumps to `to` inside the existing chain, keeping everything around it.
    fn pick(&mut self, to: LocationInfo) -> bool {
        let ordered = self.ordered();
        let Some(current_index) = self.current.as_ref().map(|_| self.back.len()) else {
            return self.visit(to);
        };

        // Nearest occurrence to the current position; ties go backwards.
        let target = ordered
            .iter()
            .enumerate()
            .filter(|(_, loc)| **loc == to)
            .min_by_key(|(i, _)| (i.abs_diff(current_index), *i > current_index))
            .map(|(i, _)| i);

        let Some(target) = target else {
            return self.visit(to);
        };
        if target == current_index {
            return false;
        }

        let mut ordered = ordered;
        let later = ordered.split_off(target + 1);
        let picked = ordered.pop();
        self.back = ordered.into_iter().collect();
        self.forward = later.into_iter().rev().collect();
        self.current = picked;
        true
    }

    fn push_bounded(stack: &mut VecDeque<LocationInfo>, location: LocationInfo, max: usize) {
        if stack.back() == Some(&location) {
            return;
        }
        stack.push_back(location);
        while stack.len() > max {
            stack.pop_front();
        }
    }

    /// Chronological snapshot: back, current, then forward.
    #[must_use]
    pub fn ordered(&self) -> Vec<LocationInfo> {
        self.back
            .iter()
            .chain(self.current.iter())
            .chain(self.forward.iter().rev())
            .cloned()
            .collect()
    }

    /// Current location.
    #[must_use]
    pub const fn current(&self) -> Option<&LocationInfo> {
        self.current.as_ref()
    }

    /// Back stack, oldest first.
    #[must_use]
    pub const fn back(&self) -> &VecDeque<LocationInfo> {
        &self.back
    }

    /// Forward stack, most recently undone last.
    #[must_use]
    pub const fn forward(&self) -> &VecDeque<LocationInfo> {
        &self.forward
    }

    /// Whether the back button is enabled.
    #[must_use]
    pub fn can_go_back(&self) -> bool {
        !self.back.is_empty()
    }

    /// Whether the forward button is enabled.
    #[must_use]
    pub fn can_go_forward(&self) -> bool {
        !self.forward.is_empty()
    }

    /// Drops both stacks, keeping the current location.
    pub fn clear(&mut self) {
        self.back.clear();
        self.forward.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegionPosition;

    fn loc(name: &str) -> LocationInfo {
        LocationInfo::new(name, RegionPosition::new(128.0, 128.0, 20.0))
    }

    fn names(stack: &VecDeque<LocationInfo>) -> Vec<&str> {
        stack.iter().map(LocationInfo::region_name).collect()
    }

    fn stacks_at(back: &[&str], current: &str, forward: &[&str]) -> NavigationHistoryStacks {
        let mut stacks = NavigationHistoryStacks::default();
        stacks.back = back.iter().map(|n| loc(n)).collect();
        stacks.current = Some(loc(current));
        stacks.forward = forward.iter().map(|n| loc(n)).collect();
        stacks
    }

    #[test]
    fn test_direct_pushes_current_and_clears_forward() {
        let mut stacks = stacks_at(&["A"], "B", &["C"]);
        assert!(stacks.navigate(Navigation::Direct(loc("D"))));
        assert_eq!(names(stacks.back()), vec!["A", "B"]);
        assert_eq!(stacks.current(), Some(&loc("D")));
        assert!(stacks.forward().is_empty());
    }

    #[test]
    fn test_first_direct_sets_current_only() {
        let mut stacks = NavigationHistoryStacks::default();
        assert!(stacks.navigate(Navigation::Direct(loc("A"))));
        assert!(!stacks.can_go_back());
        assert_eq!(stacks.current(), Some(&loc("A")));
    }

    #[test]
    fn test_direct_to_same_place_is_noop() {
        let mut stacks = stacks_at(&["A"], "B", &[]);
        assert!(!stacks.navigate(Navigation::Direct(loc("B"))));
        assert_eq!(names(stacks.back()), vec!["A"]);
    }

    #[test]
    fn test_back() {
        let mut stacks = stacks_at(&["A", "B"], "C", &[]);
        assert!(stacks.navigate(Navigation::Back));
        assert_eq!(stacks.current(), Some(&loc("B")));
        assert_eq!(names(stacks.back()), vec!["A"]);
        assert_eq!(names(stacks.forward()), vec!["C"]);
    }

    #[test]
    fn test_back_then_forward_restores() {
        let mut stacks = stacks_at(&["A", "B"], "C", &["E", "D"]);
        let before = stacks.clone();
        assert!(stacks.navigate(Navigation::Back));
        assert!(stacks.navigate(Navigation::Forward));
        assert_eq!(stacks.current(), before.current());
        assert_eq!(names(stacks.back()), names(before.back()));
        assert_eq!(names(stacks.forward()), names(before.forward()));
    }

    #[test]
    fn test_back_and_forward_noop_when_empty() {
        let mut stacks = stacks_at(&[], "A", &[]);
        assert!(!stacks.navigate(Navigation::Back));
        assert!(!stacks.navigate(Navigation::Forward));
        assert_eq!(stacks.current(), Some(&loc("A")));
    }

    #[test]
    fn test_pick_partitions_chain() {
        // Chronological: A B C [D] E F
        let mut stacks = stacks_at(&["A", "B", "C"], "D", &["F", "E"]);
        assert!(stacks.navigate(Navigation::HistoryPick(loc("B"))));
        assert_eq!(names(stacks.back()), vec!["A"]);
        assert_eq!(stacks.current(), Some(&loc("B")));
        // Next forward (tail) is C.
        assert_eq!(names(stacks.forward()), vec!["F", "E", "D", "C"]);
        let ordered: Vec<_> = stacks.ordered().iter().map(|l| l.region_name().to_string()).collect();
        assert_eq!(ordered, vec!["A", "B", "C", "D", "E", "F"]);
    }

    #[test]
    fn test_pick_forward_entry() {
        let mut stacks = stacks_at(&["A"], "B", &["D", "C"]);
        assert!(stacks.navigate(Navigation::HistoryPick(loc("D"))));
        assert_eq!(names(stacks.back()), vec!["A", "B", "C"]);
        assert!(stacks.forward().is_empty());
    }

    #[test]
    fn test_pick_unknown_behaves_as_direct() {
        let mut stacks = stacks_at(&["A"], "B", &["C"]);
        assert!(stacks.navigate(Navigation::HistoryPick(loc("Z"))));
        assert_eq!(names(stacks.back()), vec!["A", "B"]);
        assert!(stacks.forward().is_empty());
    }

    #[test]
    fn test_pick_current_is_noop() {
        let mut stacks = stacks_at(&["A"], "B", &["C"]);
        assert!(!stacks.navigate(Navigation::HistoryPick(loc("B"))));
    }

    #[test]
    fn test_depth_is_bounded() {
        let mut stacks = NavigationHistoryStacks::new(2);
        for name in ["A", "B", "C", "D"] {
            stacks.navigate(Navigation::Direct(loc(name)));
        }
        assert_eq!(names(stacks.back()), vec!["B", "C"]);
    }

    #[test]
    fn test_clear_keeps_current() {
        let mut stacks = stacks_at(&["A"], "B", &["C"]);
        stacks.clear();
        assert!(!stacks.can_go_back());
        assert!(!stacks.can_go_forward());
        assert_eq!(stacks.current(), Some(&loc("B")));
    }
}
