use crate::grouping::GroupMode;
use serde::Deserialize;
use std::collections::BTreeSet;

/// Which statistic drives the fill colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Age,
    Income,
}

/// The complete display state: color mode, group mode, and the set of
/// neighborhoods picked for comparison. Immutable; every transition
/// returns a new value, so the renderer can stay a pure function of
/// (state, data).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub color_mode: ColorMode,
    pub group_mode: GroupMode,
    pub selection: BTreeSet<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            color_mode: ColorMode::Age,
            group_mode: GroupMode::Grouped,
            selection: BTreeSet::new(),
        }
    }
}

impl ViewState {
    pub fn with_color_mode(&self, color_mode: ColorMode) -> Self {
        ViewState {
            color_mode,
            ..self.clone()
        }
    }

    pub fn with_group_mode(&self, group_mode: GroupMode) -> Self {
        ViewState {
            group_mode,
            ..self.clone()
        }
    }

    pub fn toggled_group_mode(&self) -> Self {
        let group_mode = match self.group_mode {
            GroupMode::Grouped => GroupMode::Ungrouped,
            GroupMode::Ungrouped => GroupMode::Grouped,
        };
        self.with_group_mode(group_mode)
    }

    /// Adds the name to the selection, or removes it if already
    /// selected.
    pub fn with_selection_toggled(&self, name: &str) -> Self {
        let mut selection = self.selection.clone();
        if !selection.remove(name) {
            selection.insert(name.to_string());
        }
        ViewState {
            selection,
            ..self.clone()
        }
    }

    pub fn with_selection_cleared(&self) -> Self {
        ViewState {
            selection: BTreeSet::new(),
            ..self.clone()
        }
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.selection.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_do_not_mutate_the_original() {
        let base = ViewState::default();
        let recolored = base.with_color_mode(ColorMode::Income);
        assert_eq!(base.color_mode, ColorMode::Age);
        assert_eq!(recolored.color_mode, ColorMode::Income);
        assert_eq!(recolored.group_mode, base.group_mode);
    }

    #[test]
    fn toggling_group_mode_twice_round_trips() {
        let base = ViewState::default();
        assert_eq!(base.toggled_group_mode().toggled_group_mode(), base);
    }

    #[test]
    fn selection_toggle_adds_then_removes() {
        let base = ViewState::default();
        let one = base.with_selection_toggled("Downtown");
        assert!(one.is_selected("Downtown"));
        assert!(!base.is_selected("Downtown"));

        let none = one.with_selection_toggled("Downtown");
        assert_eq!(none.selection, base.selection);
    }

    #[test]
    fn clearing_empties_the_selection() {
        let picked = ViewState::default()
            .with_selection_toggled("A")
            .with_selection_toggled("B");
        assert_eq!(picked.selection.len(), 2);
        assert!(picked.with_selection_cleared().selection.is_empty());
    }
}
