//! The small persisted preferences: recently loaded roots and the theme.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How many distinct roots the history keeps.
pub const HISTORY_CAPACITY: usize = 5;

/// Most-recent-first list of distinct root paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct PathHistory(Vec<String>);

impl PathHistory {
    /// Moves `path` to the front, dropping older duplicates and overflow.
    ///
    /// Blank paths are ignored. Returns `true` if the history changed.
    pub fn push(&mut self, path: &str) -> bool {
        if path.trim().is_empty() {
            return false;
        }
        if self.0.first().map(String::as_str) == Some(path) {
            return false;
        }
        self.0.retain(|existing| existing != path);
        self.0.insert(0, path.to_string());
        self.0.truncate(HISTORY_CAPACITY);
        true
    }

    /// Returns the entry at `index` (0 is the most recent).
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for PathHistory {
    /// Normalizes a stored list through [`PathHistory::push`] so a hand-edited
    /// file cannot break the capacity or uniqueness rules.
    fn from(paths: Vec<String>) -> Self {
        let mut history = PathHistory::default();
        for path in paths.iter().rev() {
            history.push(path);
        }
        history
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggle(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => f.write_str("light"),
            Theme::Dark => f.write_str("dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{other}' (expected 'light' or 'dark')")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_keeps_most_recent_first_and_unique() {
        let mut history = PathHistory::default();
        for path in ["/a", "/b", "/c"] {
            history.push(path);
        }
        assert!(history.push("/a"));
        assert_eq!(history.entries(), ["/a", "/c", "/b"]);
        assert!(!history.push("/a"));
    }

    #[test]
    fn push_caps_at_five() {
        let mut history = PathHistory::default();
        for i in 0..8 {
            history.push(&format!("/p{i}"));
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.get(0), Some("/p7"));
        assert_eq!(history.get(4), Some("/p3"));
    }

    #[test]
    fn blank_paths_are_ignored() {
        let mut history = PathHistory::default();
        assert!(!history.push("   "));
        assert!(history.is_empty());
    }

    #[test]
    fn stored_list_is_normalized() {
        let stored = vec!["/a", "/b", "/a", "/c", "/d", "/e", "/f"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let history = PathHistory::from(stored);
        assert_eq!(history.entries(), ["/a", "/b", "/c", "/d", "/e"]);
    }

    #[test]
    fn theme_toggles_and_round_trips_through_text() {
        assert_eq!(Theme::Light.toggle(), Theme::Dark);
        assert_eq!(Theme::Dark.toggle(), Theme::Light);
        assert_eq!("DARK".parse::<Theme>(), Ok(Theme::Dark));
        assert_eq!(serde_json::to_string(&Theme::Dark).unwrap(), "\"dark\"");
    }
}
