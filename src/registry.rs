//! Language registry
//!
//! Caches the language set announced by the server and drives the selector.
//! Row 0 of the selector is "no language"; rows 1.. are the languages in
//! announced order.

use crate::list::ListState;
use crate::models::Language;

#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    languages: Vec<Language>,
    selected: Option<String>,
    /// Selector cursor, one row per language plus the "none" row
    pub list: ListState,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self {
            list: ListState::new(1),
            ..Self::default()
        }
    }

    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&Language> {
        self.languages.iter().find(|l| l.code == code)
    }

    pub fn is_offered(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn selected(&self) -> Option<&Language> {
        self.selected.as_deref().and_then(|code| self.get(code))
    }

    pub fn selected_code(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Replace the language set wholesale.
    ///
    /// The current selection survives if still offered; otherwise the first
    /// offered entry of `preferred` is restored. Returns the selection after
    /// the update.
    pub fn update(&mut self, languages: Vec<Language>, preferred: &[Option<&str>]) -> Option<&str> {
        self.languages = languages;

        let keep = self
            .selected
            .as_deref()
            .filter(|code| self.is_offered(code))
            .map(String::from);

        self.selected = keep.or_else(|| {
            preferred
                .iter()
                .flatten()
                .find(|code| self.is_offered(code))
                .map(|code| code.to_string())
        });

        self.list.set_len(self.languages.len() + 1);
        self.sync_cursor();
        self.selected.as_deref()
    }

    /// Select a language by code (`None` clears). Returns `true` when the
    /// selection changed; codes not offered are refused.
    pub fn select(&mut self, code: Option<&str>) -> bool {
        if let Some(code) = code {
            if !self.is_offered(code) {
                return false;
            }
        }
        if self.selected.as_deref() == code {
            return false;
        }
        self.selected = code.map(String::from);
        self.sync_cursor();
        true
    }

    /// Language code under the selector cursor (`None` for the "none" row)
    pub fn highlighted(&self) -> Option<&str> {
        match self.list.selected {
            0 => None,
            i => self.languages.get(i - 1).map(|l| l.code.as_str()),
        }
    }

    /// Move the selector cursor onto the current selection
    pub fn sync_cursor(&mut self) {
        let row = self
            .selected
            .as_deref()
            .and_then(|code| self.languages.iter().position(|l| l.code == code))
            .map(|i| i + 1)
            .unwrap_or(0);
        self.list.select(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn langs() -> Vec<Language> {
        vec![
            Language::new("en", "English").with_flag("🇺🇸"),
            Language::new("ja", "Japanese"),
            Language::new("zh", "Chinese"),
        ]
    }

    #[test]
    fn test_update_restores_persisted() {
        let mut reg = LanguageRegistry::new();
        let selected = reg.update(langs(), &[Some("ja")]);
        assert_eq!(selected, Some("ja"));
        assert_eq!(reg.list.selected, 2);
        assert_eq!(reg.list.len, 4);
    }

    #[test]
    fn test_update_ignores_unoffered_preference() {
        let mut reg = LanguageRegistry::new();
        assert_eq!(reg.update(langs(), &[Some("fr"), None]), None);
        assert_eq!(reg.list.selected, 0);
    }

    #[test]
    fn test_update_preference_order() {
        let mut reg = LanguageRegistry::new();
        assert_eq!(reg.update(langs(), &[Some("fr"), Some("zh"), Some("en")]), Some("zh"));
    }

    #[test]
    fn test_update_keeps_current_selection() {
        let mut reg = LanguageRegistry::new();
        reg.update(langs(), &[]);
        assert!(reg.select(Some("zh")));
        assert_eq!(reg.update(langs(), &[Some("en")]), Some("zh"));
    }

    #[test]
    fn test_update_drops_withdrawn_selection() {
        let mut reg = LanguageRegistry::new();
        reg.update(langs(), &[Some("zh")]);
        let reduced = vec![Language::new("en", "English")];
        assert_eq!(reg.update(reduced, &[]), None);
        assert!(reg.selected().is_none());
    }

    #[test]
    fn test_select() {
        let mut reg = LanguageRegistry::new();
        reg.update(langs(), &[]);

        assert!(!reg.select(Some("ko")));
        assert!(reg.select(Some("en")));
        assert!(!reg.select(Some("en")));
        assert_eq!(reg.selected().unwrap().name, "English");
        assert!(reg.select(None));
        assert_eq!(reg.selected_code(), None);
    }

    #[test]
    fn test_highlighted_rows() {
        let mut reg = LanguageRegistry::new();
        reg.update(langs(), &[]);
        assert_eq!(reg.highlighted(), None);
        reg.list.down();
        assert_eq!(reg.highlighted(), Some("en"));
        reg.list.last();
        assert_eq!(reg.highlighted(), Some("zh"));
    }
}
