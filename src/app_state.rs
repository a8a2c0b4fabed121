//! 界面级的临时状态（搜索框/菜单开关、主题、最近打开的漫画）。
//!
//! 这里只放视图标志，不放任何服务端数据。由 TUI 的 `App` 持有并显式传递。

use std::collections::VecDeque;

const READING_HISTORY_CAP: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub search_open: bool,
    pub menu_open: bool,
    pub theme: Theme,
    pub selected_comic: Option<String>,
    reading_history: VecDeque<String>,
}

impl UiState {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            ..Self::default()
        }
    }

    /// 打开搜索时关闭菜单，两者互斥。
    pub fn toggle_search(&mut self) {
        self.search_open = !self.search_open;
        if self.search_open {
            self.menu_open = false;
        }
    }

    pub fn close_search(&mut self) {
        self.search_open = false;
    }

    pub fn toggle_menu(&mut self) {
        self.menu_open = !self.menu_open;
        if self.menu_open {
            self.search_open = false;
        }
    }

    pub fn close_menu(&mut self) {
        self.menu_open = false;
    }

    pub fn set_selected_comic(&mut self, slug: Option<String>) {
        self.selected_comic = slug;
    }

    /// 最近打开的在最前；重复打开会移到最前而不是追加。
    pub fn add_to_history(&mut self, slug: &str) {
        let slug = slug.trim();
        if slug.is_empty() {
            return;
        }
        self.reading_history.retain(|s| s != slug);
        self.reading_history.push_front(slug.to_string());
        self.reading_history.truncate(READING_HISTORY_CAP);
    }

    pub fn reading_history(&self) -> impl Iterator<Item = &str> {
        self.reading_history.iter().map(String::as_str)
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_and_menu_are_exclusive() {
        let mut ui = UiState::default();
        ui.toggle_menu();
        assert!(ui.menu_open);
        ui.toggle_search();
        assert!(ui.search_open);
        assert!(!ui.menu_open);
        ui.close_search();
        assert!(!ui.search_open);
    }

    #[test]
    fn history_dedups_and_caps() {
        let mut ui = UiState::default();
        ui.add_to_history("a");
        ui.add_to_history("b");
        ui.add_to_history("a");
        ui.add_to_history("  ");
        assert_eq!(ui.reading_history().collect::<Vec<_>>(), vec!["a", "b"]);

        for i in 0..60 {
            ui.add_to_history(&format!("c{i}"));
        }
        let all: Vec<_> = ui.reading_history().collect();
        assert_eq!(all.len(), READING_HISTORY_CAP);
        assert_eq!(all[0], "c59");
    }

    #[test]
    fn theme_toggle() {
        let mut ui = UiState::new(Theme::Light);
        ui.toggle_theme();
        assert_eq!(ui.theme, Theme::Dark);
        ui.set_theme(Theme::Light);
        assert_eq!(ui.theme, Theme::Light);
    }
}
