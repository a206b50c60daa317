//! Selection state for list views

/// Selection state for a scrollable list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListState {
    /// Currently selected index
    pub selected: usize,
    /// Scroll offset for viewport
    pub offset: usize,
    /// Total number of items
    pub len: usize,
}

impl ListState {
    pub fn new(len: usize) -> Self {
        Self {
            selected: 0,
            offset: 0,
            len,
        }
    }

    /// Move selection up
    pub fn up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            if self.selected < self.offset {
                self.offset = self.selected;
            }
        }
    }

    /// Move selection down
    pub fn down(&mut self) {
        if self.len > 0 && self.selected < self.len - 1 {
            self.selected += 1;
        }
    }

    pub fn page_up(&mut self, page_size: usize) {
        self.selected = self.selected.saturating_sub(page_size);
        if self.selected < self.offset {
            self.offset = self.selected;
        }
    }

    pub fn page_down(&mut self, page_size: usize) {
        if self.len > 0 {
            self.selected = (self.selected + page_size).min(self.len - 1);
        }
    }

    /// Jump to first item
    pub fn first(&mut self) {
        self.selected = 0;
        self.offset = 0;
    }

    /// Jump to last item
    pub fn last(&mut self) {
        if self.len > 0 {
            self.selected = self.len - 1;
        }
    }

    /// Update offset to keep selected item visible
    pub fn scroll_into_view(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + visible_height {
            self.offset = self.selected - visible_height + 1;
        }
    }

    pub fn select(&mut self, index: usize) {
        self.selected = if self.len == 0 {
            0
        } else {
            index.min(self.len - 1)
        };
    }

    /// Update length, clamping the selection to the valid range
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        if len == 0 {
            self.selected = 0;
            self.offset = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_state_navigation() {
        let mut list = ListState::new(5);
        assert_eq!(list.selected, 0);

        list.up();
        assert_eq!(list.selected, 0);

        list.down();
        list.down();
        assert_eq!(list.selected, 2);

        list.last();
        list.down();
        assert_eq!(list.selected, 4);

        list.first();
        assert_eq!(list.selected, 0);
    }

    #[test]
    fn test_list_state_pages() {
        let mut list = ListState::new(20);
        list.page_down(8);
        assert_eq!(list.selected, 8);
        list.page_down(100);
        assert_eq!(list.selected, 19);
        list.page_up(5);
        assert_eq!(list.selected, 14);
    }

    #[test]
    fn test_list_state_empty() {
        let mut list = ListState::new(0);
        list.down();
        list.last();
        assert_eq!(list.selected, 0);
        list.select(3);
        assert_eq!(list.selected, 0);
    }

    #[test]
    fn test_list_state_set_len_clamps() {
        let mut list = ListState::new(10);
        list.select(8);
        list.set_len(3);
        assert_eq!(list.selected, 2);
        list.set_len(0);
        assert_eq!(list.selected, 0);
    }

    #[test]
    fn test_scroll_into_view() {
        let mut list = ListState::new(30);
        list.select(12);
        list.scroll_into_view(5);
        assert_eq!(list.offset, 8);
        list.select(2);
        list.scroll_into_view(5);
        assert_eq!(list.offset, 2);
    }
}
