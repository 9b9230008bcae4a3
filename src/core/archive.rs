/// World archive: a pager over the story's static lore pages.

use crate::core::story::StoryRepository;

/// Page-index state for browsing the world archive. Paging is bounded at
/// both ends; there is no wraparound and no history.
#[derive(Debug, Clone, Default)]
pub struct WorldArchive {
    pages: Vec<String>,
    index: usize,
}

impl WorldArchive {
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages, index: 0 }
    }

    pub fn from_story(story: &StoryRepository) -> Self {
        Self::new(story.world_content().to_vec())
    }

    pub fn current(&self) -> Option<&str> {
        self.pages.get(self.index).map(String::as_str)
    }

    /// Zero-based index of the current page.
    pub fn position(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.pages.len()
    }

    pub fn has_previous(&self) -> bool {
        self.index > 0
    }

    /// Move forward one page. Returns false at the last page.
    pub fn next_page(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Move back one page. Returns false at the first page.
    pub fn previous_page(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.index -= 1;
        true
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    pub fn header(&self) -> String {
        format!("ARCHIVE FILE #{}", self.index + 1)
    }

    pub fn indicator(&self) -> String {
        format!("FILE {} / {}", self.index + 1, self.pages.len())
    }
}
