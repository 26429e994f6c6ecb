//! Document-level types.

use super::Page;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A document whose pages are being reconstructed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Path of the source PDF, handed to the table extractor
    pub source: PathBuf,

    /// Pages in the document
    pub pages: Vec<Page>,
}

impl Document {
    /// Create a new empty document for a source file.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            pages: Vec::new(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Get the number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Get a page by number (1-indexed).
    pub fn get_page(&self, page_num: u32) -> Option<&Page> {
        if page_num == 0 {
            return None;
        }
        self.pages.get((page_num - 1) as usize)
    }

    /// Get a mutable page by number (1-indexed).
    pub fn get_page_mut(&mut self, page_num: u32) -> Option<&mut Page> {
        if page_num == 0 {
            return None;
        }
        self.pages.get_mut((page_num - 1) as usize)
    }

    /// Add a page to the document.
    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Check if the document has any pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
