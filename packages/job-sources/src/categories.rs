//! Category keyword tables.
//!
//! A table maps an integer category id to the keywords that describe it.
//! Tables are built once at startup and shared read-only.

use std::collections::BTreeMap;

use crate::error::CategoryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryKeywords {
    entries: BTreeMap<i64, Vec<String>>,
}

impl CategoryKeywords {
    pub fn builder() -> CategoryKeywordsBuilder {
        CategoryKeywordsBuilder::default()
    }

    /// Keywords for a category, lowercased and trimmed.
    pub fn keywords(&self, category_id: i64) -> Option<&[String]> {
        self.entries.get(&category_id).map(Vec::as_slice)
    }

    pub fn category_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &[String])> {
        self.entries.iter().map(|(id, kws)| (*id, kws.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CategoryKeywords {
    /// The job board's standard categories.
    fn default() -> Self {
        let table: [(i64, &[&str]); 8] = [
            (1, &["software", "developer", "engineer", "backend", "frontend", "full stack", "devops"]),
            (2, &["design", "designer", "ux", "ui", "product design"]),
            (3, &["product manager", "product owner", "roadmap"]),
            (4, &["marketing", "seo", "content", "growth"]),
            (5, &["sales", "account executive", "business development"]),
            (6, &["support", "customer success", "customer service"]),
            (7, &["data", "analyst", "machine learning", "data scientist"]),
            (8, &["operations", "finance", "recruiter", "hr", "people"]),
        ];

        let mut entries = BTreeMap::new();
        for (id, keywords) in table {
            entries.insert(id, keywords.iter().map(|k| k.to_string()).collect());
        }
        Self { entries }
    }
}

#[derive(Debug, Default)]
pub struct CategoryKeywordsBuilder {
    pending: Vec<(i64, Vec<String>)>,
}

impl CategoryKeywordsBuilder {
    pub fn category<I, K>(mut self, category_id: i64, keywords: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.into().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        self.pending.push((category_id, keywords));
        self
    }

    /// Validate and freeze the table.
    pub fn build(self) -> Result<CategoryKeywords, CategoryError> {
        let mut entries = BTreeMap::new();
        for (id, keywords) in self.pending {
            if keywords.is_empty() {
                return Err(CategoryError::EmptyKeywords(id));
            }
            if entries.insert(id, keywords).is_some() {
                return Err(CategoryError::DuplicateCategory(id));
            }
        }
        Ok(CategoryKeywords { entries })
    }
}
