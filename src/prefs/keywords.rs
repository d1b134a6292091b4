use serde::Serialize;

use super::validation::ValidationError;

/// Ordered keyword list without duplicates.
///
/// Matching is exact and case-sensitive; `"AI"` and `"ai"` are different
/// keywords. Empty strings are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeywordSet(Vec<String>);

impl KeywordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `keyword` unless it is empty or already present.
    ///
    /// Returns `true` if the list changed.
    pub fn add(&mut self, keyword: &str) -> bool {
        if keyword.is_empty() || self.contains(keyword) {
            return false;
        }
        self.0.push(keyword.to_owned());
        true
    }

    /// [`KeywordSet::add`] that reports why nothing was added.
    pub fn try_add(&mut self, keyword: &str) -> Result<(), ValidationError> {
        if keyword.is_empty() {
            return Err(ValidationError::EmptyKeyword);
        }
        if !self.add(keyword) {
            return Err(ValidationError::DuplicateKeyword(keyword.to_owned()));
        }
        Ok(())
    }

    /// Remove `keyword` if present. Returns `true` if the list changed.
    pub fn remove(&mut self, keyword: &str) -> bool {
        match self.0.iter().position(|k| k == keyword) {
            Some(idx) => {
                self.0.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.0.iter().any(|k| k == keyword)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Builds from untrusted input (e.g. a server response): empties and repeats
/// are dropped, first occurrence wins.
impl FromIterator<String> for KeywordSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = KeywordSet::new();
        for keyword in iter {
            if !keyword.is_empty() && !set.contains(&keyword) {
                set.0.push(keyword);
            }
        }
        set
    }
}
