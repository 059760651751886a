use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Paging parameters as sent by the admin console (`?page=1&pageSize=10&name=..`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub name: Option<String>,
}

impl PageQuery {
    pub fn current(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn size(&self) -> u32 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Name filter with surrounding whitespace removed; empty means unset
    pub fn name_filter(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub total: usize,
    pub size: u32,
    pub current: u32,
}

impl<T> Page<T> {
    /// Cut the requested page out of an already ordered result set
    pub fn slice(items: Vec<T>, query: &PageQuery) -> Self {
        let total = items.len();
        let size = query.size();
        let current = query.current();
        let skip = (current as usize - 1) * size as usize;
        let records = items.into_iter().skip(skip).take(size as usize).collect();
        Self {
            records,
            total,
            size,
            current,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            records: self.records.into_iter().map(f).collect(),
            total: self.total,
            size: self.size,
            current: self.current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_middle_page() {
        let query = PageQuery {
            page: Some(2),
            page_size: Some(3),
            name: None,
        };
        let page = Page::slice((1..=8).collect::<Vec<_>>(), &query);
        assert_eq!(page.records, vec![4, 5, 6]);
        assert_eq!(page.total, 8);
        assert_eq!(page.current, 2);
    }

    #[test]
    fn test_slice_past_end_is_empty() {
        let query = PageQuery {
            page: Some(5),
            page_size: Some(10),
            name: None,
        };
        let page = Page::slice(vec![1, 2, 3], &query);
        assert!(page.records.is_empty());
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_defaults_and_clamping() {
        let query = PageQuery {
            page: Some(0),
            page_size: Some(10_000),
            name: Some("   ".to_string()),
        };
        assert_eq!(query.current(), 1);
        assert_eq!(query.size(), MAX_PAGE_SIZE);
        assert_eq!(query.name_filter(), None);
        assert_eq!(PageQuery::default().size(), DEFAULT_PAGE_SIZE);
    }
}
