use serde::{Deserialize, Serialize};

/// Remote paged result, 0-based `number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub size: u32,
}

impl<T> Page<T> {
    pub fn empty(size: u32) -> Self {
        Self {
            content: Vec::new(),
            total_pages: 0,
            total_elements: 0,
            number: 0,
            size,
        }
    }

    /// Fill in fields some endpoints leave out.
    pub fn normalized(mut self, requested_size: u32) -> Self {
        if self.size == 0 {
            self.size = requested_size;
        }
        if self.total_elements == 0 && !self.content.is_empty() {
            self.total_elements = self.content.len() as u64;
        }
        if self.total_pages == 0 && self.total_elements > 0 && self.size > 0 {
            self.total_pages = self.total_elements.div_ceil(self.size as u64) as u32;
        }
        self
    }

    pub fn is_last(&self) -> bool {
        self.content.is_empty() || self.number + 1 >= self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_computes_missing_page_count() {
        let page = Page {
            content: vec![1, 2, 3],
            total_pages: 0,
            total_elements: 23,
            number: 0,
            size: 0,
        }
        .normalized(10);

        assert_eq!(page.size, 10);
        assert_eq!(page.total_pages, 3);
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Row {
        id: i64,
    }

    #[test]
    fn test_deserializes_items_without_default() {
        let page: Page<Row> = serde_json::from_str(
            r#"{"content":[{"id":4}],"totalPages":1,"totalElements":1,"number":0,"size":10}"#,
        )
        .unwrap();
        assert_eq!(page.content, vec![Row { id: 4 }]);

        let bare: Page<Row> = serde_json::from_str(r#"{"totalElements":0}"#).unwrap();
        assert!(bare.content.is_empty());
    }

    #[test]
    fn test_is_last() {
        let mut page = Page {
            content: vec!["a"],
            total_pages: 3,
            total_elements: 21,
            number: 1,
            size: 10,
        };
        assert!(!page.is_last());
        page.number = 2;
        assert!(page.is_last());
        assert!(Page::<u8>::empty(10).is_last());
    }
}
