// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use super::StoreError;

/// One page of raw twin documents.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub page: usize,
    pub twins: Vec<Value>,
    pub next_page: Option<usize>,
}

/// Where twin pages come from. Handles are built by the caller and passed in.
pub trait PageSource {
    fn fetch_page(&self, page: usize) -> impl Future<Output = Result<Page, StoreError>> + Send;
}

/// Serves an in-memory twin list page by page, standing in for a paged query API.
#[derive(Debug, Clone)]
pub struct TwinPager {
    twins: Arc<Vec<Value>>,
    page_size: usize,
}

impl TwinPager {
    pub fn new(twins: Vec<Value>, page_size: usize) -> Self {
        Self { twins: Arc::new(twins), page_size: page_size.max(1) }
    }

    /// Accepts a bare array, a `{ "value": [...] }` page or a single twin.
    pub fn from_document(document: Value, page_size: usize) -> Self {
        let twins = match document {
            Value::Array(items) => items,
            Value::Object(mut object) => match object.remove("value") {
                Some(Value::Array(items)) => items,
                Some(other) => {
                    object.insert("value".to_owned(), other);
                    vec![Value::Object(object)]
                }
                None => vec![Value::Object(object)],
            },
            Value::Null => Vec::new(),
            other => vec![other],
        };
        Self::new(twins, page_size)
    }

    pub fn len(&self) -> usize {
        self.twins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.twins.is_empty()
    }

    pub fn pages(&self) -> usize {
        self.twins.len().div_ceil(self.page_size)
    }

    fn page(&self, page: usize) -> Result<Page, StoreError> {
        let pages = self.pages();
        // Page 0 of an empty source is an empty last page.
        if page >= pages.max(1) {
            return Err(StoreError::PageOutOfRange { page, pages });
        }
        let start = page * self.page_size;
        let end = (start + self.page_size).min(self.twins.len());
        let next_page = (end < self.twins.len()).then_some(page + 1);
        Ok(Page { page, twins: self.twins[start..end].to_vec(), next_page })
    }
}

impl PageSource for TwinPager {
    fn fetch_page(&self, page: usize) -> impl Future<Output = Result<Page, StoreError>> + Send {
        let result = self.page(page);
        async move {
            tokio::task::yield_now().await;
            result
        }
    }
}
