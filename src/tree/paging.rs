// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Lazy-page cursor with a monotonic fetch generation.
//!
//! Every reset and every request bumps the generation; a loaded page is applied only when it
//! carries the generation of the request that is still outstanding.

/// A fetch the caller must perform and answer with [`super::Action::PageLoaded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub generation: u64,
    pub page: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagingState {
    next_page: Option<usize>,
    loading: bool,
    generation: u64,
}

impl PagingState {
    pub fn next_page(&self) -> Option<usize> {
        self.next_page
    }

    pub fn has_next_page(&self) -> bool {
        self.next_page.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a response tagged with `generation` would still be accepted.
    pub fn is_current(&self, generation: u64) -> bool {
        self.loading && generation == self.generation
    }

    /// Starts over with a new cursor; any outstanding fetch becomes stale.
    pub(super) fn reset(&mut self, next_page: Option<usize>) {
        self.generation += 1;
        self.loading = false;
        self.next_page = next_page;
    }

    pub(super) fn request(&mut self) -> Option<PageRequest> {
        if self.loading {
            return None;
        }
        let page = self.next_page?;
        self.loading = true;
        self.generation += 1;
        Some(PageRequest { generation: self.generation, page })
    }

    /// Returns `false` for a response that no longer matches the outstanding request.
    pub(super) fn accept(&mut self, generation: u64, next_page: Option<usize>) -> bool {
        if !self.loading || generation != self.generation {
            return false;
        }
        self.loading = false;
        self.next_page = next_page;
        true
    }
}
