// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Twinmapper: map OPC-UA nodes onto digital twin properties.
//!
//! DTDL interfaces and twin query results are normalized into flat row lists
//! ([`normalize`]), driven by a pure tree controller ([`tree`]) and shown in a terminal UI
//! ([`tui`]) where the operator builds a [`mapping`] table.

pub mod config;
pub mod mapping;
pub mod model;
pub mod normalize;
pub mod search;
pub mod store;
pub mod tree;
pub mod tui;
