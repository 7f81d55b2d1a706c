// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model: row nodes, schema descriptors, stable ids and the raw JSON input shapes.

pub mod fixtures;
pub mod ids;
pub mod node;
pub mod raw;
pub mod schema;

pub use ids::{Id, IdError, MappingKey, RowKey};
pub use node::{Namespace, Node, NodeKind, ParentRelationship};
pub use raw::{
    display_text, DraftTwin, RawContent, RawInterface, RawTag, RawTagProperty, RawTwin, TypeTag,
};
pub use schema::{EnumEntry, FieldDescriptor, MapSlot, PropertyDescriptor};
