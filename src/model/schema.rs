// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use serde::Serialize;
use smol_str::SmolStr;

/// Canonical description of a property schema.
///
/// Each complex kind carries exactly its own detail, so an `Enum` can never also carry map slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "schemaKind", rename_all = "camelCase")]
pub enum PropertyDescriptor {
    /// A primitive DTDL schema such as `string`, `double` or `dateTime`.
    Scalar { name: SmolStr },
    Object { fields: Vec<FieldDescriptor> },
    Array { element: Box<PropertyDescriptor> },
    Enum { entries: Vec<EnumEntry> },
    Map { key: MapSlot, value: MapSlot },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub schema: PropertyDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumEntry {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSlot {
    pub name: String,
    pub schema_kind: SmolStr,
}

impl PropertyDescriptor {
    pub fn scalar(name: impl Into<SmolStr>) -> Self {
        Self::Scalar { name: name.into() }
    }

    /// `object`, `array`, `enum`, `map`, or the scalar schema name.
    pub fn schema_kind(&self) -> &str {
        match self {
            Self::Scalar { name } => name,
            Self::Object { .. } => "object",
            Self::Array { .. } => "array",
            Self::Enum { .. } => "enum",
            Self::Map { .. } => "map",
        }
    }

    pub fn nested(&self) -> &[FieldDescriptor] {
        match self {
            Self::Object { fields } => fields,
            _ => &[],
        }
    }

    pub fn element_type(&self) -> Option<&str> {
        match self {
            Self::Array { element } => Some(element.schema_kind()),
            _ => None,
        }
    }

    pub fn enum_entries(&self) -> &[EnumEntry] {
        match self {
            Self::Enum { entries } => entries,
            _ => &[],
        }
    }

    pub fn map_slots(&self) -> Option<(&MapSlot, &MapSlot)> {
        match self {
            Self::Map { key, value } => Some((key, value)),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar { name } => f.write_str(name),
            Self::Object { fields } => write!(f, "object ({} fields)", fields.len()),
            Self::Array { element } => write!(f, "{} array", element.schema_kind()),
            Self::Enum { entries } => {
                f.write_str("enum [")?;
                for (idx, entry) in entries.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", entry.name, entry.value)?;
                }
                f.write_str("]")
            }
            Self::Map { key, value } => write!(
                f,
                "map {} ({}) -> {} ({})",
                key.name, key.schema_kind, value.name, value.schema_kind
            ),
        }
    }
}
