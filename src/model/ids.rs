// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Twinmapper and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smol_str::SmolStr;

/// A stable identifier used across normalizers, the tree controller and the mapping table.
///
/// Row keys are derived from content paths (interface id plus content names, or model id plus
/// twin id) so the same logical row gets the same key after every rebuild. The only rule enforced
/// here is that the id is non-empty and single-line, because ids are rendered verbatim in rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T> {
    value: SmolStr,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    pub fn new(value: impl Into<SmolStr>) -> Result<Self, IdError> {
        let value = value.into();
        validate_id(&value)?;
        Ok(Self { value, _marker: PhantomData })
    }

    fn from_parts(value: String) -> Self {
        Self { value: SmolStr::from(value), _marker: PhantomData }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_string(self) -> String {
        self.value.to_string()
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> AsRef<str> for Id<T> {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl<T> Borrow<str> for Id<T> {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl<T> FromStr for Id<T> {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<T> TryFrom<String> for Id<T> {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = SmolStr::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("id must not be empty")]
    Empty,
    #[error("id must not contain line breaks")]
    ContainsLineBreak,
}

fn validate_id(value: &str) -> Result<(), IdError> {
    if value.is_empty() {
        return Err(IdError::Empty);
    }
    if value.contains(['\n', '\r']) {
        return Err(IdError::ContainsLineBreak);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowKeyTag {}
pub type RowKey = Id<RowKeyTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MappingKeyTag {}
pub type MappingKey = Id<MappingKeyTag>;

impl RowKey {
    /// Key of a top-level interface row.
    pub fn interface(interface_id: &str) -> Self {
        Self::from_parts(format!("interface:{interface_id}"))
    }

    /// Key of a content row nested under `self`, e.g. a property or an inlined component.
    pub fn child(&self, name: &str) -> Self {
        Self::from_parts(format!("{}/{name}", self.value))
    }

    pub fn model(model_id: &str) -> Self {
        Self::from_parts(format!("model:{model_id}"))
    }

    pub fn twin(model_id: &str, twin_id: &str) -> Self {
        Self::from_parts(format!("twin:{model_id}/{twin_id}"))
    }

    pub fn separator(model_id: &str) -> Self {
        Self::from_parts(format!("separator:{model_id}"))
    }

    pub fn future_twin(model_id: &str, twin_id: &str) -> Self {
        Self::from_parts(format!("future:{model_id}/{twin_id}"))
    }

    /// Key of the root row of an OPC-UA node tree.
    pub fn opcua(root: &str) -> Self {
        Self::from_parts(format!("opcua:{root}"))
    }
}

impl MappingKey {
    pub fn sequential(n: u64) -> Self {
        Self::from_parts(format!("m{n}"))
    }
}
