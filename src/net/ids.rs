//! 元素标识符：库所、迁移与弧共享同一个字符串命名空间。
use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::net::core::NetError;

/// String handle of a place, transition or arc.
///
/// Identifiers are never empty. Lookups through the engine tables accept a
/// plain `&str` because `ElementId` borrows as `str`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(raw: impl Into<String>) -> Result<Self, NetError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(NetError::EmptyId);
        }
        Ok(Self(raw))
    }

    /// Error payload for a lookup key that matched nothing, possibly empty.
    pub(crate) fn unchecked(raw: &str) -> Self {
        Self(raw.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ElementId").field(&self.0).finish()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ElementId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ElementId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ElementId {
    type Error = NetError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl PartialEq<str> for ElementId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ElementId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn empty_identifier_is_rejected() {
        assert_eq!(ElementId::new(""), Err(NetError::EmptyId));
        assert!(ElementId::try_from("p0").is_ok());
    }

    #[test]
    fn table_lookup_by_str() {
        let mut table = IndexMap::new();
        table.insert(ElementId::new("t1").unwrap(), 7);
        assert_eq!(table.get("t1"), Some(&7));
        assert!(table.get("t2").is_none());
    }

    #[test]
    fn formatting() {
        let id = ElementId::new("p0").unwrap();
        assert_eq!(id.to_string(), "p0");
        assert_eq!(format!("{:?}", id), "ElementId(\"p0\")");
        assert_eq!(id, "p0");
    }
}
