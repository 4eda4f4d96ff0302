use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

/// Column groups of the page table.
///
/// Variants are declared in name order so that columns sort the same way as
/// their `family:qualifier` wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Content,
    Inlinks,
    Meta,
    Outlinks,
}

impl Family {
    pub const ALL: [Family; 4] = [
        Family::Content,
        Family::Inlinks,
        Family::Meta,
        Family::Outlinks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Content => "content",
            Family::Inlinks => "inlinks",
            Family::Meta => "meta",
            Family::Outlinks => "outlinks",
        }
    }

    /// Whether the store keeps older values of this family's cells.
    /// Link families are keyed by the other endpoint and simply overwrite.
    pub fn is_versioned(&self) -> bool {
        matches!(self, Family::Content | Family::Meta)
    }

    pub fn parse(name: &str) -> Option<Family> {
        Family::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Fixed qualifiers of the content and meta families.
pub const HTML: &str = "html";
pub const TEXT: &str = "text";
pub const FETCH_TIME: &str = "fetch_time";
pub const STATUS: &str = "status";
pub const CONTENT_TYPE: &str = "content_type";

/// A `family:qualifier` column name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Column {
    pub family: Family,
    pub qualifier: String,
}

impl Column {
    pub fn new(family: Family, qualifier: impl Into<String>) -> Self {
        Self {
            family,
            qualifier: qualifier.into(),
        }
    }

    /// Parse the wire form. Only the first `:` separates the family, so
    /// qualifiers holding row keys with ports survive intact.
    pub fn parse(wire: &str) -> Result<Self> {
        let (family, qualifier) = wire
            .split_once(':')
            .ok_or_else(|| Error::malformed_column(wire, "missing ':'"))?;
        let family =
            Family::parse(family).ok_or_else(|| Error::malformed_column(wire, "unknown family"))?;
        if qualifier.is_empty() {
            return Err(Error::malformed_column(wire, "empty qualifier"));
        }
        Ok(Self::new(family, qualifier))
    }

    pub fn wire(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.qualifier)
    }
}

/// Column values destined for one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    cells: BTreeMap<Column, Vec<u8>>,
}

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, replacing any value already staged for it.
    pub fn insert(&mut self, column: Column, value: impl Into<Vec<u8>>) {
        self.cells.insert(column, value.into());
    }

    pub fn put(&mut self, family: Family, qualifier: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.insert(Column::new(family, qualifier), value);
    }

    pub fn get(&self, column: &Column) -> Option<&[u8]> {
        self.cells.get(column).map(Vec::as_slice)
    }

    /// Look a column up by its wire form; `None` for unknown families too.
    pub fn get_wire(&self, wire: &str) -> Option<&[u8]> {
        let column = Column::parse(wire).ok()?;
        self.get(&column)
    }

    /// Per-qualifier merge, values from `other` win.
    pub fn merge(&mut self, other: ColumnMap) {
        self.cells.extend(other.cells);
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Column, Vec<u8>> {
        self.cells.iter()
    }

    /// Cells of one family, in qualifier order.
    pub fn family(&self, family: Family) -> impl Iterator<Item = (&str, &[u8])> + '_ {
        self.cells
            .iter()
            .filter(move |(column, _)| column.family == family)
            .map(|(column, value)| (column.qualifier.as_str(), value.as_slice()))
    }

    pub fn count(&self, family: Family) -> usize {
        self.family(family).count()
    }

    /// `(family:qualifier, value)` pairs as handed to a store client.
    pub fn to_wire(&self) -> Vec<(String, &[u8])> {
        self.cells
            .iter()
            .map(|(column, value)| (column.wire(), value.as_slice()))
            .collect()
    }
}

impl IntoIterator for ColumnMap {
    type Item = (Column, Vec<u8>);
    type IntoIter = btree_map::IntoIter<Column, Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.into_iter()
    }
}

impl<'a> IntoIterator for &'a ColumnMap {
    type Item = (&'a Column, &'a Vec<u8>);
    type IntoIter = btree_map::Iter<'a, Column, Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}

impl FromIterator<(Column, Vec<u8>)> for ColumnMap {
    fn from_iter<T: IntoIterator<Item = (Column, Vec<u8>)>>(iter: T) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_versioning() {
        assert!(Family::Content.is_versioned());
        assert!(Family::Meta.is_versioned());
        assert!(!Family::Outlinks.is_versioned());
        assert!(!Family::Inlinks.is_versioned());
    }

    #[test]
    fn test_family_parse() {
        for family in Family::ALL {
            assert_eq!(Family::parse(family.as_str()), Some(family));
        }
        assert_eq!(Family::parse("links"), None);
    }

    #[test]
    fn test_column_wire_form() {
        let column = Column::new(Family::Outlinks, "9!com.example.www/about");
        assert_eq!(column.wire(), "outlinks:9!com.example.www/about");
        assert_eq!(Column::parse(&column.wire()).unwrap(), column);
    }

    #[test]
    fn test_column_parse_keeps_colons_in_qualifier() {
        let column = Column::parse("inlinks:3!com:8080.example/x").unwrap();
        assert_eq!(column.family, Family::Inlinks);
        assert_eq!(column.qualifier, "3!com:8080.example/x");
    }

    #[test]
    fn test_column_parse_errors() {
        assert!(Column::parse("content").is_err());
        assert!(Column::parse("links:x").is_err());
        assert!(Column::parse("meta:").is_err());
    }

    #[test]
    fn test_iteration_matches_wire_order() {
        let mut map = ColumnMap::new();
        map.put(Family::Outlinks, "a", "1");
        map.put(Family::Meta, "status", "200");
        map.put(Family::Inlinks, "b", "2");
        map.put(Family::Content, HTML, "<html/>");

        let wire: Vec<String> = map.to_wire().into_iter().map(|(c, _)| c).collect();
        let mut sorted = wire.clone();
        sorted.sort();
        assert_eq!(wire, sorted);
    }

    #[test]
    fn test_merge_later_wins() {
        let mut a = ColumnMap::new();
        a.put(Family::Outlinks, "x", "old");
        a.put(Family::Meta, STATUS, "200");

        let mut b = ColumnMap::new();
        b.put(Family::Outlinks, "x", "new");
        b.put(Family::Outlinks, "y", "other");

        a.merge(b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.get_wire("outlinks:x"), Some(&b"new"[..]));
        assert_eq!(a.count(Family::Outlinks), 2);
    }
}
