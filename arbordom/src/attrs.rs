//! Ordered attribute lists.
//!
//! Attributes on an element form an *ordered sequence* of
//! `(QualName, value)` pairs, not a map: duplicate keys are permitted and
//! distinguishable by position, and insertion order is preserved all the
//! way through serialization. [`AttrsList`] therefore supports both
//! positional access (`get`, `set`, `remove`, ...) and keyed access
//! (`find`, `index`, `set_by_key`, ...) where keyed operations always act
//! on the *first* match.

use core::fmt;

use tendril::StrTendril;

use crate::errors::Error;
use crate::errors::Result;
use crate::name::QualName;

/// A single attribute entry.
pub type Attr = (QualName, StrTendril);

/// The ordered attribute list attached to every element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttrsList {
  items: Vec<Attr>,
}

impl AttrsList {
  pub fn new() -> Self {
    AttrsList { items: Vec::new() }
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  /// Positional access.
  pub fn get(&self, index: usize) -> Option<&Attr> {
    self.items.get(index)
  }

  /// Replaces the entry at `index` in place.
  pub fn set(
    &mut self,
    index: usize,
    key: impl Into<QualName>,
    value: impl Into<StrTendril>,
  ) -> Result<()> {
    let len = self.items.len();
    let slot = self
      .items
      .get_mut(index)
      .ok_or(Error::IndexOutOfBounds { index, len })?;
    *slot = (key.into(), value.into());
    Ok(())
  }

  /// Removes and returns the entry at `index`, shifting everything after
  /// it to the left.
  pub fn remove(&mut self, index: usize) -> Result<Attr> {
    if index >= self.items.len() {
      return Err(Error::IndexOutOfBounds { index, len: self.items.len() });
    }
    Ok(self.items.remove(index))
  }

  /// Removes and returns the entry at `index`, replacing it with the last
  /// entry. O(1) but does not preserve ordering.
  pub fn swap_remove(&mut self, index: usize) -> Result<Attr> {
    if index >= self.items.len() {
      return Err(Error::IndexOutOfBounds { index, len: self.items.len() });
    }
    Ok(self.items.swap_remove(index))
  }

  pub fn push(&mut self, key: impl Into<QualName>, value: impl Into<StrTendril>) {
    self.items.push((key.into(), value.into()));
  }

  /// Inserts at position `index`, shifting everything after it to the
  /// right. `index == len` is equivalent to `push`.
  pub fn insert(
    &mut self,
    index: usize,
    key: impl Into<QualName>,
    value: impl Into<StrTendril>,
  ) -> Result<()> {
    if index > self.items.len() {
      return Err(Error::IndexOutOfBounds { index, len: self.items.len() });
    }
    self.items.insert(index, (key.into(), value.into()));
    Ok(())
  }

  /// Removes consecutive repeated entries.
  pub fn dedup(&mut self) {
    self.items.dedup();
  }

  pub fn reverse(&mut self) {
    self.items.reverse();
  }

  /// Stable sort by key, using the `(namespace, local, prefix)` ordering
  /// of [`QualName`].
  pub fn sort(&mut self) {
    self.items.sort_by(|a, b| a.0.cmp(&b.0));
  }

  pub fn clear(&mut self) {
    self.items.clear();
  }

  pub fn iter(&self) -> core::slice::Iter<'_, Attr> {
    self.items.iter()
  }

  /// First match at or after `start`, as `(index, value)`.
  pub fn find(
    &self,
    key: impl Into<QualName>,
    start: usize,
  ) -> Option<(usize, &StrTendril)> {
    let key = key.into();
    self
      .items
      .iter()
      .enumerate()
      .skip(start)
      .find(|(_, (k, _))| *k == key)
      .map(|(i, (_, v))| (i, v))
  }

  /// Like [`find`](Self::find) but failing with [`Error::NotFound`] on a
  /// miss.
  pub fn index(&self, key: impl Into<QualName>, start: usize) -> Result<usize> {
    let key = key.into();
    match self.find(key.clone(), start) {
      Some((i, _)) => Ok(i),
      None => Err(Error::NotFound(key.to_string())),
    }
  }

  pub fn contains_key(&self, key: impl Into<QualName>) -> bool {
    self.find(key, 0).is_some()
  }

  pub fn contains(
    &self,
    key: impl Into<QualName>,
    value: impl Into<StrTendril>,
  ) -> bool {
    let key = key.into();
    let value = value.into();
    self.items.iter().any(|(k, v)| *k == key && *v == value)
  }

  /// Replaces the value of the first entry matching `key`, or pushes a
  /// new entry if there is none.
  pub fn set_by_key(&mut self, key: impl Into<QualName>, value: impl Into<StrTendril>) {
    let key = key.into();
    let value = value.into();
    match self.items.iter_mut().find(|(k, _)| *k == key) {
      Some((_, v)) => *v = value,
      None => self.items.push((key, value)),
    }
  }

  /// The value of the first `id` attribute.
  pub fn id(&self) -> Option<StrTendril> {
    self.find("id", 0).map(|(_, v)| v.clone())
  }

  /// The first `class` attribute split on ASCII whitespace.
  pub fn class_list(&self) -> Vec<String> {
    match self.find("class", 0) {
      Some((_, v)) => v.split_ascii_whitespace().map(String::from).collect(),
      None => Vec::new(),
    }
  }
}

impl FromIterator<Attr> for AttrsList {
  fn from_iter<I: IntoIterator<Item = Attr>>(iter: I) -> Self {
    AttrsList { items: iter.into_iter().collect() }
  }
}

impl<'a> IntoIterator for &'a AttrsList {
  type Item = &'a Attr;
  type IntoIter = core::slice::Iter<'a, Attr>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}

impl IntoIterator for AttrsList {
  type Item = Attr;
  type IntoIter = std::vec::IntoIter<Attr>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.into_iter()
  }
}

impl fmt::Display for AttrsList {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (key, value) in &self.items {
      write!(f, " {}=\"{}\"", key, value)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> AttrsList {
    let mut attrs = AttrsList::new();
    attrs.push("id", "par");
    attrs.push("custom-attr", "val");
    attrs.push("class", "table flex flex-col");
    attrs
  }

  #[test]
  fn positional_and_keyed_access() {
    let attrs = sample();
    assert_eq!(attrs.len(), 3);
    assert_eq!(attrs.id().as_deref(), Some("par"));

    let mut classes = attrs.class_list();
    classes.sort();
    assert_eq!(classes, ["flex", "flex-col", "table"]);

    let (index, value) = attrs.find("custom-attr", 0).unwrap();
    assert_eq!(index, 1);
    assert_eq!(&value[..], "val");

    assert!(attrs.contains_key("class"));
    assert!(attrs.contains("id", "par"));
    assert!(!attrs.contains("id", "other"));
    assert!(matches!(attrs.index("nope", 0), Err(Error::NotFound(_))));
  }

  #[test]
  fn removal_then_reappend_keeps_length() {
    let mut attrs = sample();

    attrs.remove(0).unwrap();
    assert_eq!(attrs.id(), None);
    attrs.remove(1).unwrap();
    assert!(attrs.class_list().is_empty());

    attrs.set(0, "data-type", "3").unwrap();
    let (key, value) = attrs.get(0).unwrap();
    assert_eq!(key, &QualName::new("data-type"));
    assert_eq!(&value[..], "3");

    attrs.push("id", "newid");
    attrs.push("class", "mt-0 px-10");
    assert_eq!(attrs.len(), 3);
    assert_eq!(attrs.id().as_deref(), Some("newid"));
  }

  #[test]
  fn sort_orders_keys_alphabetically() {
    let mut attrs = AttrsList::new();
    attrs.push("data-type", "3");
    attrs.push("id", "newid");
    attrs.push("class", "mt-0 px-10");
    attrs.sort();

    assert_eq!(attrs.get(0).unwrap().0, QualName::new("class"));
    assert_eq!(attrs.get(1).unwrap().0, QualName::new("data-type"));
    assert_eq!(attrs.get(2).unwrap().0, QualName::new("id"));
  }

  #[test]
  fn duplicate_keys_are_positional() {
    let mut attrs = AttrsList::new();
    attrs.push("k", "a");
    attrs.push("k", "b");
    assert_eq!(attrs.len(), 2);
    assert_eq!(attrs.find("k", 0).unwrap().0, 0);
    assert_eq!(attrs.find("k", 1).unwrap().0, 1);

    // set_by_key only touches the first match.
    attrs.set_by_key("k", "c");
    assert_eq!(&attrs.get(0).unwrap().1[..], "c");
    assert_eq!(&attrs.get(1).unwrap().1[..], "b");
  }

  #[test]
  fn dedup_removes_consecutive_repeats() {
    let mut attrs = AttrsList::new();
    attrs.push("k", "a");
    attrs.push("k", "a");
    attrs.push("k", "b");
    attrs.dedup();
    assert_eq!(attrs.len(), 2);
  }

  #[test]
  fn out_of_bounds_is_an_error() {
    let mut attrs = sample();
    assert!(matches!(
      attrs.remove(9),
      Err(Error::IndexOutOfBounds { index: 9, len: 3 })
    ));
    assert!(attrs.insert(9, "k", "v").is_err());
    assert!(attrs.set(3, "k", "v").is_err());
  }
}
