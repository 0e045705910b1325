//! In-memory item store
//!
//! Items are schema-less JSON objects kept in insertion order for the lifetime of the
//! process. An item's optional integer `id` field is its lookup key. Keys are supplied
//! by the caller and never checked for uniqueness, so every lookup resolves to the
//! first matching item.

use std::fmt::{Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use error_stack::{report, Result};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

const ID_FIELD: &str = "id";

pub type Item = Map<String, Value>;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("item {0} not found")]
    ItemNotFound(ItemId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(i64);

impl ItemId {
    /// The key of an item, if its `id` field is numerically an integer.
    ///
    /// `1.0` and `1e0` are stored as floats but still key the item as `1`.
    pub fn of(item: &Item) -> Option<Self> {
        let id = item.get(ID_FIELD)?;

        id.as_i64()
            .or_else(|| id.as_f64().and_then(integral))
            .map(ItemId)
    }
}

// i64::MAX rounds up to 2^63 as a float, so the upper bound is exclusive
#[allow(clippy::cast_possible_truncation)]
fn integral(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;

    (in_range && value.fract() == 0.0).then_some(value as i64)
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        ItemId(id)
    }
}

impl FromStr for ItemId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse().map(ItemId)
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared, insertion-ordered collection of items.
///
/// All operations are serialized through a read-write lock, so concurrent handlers
/// never observe a partially applied update.
#[derive(Debug, Default)]
pub struct ItemStore {
    items: RwLock<Vec<Item>>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the item exactly as given
    pub fn create(&self, item: Item) -> Item {
        let mut items = self.write();
        items.push(item.clone());
        debug!(count = items.len(), "item created");

        item
    }

    pub fn list_all(&self) -> Vec<Item> {
        self.read().clone()
    }

    pub fn get(&self, id: ItemId) -> Result<Item, Error> {
        let items = self.read();

        position(&items, id)
            .map(|index| items[index].clone())
            .ok_or_else(|| report!(Error::ItemNotFound(id)))
    }

    /// Shallow-merges `patch` into the first item with the given id.
    ///
    /// Fields present in the patch replace the item's fields wholesale, including nested
    /// objects and the `id` field itself. All other fields are kept.
    pub fn update(&self, id: ItemId, patch: Item) -> Result<Item, Error> {
        let mut items = self.write();
        let index = position(&items, id).ok_or_else(|| report!(Error::ItemNotFound(id)))?;

        let item = &mut items[index];
        item.extend(patch);

        Ok(item.clone())
    }

    pub fn delete(&self, id: ItemId) -> Result<(), Error> {
        let mut items = self.write();
        let index = position(&items, id).ok_or_else(|| report!(Error::ItemNotFound(id)))?;

        items.remove(index);
        debug!(%id, count = items.len(), "item deleted");

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // a panic while holding the lock cannot leave the vector half-modified, so a
    // poisoned lock is still safe to use
    fn read(&self) -> RwLockReadGuard<'_, Vec<Item>> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Item>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn position(items: &[Item], id: ItemId) -> Option<usize> {
    items.iter().position(|item| ItemId::of(item) == Some(id))
}
