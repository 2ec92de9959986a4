use fnv::FnvBuildHasher;
use std::{collections::HashMap, ops::Index, sync::Arc};

/// Access to the short name of a description object
pub trait OdxNamed {
    fn short_name(&self) -> &str;
}

impl<T: OdxNamed> OdxNamed for Arc<T> {
    fn short_name(&self) -> &str {
        (**self).short_name()
    }
}

/// A list of named description objects
///
/// A `NamedItemList` keeps its items in document order and additionally allows
/// fast access by short name. Every short-name scope of a description (the
/// states of a state chart, the parameters of a structure, the rows of a table)
/// is a `NamedItemList`.
#[derive(Debug, Clone)]
pub struct NamedItemList<T: OdxNamed> {
    items: Vec<T>,
    // short name -> index into items
    map: HashMap<String, usize, FnvBuildHasher>,
}

impl<T: OdxNamed> NamedItemList<T> {
    pub fn new() -> Self {
        Self {
            items: vec![],
            map: HashMap::default(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            map: HashMap::with_capacity_and_hasher(capacity, FnvBuildHasher::default()),
        }
    }

    /// append an item
    ///
    /// Returns false if the short name was already taken; the item is stored
    /// anyway, but lookups by name keep returning the first one.
    pub fn push(&mut self, value: T) -> bool {
        let index = self.items.len();
        let key = value.short_name().to_string();
        let is_new = !self.map.contains_key(&key);
        self.map.entry(key).or_insert(index);
        self.items.push(value);
        is_new
    }

    pub fn get(&self, short_name: &str) -> Option<&T> {
        let index = self.map.get(short_name)?;
        Some(&self.items[*index])
    }

    pub fn index(&self, short_name: &str) -> Option<usize> {
        self.map.get(short_name).copied()
    }

    pub fn contains_key(&self, short_name: &str) -> bool {
        self.map.contains_key(short_name)
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.map.keys()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        let into_iter = iter.into_iter();
        let (low, _high) = into_iter.size_hint();
        self.items.reserve(low);
        self.map.reserve(low);
        for item in into_iter {
            self.push(item);
        }
    }
}

impl<T: OdxNamed> Default for NamedItemList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: OdxNamed> Index<usize> for NamedItemList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.items[index]
    }
}

impl<T: OdxNamed> FromIterator<T> for NamedItemList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let into_iter = iter.into_iter();
        let (low, _high) = into_iter.size_hint();
        let mut item_list = NamedItemList::with_capacity(low);
        for item in into_iter {
            item_list.push(item);
        }
        item_list
    }
}

impl<T: OdxNamed> IntoIterator for NamedItemList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T: OdxNamed> IntoIterator for &'a NamedItemList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        name: String,
        value: u32,
    }

    impl OdxNamed for Item {
        fn short_name(&self) -> &str {
            &self.name
        }
    }

    fn item(name: &str, value: u32) -> Item {
        Item {
            name: name.to_string(),
            value,
        }
    }

    #[test]
    fn push_and_get() {
        let mut list = NamedItemList::new();
        assert!(list.is_empty());
        assert!(list.push(item("a", 1)));
        assert!(list.push(item("b", 2)));
        assert_eq!(list.len(), 2);
        assert_eq!(list.get("b").map(|i| i.value), Some(2));
        assert_eq!(list.index("a"), Some(0));
        assert!(list.get("c").is_none());
        assert_eq!(list[1].name, "b");
        assert_eq!(list.first().map(|i| i.value), Some(1));
        assert_eq!(list.last().map(|i| i.value), Some(2));
    }

    #[test]
    fn duplicate_names_refer_to_first() {
        let mut list = NamedItemList::new();
        list.push(item("a", 1));
        assert!(!list.push(item("a", 2)));
        assert_eq!(list.len(), 2);
        assert_eq!(list.get("a").map(|i| i.value), Some(1));
    }

    #[test]
    fn collect_in_order() {
        let list: NamedItemList<_> = vec![item("z", 1), item("y", 2), item("x", 3)]
            .into_iter()
            .collect();
        let names: Vec<&str> = list.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["z", "y", "x"]);

        let mut list2 = NamedItemList::new();
        list2.extend(list);
        assert!(list2.contains_key("y"));
        assert_eq!(list2.keys().count(), 3);
    }

    #[test]
    fn shared_items() {
        let list: NamedItemList<Arc<Item>> = vec![Arc::new(item("a", 1))].into_iter().collect();
        assert_eq!(list.get("a").map(|i| i.value), Some(1));
    }
}
