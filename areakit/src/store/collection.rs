//! Collection ordonnée indexée par clé

use std::collections::HashMap;

use crate::types::Area;

/// Élément identifié par une clé unique
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Area {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Collection conservant l'ordre d'insertion avec accès O(1) par clé
#[derive(Debug, Clone)]
pub struct OrderedCollection<T: Keyed> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: Keyed> Default for OrderedCollection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Keyed> OrderedCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&i| &self.items[i])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        match self.index.get(key) {
            Some(&i) => self.items.get_mut(i),
            None => None,
        }
    }

    /// Insère un élément; s'il existe déjà il est remplacé en place et l'ancien retourné
    pub fn insert(&mut self, item: T) -> Option<T> {
        match self.index.get(item.key()) {
            Some(&i) => Some(std::mem::replace(&mut self.items[i], item)),
            None => {
                self.index.insert(item.key().to_string(), self.items.len());
                self.items.push(item);
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<T> {
        let i = self.index.remove(key)?;
        let item = self.items.remove(i);
        self.reindex_from(i);
        Some(item)
    }

    /// Retire et retourne les éléments vérifiant le prédicat
    pub fn extract_if<F: FnMut(&T) -> bool>(&mut self, mut pred: F) -> Vec<T> {
        let (removed, kept): (Vec<T>, Vec<T>) = self.items.drain(..).partition(|t| pred(t));
        self.items = kept;
        self.reindex_from(0);
        removed
    }

    pub fn clear(&mut self) -> Vec<T> {
        self.index.clear();
        std::mem::take(&mut self.items)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn keys(&self) -> Vec<String> {
        self.items.iter().map(|t| t.key().to_string()).collect()
    }

    fn reindex_from(&mut self, start: usize) {
        if start == 0 {
            self.index.clear();
        }
        for (i, item) in self.items.iter().enumerate().skip(start) {
            self.index.insert(item.key().to_string(), i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(id: &str) -> Area {
        Area::default().with_id(id)
    }

    #[test]
    fn test_insert_keeps_order_and_replaces() {
        let mut c = OrderedCollection::new();
        assert!(c.insert(area("a")).is_none());
        assert!(c.insert(area("b")).is_none());
        let old = c.insert(area("a").with_title("A2"));
        assert!(old.is_some());
        assert_eq!(c.keys(), vec!["a", "b"]);
        assert_eq!(c.get("a").and_then(|a| a.title.as_deref()), Some("A2"));
    }

    #[test]
    fn test_remove_reindexes() {
        let mut c = OrderedCollection::new();
        for id in ["a", "b", "c"] {
            c.insert(area(id));
        }
        c.remove("a");
        assert_eq!(c.get("c").map(|a| a.id.as_str()), Some("c"));
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_extract_if() {
        let mut c = OrderedCollection::new();
        for id in ["a", "b", "c"] {
            c.insert(area(id));
        }
        let removed = c.extract_if(|a| a.id != "b");
        assert_eq!(removed.len(), 2);
        assert_eq!(c.keys(), vec!["b"]);
        assert!(c.get("b").is_some());
        assert!(!c.contains("a"));
    }
}
