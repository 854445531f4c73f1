use std::fmt::Debug;
use std::marker::PhantomData;
use std::ops::Index;
use std::ops::IndexMut;

/// A key which identifies a position in a [`KeyedVec`].
///
/// Keys are dense: the `n`-th key created by [`KeyedVec::push`] has index `n`.
pub trait StorageKey: Copy {
    fn index(self) -> usize;

    fn from_index(index: usize) -> Self;
}

/// A vector which can only be indexed by keys of type `Key`, so that values belonging to, e.g.,
/// indicators cannot be looked up with a domain.
pub struct KeyedVec<Key, Value> {
    values: Vec<Value>,
    key: PhantomData<fn(Key) -> Key>,
}

impl<Key: StorageKey, Value> KeyedVec<Key, Value> {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Appends a value and returns its key.
    pub fn push(&mut self, value: Value) -> Key {
        let key = Key::from_index(self.values.len());
        self.values.push(value);
        key
    }

    pub fn get(&self, key: Key) -> Option<&Value> {
        self.values.get(key.index())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    /// The keys in increasing order.
    pub fn keys(&self) -> impl Iterator<Item = Key> {
        (0..self.values.len()).map(Key::from_index)
    }

    /// The keys with their values, in increasing key order.
    pub fn enumerate(&self) -> impl Iterator<Item = (Key, &Value)> + '_ {
        self.keys().zip(self.values.iter())
    }
}

impl<Key: StorageKey, Value: Clone> KeyedVec<Key, Value> {
    pub fn filled(len: usize, value: Value) -> Self {
        KeyedVec::from(vec![value; len])
    }
}

impl<Key, Value> From<Vec<Value>> for KeyedVec<Key, Value> {
    fn from(values: Vec<Value>) -> Self {
        KeyedVec {
            values,
            key: PhantomData,
        }
    }
}

impl<Key, Value> Default for KeyedVec<Key, Value> {
    fn default() -> Self {
        KeyedVec::from(Vec::new())
    }
}

impl<Key, Value: Clone> Clone for KeyedVec<Key, Value> {
    fn clone(&self) -> Self {
        KeyedVec::from(self.values.clone())
    }
}

impl<Key, Value: PartialEq> PartialEq for KeyedVec<Key, Value> {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl<Key, Value: Eq> Eq for KeyedVec<Key, Value> {}

impl<Key, Value: Debug> Debug for KeyedVec<Key, Value> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.values).finish()
    }
}

impl<Key: StorageKey, Value> Index<Key> for KeyedVec<Key, Value> {
    type Output = Value;

    fn index(&self, key: Key) -> &Value {
        &self.values[key.index()]
    }
}

impl<Key: StorageKey, Value> IndexMut<Key> for KeyedVec<Key, Value> {
    fn index_mut(&mut self, key: Key) -> &mut Value {
        &mut self.values[key.index()]
    }
}
