//! A fixed-capacity sorted array over caller-provided storage.

use core::ptr::NonNull;

/// Strict ordering predicate.
pub type LessThan<T> = fn(&T, &T) -> bool;

/// Items kept sorted by `less_than`. A new item goes before any equal ones.
pub struct OrderedArray<T: Copy> {
    items: NonNull<T>,
    len: usize,
    capacity: usize,
    less_than: LessThan<T>,
}

impl<T: Copy> OrderedArray<T> {
    /// An empty array using the `capacity` slots at `storage`.
    ///
    /// # Safety
    /// `storage` must hold `capacity` initialized items, stay valid for
    /// reads and writes while the array is used, and not be accessed
    /// through anything else.
    pub const unsafe fn place(storage: NonNull<T>, capacity: usize, less_than: LessThan<T>) -> Self {
        Self {
            items: storage,
            len: 0,
            capacity,
            less_than,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    fn as_slice(&self) -> &[T] {
        unsafe { core::slice::from_raw_parts(self.items.as_ptr(), self.len) }
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { core::slice::from_raw_parts_mut(self.items.as_ptr(), self.len) }
    }

    /// Insert `item` after every element that is less than it.
    ///
    /// # Panics
    /// If the array is full.
    pub fn insert(&mut self, item: T) {
        assert!(!self.is_full(), "ordered array full ({} items)", self.capacity);
        let less_than = self.less_than;
        let at = self
            .as_slice()
            .iter()
            .position(|x| !less_than(x, &item))
            .unwrap_or(self.len);
        self.len += 1;
        let items = self.as_mut_slice();
        items.copy_within(at..items.len() - 1, at + 1);
        items[at] = item;
    }

    /// # Panics
    /// If `index` is out of bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> T {
        self.as_slice()[index]
    }

    /// Remove the item at `index`, shifting the tail down.
    ///
    /// # Panics
    /// If `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> T {
        let items = self.as_mut_slice();
        let item = items[index];
        items.copy_within(index + 1.., index);
        self.len -= 1;
        item
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.as_slice().iter().copied()
    }
}

impl<T: Copy + PartialEq> OrderedArray<T> {
    /// Index of the first item equal to `item`.
    #[must_use]
    pub fn position(&self, item: T) -> Option<usize> {
        self.as_slice().iter().position(|x| *x == item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn by_value(a: &u32, b: &u32) -> bool {
        a < b
    }

    fn array(storage: &mut [u32]) -> OrderedArray<u32> {
        let ptr = NonNull::new(storage.as_mut_ptr()).unwrap();
        unsafe { OrderedArray::place(ptr, storage.len(), by_value) }
    }

    #[test]
    fn keeps_items_sorted() {
        let mut storage = [0u32; 8];
        let mut a = array(&mut storage);
        for x in [5, 1, 4, 1, 9] {
            a.insert(x);
        }
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 1, 4, 5, 9]);
        assert_eq!(a.remove(2), 4);
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 1, 5, 9]);
        assert_eq!(a.position(9), Some(3));
        assert_eq!(a.position(4), None);
    }

    #[test]
    fn remove_last_and_refill() {
        let mut storage = [0u32; 2];
        let mut a = array(&mut storage);
        a.insert(2);
        a.insert(1);
        assert!(a.is_full());
        assert_eq!(a.remove(1), 2);
        a.insert(3);
        assert_eq!(a.get(1), 3);
    }

    #[test]
    #[should_panic(expected = "ordered array full")]
    fn overflow_panics() {
        let mut storage = [0u32; 1];
        let mut a = array(&mut storage);
        a.insert(1);
        a.insert(2);
    }
}
