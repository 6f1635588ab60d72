//! Growable double-ended ring buffer.
//!
//! Elements live in a circular `Vec<Option<T>>`; `head` is the slot of the
//! logical front. Pushes and pops at either end are O(1), indexed access is
//! O(1), and arbitrary-index insert/remove shift whichever side is shorter.

use std::fmt;
use std::iter::FusedIterator;
use std::ops::{Index, IndexMut};

use crate::DequeError;

/// Capacity used by [`Deque::new`] and when growing from zero.
pub const DEFAULT_CAPACITY: usize = 8;

pub struct Deque<T> {
    buf: Vec<Option<T>>,
    head: usize,
    len: usize,
}

fn empty_slots<T>(capacity: usize) -> Vec<Option<T>> {
    let mut buf = Vec::with_capacity(capacity);
    buf.resize_with(capacity, || None);
    buf
}

impl<T> Deque<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: empty_slots(capacity),
            head: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Resize the backing ring, preserving logical order across the wrap point.
    ///
    /// Fails with [`DequeError::CapacityBelowCount`] if `capacity` would not hold
    /// the current elements.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<(), DequeError> {
        if capacity < self.len {
            return Err(DequeError::CapacityBelowCount {
                capacity,
                len: self.len,
            });
        }
        if capacity == self.buf.len() {
            return Ok(());
        }

        let mut buf = empty_slots(capacity);
        for (index, slot) in buf.iter_mut().take(self.len).enumerate() {
            let from = self.slot(index);
            *slot = self.buf[from].take();
        }
        self.buf = buf;
        self.head = 0;
        Ok(())
    }

    /// Make room for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        let needed = self.len.saturating_add(additional);
        if needed <= self.buf.len() {
            return;
        }
        let grown = (self.buf.len() * 2).max(DEFAULT_CAPACITY).max(needed);
        // `grown >= needed > len`, so this cannot fail.
        let _ = self.set_capacity(grown);
    }

    pub fn add_to_back(&mut self, value: T) {
        self.reserve(1);
        let slot = self.slot(self.len);
        self.buf[slot] = Some(value);
        self.len += 1;
    }

    pub fn add_to_front(&mut self, value: T) {
        self.reserve(1);
        self.head = match self.head {
            0 => self.buf.len() - 1,
            head => head - 1,
        };
        self.buf[self.head] = Some(value);
        self.len += 1;
    }

    pub fn remove_from_front(&mut self) -> Result<T, DequeError> {
        if self.len == 0 {
            return Err(DequeError::Empty);
        }
        let value = self.buf[self.head].take();
        self.head += 1;
        if self.head == self.buf.len() {
            self.head = 0;
        }
        self.len -= 1;
        value.ok_or(DequeError::Empty)
    }

    pub fn remove_from_back(&mut self) -> Result<T, DequeError> {
        if self.len == 0 {
            return Err(DequeError::Empty);
        }
        let slot = self.slot(self.len - 1);
        self.len -= 1;
        self.buf[slot].take().ok_or(DequeError::Empty)
    }

    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.get_mut(0)
    }

    pub fn back(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|last| self.get(last))
    }

    pub fn back_mut(&mut self) -> Option<&mut T> {
        match self.len.checked_sub(1) {
            Some(last) => self.get_mut(last),
            None => None,
        }
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        self.buf[self.slot(index)].as_ref()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len {
            return None;
        }
        let slot = self.slot(index);
        self.buf[slot].as_mut()
    }

    /// Replace the element at `index`, returning the previous value.
    pub fn set(&mut self, index: usize, value: T) -> Result<T, DequeError> {
        let len = self.len;
        match self.get_mut(index) {
            Some(current) => Ok(std::mem::replace(current, value)),
            None => Err(DequeError::IndexOutOfRange { index, len }),
        }
    }

    /// Insert `value` so that it ends up at `index` (`index == len` appends).
    pub fn insert(&mut self, index: usize, value: T) -> Result<(), DequeError> {
        if index > self.len {
            return Err(DequeError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }

        if index < self.len / 2 {
            self.add_to_front(value);
            for i in 0..index {
                self.swap_logical(i, i + 1);
            }
        } else {
            let last = self.len;
            self.add_to_back(value);
            for i in (index..last).rev() {
                self.swap_logical(i, i + 1);
            }
        }
        Ok(())
    }

    /// Insert every item of `items`, in order, starting at `index`.
    pub fn insert_range<I>(&mut self, index: usize, items: I) -> Result<(), DequeError>
    where
        I: IntoIterator<Item = T>,
    {
        if index > self.len {
            return Err(DequeError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }

        let items = items.into_iter();
        self.reserve(items.size_hint().0);

        let before = self.len;
        for item in items {
            self.add_to_back(item);
        }
        let added = self.len - before;

        // [index, len) is now <old tail><new items>; rotate the new block forward.
        self.reverse_logical(index, self.len);
        self.reverse_logical(index, index + added);
        self.reverse_logical(index + added, self.len);
        Ok(())
    }

    pub fn remove_at(&mut self, index: usize) -> Result<T, DequeError> {
        if index >= self.len {
            return Err(DequeError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }

        if index < self.len / 2 {
            for i in (0..index).rev() {
                self.swap_logical(i, i + 1);
            }
            self.remove_from_front()
        } else {
            for i in index..self.len - 1 {
                self.swap_logical(i, i + 1);
            }
            self.remove_from_back()
        }
    }

    /// Remove `count` elements starting at `index`.
    pub fn remove_range(&mut self, index: usize, count: usize) -> Result<(), DequeError> {
        if index > self.len || count > self.len - index {
            return Err(DequeError::IndexOutOfRange {
                index: index.saturating_add(count),
                len: self.len,
            });
        }

        for i in index..self.len - count {
            self.swap_logical(i, i + count);
        }
        for _ in 0..count {
            let slot = self.slot(self.len - 1);
            self.buf[slot] = None;
            self.len -= 1;
        }
        if self.len == 0 {
            self.head = 0;
        }
        Ok(())
    }

    pub fn index_of(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.iter().position(|item| item == value)
    }

    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.index_of(value).is_some()
    }

    pub fn clear(&mut self) {
        for index in 0..self.len {
            let slot = self.slot(index);
            self.buf[slot] = None;
        }
        self.head = 0;
        self.len = 0;
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            deque: self,
            front: 0,
            back: self.len,
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        let len = self.len;
        let (wrapped, tail) = self.buf.split_at_mut(self.head);
        tail.iter_mut()
            .chain(wrapped.iter_mut())
            .take(len)
            .filter_map(Option::as_mut)
    }

    fn slot(&self, index: usize) -> usize {
        let slot = self.head + index;
        if slot >= self.buf.len() {
            slot - self.buf.len()
        } else {
            slot
        }
    }

    fn swap_logical(&mut self, a: usize, b: usize) {
        let (a, b) = (self.slot(a), self.slot(b));
        self.buf.swap(a, b);
    }

    fn reverse_logical(&mut self, start: usize, end: usize) {
        if end <= start {
            return;
        }
        let (mut lo, mut hi) = (start, end - 1);
        while lo < hi {
            self.swap_logical(lo, hi);
            lo += 1;
            hi -= 1;
        }
    }
}

impl<T> Default for Deque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Deque<T> {
    fn clone(&self) -> Self {
        let mut out = Self::with_capacity(self.capacity());
        out.extend(self.iter().cloned());
        out
    }
}

impl<T: fmt::Debug> fmt::Debug for Deque<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for Deque<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for Deque<T> {}

impl<T> Index<usize> for Deque<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        let len = self.len;
        self.get(index)
            .unwrap_or_else(|| panic!("index {index} out of range for deque of length {len}"))
    }
}

impl<T> IndexMut<usize> for Deque<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.len;
        self.get_mut(index)
            .unwrap_or_else(|| panic!("index {index} out of range for deque of length {len}"))
    }
}

impl<T> From<Vec<T>> for Deque<T> {
    fn from(items: Vec<T>) -> Self {
        if items.is_empty() {
            return Self::new();
        }
        let len = items.len();
        Self {
            buf: items.into_iter().map(Some).collect(),
            head: 0,
            len,
        }
    }
}

impl<T> FromIterator<T> for Deque<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<T> Extend<T> for Deque<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for item in iter {
            self.add_to_back(item);
        }
    }
}

pub struct Iter<'a, T> {
    deque: &'a Deque<T>,
    front: usize,
    back: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.front == self.back {
            return None;
        }
        let item = self.deque.get(self.front);
        self.front += 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        self.deque.get(self.back)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a Deque<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

pub struct IntoIter<T> {
    deque: Deque<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.deque.remove_from_front().ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.deque.len(), Some(self.deque.len()))
    }
}

impl<T> DoubleEndedIterator for IntoIter<T> {
    fn next_back(&mut self) -> Option<T> {
        self.deque.remove_from_back().ok()
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> FusedIterator for IntoIter<T> {}

impl<T> IntoIterator for Deque<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter { deque: self }
    }
}
