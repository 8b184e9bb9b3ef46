//! Fixed-capacity ring buffer over caller-supplied storage.
//!
//! Pushing into a full buffer evicts the oldest entry. Indices passed to
//! [`CircularBuffer::get`] and [`CircularBuffer::pop`] are relative to the
//! oldest entry. The buffer never allocates and is not synchronized: exactly
//! one owner may mutate it.

use core::marker::PhantomData;

/// Ring buffer of `T` stored in `S` (an array, slice or boxed slice).
///
/// Capacity is the length of the storage. A zero-capacity buffer accepts and
/// discards every push.
pub struct CircularBuffer<T, S> {
    storage: S,
    head: usize,
    tail: usize,
    empty: bool,
    _item: PhantomData<T>,
}

impl<T, S> CircularBuffer<T, S>
where
    T: Copy,
    S: AsRef<[T]> + AsMut<[T]>,
{
    /// Wrap `storage`. Existing contents are ignored; the buffer starts empty.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            head: 0,
            tail: 0,
            empty: true,
            _item: PhantomData,
        }
    }

    /// Maximum number of entries.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.as_ref().len()
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.empty = true;
    }

    /// Number of entries currently stored.
    pub fn size(&self) -> usize {
        if self.empty {
            0
        } else if self.head > self.tail {
            self.head - self.tail
        } else {
            self.head + self.capacity() - self.tail
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        !self.empty && self.head == self.tail
    }

    /// Append `item`, evicting the oldest entry when full.
    pub fn push(&mut self, item: T) {
        if self.capacity() == 0 {
            return;
        }
        if self.is_full() {
            self.tail = self.next(self.tail);
        }
        let head = self.head;
        self.storage.as_mut()[head] = item;
        self.head = self.next(head);
        self.empty = false;
    }

    /// Entry `index` positions after the oldest one.
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.size() {
            return None;
        }
        Some(self.storage.as_ref()[self.slot(index)])
    }

    /// Remove and return entry `index`. Remaining entries keep their order.
    pub fn pop(&mut self, index: usize) -> Option<T> {
        if index >= self.size() {
            return None;
        }
        let item = self.storage.as_ref()[self.slot(index)];

        // Close the gap by moving the older entries one slot towards the head.
        for i in (0..index).rev() {
            let from = self.slot(i);
            let to = self.slot(i + 1);
            let storage = self.storage.as_mut();
            storage[to] = storage[from];
        }
        self.tail = self.next(self.tail);
        if self.tail == self.head {
            self.empty = true;
        }
        Some(item)
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let storage = self.storage.as_ref();
        (0..self.size()).map(move |i| &storage[self.slot(i)])
    }

    /// Visit entries from oldest to newest.
    pub fn iterate<F: FnMut(&T)>(&self, mut f: F) {
        for item in self.iter() {
            f(item);
        }
    }

    #[inline]
    fn slot(&self, index: usize) -> usize {
        (self.tail + index) % self.capacity()
    }

    #[inline]
    fn next(&self, i: usize) -> usize {
        if i + 1 >= self.capacity() { 0 } else { i + 1 }
    }
}

impl<T, S> core::fmt::Debug for CircularBuffer<T, S>
where
    T: Copy + core::fmt::Debug,
    S: AsRef<[T]> + AsMut<[T]>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
