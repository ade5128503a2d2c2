// Fixed-capacity ring storage. Not synchronized: every caller holds the
// owning buffer's lock.

pub(crate) struct RingStorage<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    size: usize,
}

impl<T> RingStorage<T> {
    /// `capacity` must be non-zero; the buffer constructors validate it.
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        RingStorage {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            tail: 0,
            size: 0,
        }
    }

    pub(crate) fn try_push(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }
        debug_assert!(self.slots[self.tail].is_none());
        self.slots[self.tail] = Some(value);
        self.tail = (self.tail + 1) % self.capacity();
        self.size += 1;
        Ok(())
    }

    pub(crate) fn try_pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let value = self.slots[self.head].take();
        debug_assert!(value.is_some());
        self.head = (self.head + 1) % self.capacity();
        self.size -= 1;
        value
    }

    pub(crate) fn len(&self) -> usize {
        self.size
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub(crate) fn is_full(&self) -> bool {
        self.size == self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_until_full_then_reject() {
        let mut ring = RingStorage::new(2);
        assert!(ring.is_empty());
        assert_eq!(ring.try_push('a'), Ok(()));
        assert_eq!(ring.try_push('b'), Ok(()));
        assert!(ring.is_full());
        assert_eq!(ring.try_push('c'), Err('c'));
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn pop_empty_is_none_without_mutation() {
        let mut ring: RingStorage<u8> = RingStorage::new(3);
        assert_eq!(ring.try_pop(), None);
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.try_push(1), Ok(()));
        assert_eq!(ring.try_pop(), Some(1));
        assert_eq!(ring.try_pop(), None);
    }

    #[test]
    fn indices_wrap_around_preserving_order() {
        let mut ring = RingStorage::new(3);
        let mut next_in = 0u32;
        let mut next_out = 0u32;
        // Interleave so head and tail lap the slot array several times.
        for round in 0..10 {
            for _ in 0..(round % 3) + 1 {
                if ring.try_push(next_in).is_ok() {
                    next_in += 1;
                }
            }
            while let Some(v) = ring.try_pop() {
                assert_eq!(v, next_out);
                next_out += 1;
            }
        }
        assert_eq!(next_in, next_out);
        assert!(ring.is_empty());
    }

    #[test]
    fn single_slot_ring() {
        let mut ring = RingStorage::new(1);
        assert_eq!(ring.capacity(), 1);
        assert_eq!(ring.try_push(5), Ok(()));
        assert_eq!(ring.try_push(7), Err(7));
        assert_eq!(ring.try_pop(), Some(5));
        assert_eq!(ring.try_pop(), None);
    }
}
