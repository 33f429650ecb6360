//! Fixed-capacity circular FIFO with overwrite-on-full semantics, used by the
//! FDC/HDC command FIFOs and the keyboard scancode queue.

#[derive(Debug, Clone)]
pub struct RingBuffer {
    buffer: Vec<u8>,
    head: usize,
    tail: usize,
    count: usize,
}

impl RingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        RingBuffer {
            buffer: vec![0; capacity.max(1)],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.buffer.len()
    }

    /// Push a byte. If the buffer is full, the oldest byte is overwritten
    /// and the head advances to keep the newest `capacity` bytes.
    pub fn push(&mut self, value: u8) {
        let cap = self.buffer.len();
        self.buffer[self.tail] = value;
        self.tail = (self.tail + 1) % cap;
        if self.count < cap {
            self.count += 1;
        } else {
            self.head = (self.head + 1) % cap;
        }
    }

    /// Pop the oldest byte, or 0 if empty.
    pub fn pop(&mut self) -> u8 {
        if self.count == 0 {
            return 0;
        }
        let cap = self.buffer.len();
        let value = self.buffer[self.head];
        self.head = (self.head + 1) % cap;
        self.count -= 1;
        value
    }

    /// Look `offset` bytes ahead of the head without consuming. `None` if
    /// `offset >= len()`.
    pub fn peek(&self, offset: usize) -> Option<u8> {
        if offset >= self.count {
            return None;
        }
        let cap = self.buffer.len();
        Some(self.buffer[(self.head + offset) % cap])
    }

    /// Discard up to `amount` bytes from the head, clamped to the current
    /// length.
    pub fn discard(&mut self, amount: usize) {
        let cap = self.buffer.len();
        let amount = amount.min(self.count);
        self.head = (self.head + amount) % cap;
        self.count -= amount;
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut rb = RingBuffer::with_capacity(4);
        rb.push(1);
        rb.push(2);
        rb.push(3);
        assert_eq!(rb.pop(), 1);
        assert_eq!(rb.pop(), 2);
        assert_eq!(rb.len(), 1);
    }

    #[test]
    fn overwrite_on_full_advances_head() {
        let mut rb = RingBuffer::with_capacity(3);
        for v in 1..=5u8 {
            rb.push(v);
        }
        // capacity 3, pushed 5: should hold the last 3 values {3,4,5}
        assert_eq!(rb.len(), 3);
        assert_eq!(rb.pop(), 3);
        assert_eq!(rb.pop(), 4);
        assert_eq!(rb.pop(), 5);
    }

    #[test]
    fn peek_and_discard() {
        let mut rb = RingBuffer::with_capacity(4);
        rb.push(10);
        rb.push(20);
        rb.push(30);
        assert_eq!(rb.peek(1), Some(20));
        assert_eq!(rb.peek(5), None);
        rb.discard(2);
        assert_eq!(rb.len(), 1);
        assert_eq!(rb.pop(), 30);
    }

    proptest::proptest! {
        #[test]
        fn holds_last_min_n_k(pushes in proptest::collection::vec(0u8..=255, 0..64), cap in 1usize..16) {
            let mut rb = RingBuffer::with_capacity(cap);
            for &v in &pushes {
                rb.push(v);
            }
            let expect_len = pushes.len().min(cap);
            proptest::prop_assert_eq!(rb.len(), expect_len);
            let expected: Vec<u8> = pushes[pushes.len() - expect_len..].to_vec();
            let mut got = Vec::new();
            while !rb.is_empty() {
                got.push(rb.pop());
            }
            proptest::prop_assert_eq!(got, expected);
        }
    }
}
