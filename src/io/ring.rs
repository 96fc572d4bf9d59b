/// Index arithmetic for a pipelined buffer rotation
///
/// `lead` buffers are kept in flight ahead of the one being consumed. Each cycle enqueues the
/// slot under the cursor and then consumes the slot queued `lead` cycles earlier, so with a lead
/// of two a capture device always holds a spare buffer to fill while the previous one is read.
/// Output channels use a lead of zero and consume what they just queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    count: u32,
    lead: u32,
    cursor: u32,
    ready: Option<u32>,
}

impl Ring {
    /// Returns a ring over `count` slots, or `None` unless `count > lead`
    ///
    /// # Example
    ///
    /// ```
    /// use rawcap::io::Ring;
    /// let mut ring = Ring::new(3, 2).unwrap();
    /// ring.prime();
    /// assert_eq!(ring.enqueue_next(), 2);
    /// assert_eq!(ring.dequeue_ready(), 0);
    /// ```
    pub fn new(count: u32, lead: u32) -> Option<Self> {
        if count <= lead {
            return None;
        }
        Some(Ring {
            count,
            lead,
            cursor: 0,
            ready: None,
        })
    }

    /// Slot to hand to the device next
    pub fn enqueue_next(&self) -> u32 {
        self.cursor
    }

    /// Slot that completes for the enqueue just issued, recorded as the ready slot
    pub fn dequeue_ready(&mut self) -> u32 {
        let index = (self.cursor + self.count - self.lead) % self.count;
        self.ready = Some(index);
        index
    }

    /// Moves the cursor past the slot just consumed
    pub fn rotate(&mut self) {
        self.cursor = (self.cursor + 1) % self.count;
    }

    /// Slots queued before streaming starts, advancing the cursor past each of them
    pub fn prime(&mut self) -> Vec<u32> {
        (0..self.lead)
            .map(|_| {
                let index = self.enqueue_next();
                self.rotate();
                index
            })
            .collect()
    }

    /// Back to the initial position, with nothing in flight
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.ready = None;
    }

    pub fn ready(&self) -> Option<u32> {
        self.ready
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn lead(&self) -> u32 {
        self.lead
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_must_leave_a_free_slot() {
        assert!(Ring::new(2, 2).is_none());
        assert!(Ring::new(3, 2).is_some());
        assert!(Ring::new(1, 0).is_some());
    }

    #[test]
    fn test_ready_visits_every_slot_in_order() {
        for count in 3..8 {
            let mut ring = Ring::new(count, 2).unwrap();
            assert_eq!(ring.prime(), vec![0, 1]);

            let visited: Vec<u32> = (0..count)
                .map(|_| {
                    let _queued = ring.enqueue_next();
                    let ready = ring.dequeue_ready();
                    ring.rotate();
                    ready
                })
                .collect();
            assert_eq!(visited, (0..count).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_zero_lead_consumes_what_it_queued() {
        let mut ring = Ring::new(3, 0).unwrap();
        assert!(ring.prime().is_empty());
        for _ in 0..5 {
            let queued = ring.enqueue_next();
            assert_eq!(ring.dequeue_ready(), queued);
            ring.rotate();
        }
        assert_eq!(ring.cursor(), 2);
    }
}
