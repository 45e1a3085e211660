//! Outbound write queue: presents one frame at a time to the transport.

use std::collections::VecDeque;

use bytes::Bytes;

/// Pending outbound frames.
///
/// The head is the frame currently submitted to the transport; everything
/// behind it waits. Exactly one of two states holds at any instant: the
/// queue is empty and no write is in flight, or the queue is non-empty and
/// its head has been submitted.
#[derive(Default)]
pub(crate) struct WriteQueue {
    frames: VecDeque<Bytes>,
}

impl WriteQueue {
    /// Append a frame. Returns `true` when the queue was idle and the
    /// caller must start the write pump for the new head.
    pub(crate) fn push(&mut self, frame: Bytes) -> bool {
        let was_idle = self.frames.is_empty();
        self.frames.push_back(frame);
        was_idle
    }

    /// The frame currently owed to the transport.
    pub(crate) fn head(&self) -> Option<Bytes> {
        self.frames.front().cloned()
    }

    /// Drop the completed head and return the next frame to submit, if any.
    pub(crate) fn advance(&mut self) -> Option<Bytes> {
        self.frames.pop_front();
        self.head()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(byte: u8) -> Bytes {
        Bytes::from(vec![byte])
    }

    #[test]
    fn only_the_empty_transition_starts_the_pump() {
        let mut queue = WriteQueue::default();
        assert!(queue.push(frame(1)));
        assert!(!queue.push(frame(2)));
        assert!(!queue.push(frame(3)));
    }

    #[test]
    fn advance_walks_the_queue_in_order() {
        let mut queue = WriteQueue::default();
        queue.push(frame(1));
        queue.push(frame(2));
        queue.push(frame(3));

        assert_eq!(queue.head(), Some(frame(1)));
        assert_eq!(queue.advance(), Some(frame(2)));
        assert_eq!(queue.advance(), Some(frame(3)));
        assert_eq!(queue.advance(), None);
        assert_eq!(queue.len(), 0);

        // Once drained, the next push starts the pump again.
        assert!(queue.push(frame(4)));
    }
}
