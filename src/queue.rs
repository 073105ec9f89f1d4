//! Ordered delivery of log entries
//!
//! Entries are written in FIFO order. While paused, new entries collect in a back queue
//! and are only written on resume, which lets a caller place extra entries in front of
//! everything that arrived during the pause.
//!
//! Pauses nest: the queue counts them and resumes draining only when the last one is
//! released, so overlapping pausers cannot unpause each other early.
//!
//! An entry can also be *held*: it takes its place in the back queue at once, but nothing
//! from that place onward is written until the hold is completed, optionally with a
//! response entry written directly before it. Holds keep the call order of overlapping
//! webhook calls.

use std::collections::VecDeque;

use crate::entry::LogEntry;
use crate::error::Result;

/// Destination of drained entries
pub trait EntrySink {
    /// Write one entry; an error stops the drain
    fn write_entry(&mut self, entry: &LogEntry) -> Result<()>;
}

/// Handle of a held entry, returned by [`DeliveryQueue::hold`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HoldId(u64);

#[derive(Debug)]
enum Slot {
    Ready(LogEntry),
    Held { id: HoldId, entry: LogEntry },
}

impl Slot {
    fn into_ready(self) -> Self {
        match self {
            Slot::Held { entry, .. } => Slot::Ready(entry),
            ready => ready,
        }
    }
}

/// FIFO queue with pause/resume, front-of-line injection and held slots
#[derive(Debug, Default)]
pub struct DeliveryQueue {
    main: VecDeque<LogEntry>,
    back: VecDeque<Slot>,
    pauses: usize,
    holds: usize,
    next_hold: u64,
}

impl DeliveryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether new entries go to the back queue, because of a pause or a pending hold
    pub fn is_paused(&self) -> bool {
        self.pauses > 0 || self.holds > 0
    }

    /// Number of outstanding pauses
    pub fn pause_depth(&self) -> usize {
        self.pauses
    }

    /// Number of held entries not yet completed
    pub fn held(&self) -> usize {
        self.holds
    }

    /// Entries waiting in the back queue, held ones included
    pub fn back_len(&self) -> usize {
        self.back.len()
    }

    /// Entries not yet written
    pub fn pending(&self) -> usize {
        self.main.len() + self.back.len()
    }

    /// Queue an entry; when not paused it is written immediately together with
    /// anything still queued ahead of it
    pub fn enqueue(&mut self, entry: LogEntry, sink: &mut impl EntrySink) -> Result<()> {
        if self.is_paused() {
            self.back.push_back(Slot::Ready(entry));
            Ok(())
        } else {
            self.main.push_back(entry);
            self.drain(sink)
        }
    }

    /// Stop writing; later entries collect in the back queue
    pub fn pause(&mut self) {
        self.pauses += 1;
    }

    /// Put an entry at the front of the back queue
    ///
    /// Only valid while paused. Otherwise the entry is handed back untouched.
    pub fn inject_front(&mut self, entry: LogEntry) -> std::result::Result<(), LogEntry> {
        if !self.is_paused() {
            return Err(entry);
        }
        self.back.push_front(Slot::Ready(entry));
        Ok(())
    }

    /// Release one pause; releasing the last one writes the back queue up to the first
    /// pending hold
    pub fn resume(&mut self, sink: &mut impl EntrySink) -> Result<()> {
        if self.pauses > 1 {
            self.pauses -= 1;
            return Ok(());
        }
        self.pauses = 0;
        self.release(sink)
    }

    /// Reserve the entry's place at the end of the queue without writing it
    pub fn hold(&mut self, entry: LogEntry) -> HoldId {
        let id = HoldId(self.next_hold);
        self.next_hold += 1;
        self.holds += 1;
        self.back.push_back(Slot::Held { id, entry });
        id
    }

    /// Complete a hold, placing `response` directly before the held entry
    ///
    /// If the hold was already released by [`flush`](Self::flush), the response is
    /// simply queued.
    pub fn complete(
        &mut self,
        id: HoldId,
        response: Option<LogEntry>,
        sink: &mut impl EntrySink,
    ) -> Result<()> {
        let position = self
            .back
            .iter()
            .position(|slot| matches!(slot, Slot::Held { id: held, .. } if *held == id));
        let Some(index) = position else {
            return match response {
                Some(response) => self.enqueue(response, sink),
                None => Ok(()),
            };
        };

        if let Some(slot) = self.back.remove(index) {
            self.back.insert(index, slot.into_ready());
        }
        if let Some(response) = response {
            self.back.insert(index, Slot::Ready(response));
        }
        self.holds = self.holds.saturating_sub(1);
        self.release(sink)
    }

    /// Release every pause and hold and write everything that is waiting
    pub fn flush(&mut self, sink: &mut impl EntrySink) -> Result<()> {
        self.pauses = 0;
        self.holds = 0;
        self.back = self.back.drain(..).map(Slot::into_ready).collect();
        self.release(sink)
    }

    /// Move ready entries from the front of the back queue to the main queue and drain
    fn release(&mut self, sink: &mut impl EntrySink) -> Result<()> {
        if self.pauses == 0 {
            while let Some(Slot::Ready(_)) = self.back.front() {
                let Some(Slot::Ready(entry)) = self.back.pop_front() else {
                    break;
                };
                self.main.push_back(entry);
            }
        }
        self.drain(sink)
    }

    /// Write every entry queued at the time of the call
    ///
    /// An entry is removed only after it has been written, so a failed write leaves
    /// it and everything behind it queued for the next drain.
    pub fn drain(&mut self, sink: &mut impl EntrySink) -> Result<()> {
        let count = self.main.len();
        for _ in 0..count {
            let Some(entry) = self.main.front() else {
                break;
            };
            sink.write_entry(entry)?;
            self.main.pop_front();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoggerError;

    #[derive(Default)]
    struct RecordingSink {
        written: Vec<String>,
        fail_on: Option<String>,
    }

    impl EntrySink for RecordingSink {
        fn write_entry(&mut self, entry: &LogEntry) -> Result<()> {
            if self.fail_on.as_deref() == Some(entry.text()) {
                return Err(LoggerError::io(
                    "failed to append to",
                    "test.log",
                    std::io::Error::new(std::io::ErrorKind::Other, "boom"),
                ));
            }
            self.written.push(entry.text().to_string());
            Ok(())
        }
    }

    fn entry(text: &str) -> LogEntry {
        LogEntry::text_only("test", text)
    }

    #[test]
    fn test_enqueue_drains_immediately() {
        let mut queue = DeliveryQueue::new();
        let mut sink = RecordingSink::default();

        queue.enqueue(entry("a"), &mut sink).unwrap();
        queue.enqueue(entry("b"), &mut sink).unwrap();

        assert_eq!(sink.written, vec!["a", "b"]);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_paused_enqueue_does_not_write() {
        let mut queue = DeliveryQueue::new();
        let mut sink = RecordingSink::default();

        queue.pause();
        queue.enqueue(entry("a"), &mut sink).unwrap();
        queue.enqueue(entry("b"), &mut sink).unwrap();

        assert!(sink.written.is_empty());
        assert_eq!(queue.back_len(), 2);

        queue.resume(&mut sink).unwrap();
        assert_eq!(sink.written, vec!["a", "b"]);
        assert!(!queue.is_paused());
        assert_eq!(queue.back_len(), 0);
    }

    #[test]
    fn test_response_written_before_original_then_later_entries() {
        let mut queue = DeliveryQueue::new();
        let mut sink = RecordingSink::default();

        queue.pause();
        queue.enqueue(entry("during pause 1"), &mut sink).unwrap();
        queue.enqueue(entry("during pause 2"), &mut sink).unwrap();
        queue.inject_front(entry("original")).unwrap();
        queue.inject_front(entry("response")).unwrap();
        queue.resume(&mut sink).unwrap();
        queue.enqueue(entry("after resume"), &mut sink).unwrap();

        assert_eq!(
            sink.written,
            vec![
                "response",
                "original",
                "during pause 1",
                "during pause 2",
                "after resume"
            ]
        );
    }

    #[test]
    fn test_inject_front_requires_pause() {
        let mut queue = DeliveryQueue::new();
        let rejected = queue.inject_front(entry("x")).unwrap_err();
        assert_eq!(rejected.text(), "x");
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_nested_pauses_drain_on_last_resume() {
        let mut queue = DeliveryQueue::new();
        let mut sink = RecordingSink::default();

        queue.pause();
        queue.pause();
        queue.enqueue(entry("a"), &mut sink).unwrap();
        assert_eq!(queue.pause_depth(), 2);

        queue.resume(&mut sink).unwrap();
        assert!(queue.is_paused());
        assert!(sink.written.is_empty());

        queue.resume(&mut sink).unwrap();
        assert!(!queue.is_paused());
        assert_eq!(sink.written, vec!["a"]);
    }

    #[test]
    fn test_hold_keeps_its_place() {
        let mut queue = DeliveryQueue::new();
        let mut sink = RecordingSink::default();

        queue.enqueue(entry("before"), &mut sink).unwrap();
        let id = queue.hold(entry("original"));
        queue.enqueue(entry("after"), &mut sink).unwrap();
        assert!(queue.is_paused());
        assert_eq!(sink.written, vec!["before"]);

        queue.complete(id, Some(entry("response")), &mut sink).unwrap();
        assert_eq!(sink.written, vec!["before", "response", "original", "after"]);
        assert!(!queue.is_paused());
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_overlapping_holds_complete_in_call_order() {
        let mut queue = DeliveryQueue::new();
        let mut sink = RecordingSink::default();

        let first = queue.hold(entry("first original"));
        queue.enqueue(entry("between"), &mut sink).unwrap();
        let second = queue.hold(entry("second original"));
        queue.enqueue(entry("after both"), &mut sink).unwrap();

        queue
            .complete(second, Some(entry("second response")), &mut sink)
            .unwrap();
        assert!(sink.written.is_empty());
        assert_eq!(queue.held(), 1);

        queue
            .complete(first, Some(entry("first response")), &mut sink)
            .unwrap();
        assert_eq!(
            sink.written,
            vec![
                "first response",
                "first original",
                "between",
                "second response",
                "second original",
                "after both"
            ]
        );
    }

    #[test]
    fn test_first_hold_completing_writes_up_to_next_hold() {
        let mut queue = DeliveryQueue::new();
        let mut sink = RecordingSink::default();

        let first = queue.hold(entry("first original"));
        queue.enqueue(entry("between"), &mut sink).unwrap();
        let second = queue.hold(entry("second original"));

        queue.complete(first, None, &mut sink).unwrap();
        assert_eq!(sink.written, vec!["first original", "between"]);
        assert!(queue.is_paused());

        queue.complete(second, None, &mut sink).unwrap();
        assert_eq!(
            sink.written,
            vec!["first original", "between", "second original"]
        );
    }

    #[test]
    fn test_completed_hold_waits_for_manual_pause() {
        let mut queue = DeliveryQueue::new();
        let mut sink = RecordingSink::default();

        queue.pause();
        let id = queue.hold(entry("original"));
        queue.complete(id, Some(entry("response")), &mut sink).unwrap();
        assert!(sink.written.is_empty());

        queue.resume(&mut sink).unwrap();
        assert_eq!(sink.written, vec!["response", "original"]);
    }

    #[test]
    fn test_flush_writes_held_entries() {
        let mut queue = DeliveryQueue::new();
        let mut sink = RecordingSink::default();

        let id = queue.hold(entry("original"));
        queue.enqueue(entry("after"), &mut sink).unwrap();
        queue.flush(&mut sink).unwrap();
        assert_eq!(sink.written, vec!["original", "after"]);
        assert_eq!(queue.held(), 0);

        // A late completion only adds its response
        queue.complete(id, Some(entry("late response")), &mut sink).unwrap();
        assert_eq!(sink.written, vec!["original", "after", "late response"]);
    }

    #[test]
    fn test_flush_releases_all_pauses() {
        let mut queue = DeliveryQueue::new();
        let mut sink = RecordingSink::default();

        queue.pause();
        queue.pause();
        queue.enqueue(entry("a"), &mut sink).unwrap();
        queue.flush(&mut sink).unwrap();

        assert!(!queue.is_paused());
        assert_eq!(sink.written, vec!["a"]);
    }

    #[test]
    fn test_resume_without_pause_just_drains() {
        let mut queue = DeliveryQueue::new();
        let mut sink = RecordingSink::default();
        queue.resume(&mut sink).unwrap();
        assert_eq!(queue.pause_depth(), 0);
        assert!(sink.written.is_empty());
    }

    #[test]
    fn test_failed_write_keeps_remaining_entries() {
        let mut queue = DeliveryQueue::new();
        let mut sink = RecordingSink {
            fail_on: Some("b".to_string()),
            ..Default::default()
        };

        queue.pause();
        for text in ["a", "b", "c"] {
            queue.enqueue(entry(text), &mut sink).unwrap();
        }
        assert!(queue.resume(&mut sink).is_err());
        assert_eq!(sink.written, vec!["a"]);
        assert_eq!(queue.pending(), 2);

        sink.fail_on = None;
        queue.drain(&mut sink).unwrap();
        assert_eq!(sink.written, vec!["a", "b", "c"]);
    }
}
