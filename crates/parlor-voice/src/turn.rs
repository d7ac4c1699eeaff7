//! Turn segmentation: buffering inbound audio frames between boundaries.
//!
//! A turn is one user utterance cycle, opened by the first audio frame after
//! a boundary and closed by a zero-length frame. The session's receive loop
//! owns the buffer exclusively, so no locking is needed.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Accumulates inbound PCM16 frames for the turn currently being spoken.
#[derive(Debug, Default)]
pub struct TurnBuffer {
    frames: Vec<Vec<u8>>,
}

impl TurnBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one audio frame, preserving arrival order.
    pub fn append(&mut self, frame: Vec<u8>) {
        self.frames.push(frame);
    }

    /// Concatenates all buffered frames in arrival order and clears the
    /// buffer in the same step, so frames arriving while the turn is being
    /// processed unambiguously belong to the next turn.
    ///
    /// Returns an empty payload when nothing was buffered; callers must
    /// treat that as "no audio, skip the turn" rather than invoking the
    /// pipeline.
    pub fn drain(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.frames).concat()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// One assembled turn: the audio between two boundaries, stamped for logs.
#[derive(Debug)]
pub struct Turn {
    /// Short opaque identifier for log correlation. Collisions are
    /// tolerated; nothing keys off this value.
    pub id: String,
    /// When the turn boundary was detected.
    pub started_at: DateTime<Utc>,
    /// Raw PCM16 payload, immutable once assembled.
    pub audio: Vec<u8>,
}

impl Turn {
    /// Stamps a drained payload with a fresh id and timestamp.
    pub fn new(audio: Vec<u8>) -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(8);
        Self {
            id,
            started_at: Utc::now(),
            audio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_concatenates_in_arrival_order() {
        let mut buffer = TurnBuffer::new();
        buffer.append(vec![1, 2]);
        buffer.append(vec![3]);
        buffer.append(vec![4, 5, 6]);
        assert_eq!(buffer.drain(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn drain_clears_the_buffer() {
        let mut buffer = TurnBuffer::new();
        buffer.append(vec![1, 2]);
        let _ = buffer.drain();
        assert!(buffer.is_empty());
        assert_eq!(buffer.drain(), Vec::<u8>::new());
    }

    #[test]
    fn empty_drain_is_safe() {
        let mut buffer = TurnBuffer::new();
        assert_eq!(buffer.drain(), Vec::<u8>::new());
        assert!(buffer.is_empty());
    }

    #[test]
    fn frames_appended_after_drain_start_the_next_turn() {
        let mut buffer = TurnBuffer::new();
        buffer.append(vec![1]);
        assert_eq!(buffer.drain(), vec![1]);
        buffer.append(vec![2]);
        assert_eq!(buffer.drain(), vec![2]);
    }

    #[test]
    fn turn_ids_are_short_hex() {
        let turn = Turn::new(vec![0; 4]);
        assert_eq!(turn.id.len(), 8);
        assert!(turn.id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
