//! FIFO audio queue
//!
//! Holds decoded clips waiting for the single shared player and drains them
//! one at a time, strictly in enqueue order. Only the queue starts or halts
//! the player. Clips are released (dropped) as soon as they finish, fail to
//! start, or are flushed.

use std::collections::VecDeque;

use super::player::PlayerError;

/// The one playback device the queue drives
pub trait AudioSink<T> {
    /// Begin playing `item`; completion must be reported back with `ticket`
    fn start(&mut self, item: &T, ticket: u64) -> Result<(), PlayerError>;

    /// Stop whatever is playing
    fn halt(&mut self);
}

#[derive(Debug)]
pub struct AudioQueue<T> {
    pending: VecDeque<T>,
    current: Option<(u64, T)>,
    last_ticket: u64,
}

impl<T> Default for AudioQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AudioQueue<T> {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            current: None,
            last_ticket: 0,
        }
    }

    /// Nothing playing and nothing waiting
    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.pending.is_empty()
    }

    pub fn is_playing(&self) -> bool {
        self.current.is_some()
    }

    /// Clips waiting behind the current one
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn current_ticket(&self) -> Option<u64> {
        self.current.as_ref().map(|(ticket, _)| *ticket)
    }

    /// Append a clip, starting playback if the player is free
    pub fn push<S: AudioSink<T>>(&mut self, item: T, sink: &mut S) {
        self.pending.push_back(item);
        if self.current.is_none() {
            self.advance(sink);
        }
    }

    /// Handle the player finishing `ticket`. Stale tickets (from halted
    /// playbacks) are ignored. Returns `true` if the queue advanced.
    pub fn finished<S: AudioSink<T>>(&mut self, ticket: u64, sink: &mut S) -> bool {
        if self.current_ticket() != Some(ticket) {
            return false;
        }
        self.current = None;
        self.advance(sink);
        true
    }

    /// Drop every clip and halt playback. Returns how many were discarded.
    pub fn flush<S: AudioSink<T>>(&mut self, sink: &mut S) -> usize {
        let mut discarded = self.pending.len();
        self.pending.clear();
        if self.current.take().is_some() {
            sink.halt();
            discarded += 1;
        }
        discarded
    }

    /// Start the next clip that the player accepts; clips that fail to start
    /// are dropped so one bad item never stalls the queue
    fn advance<S: AudioSink<T>>(&mut self, sink: &mut S) {
        while let Some(item) = self.pending.pop_front() {
            self.last_ticket += 1;
            let ticket = self.last_ticket;
            match sink.start(&item, ticket) {
                Ok(()) => {
                    self.current = Some((ticket, item));
                    return;
                }
                Err(e) => log::warn!("Skipping clip {}: {}", ticket, e),
            }
        }
    }
}
