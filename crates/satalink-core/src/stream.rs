//! Valid/ready streaming model shared by every pipeline stage.
//!
//! Each stage is evaluated once per clock tick. A beat moves between two stages only when the
//! producer presents it (`Some`) and the consumer is ready in the same tick. Buffers expose
//! their readiness from registered state, which is what lets the composed pipeline be
//! evaluated in a fixed order without combinational loops.

use std::collections::VecDeque;

/// One transfer on the transport-side channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Beat {
    pub data: u32,
    pub sop: bool,
    pub eop: bool,
    /// Only meaningful on the `eop` beat.
    pub error: bool,
}

impl Beat {
    pub const fn new(data: u32) -> Self {
        Self {
            data,
            sop: false,
            eop: false,
            error: false,
        }
    }
}

/// Frames `words` as a single packet. An empty slice produces no beats.
pub fn packet_beats(words: &[u32]) -> impl Iterator<Item = Beat> + '_ {
    let last = words.len().saturating_sub(1);
    words.iter().enumerate().map(move |(i, &data)| Beat {
        data,
        sop: i == 0,
        eop: i == last,
        error: false,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    pub words: Vec<u32>,
    pub error: bool,
}

/// Reassembles beats into packets.
///
/// A `sop` beat always starts a fresh packet, discarding any unterminated one; beats seen
/// outside a packet are dropped.
#[derive(Debug, Default)]
pub struct PacketAssembler {
    current: Option<Vec<u32>>,
}

impl PacketAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, beat: Beat) -> Option<Packet> {
        if beat.sop {
            self.current = Some(Vec::new());
        }
        let words = self.current.as_mut()?;
        words.push(beat.data);
        if !beat.eop {
            return None;
        }
        let words = self.current.take().unwrap_or_default();
        Some(Packet {
            words,
            error: beat.error,
        })
    }

    pub fn in_packet(&self) -> bool {
        self.current.is_some()
    }
}

/// Synchronous FIFO with a fixed depth and an optional almost-full threshold.
#[derive(Debug, Clone)]
pub struct Fifo<T> {
    entries: VecDeque<T>,
    depth: usize,
    almost_full: Option<usize>,
}

impl<T> Fifo<T> {
    pub fn new(depth: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(depth),
            depth,
            almost_full: None,
        }
    }

    pub fn with_almost_full(depth: usize, threshold: usize) -> Self {
        Self {
            almost_full: Some(threshold),
            ..Self::new(depth)
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn level(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ready to accept a beat this tick. Depends only on the current level, never on a pop
    /// issued in the same tick.
    pub fn can_push(&self) -> bool {
        self.entries.len() < self.depth
    }

    pub fn is_almost_full(&self) -> bool {
        self.almost_full
            .is_some_and(|threshold| self.entries.len() >= threshold)
    }

    /// Returns the value back if the FIFO is full.
    pub fn push(&mut self, value: T) -> Result<(), T> {
        if !self.can_push() {
            return Err(value);
        }
        self.entries.push_back(value);
        Ok(())
    }

    pub fn peek(&self) -> Option<&T> {
        self.entries.front()
    }

    pub fn pop(&mut self) -> Option<T> {
        self.entries.pop_front()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// One-entry pipeline register between two stages.
///
/// Ready when empty, or when the held value is consumed downstream in the same tick.
#[derive(Debug, Clone, Default)]
pub struct PipeRegister<T> {
    slot: Option<T>,
}

impl<T: Copy> PipeRegister<T> {
    pub fn new() -> Self {
        Self { slot: None }
    }

    pub fn head(&self) -> Option<T> {
        self.slot
    }

    pub fn is_ready(&self, consumed: bool) -> bool {
        self.slot.is_none() || consumed
    }

    /// Clock edge. `input` must only be `Some` when [`Self::is_ready`] held for this tick.
    pub fn advance(&mut self, consumed: bool, input: Option<T>) {
        if consumed {
            self.slot = None;
        }
        if input.is_some() {
            debug_assert!(self.slot.is_none(), "pipe register overwritten");
            self.slot = input;
        }
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}
