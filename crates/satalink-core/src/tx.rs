//! Link transmitter.
//!
//! Drives the host side of the frame handshake (X_RDY / SOF / data / EOF / WTRM) and
//! multiplexes primitives with the CRC-protected, scrambled payload. The receiver shares the
//! single outbound path: whatever it asks to insert wins over the transmitter's own choice.
//!
//! Once the peer has answered X_RDY, a SYNC from it means it dropped back to idle. The frame
//! is abandoned: its unsent beats are discarded by the CRC inserter, or the whole frame is
//! kept for another attempt if none of it had been sent yet.

use crate::crc::CrcInserter;
use crate::scrambler::Scrambler;
use crate::stream::Beat;
use satalink_wire::{PhyWord, Primitive};

/// What the receiver tells the transmitter, recomputed every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RxToTx {
    /// Receiver state machine is idle.
    pub idle: bool,
    /// Primitive the receiver needs on the wire this tick. Takes priority over everything.
    pub insert: Option<Primitive>,
    /// Primitive received from the peer this tick, if any.
    pub primitive: Option<Primitive>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Idle,
    Rdy,
    Sof,
    Copy,
    HoldA,
    Eof,
    Wtrm,
}

/// How a transmitted frame ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    Accepted,
    Rejected,
    /// The peer returned to SYNC before answering.
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxStep {
    /// Word presented to the output stage (transferred only if it was ready).
    pub output: Option<PhyWord>,
    /// The transmit buffer's head beat was consumed.
    pub consumed: bool,
    pub outcome: Option<TxOutcome>,
}

#[derive(Debug, Clone)]
pub struct LinkTx {
    state: TxState,
    crc: CrcInserter,
    scrambler: Scrambler,
}

impl Default for LinkTx {
    fn default() -> Self {
        Self {
            state: TxState::Idle,
            crc: CrcInserter::new(),
            scrambler: Scrambler::new(),
        }
    }
}

impl LinkTx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn crc_busy(&self) -> bool {
        self.crc.is_busy()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// One tick.
    ///
    /// `sink` is the beat at the head of the transmit buffer and `ready` whether the output
    /// stage can take a word this tick.
    pub fn step(&mut self, sink: Option<Beat>, from_rx: RxToTx, ready: bool) -> TxStep {
        let payload = self.crc.source(sink).map(|beat| Beat {
            data: beat.data ^ self.scrambler.value(),
            ..beat
        });
        let peer = from_rx.primitive;
        let abort = peer == Some(Primitive::Sync)
            && matches!(
                self.state,
                TxState::Sof | TxState::Copy | TxState::HoldA | TxState::Eof | TxState::Wtrm
            );

        let mut insert = None;
        let mut copy = false;
        let mut reset_scrambler = false;
        let mut outcome = None;
        let mut next = self.state;

        match self.state {
            _ if abort => {
                insert = Some(Primitive::Sync);
                outcome = Some(TxOutcome::Aborted);
                next = TxState::Idle;
            }
            TxState::Idle => {
                reset_scrambler = true;
                if from_rx.idle {
                    insert = Some(Primitive::Sync);
                    if payload.is_some_and(|b| b.sop) && peer == Some(Primitive::Sync) {
                        next = TxState::Rdy;
                    }
                }
            }
            TxState::Rdy => {
                insert = Some(Primitive::XRdy);
                if !from_rx.idle {
                    next = TxState::Idle;
                } else if peer == Some(Primitive::RRdy) {
                    next = TxState::Sof;
                }
            }
            TxState::Sof => {
                insert = Some(Primitive::Sof);
                if ready {
                    next = TxState::Copy;
                }
            }
            TxState::Copy => {
                copy = true;
                let payload_ready = ready && from_rx.insert.is_none();
                if payload.is_some_and(|b| b.eop) && payload_ready {
                    next = TxState::Eof;
                } else if peer == Some(Primitive::Hold) {
                    next = TxState::HoldA;
                } else if payload.is_none() {
                    insert = Some(Primitive::Hold);
                }
            }
            TxState::HoldA => {
                insert = Some(Primitive::HoldA);
                if peer == Some(Primitive::RIp) {
                    next = TxState::Copy;
                }
            }
            TxState::Eof => {
                insert = Some(Primitive::Eof);
                if ready {
                    next = TxState::Wtrm;
                }
            }
            TxState::Wtrm => {
                insert = Some(Primitive::Wtrm);
                match peer {
                    Some(Primitive::ROk) => {
                        outcome = Some(TxOutcome::Accepted);
                        next = TxState::Idle;
                    }
                    Some(Primitive::RErr) => {
                        outcome = Some(TxOutcome::Rejected);
                        next = TxState::Idle;
                    }
                    _ => {}
                }
            }
        }

        let (output, payload_ack) = match (from_rx.insert, insert) {
            (Some(p), _) | (None, Some(p)) => (Some(PhyWord::primitive(p)), false),
            (None, None) if copy => (
                payload.map(|b| PhyWord::data(b.data)),
                payload.is_some() && ready,
            ),
            (None, None) => (None, false),
        };

        let consumed = self.crc.commit(sink, payload_ack);
        if abort {
            self.crc.reset();
        }
        if reset_scrambler {
            self.scrambler.reset();
        } else if payload_ack {
            self.scrambler.advance();
        }

        if let Some(outcome) = outcome {
            tracing::debug!(?outcome, "link tx frame finished");
        }
        if next != self.state {
            tracing::trace!(from = ?self.state, to = ?next, "link tx state");
            self.state = next;
        }

        TxStep {
            output,
            consumed,
            outcome,
        }
    }
}
