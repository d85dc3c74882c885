//! Link receiver.
//!
//! Answers the peer's frame handshake (R_RDY / R_IP / R_OK / R_ERR), extracts the payload from
//! between SOF and EOF, descrambles it and hands it to the CRC checker. Flow control towards the
//! peer is HOLD, requested whenever the receive buffer is nearly full.
//!
//! A SYNC from the peer in the middle of the handshake means the peer has gone back to idle.
//! The receiver follows it there, closing any partially received frame with `error` set.

use crate::crc::CrcChecker;
use crate::scrambler::Scrambler;
use crate::stream::Beat;
use crate::tx::RxToTx;
use satalink_wire::{PhyWord, Primitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
    Idle,
    Rdy,
    WaitFirst,
    Copy,
    Eof,
    Wtrm,
    ROk,
    RErr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RxStep {
    pub to_tx: RxToTx,
    /// Beat for the receive buffer. Only produced when the buffer could take it.
    pub output: Option<Beat>,
    /// A payload word arrived while the checker was stalled and was lost.
    pub overrun: bool,
    /// HOLD was asked of the peer this tick.
    pub hold_requested: bool,
    /// The frame being received was cut short by the peer.
    pub aborted: bool,
}

#[derive(Debug, Clone)]
pub struct LinkRx {
    state: RxState,
    /// Next payload beat starts the frame.
    sop: bool,
    /// Most recent data word, held until the following word shows whether it was the last.
    data: u32,
    crc_error: bool,
    descrambler: Scrambler,
    checker: CrcChecker,
}

impl Default for LinkRx {
    fn default() -> Self {
        Self {
            state: RxState::Idle,
            sop: false,
            data: 0,
            crc_error: false,
            descrambler: Scrambler::new(),
            checker: CrcChecker::new(),
        }
    }
}

impl LinkRx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RxState {
        self.state
    }

    /// Result of the last completed frame's CRC check.
    pub fn crc_error(&self) -> bool {
        self.crc_error
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Closes a frame left incomplete in `Copy`, as when the PHY goes down under it: the held
    /// word is released as the frame's last beat with `error` set.
    pub fn abort(&mut self, out_ready: bool) -> Option<Beat> {
        if self.state != RxState::Copy {
            return None;
        }
        let (output, _) = self.check(self.cut_short(), out_ready);
        output
    }

    fn cut_short(&self) -> Beat {
        Beat {
            sop: self.sop,
            eop: true,
            error: true,
            ..Beat::new(self.data)
        }
    }

    /// Descrambles `beat` and offers it to the CRC checker. Returns the checker's output and
    /// whether the beat was lost.
    fn check(&mut self, beat: Beat, out_ready: bool) -> (Option<Beat>, bool) {
        let beat = Beat {
            data: beat.data ^ self.descrambler.value(),
            ..beat
        };
        let step = self.checker.step(Some(beat), out_ready);
        if step.accepted {
            self.descrambler.advance();
        } else {
            tracing::error!(state = ?self.state, "link rx overrun, payload word dropped");
        }
        (step.output, !step.accepted)
    }

    /// One tick.
    ///
    /// `input` is the word out of the input register, `hold` whether the receive buffer is
    /// almost full and `out_ready` whether it can take a beat this tick. With `defer_x_rdy`
    /// an X_RDY from the peer is left unanswered for now.
    pub fn step(
        &mut self,
        input: Option<PhyWord>,
        hold: bool,
        out_ready: bool,
        defer_x_rdy: bool,
    ) -> RxStep {
        let primitive = input.and_then(|w| w.primitive_kind());
        let data = input.filter(|w| w.is_data()).map(|w| w.data);
        let idle = self.state == RxState::Idle;

        let mut insert = None;
        let mut beat = None;
        let mut hold_requested = false;
        let mut aborted = false;
        let mut next = self.state;
        let peer_sync = primitive == Some(Primitive::Sync);

        match self.state {
            RxState::Idle => {
                self.descrambler.reset();
                if primitive == Some(Primitive::XRdy) && !defer_x_rdy {
                    next = RxState::Rdy;
                }
            }
            RxState::Rdy => {
                insert = Some(Primitive::RRdy);
                if primitive == Some(Primitive::Sof) {
                    next = RxState::WaitFirst;
                } else if peer_sync {
                    next = RxState::Idle;
                }
            }
            RxState::WaitFirst => {
                insert = Some(Primitive::RIp);
                if data.is_some() {
                    next = RxState::Copy;
                } else if peer_sync {
                    next = RxState::Idle;
                }
            }
            RxState::Copy => {
                insert = Some(Primitive::RIp);
                if data.is_some() {
                    beat = Some(Beat {
                        sop: self.sop,
                        ..Beat::new(self.data)
                    });
                }
                if primitive == Some(Primitive::Hold) {
                    insert = Some(Primitive::HoldA);
                } else if primitive == Some(Primitive::Eof) {
                    beat = Some(Beat {
                        sop: self.sop,
                        eop: true,
                        ..Beat::new(self.data)
                    });
                    next = RxState::Eof;
                } else if peer_sync {
                    beat = Some(self.cut_short());
                    aborted = true;
                    next = RxState::Idle;
                } else if hold {
                    insert = Some(Primitive::Hold);
                    hold_requested = true;
                }
            }
            RxState::Eof => {
                insert = Some(Primitive::RIp);
                if primitive == Some(Primitive::Wtrm) {
                    next = RxState::Wtrm;
                } else if peer_sync {
                    next = RxState::Idle;
                }
            }
            RxState::Wtrm => {
                insert = Some(Primitive::RIp);
                next = if self.crc_error {
                    RxState::RErr
                } else {
                    RxState::ROk
                };
            }
            RxState::ROk | RxState::RErr => {
                insert = Some(if self.state == RxState::ROk {
                    Primitive::ROk
                } else {
                    Primitive::RErr
                });
                if primitive == Some(Primitive::Sync) {
                    next = RxState::Idle;
                }
            }
        }

        match self.state {
            RxState::WaitFirst => self.sop = true,
            RxState::Copy if data.is_some() => self.sop = false,
            _ => {}
        }
        if let Some(data) = data {
            self.data = data;
        }

        let (output, overrun) = match beat {
            Some(beat) => self.check(beat, out_ready),
            None => (self.checker.step(None, out_ready).output, false),
        };
        if let Some(out) = output.filter(|b| b.eop) {
            self.crc_error = out.error;
        }

        if next != self.state {
            tracing::trace!(from = ?self.state, to = ?next, "link rx state");
            if next == RxState::RErr {
                tracing::debug!("link rx frame failed CRC check");
            }
            if peer_sync && !matches!(self.state, RxState::ROk | RxState::RErr) {
                tracing::debug!(from = ?self.state, "peer returned to SYNC, link rx back to idle");
            }
            self.state = next;
        }

        RxStep {
            to_tx: RxToTx {
                idle,
                insert,
                primitive,
            },
            output,
            overrun,
            hold_requested,
            aborted,
        }
    }
}
