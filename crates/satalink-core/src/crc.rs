//! SATA frame CRC: the 32-bit engine and the stream stages that append and verify it.
//!
//! The CRC covers every payload dword of a frame and is carried as one extra dword before EOF.
//! It is computed MSB-first over whole dwords with the IEEE 802.3 polynomial, no reflection and
//! no final XOR, starting from the SATA seed. A frame is intact when running the engine over the
//! trailer dword leaves the register at zero.

use crate::stream::Beat;

pub const CRC_WIDTH: u32 = 32;
pub const CRC_POLYNOMIAL: u32 = 0x04C1_1DB7;
pub const CRC_INIT: u32 = 0x5232_5032;
/// Register value left after the trailer of an intact frame.
pub const CRC_CHECK: u32 = 0x0000_0000;

/// Advances the CRC by one dword.
///
/// Equivalent to the parallel XOR network of the hardware engine: each output bit is the
/// parity of a fixed subset of `last ^ data` bits. Here the network is unrolled as the
/// textbook shift register clocked once per bit.
pub fn crc_next(last: u32, data: u32) -> u32 {
    let mut crc = last ^ data;
    for _ in 0..CRC_WIDTH {
        crc = if crc & 0x8000_0000 != 0 {
            (crc << 1) ^ CRC_POLYNOMIAL
        } else {
            crc << 1
        };
    }
    crc
}

/// CRC of a whole payload, i.e. the trailer a transmitter appends.
pub fn frame_crc(words: &[u32]) -> u32 {
    words.iter().fold(CRC_INIT, |crc, &w| crc_next(crc, w))
}

/// The per-frame CRC register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkCrc {
    reg: u32,
}

impl Default for LinkCrc {
    fn default() -> Self {
        Self { reg: CRC_INIT }
    }
}

impl LinkCrc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.reg = CRC_INIT;
    }

    /// CRC of the dwords absorbed so far.
    pub fn value(&self) -> u32 {
        self.reg
    }

    pub fn update(&mut self, data: u32) {
        self.reg = crc_next(self.reg, data);
    }

    /// Whether `trailer`, taken as the frame's CRC dword, fails the residue check.
    pub fn is_error(&self, trailer: u32) -> bool {
        crc_next(self.reg, trailer) != CRC_CHECK
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InserterState {
    Idle,
    Copy,
    Insert,
}

/// Appends the frame CRC as an extra trailing beat.
///
/// The input's `eop` beat loses its `eop` flag on the way through; the appended CRC beat
/// carries it instead.
#[derive(Debug, Clone)]
pub struct CrcInserter {
    state: InserterState,
    crc: LinkCrc,
}

impl Default for CrcInserter {
    fn default() -> Self {
        Self {
            state: InserterState::Idle,
            crc: LinkCrc::new(),
        }
    }
}

impl CrcInserter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InserterState {
        self.state
    }

    /// A CRC append is in flight.
    pub fn is_busy(&self) -> bool {
        self.state != InserterState::Idle
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Beat presented downstream this tick, given the beat presented by upstream.
    pub fn source(&self, sink: Option<Beat>) -> Option<Beat> {
        match self.state {
            InserterState::Idle => None,
            InserterState::Copy => sink.map(|beat| Beat { eop: false, ..beat }),
            InserterState::Insert => Some(Beat {
                data: self.crc.value(),
                sop: false,
                eop: true,
                error: false,
            }),
        }
    }

    /// Clock edge. Returns whether the upstream beat was consumed.
    ///
    /// In `Idle` a `sop` beat is left in place (it is copied from the next tick on) while any
    /// other beat is consumed and discarded.
    pub fn commit(&mut self, sink: Option<Beat>, source_ready: bool) -> bool {
        match self.state {
            InserterState::Idle => {
                self.crc.reset();
                match sink {
                    Some(beat) if beat.sop => {
                        self.state = InserterState::Copy;
                        false
                    }
                    Some(_) => true,
                    None => false,
                }
            }
            InserterState::Copy => {
                let Some(beat) = sink else {
                    return false;
                };
                if !source_ready {
                    return false;
                }
                self.crc.update(beat.data);
                if beat.eop {
                    self.state = InserterState::Insert;
                }
                true
            }
            InserterState::Insert => {
                if source_ready {
                    self.state = InserterState::Idle;
                }
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckerState {
    Reset,
    Idle,
    Copy,
}

/// Outcome of one [`CrcChecker`] tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckerStep {
    /// The input beat was accepted.
    pub accepted: bool,
    /// Beat emitted downstream (already accepted by the consumer). Only the frame's `eop`
    /// beat carries the CRC verdict in `error`; other beats only repeat an upstream `error`.
    pub output: Option<Beat>,
}

/// Verifies and strips the CRC trailer of each frame.
///
/// Output runs one beat behind the input: a beat is released only once its successor
/// arrives, so the trailer (the last input beat) is never released. The released beat
/// takes `eop` from the input beat that pushed it out, and on that beat `error` reports the
/// residue check of the trailer.
#[derive(Debug, Clone)]
pub struct CrcChecker {
    state: CheckerState,
    crc: LinkCrc,
    lookahead: Option<Beat>,
}

impl Default for CrcChecker {
    fn default() -> Self {
        Self {
            state: CheckerState::Reset,
            crc: LinkCrc::new(),
            lookahead: None,
        }
    }
}

impl CrcChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CheckerState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state != CheckerState::Idle
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// One tick. Must be called every tick, with `sink: None` when upstream is idle, so the
    /// post-frame reset completes.
    pub fn step(&mut self, sink: Option<Beat>, source_ready: bool) -> CheckerStep {
        if self.state == CheckerState::Reset {
            self.crc.reset();
            self.lookahead = None;
            self.state = CheckerState::Idle;
            return CheckerStep::default();
        }

        let Some(beat) = sink else {
            return CheckerStep::default();
        };
        if self.state == CheckerState::Idle && !beat.sop {
            return CheckerStep {
                accepted: true,
                output: None,
            };
        }

        let output = self.lookahead.filter(|_| source_ready).map(|held| Beat {
            data: held.data,
            sop: held.sop,
            eop: beat.eop,
            error: beat.error || (beat.eop && self.crc.is_error(beat.data)),
        });
        if self.lookahead.is_some() && output.is_none() {
            return CheckerStep::default();
        }

        self.crc.update(beat.data);
        self.lookahead = Some(beat);
        self.state = if beat.eop {
            CheckerState::Reset
        } else {
            CheckerState::Copy
        };
        CheckerStep {
            accepted: true,
            output,
        }
    }
}
