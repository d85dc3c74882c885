//! The complete link layer: transmit and receive paths, their buffers and the PHY-side stages.
//!
//! ```text
//!  push() -> tx buffer -> CRC insert -> scramble -> TX FSM -> out reg -> CONT insert -> PHY
//!                                                    ^ RxToTx
//!  pop() <- rx buffer <- CRC check <- descramble <- RX FSM <- in reg <- CONT remove <- PHY
//! ```
//!
//! [`Link::tick`] evaluates one clock: the receive side first, since its primitive requests and
//! idle state feed the transmitter's decisions in the same tick, then the transmit side.

use crate::config::{LinkConfig, LinkRole};
use crate::cont::{ContInserter, ContRemover};
use crate::error::{LinkError, Result};
use crate::rx::{LinkRx, RxState};
use crate::stream::{packet_beats, Beat, Fifo, PipeRegister};
use crate::tx::{LinkTx, TxOutcome, TxState};
use satalink_wire::PhyWord;

/// PHY-side inputs for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhyInput {
    /// Word received from the peer, if one arrived this tick.
    pub rx: Option<PhyWord>,
    /// The PHY accepts the word presented in [`PhyOutput::tx`] this tick.
    pub tx_ready: bool,
    /// The PHY is up. While low the link's protocol state is held in reset.
    pub ready: bool,
}

impl Default for PhyInput {
    fn default() -> Self {
        Self {
            rx: None,
            tx_ready: true,
            ready: true,
        }
    }
}

impl PhyInput {
    pub fn word(rx: Option<PhyWord>) -> Self {
        Self {
            rx,
            ..Self::default()
        }
    }

    pub fn not_ready() -> Self {
        Self {
            ready: false,
            ..Self::default()
        }
    }
}

/// PHY-side outputs for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhyOutput {
    /// Word presented to the PHY. Transferred only if `tx_ready` was set.
    pub tx: Option<PhyWord>,
}

/// Frame and flow-control counters, all saturating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkStats {
    /// Frames the peer answered with R_OK.
    pub tx_frames: u64,
    /// Frames the peer answered with R_ERR.
    pub tx_frames_rejected: u64,
    /// Frames given up because the peer went back to SYNC mid-handshake.
    pub tx_frames_aborted: u64,
    /// Frames delivered to the receive buffer, good or bad.
    pub rx_frames: u64,
    /// Delivered frames with `error` set: failed CRC check or cut short.
    pub rx_crc_errors: u64,
    /// Frames cut short, by the peer returning to SYNC or by PHY loss.
    pub rx_frames_aborted: u64,
    /// Payload words lost because the receive path could not take them.
    pub rx_overruns: u64,
    /// Ticks on which HOLD was requested of the peer.
    pub holds_requested: u64,
}

#[derive(Debug)]
pub struct Link {
    config: LinkConfig,
    tx_buffer: Fifo<Beat>,
    tx: LinkTx,
    out_reg: PipeRegister<PhyWord>,
    cont_inserter: ContInserter,
    cont_remover: ContRemover,
    in_reg: PipeRegister<PhyWord>,
    rx: LinkRx,
    rx_buffer: Fifo<Beat>,
    phy_ready: bool,
    /// Beats of the frame currently being delivered.
    rx_frame_words: usize,
    stats: LinkStats,
}

impl Link {
    pub fn new(config: LinkConfig) -> Result<Self> {
        config.validate()?;
        let depth = config.buffer_depth;
        let threshold = config.almost_full_threshold();
        Ok(Self {
            tx_buffer: Fifo::new(depth),
            tx: LinkTx::new(),
            out_reg: PipeRegister::new(),
            cont_inserter: ContInserter::new(),
            cont_remover: ContRemover::new(),
            in_reg: PipeRegister::new(),
            rx: LinkRx::new(),
            rx_buffer: Fifo::with_almost_full(depth, threshold),
            phy_ready: true,
            rx_frame_words: 0,
            stats: LinkStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn tx_state(&self) -> TxState {
        self.tx.state()
    }

    pub fn rx_state(&self) -> RxState {
        self.rx.state()
    }

    /// Both state machines idle and nothing left to send.
    pub fn is_idle(&self) -> bool {
        self.tx.state() == TxState::Idle
            && self.rx.state() == RxState::Idle
            && self.tx_buffer.is_empty()
            && !self.tx.crc_busy()
    }

    pub fn can_push(&self) -> bool {
        self.tx_buffer.can_push()
    }

    pub fn tx_level(&self) -> usize {
        self.tx_buffer.level()
    }

    /// Queues one transmit beat.
    pub fn push(&mut self, beat: Beat) -> Result<()> {
        let depth = self.tx_buffer.depth();
        self.tx_buffer
            .push(beat)
            .map_err(|_| LinkError::TxBufferFull { depth })
    }

    /// Queues `words` as one frame. Nothing is queued unless the whole frame fits.
    pub fn push_frame(&mut self, words: &[u32]) -> Result<()> {
        let depth = self.tx_buffer.depth();
        if depth - self.tx_buffer.level() < words.len() {
            return Err(LinkError::TxBufferFull { depth });
        }
        for beat in packet_beats(words) {
            self.push(beat)?;
        }
        Ok(())
    }

    pub fn rx_level(&self) -> usize {
        self.rx_buffer.level()
    }

    /// Next received beat. The frame's last beat carries `error` if it failed the CRC check.
    pub fn pop(&mut self) -> Option<Beat> {
        self.rx_buffer.pop()
    }

    /// Advances the link by one clock tick.
    pub fn tick(&mut self, phy: PhyInput) -> PhyOutput {
        if !phy.ready {
            if self.phy_ready {
                self.phy_down();
            }
            return PhyOutput::default();
        }
        if !self.phy_ready {
            tracing::debug!("phy ready, link restarting");
            self.phy_ready = true;
        }

        // Receive side.
        let restored = self.cont_remover.step(phy.rx);
        let word = self.in_reg.head();
        self.in_reg.advance(true, restored);

        // A device keeps its own X_RDY up when the host requests at the same time.
        let defer_x_rdy =
            self.config.role == LinkRole::Device && self.tx.state() != TxState::Idle;
        let rx = self.rx.step(
            word,
            self.rx_buffer.is_almost_full(),
            self.rx_buffer.can_push(),
            defer_x_rdy,
        );
        if let Some(beat) = rx.output {
            self.deliver(beat);
        }
        if rx.overrun {
            self.stats.rx_overruns = self.stats.rx_overruns.saturating_add(1);
        }
        if rx.hold_requested {
            self.stats.holds_requested = self.stats.holds_requested.saturating_add(1);
        }
        if rx.aborted {
            self.stats.rx_frames_aborted = self.stats.rx_frames_aborted.saturating_add(1);
        }

        // Transmit side.
        let cont = self.cont_inserter.step(self.out_reg.head(), phy.tx_ready);
        let out_ready = self.out_reg.is_ready(cont.consumed);
        let tx = self
            .tx
            .step(self.tx_buffer.peek().copied(), rx.to_tx, out_ready);
        self.out_reg
            .advance(cont.consumed, tx.output.filter(|_| out_ready));
        if tx.consumed {
            self.tx_buffer.pop();
        }
        match tx.outcome {
            Some(TxOutcome::Accepted) => {
                self.stats.tx_frames = self.stats.tx_frames.saturating_add(1);
            }
            Some(TxOutcome::Rejected) => {
                self.stats.tx_frames_rejected = self.stats.tx_frames_rejected.saturating_add(1);
            }
            Some(TxOutcome::Aborted) => {
                self.stats.tx_frames_aborted = self.stats.tx_frames_aborted.saturating_add(1);
            }
            None => {}
        }

        PhyOutput { tx: cont.output }
    }

    fn deliver(&mut self, beat: Beat) {
        if self.rx_buffer.push(beat).is_err() {
            self.stats.rx_overruns = self.stats.rx_overruns.saturating_add(1);
            tracing::error!("rx buffer full, beat dropped");
            return;
        }
        if beat.sop {
            self.rx_frame_words = 0;
        }
        self.rx_frame_words += 1;
        if beat.eop {
            self.stats.rx_frames = self.stats.rx_frames.saturating_add(1);
            if beat.error {
                self.stats.rx_crc_errors = self.stats.rx_crc_errors.saturating_add(1);
            }
            tracing::debug!(
                words = self.rx_frame_words,
                error = beat.error,
                "link rx frame delivered"
            );
        }
    }

    /// Protocol state goes back to power-on; buffered beats survive. A frame being received
    /// is closed with `error` set.
    fn phy_down(&mut self) {
        if self.tx.state() != TxState::Idle || self.rx.state() != RxState::Idle {
            tracing::warn!(
                tx = ?self.tx.state(),
                rx = ?self.rx.state(),
                "phy lost mid-frame, link reset"
            );
        }
        if self.rx.state() == RxState::Copy {
            self.stats.rx_frames_aborted = self.stats.rx_frames_aborted.saturating_add(1);
            if let Some(beat) = self.rx.abort(self.rx_buffer.can_push()) {
                self.deliver(beat);
            }
        }
        self.phy_ready = false;
        self.tx.reset();
        self.rx.reset();
        self.out_reg.clear();
        self.in_reg.clear();
        self.cont_inserter.reset();
        self.cont_remover.reset();
    }
}
