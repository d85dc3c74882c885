//! Cycle-level model of the SATA link layer.
//!
//! The link sits between the transport layer, which exchanges FIS payloads as framed dword
//! streams, and the PHY, which moves one 32-bit word (plus control flags) per clock in each
//! direction. Every stage is evaluated once per [`Link::tick`], so the model reproduces the
//! exact word sequence a hardware implementation would put on the wire.
//!
//! - [`Link`]: the composed link, with its buffers and host-facing API
//! - [`LinkTx`] / [`LinkRx`]: the transmit and receive state machines
//! - [`CrcInserter`] / [`CrcChecker`]: frame CRC append and verification
//! - [`Scrambler`]: payload whitening
//! - [`ContInserter`] / [`ContRemover`]: repeated-primitive suppression

#![forbid(unsafe_code)]

mod config;
mod cont;
mod crc;
mod error;
mod link;
mod rx;
mod scrambler;
mod stream;
mod tx;

pub use config::{LinkConfig, LinkRole, FIS_MAX_WORDS, MIN_HOLD_HEADROOM};
pub use cont::{ContInserter, ContRemover, ContStep};
pub use crc::{
    crc_next, frame_crc, CheckerState, CheckerStep, CrcChecker, CrcInserter, InserterState,
    LinkCrc, CRC_CHECK, CRC_INIT, CRC_POLYNOMIAL, CRC_WIDTH,
};
pub use error::{LinkError, Result};
pub use link::{Link, LinkStats, PhyInput, PhyOutput};
pub use rx::{LinkRx, RxState, RxStep};
pub use scrambler::{Scrambler, SCRAMBLER_SEED};
pub use stream::{packet_beats, Beat, Fifo, Packet, PacketAssembler, PipeRegister};
pub use tx::{LinkTx, RxToTx, TxOutcome, TxState, TxStep};

pub use satalink_wire::{CharIsK, PhyWord, Primitive};

#[cfg(test)]
mod proptests;
