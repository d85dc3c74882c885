//! CONT primitive suppression.
//!
//! Long runs of a repeated primitive are replaced on the wire by two copies of the primitive,
//! a CONT marker and scrambled junk dwords, which keeps the line spectrum from collapsing onto
//! a few tones. The receiving side substitutes the repeated primitive back in.
//!
//! A run is only ever ended by a primitive: when a suppressed run is followed by data (which
//! would otherwise be taken for junk), or when the suppressed primitive was HOLD, the
//! repeated primitive is sent once more before the new word. The remover recognises that
//! closing copy and drops it, so removal restores the inserter's input word for word.

use crate::scrambler::Scrambler;
use satalink_wire::{PhyWord, Primitive};

/// Result of one [`ContInserter`] tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContStep {
    /// Word presented to the PHY this tick.
    pub output: Option<PhyWord>,
    /// The input word was consumed.
    pub consumed: bool,
}

#[derive(Debug, Clone)]
pub struct ContInserter {
    /// Consecutive repeats of `last`, saturating at 2.
    repeats: u8,
    last: PhyWord,
    last_primitive: u32,
    junk: Scrambler,
}

impl Default for ContInserter {
    fn default() -> Self {
        Self {
            repeats: 0,
            last: PhyWord::default(),
            last_primitive: 0,
            junk: Scrambler::new(),
        }
    }
}

impl ContInserter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Suppression is active: the input repeats and junk is going out in its place.
    pub fn in_cont(&self) -> bool {
        self.repeats == 2
    }

    pub fn step(&mut self, input: Option<PhyWord>, ready: bool) -> ContStep {
        let Some(word) = input else {
            return ContStep::default();
        };

        let is_data = word.is_data();
        let repeated = !is_data && word == self.last;
        let mut output = word;
        let mut consumed = ready;

        if repeated {
            match self.repeats {
                1 => output = PhyWord::primitive(Primitive::Cont),
                2 => {
                    output = PhyWord::data(self.junk.value());
                    if ready {
                        self.junk.advance();
                    }
                }
                _ => {}
            }
            if ready && self.repeats < 2 {
                self.repeats += 1;
            }
        } else {
            let closes_run =
                is_data || self.last_primitive == Primitive::Hold.word();
            if self.repeats == 2 && closes_run {
                output = PhyWord::control(self.last_primitive);
                consumed = false;
            }
            if ready {
                self.repeats = 0;
            }
        }

        // Tracks the input side even on the tick a closing primitive is re-sent.
        if ready {
            self.last = word;
            if !is_data {
                self.last_primitive = word.data;
            }
        }

        ContStep {
            output: Some(output),
            consumed,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContRemover {
    in_cont: bool,
    last_primitive: u32,
}

impl ContRemover {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn in_cont(&self) -> bool {
        self.in_cont
    }

    /// Every input word is consumed; `None` is returned for idle ticks and for the closing
    /// copy that ends a suppressed run.
    pub fn step(&mut self, input: Option<PhyWord>) -> Option<PhyWord> {
        let word = input?;
        let is_data = word.is_data();
        let is_cont = word.is_primitive(Primitive::Cont);

        let output = if is_cont || (self.in_cont && is_data) {
            Some(PhyWord::control(self.last_primitive))
        } else if self.in_cont && word.is_control() && word.data == self.last_primitive {
            None
        } else {
            Some(word)
        };

        if is_cont {
            self.in_cont = true;
        } else if !is_data {
            self.in_cont = false;
            self.last_primitive = word.data;
        }

        output
    }
}
