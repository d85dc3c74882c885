//! SATA data scrambler.
//!
//! A 16-bit LFSR context yields one 32-bit whitening value per dword. Output bit `n` is the
//! parity of the context bits selected by `TAPS[n]`; the upper half of the output becomes the
//! next context. Scrambling is a plain XOR, so the same sequence descrambles.

pub const SCRAMBLER_SEED: u16 = 0xF0F6;

/// Context bit masks feeding each output bit (bit 0 first).
const TAPS: [u16; 32] = [
    0xA011, 0xE033, 0x6077, 0xC0EE, 0x21CD, 0x439A, 0x8734, 0xAE79, //
    0xFCE3, 0x59D7, 0xB3AE, 0xC74D, 0x2E8B, 0x5D16, 0xBA2C, 0xD449, //
    0x0883, 0x1106, 0x220C, 0x4418, 0x8830, 0xB071, 0xC0F3, 0x21F7, //
    0x43EE, 0x87DC, 0xAFA9, 0xFF43, 0x5E97, 0xBD2E, 0xDA4D, 0x148B,
];

fn lfsr_output(context: u16) -> u32 {
    TAPS.iter().enumerate().fold(0u32, |acc, (bit, &taps)| {
        acc | (((context & taps).count_ones() & 1) << bit)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scrambler {
    context: u16,
}

impl Default for Scrambler {
    fn default() -> Self {
        Self {
            context: SCRAMBLER_SEED,
        }
    }
}

impl Scrambler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.context = SCRAMBLER_SEED;
    }

    /// Whitening value for the current dword.
    pub fn value(&self) -> u32 {
        lfsr_output(self.context)
    }

    pub fn advance(&mut self) {
        self.context = (self.value() >> 16) as u16;
    }

    /// XORs `data` with the current value and advances.
    pub fn apply(&mut self, data: u32) -> u32 {
        let out = data ^ self.value();
        self.advance();
        out
    }
}
