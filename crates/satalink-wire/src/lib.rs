//! Wire-level vocabulary shared by the SATA link layer and its transceiver.
//!
//! Every transfer between the link layer and the PHY is one 32-bit word plus a per-byte-lane
//! control ("K character") flag. A word whose lane 0 is flagged as a control character is a
//! *primitive*: a reserved bit pattern with protocol meaning and no payload.
//!
//! - [`CharIsK`]: per-lane control flags
//! - [`PhyWord`]: one transfer on the PHY boundary
//! - [`Primitive`]: the primitive table, with bit-exact encodings

#![forbid(unsafe_code)]

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Per-byte-lane control character flags of a [`PhyWord`].
    ///
    /// SATA primitives always carry their K character in lane 0, so the only flag values the
    /// link layer produces are the empty set (data) and [`CharIsK::K0`] (primitive).
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct CharIsK: u8 {
        const K0 = 1 << 0;
        const K1 = 1 << 1;
        const K2 = 1 << 2;
        const K3 = 1 << 3;
    }
}

impl Default for CharIsK {
    fn default() -> Self {
        Self::empty()
    }
}

/// One 32-bit transfer on the PHY boundary.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct PhyWord {
    pub data: u32,
    pub charisk: CharIsK,
}

impl PhyWord {
    pub const fn data(data: u32) -> Self {
        Self {
            data,
            charisk: CharIsK::empty(),
        }
    }

    pub const fn primitive(primitive: Primitive) -> Self {
        Self::control(primitive.word())
    }

    /// A lane-0 control word with an arbitrary (possibly unknown) encoding.
    pub const fn control(data: u32) -> Self {
        Self {
            data,
            charisk: CharIsK::K0,
        }
    }

    pub fn is_data(&self) -> bool {
        self.charisk.is_empty()
    }

    /// Lane-0 control word, whether or not its encoding is a known primitive.
    pub fn is_control(&self) -> bool {
        self.charisk == CharIsK::K0
    }

    pub fn is_primitive(&self, primitive: Primitive) -> bool {
        self.is_control() && self.data == primitive.word()
    }

    pub fn primitive_kind(&self) -> Option<Primitive> {
        Primitive::decode(*self)
    }
}

impl From<Primitive> for PhyWord {
    fn from(primitive: Primitive) -> Self {
        Self::primitive(primitive)
    }
}

impl fmt::Display for PhyWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.primitive_kind() {
            Some(p) => write!(f, "{p}"),
            None if self.is_data() => write!(f, "{:#010x}", self.data),
            None => write!(f, "K({:#010x}, {:#06b})", self.data, self.charisk.bits()),
        }
    }
}

/// SATA link-layer primitives.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Primitive {
    Align,
    Cont,
    Sync,
    RRdy,
    ROk,
    RErr,
    RIp,
    XRdy,
    Wtrm,
    Sof,
    Eof,
    Hold,
    HoldA,
}

impl Primitive {
    pub const ALL: [Primitive; 13] = [
        Primitive::Align,
        Primitive::Cont,
        Primitive::Sync,
        Primitive::RRdy,
        Primitive::ROk,
        Primitive::RErr,
        Primitive::RIp,
        Primitive::XRdy,
        Primitive::Wtrm,
        Primitive::Sof,
        Primitive::Eof,
        Primitive::Hold,
        Primitive::HoldA,
    ];

    /// Dword encoding as transmitted (lane 0 holds the K28.3/K28.5 character).
    pub const fn word(self) -> u32 {
        match self {
            Primitive::Align => 0x7B4A_4ABC,
            Primitive::Cont => 0x9999_AA7C,
            Primitive::Sync => 0xB5B5_957C,
            Primitive::RRdy => 0x4A4A_957C,
            Primitive::ROk => 0x3535_B57C,
            Primitive::RErr => 0x5656_B57C,
            Primitive::RIp => 0x5555_B57C,
            Primitive::XRdy => 0x5757_B57C,
            Primitive::Wtrm => 0x5858_B57C,
            Primitive::Sof => 0x3737_B57C,
            Primitive::Eof => 0xD5D5_B57C,
            Primitive::Hold => 0xD5D5_AA7C,
            Primitive::HoldA => 0x9595_AA7C,
        }
    }

    /// Decodes a primitive. Only lane-0 control words are candidates; data words never decode,
    /// even when their bits happen to match an encoding.
    pub fn decode(word: PhyWord) -> Option<Self> {
        if !word.is_control() {
            return None;
        }
        Self::ALL.into_iter().find(|p| p.word() == word.data)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Primitive::Align => "ALIGN",
            Primitive::Cont => "CONT",
            Primitive::Sync => "SYNC",
            Primitive::RRdy => "R_RDY",
            Primitive::ROk => "R_OK",
            Primitive::RErr => "R_ERR",
            Primitive::RIp => "R_IP",
            Primitive::XRdy => "X_RDY",
            Primitive::Wtrm => "WTRM",
            Primitive::Sof => "SOF",
            Primitive::Eof => "EOF",
            Primitive::Hold => "HOLD",
            Primitive::HoldA => "HOLDA",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
