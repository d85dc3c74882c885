use crate::{LinkError, Result};

/// Largest FIS the transport layer hands to the link, in dwords.
pub const FIS_MAX_WORDS: usize = 2048;

/// Words that can still land in the RX buffer after it reports almost-full.
///
/// Covers the HOLD round trip through both registered PHY stages, the wire in each
/// direction, the peer's TX FSM reaction and the RX data registration.
pub const MIN_HOLD_HEADROOM: usize = 8;

/// Which end of the cable this link sits on.
///
/// When both ends send X_RDY at once the host backs off and receives first; the device keeps
/// its request up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkRole {
    #[default]
    Host,
    Device,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub role: LinkRole,


    /// Depth, in beats, of each of the TX and RX elastic buffers.
    pub buffer_depth: usize,

    /// RX buffer level at which the receiver starts asking the peer to HOLD.
    ///
    /// `None` selects 3/4 of `buffer_depth`. The threshold must leave at least
    /// [`MIN_HOLD_HEADROOM`] free entries or in-flight words can overrun the buffer.
    pub almost_full: Option<usize>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            role: LinkRole::Host,
            buffer_depth: 2 * FIS_MAX_WORDS,
            almost_full: None,
        }
    }
}

impl LinkConfig {
    pub fn with_buffer_depth(buffer_depth: usize) -> Self {
        Self {
            buffer_depth,
            ..Self::default()
        }
    }

    pub fn device() -> Self {
        Self {
            role: LinkRole::Device,
            ..Self::default()
        }
    }

    pub fn almost_full_threshold(&self) -> usize {
        self.almost_full.unwrap_or(3 * self.buffer_depth / 4)
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_depth == 0 {
            return Err(LinkError::InvalidConfig("buffer_depth must be > 0"));
        }
        let threshold = self.almost_full_threshold();
        if threshold == 0 {
            return Err(LinkError::InvalidConfig("almost_full must be > 0"));
        }
        if threshold >= self.buffer_depth {
            return Err(LinkError::InvalidConfig(
                "almost_full must be below buffer_depth",
            ));
        }
        if self.buffer_depth - threshold < MIN_HOLD_HEADROOM {
            return Err(LinkError::InvalidConfig(
                "almost_full leaves too little headroom for the HOLD round trip",
            ));
        }
        Ok(())
    }
}
