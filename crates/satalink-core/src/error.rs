use thiserror::Error;

pub type Result<T> = std::result::Result<T, LinkError>;

/// Errors surfaced by the link layer's host-facing API.
///
/// Protocol failures (CRC mismatches, R_ERR from the peer, out-of-sequence primitives) are not
/// represented here: they travel in-band as the `error` flag of the frame's last beat.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("transmit buffer full (depth {depth})")]
    TxBufferFull { depth: usize },
}
