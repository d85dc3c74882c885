#![allow(dead_code)]

use anyhow::{anyhow, Result};
use satalink::{
    ContRemover, Link, LinkConfig, LinkRole, Packet, PacketAssembler, PhyInput, PhyWord,
    Primitive, RxState,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Flips `mask` into the `index`th payload word the host puts on the wire.
#[derive(Debug, Clone, Copy)]
pub struct HostFault {
    pub index: usize,
    pub mask: u32,
}

/// Two links wired back to back, host to device, with one tick of wire delay each way.
pub struct LinkPair {
    pub host: Link,
    pub device: Link,
    /// Word in flight host -> device.
    host_wire: Option<PhyWord>,
    /// Word in flight device -> host.
    device_wire: Option<PhyWord>,
    /// Every word each side transmitted, in order.
    pub host_trace: Vec<PhyWord>,
    pub device_trace: Vec<PhyWord>,
    /// When false the device's receive buffer is left to fill up.
    pub drain_device: bool,
    pub host_phy_ready: bool,
    pub device_phy_ready: bool,
    pub fault: Option<HostFault>,
    /// Follows the host's outbound stream to tell payload apart from CONT junk.
    host_decoder: ContRemover,
    host_in_frame: bool,
    payload_words_sent: usize,
    assembler: PacketAssembler,
    pub packets: Vec<Packet>,
    pub max_device_rx_level: usize,
    pub ticks: u64,
}

impl LinkPair {
    /// The device side always plays [`LinkRole::Device`], whatever `device.role` says.
    pub fn new(host: LinkConfig, device: LinkConfig) -> Result<Self> {
        init_tracing();
        Ok(Self {
            host: Link::new(host)?,
            device: Link::new(LinkConfig {
                role: LinkRole::Device,
                ..device
            })?,
            host_wire: None,
            device_wire: None,
            host_trace: Vec::new(),
            device_trace: Vec::new(),
            drain_device: true,
            host_phy_ready: true,
            device_phy_ready: true,
            fault: None,
            host_decoder: ContRemover::new(),
            host_in_frame: false,
            payload_words_sent: 0,
            assembler: PacketAssembler::new(),
            packets: Vec::new(),
            max_device_rx_level: 0,
            ticks: 0,
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(LinkConfig::default(), LinkConfig::default())
    }

    pub fn set_phy_ready(&mut self, ready: bool) {
        self.host_phy_ready = ready;
        self.device_phy_ready = ready;
    }

    pub fn tick(&mut self) {
        if !self.host_phy_ready {
            self.host_decoder.reset();
            self.host_in_frame = false;
        }
        let input = |rx, ready| PhyInput {
            rx,
            tx_ready: true,
            ready,
        };
        let host_in = input(self.device_wire, self.host_phy_ready);
        let device_in = input(self.host_wire, self.device_phy_ready);

        let mut host_out = self.host.tick(host_in).tx;
        let device_out = self.device.tick(device_in).tx;

        if let Some(word) = host_out.as_mut() {
            let junk = self.host_decoder.in_cont();
            if word.is_primitive(Primitive::Sof) {
                self.host_in_frame = true;
            } else if word.is_primitive(Primitive::Eof) {
                self.host_in_frame = false;
            } else if word.is_data() && !junk && self.host_in_frame {
                if let Some(fault) = self.fault.filter(|f| f.index == self.payload_words_sent) {
                    word.data ^= fault.mask;
                }
                self.payload_words_sent += 1;
            }
            self.host_decoder.step(Some(*word));
        }

        self.host_wire = host_out;
        self.device_wire = device_out;
        self.host_trace.extend(host_out);
        self.device_trace.extend(device_out);

        self.max_device_rx_level = self.max_device_rx_level.max(self.device.rx_level());
        if self.drain_device {
            while let Some(beat) = self.device.pop() {
                self.packets.extend(self.assembler.push(beat));
            }
        }
        self.ticks += 1;
    }

    /// Ticks until `done` holds, failing after `max_ticks`.
    pub fn run_until(
        &mut self,
        max_ticks: u64,
        mut done: impl FnMut(&Self) -> bool,
    ) -> Result<()> {
        let deadline = self.ticks + max_ticks;
        while !done(&*self) {
            if self.ticks >= deadline {
                return Err(anyhow!(
                    "condition not reached within {max_ticks} ticks (host {:?}/{:?}, device {:?}/{:?})",
                    self.host.tx_state(),
                    self.host.rx_state(),
                    self.device.tx_state(),
                    self.device.rx_state(),
                ));
            }
            self.tick();
        }
        Ok(())
    }

    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    pub fn both_idle(&self) -> bool {
        self.host.is_idle() && self.device.is_idle()
    }

    pub fn device_receiving(&self) -> bool {
        self.device.rx_state() == RxState::Copy
    }
}

/// Undoes CONT suppression on a transmit trace and collapses each run of equal words into
/// one entry: primitive names, or "D" for any data word.
pub fn primitive_runs(trace: &[PhyWord]) -> Vec<String> {
    let mut remover = ContRemover::new();
    let mut runs: Vec<String> = Vec::new();
    for &word in trace {
        let Some(word) = remover.step(Some(word)) else {
            continue;
        };
        let name = match word.primitive_kind() {
            Some(p) => p.name().to_string(),
            None if word.is_data() => "D".to_string(),
            None => word.to_string(),
        };
        if runs.last() != Some(&name) {
            runs.push(name);
        }
    }
    runs
}
