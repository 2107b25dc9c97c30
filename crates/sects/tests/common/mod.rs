//! Simulated UICC hosting the OMAPI test applets
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use hex_literal::hex;
use sects_apdu_core::{Bytes, CardTransport, Result};

pub const TRANSMIT_AID: [u8; 16] = hex!("A000000476416E64726F696443545331");
pub const LONG_SELECT_AID: [u8; 16] = hex!("A000000476416E64726F696443545332");

/// Data byte the transmit applet answers case 2 and 4 commands with
pub const FILLER: u8 = 0xAA;

const MAX_CHANNELS: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applet {
    Transmit,
    LongSelect,
}

/// Stateful card: allocates channels, selects applets and chains long replies
#[derive(Debug, Default)]
pub struct SimulatedCard {
    open: BTreeSet<u8>,
    selected: BTreeMap<u8, Applet>,
    pending: BTreeMap<u8, Vec<u8>>,
    /// Every command received, upper-case hex
    pub log: Vec<String>,
    /// Answer MANAGE CHANNEL with "logical channel not supported"
    pub no_logical_channels: bool,
}

impl SimulatedCard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channels currently open on the card, basic channel excluded
    pub fn open_channels(&self) -> usize {
        self.open.len()
    }

    /// Number of commands received with the given instruction byte
    pub fn count_ins(&self, ins: u8) -> usize {
        let ins = format!("{ins:02X}");
        self.log.iter().filter(|c| c[2..4] == ins).count()
    }

    fn channel_of(cla: u8) -> u8 {
        if cla & 0x40 != 0 {
            4 + (cla & 0x0F)
        } else {
            cla & 0x03
        }
    }

    /// Hand out data through 61xx so the host has to GET RESPONSE
    fn defer(&mut self, channel: u8, data: Vec<u8>) -> Vec<u8> {
        let sw = more_data(data.len()).to_vec();
        self.pending.insert(channel, data);
        sw
    }

    fn get_response(&mut self, channel: u8, le: u8) -> Vec<u8> {
        let Some(mut data) = self.pending.remove(&channel) else {
            return vec![0x69, 0x85];
        };
        let wanted = if le == 0 { 256 } else { usize::from(le) };
        let rest = data.split_off(wanted.min(data.len()));
        if !rest.is_empty() {
            data.extend(more_data(rest.len()));
            self.pending.insert(channel, rest);
            return data;
        }
        data.extend([0x90, 0x00]);
        data
    }

    fn manage_channel(&mut self, p1: u8, p2: u8) -> Vec<u8> {
        if self.no_logical_channels {
            return vec![0x68, 0x81];
        }
        match p1 {
            0x00 => match (1..MAX_CHANNELS).find(|n| !self.open.contains(n)) {
                Some(n) => {
                    self.open.insert(n);
                    vec![n, 0x90, 0x00]
                }
                None => vec![0x6A, 0x81],
            },
            0x80 if self.open.remove(&p2) => {
                self.selected.remove(&p2);
                self.pending.remove(&p2);
                vec![0x90, 0x00]
            }
            _ => vec![0x6A, 0x86],
        }
    }

    fn select(&mut self, channel: u8, aid: &[u8]) -> Vec<u8> {
        let applet = if aid == TRANSMIT_AID {
            Applet::Transmit
        } else if aid == LONG_SELECT_AID {
            Applet::LongSelect
        } else {
            return vec![0x6A, 0x82];
        };
        self.selected.insert(channel, applet);

        match applet {
            Applet::Transmit => vec![0x90, 0x00],
            Applet::LongSelect => {
                let fci = long_fci();
                self.defer(channel, fci)
            }
        }
    }
}

impl CardTransport for SimulatedCard {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes> {
        self.log.push(hex::encode_upper(command));

        let (cla, ins, p1, p2) = (command[0], command[1], command[2], command[3]);
        let body = &command[4..];
        let channel = Self::channel_of(cla);

        if channel != 0 && !self.open.contains(&channel) {
            return Ok(Bytes::from_static(&[0x68, 0x81]));
        }

        let response = match ins {
            0x70 => self.manage_channel(p1, p2),
            0xA4 if p1 == 0x04 => {
                let lc = usize::from(body[0]);
                let aid = body[1..=lc].to_vec();
                self.select(channel, &aid)
            }
            0xC0 => self.get_response(channel, le_of(body)),
            0x06 | 0x0A if self.selected.get(&channel) == Some(&Applet::Transmit) => {
                vec![0x90, 0x00]
            }
            0x08 | 0x0C if self.selected.get(&channel) == Some(&Applet::Transmit) => {
                self.defer(channel, vec![FILLER; 256])
            }
            _ if !self.selected.contains_key(&channel) => vec![0x69, 0x86],
            _ => vec![0x6D, 0x00],
        };

        Ok(Bytes::from(response))
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn reset(&mut self) -> Result<()> {
        self.open.clear();
        self.selected.clear();
        self.pending.clear();
        Ok(())
    }
}

fn more_data(remaining: usize) -> [u8; 2] {
    // 6100 stands for 256 or more
    [0x61, if remaining >= 256 { 0x00 } else { remaining as u8 }]
}

fn le_of(body: &[u8]) -> u8 {
    body.last().copied().unwrap_or(0)
}

/// FCI template long enough to need GET RESPONSE: 6F 81 F9 { 84 10 AID, A5 81 E4 { 53 81 E1 ... } }
pub fn long_fci() -> Vec<u8> {
    let mut proprietary = vec![0x53, 0x81, 0xE1];
    proprietary.extend(std::iter::repeat_n(0x5A, 0xE1));

    let mut template = vec![0x84, 0x10];
    template.extend(LONG_SELECT_AID);
    template.extend([0xA5, 0x81, proprietary.len() as u8]);
    template.extend(proprietary);

    let mut fci = vec![0x6F, 0x81, template.len() as u8];
    fci.extend(template);
    fci
}
