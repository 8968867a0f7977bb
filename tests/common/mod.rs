//! Synthetic stream builders shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;

use psip_inspector::StreamContext;

pub const PACKET: usize = 188;

/// Payload-only packet (afc = 01), stuffed with 0xFF.
pub fn packet(pid: u16, pusi: bool, cc: u8, payload: &[u8]) -> [u8; PACKET] {
    assert!(payload.len() <= 184);
    let mut pkt = [0xFFu8; PACKET];
    pkt[0] = 0x47;
    pkt[1] = ((pid >> 8) as u8 & 0x1F) | if pusi { 0x40 } else { 0 };
    pkt[2] = pid as u8;
    pkt[3] = 0x10 | (cc & 0x0F);
    pkt[4..4 + payload.len()].copy_from_slice(payload);
    pkt
}

/// Splits sections into packets, tracking a continuity counter per PID.
#[derive(Default)]
pub struct Packetizer {
    counters: HashMap<u16, u8>,
}

impl Packetizer {
    fn next_cc(&mut self, pid: u16) -> u8 {
        let cc = self.counters.entry(pid).or_insert(0);
        let current = *cc;
        *cc = (*cc + 1) & 0x0F;
        current
    }

    pub fn packetize(&mut self, pid: u16, section: &[u8]) -> Vec<[u8; PACKET]> {
        let mut out = Vec::new();
        let mut first = vec![0x00];
        let split = section.len().min(183);
        first.extend_from_slice(&section[..split]);
        let cc = self.next_cc(pid);
        out.push(packet(pid, true, cc, &first));
        for chunk in section[split..].chunks(184) {
            let cc = self.next_cc(pid);
            out.push(packet(pid, false, cc, chunk));
        }
        out
    }

    /// Feeds a section; it completes when the next section on the PID starts.
    pub fn feed(&mut self, ctx: &mut StreamContext, pid: u16, section: &[u8]) -> usize {
        let packets = self.packetize(pid, section);
        for pkt in &packets {
            ctx.accept(pkt).expect("valid packet");
        }
        packets.len()
    }
}

/// Long-form section around `body`, dummy CRC appended.
pub fn long_section(table_id: u8, extension: u16, version: u8, body: &[u8]) -> Vec<u8> {
    let section_length = (5 + body.len() + 4) as u16;
    let mut out = vec![
        table_id,
        0xB0 | (section_length >> 8) as u8,
        section_length as u8,
        (extension >> 8) as u8,
        extension as u8,
        0xC1 | ((version & 0x1F) << 1),
        0x00,
        0x00,
    ];
    out.extend_from_slice(body);
    out.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    out
}

pub fn pat_section(version: u8, programs: &[(u16, u16)]) -> Vec<u8> {
    let mut body = Vec::new();
    for &(program, pid) in programs {
        body.extend(program.to_be_bytes());
        body.extend((0xE000 | pid).to_be_bytes());
    }
    long_section(0x00, 1, version, &body)
}

pub fn pmt_section(program: u16, pcr_pid: u16, streams: &[(u8, u16)]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend((0xE000 | pcr_pid).to_be_bytes());
    body.extend([0xF0, 0x00]);
    for &(stream_type, pid) in streams {
        body.push(stream_type);
        body.extend((0xE000 | pid).to_be_bytes());
        body.extend([0xF0, 0x00]);
    }
    long_section(0x02, program, 0, &body)
}

pub fn mgt_section(version: u8, entries: &[(u16, u16)]) -> Vec<u8> {
    let mut body = vec![0x00];
    body.extend((entries.len() as u16).to_be_bytes());
    for &(table_type, pid) in entries {
        body.extend(table_type.to_be_bytes());
        body.extend((0xE000 | pid).to_be_bytes());
        body.push(0xE0 | version);
        body.extend(0u32.to_be_bytes());
        body.extend([0xF0, 0x00]);
    }
    body.extend([0xF0, 0x00]);
    long_section(0xC7, 0, version, &body)
}

pub fn vct_section(version: u8, channels: &[(&str, u16, u16)]) -> Vec<u8> {
    let mut body = vec![0x00, channels.len() as u8];
    for &(name, major, minor) in channels {
        let mut units: Vec<u16> = name.encode_utf16().collect();
        units.resize(7, 0);
        for unit in units {
            body.extend(unit.to_be_bytes());
        }
        let number: u32 = 0x00F0_0000 | (major as u32) << 10 | minor as u32;
        body.extend(&number.to_be_bytes()[1..]);
        body.push(0x04);
        body.extend(0u32.to_be_bytes());
        body.extend(1u16.to_be_bytes());
        body.extend(minor.to_be_bytes());
        body.extend([0x0D, 0xC2]);
        body.extend(minor.to_be_bytes());
        body.extend([0xFC, 0x00]);
    }
    body.extend([0xFC, 0x00]);
    long_section(0xC8, 1, version, &body)
}

pub fn stt_section(gps_seconds: u32) -> Vec<u8> {
    let mut body = vec![0x00];
    body.extend(gps_seconds.to_be_bytes());
    body.extend([18, 0x00, 0x00]);
    long_section(0xCD, 0, 0, &body)
}

pub fn mss(text: &str) -> Vec<u8> {
    let mut out = vec![1, b'e', b'n', b'g', 1, 0, 0, text.len() as u8];
    out.extend(text.bytes());
    out
}

pub fn eit_section(source_id: u16, events: &[(u16, u32, u32, Vec<u8>)]) -> Vec<u8> {
    let mut body = vec![0x00, events.len() as u8];
    for (event_id, start, duration, title) in events {
        body.extend((0xC000 | event_id).to_be_bytes());
        body.extend(start.to_be_bytes());
        body.extend(&(0xC000_0000 | duration).to_be_bytes()[1..]);
        body.push(title.len() as u8);
        body.extend(title);
        body.extend([0xF0, 0x00]);
    }
    long_section(0xCB, source_id, 0, &body)
}
