mod common;

use chrono::{TimeDelta, TimeZone, Utc};
use proptest::prelude::*;
use psip_inspector::accumulator::{AccumulatorEvent, AccumulatorState, SectionAccumulator};
use psip_inspector::psi::{gps_to_utc, parse_pat, Section};
use psip_inspector::{FrameFormatError, TsPacket};

use common::{long_section, packet};

fn synced_packet() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 188).prop_map(|mut buf| {
        buf[0] = 0x47;
        buf[1] &= 0x7F;
        buf
    })
}

proptest! {
    #[test]
    fn synced_packets_frame(buf in synced_packet()) {
        match TsPacket::parse(&buf) {
            Ok(p) => {
                prop_assert!(p.pid <= 0x1FFF);
                prop_assert!(p.payload.len() <= 184);
            }
            // adaptation field or pointer field running off the packet
            Err(err) => prop_assert!(matches!(err, FrameFormatError::OffsetOutOfRange(_)), "{err}"),
        }
    }

    #[test]
    fn payload_only_continuations_always_frame(mut buf in synced_packet()) {
        buf[1] &= 0x3F; // PUSI clear
        buf[3] = (buf[3] & 0xCF) | 0x10;
        let p = TsPacket::parse(&buf).unwrap();
        prop_assert_eq!(p.pid, ((buf[1] as u16 & 0x1F) << 8) | buf[2] as u16);
        prop_assert_eq!(p.payload.len(), 184);
    }

    #[test]
    fn unbroken_runs_complete_whole(
        pid in 0x20u16..0x1FFE,
        start_cc in 0u8..16,
        continuations in 0usize..40,
        trailing in 0usize..100,
    ) {
        let mut acc = SectionAccumulator::new(pid);
        let mut cc = start_cc;
        prop_assert!(acc.push(&TsPacket::parse(&packet(pid, true, cc, &[0x00])).unwrap()).is_none());
        let mut expected = 183;

        for _ in 0..continuations {
            cc = (cc + 1) & 0x0F;
            let pkt = packet(pid, false, cc, &[]);
            prop_assert!(acc.push(&TsPacket::parse(&pkt).unwrap()).is_none());
            expected += 184;
        }

        cc = (cc + 1) & 0x0F;
        let mut last = vec![trailing as u8];
        last.resize(1 + trailing, 0xAB);
        let event = acc.push(&TsPacket::parse(&packet(pid, true, cc, &last)).unwrap());
        match event {
            Some(AccumulatorEvent::SectionComplete { pid: got, data }) => {
                prop_assert_eq!(got, pid);
                prop_assert_eq!(data.len(), expected + trailing);
            }
            other => prop_assert!(false, "unexpected {other:?}"),
        }
    }

    #[test]
    fn one_skipped_counter_is_one_error(
        start_cc in 0u8..16,
        before in 0usize..5,
        restart_with_pusi in any::<bool>(),
    ) {
        let pid = 0x100;
        let mut acc = SectionAccumulator::new(pid);
        let mut cc = start_cc;
        acc.push(&TsPacket::parse(&packet(pid, true, cc, &[0x00])).unwrap());
        for _ in 0..before {
            cc = (cc + 1) & 0x0F;
            prop_assert!(acc.push(&TsPacket::parse(&packet(pid, false, cc, &[])).unwrap()).is_none());
        }

        let skipped = (cc + 2) & 0x0F;
        let pkt = if restart_with_pusi {
            packet(pid, true, skipped, &[0x00])
        } else {
            packet(pid, false, skipped, &[])
        };
        match acc.push(&TsPacket::parse(&pkt).unwrap()) {
            Some(AccumulatorEvent::ContinuityError(err)) => {
                prop_assert_eq!(err.pid, pid);
                prop_assert_eq!(err.expected(), (cc + 1) & 0x0F);
                prop_assert_eq!(err.actual, skipped);
            }
            other => prop_assert!(false, "unexpected {other:?}"),
        }

        if restart_with_pusi {
            prop_assert_eq!(acc.state(), AccumulatorState::Accumulating);
            prop_assert_eq!(acc.bytes_accumulated(), 183);
        } else {
            prop_assert_eq!(acc.state(), AccumulatorState::AwaitingStart);
            prop_assert_eq!(acc.bytes_accumulated(), 0);
        }

        // the stream carries on from the new counter without further errors
        let mut next = skipped;
        for _ in 0..3 {
            next = (next + 1) & 0x0F;
            let event = acc.push(&TsPacket::parse(&packet(pid, false, next, &[])).unwrap());
            prop_assert!(event.is_none());
        }
    }

    #[test]
    fn pat_entries_decode_exactly(
        programs in prop::collection::btree_map(1u16..=u16::MAX, 0x10u16..0x1FFF, 0..60),
    ) {
        let mut body = Vec::new();
        for (&program, &pid) in &programs {
            body.extend(program.to_be_bytes());
            body.extend((0xE000 | pid).to_be_bytes());
        }
        let data = long_section(0x00, 7, 3, &body);
        let pat = parse_pat(&Section::parse(0, &data).unwrap()).unwrap();
        prop_assert_eq!(pat.programs, programs);
        prop_assert_eq!(pat.network_pid, None);
    }

    #[test]
    fn gps_seconds_add_to_epoch(seconds in any::<u32>()) {
        let epoch = Utc.with_ymd_and_hms(1980, 1, 6, 0, 0, 0).unwrap() - TimeDelta::seconds(14);
        prop_assert_eq!(gps_to_utc(0), epoch);
        prop_assert_eq!(gps_to_utc(seconds), epoch + TimeDelta::seconds(seconds as i64));
    }
}
