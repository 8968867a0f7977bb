use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::psi::ProgramMapTable;

/// Major/minor virtual channel number, shown as `major-minor`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ChannelNumber {
    pub major: u16,
    pub minor: u16,
}

impl fmt::Display for ChannelNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.major, self.minor)
    }
}

/// Virtual channel announced by a TVCT or CVCT
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    pub number: ChannelNumber,
    pub callsign: String,
    pub transport_stream_id: u16,
    pub program_number: u16,
    pub source_id: u16,
    pub modulation_mode: u8,
}

/// One EIT entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleEvent {
    pub event_id: u16,
    pub start_time: DateTime<Utc>,
    pub duration_secs: u32,
    pub title: String,
}

/// Notifications raised by the stream context while it decodes tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamEvent {
    PatUpdated {
        version: u8,
        programs: BTreeMap<u16, u16>,
    },
    ProgramMap(ProgramMapTable),
    ChannelDiscovered(Channel),
    TimeChanged { time: DateTime<Utc> },
    EitDiscovered { table_number: u8, pid: u16 },
    Schedule {
        table_number: u8,
        source_id: u16,
        event: ScheduleEvent,
    },
}

/// Where the receiver reads packets from
#[derive(Debug, Clone)]
pub enum Source {
    Udp(SocketAddr),
    File(PathBuf),
}

/// Configuration options for the receiver
#[derive(Debug, Clone)]
pub struct Options {
    pub source: Source,
    pub refresh_secs: u64,
    /// Stop after this many packets; `None` runs until EOF or Ctrl-C
    pub max_packets: Option<u64>,
    pub decode_eit: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::gps_to_utc;

    #[test]
    fn events_serialize_with_a_kind_tag() {
        let event = StreamEvent::Schedule {
            table_number: 2,
            source_id: 3,
            event: ScheduleEvent {
                event_id: 17,
                start_time: gps_to_utc(0),
                duration_secs: 1800,
                title: "News".into(),
            },
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], "schedule");
        assert_eq!(value["table_number"], 2);
        assert_eq!(value["event"]["title"], "News");
        assert_eq!(value["event"]["duration_secs"], 1800);

        let value = serde_json::to_value(StreamEvent::EitDiscovered { table_number: 0, pid: 0x1D00 }).unwrap();
        assert_eq!(value["kind"], "eit_discovered");
        assert_eq!(value["pid"], 0x1D00);
    }

    #[test]
    fn channel_number_display_and_order() {
        let a = ChannelNumber { major: 7, minor: 300 };
        let b = ChannelNumber { major: 9, minor: 1 };
        assert_eq!(a.to_string(), "7-300");
        assert!(a < b);
    }
}
