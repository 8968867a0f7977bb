// src/lib.rs
//! ATSC PSIP inspector: MPEG-2 transport packets in, program tables, virtual
//! channels, system time and program guide events out.

pub mod inspector {
    pub use crate::types::{Options, Source};

    /// Async entry-point; returns when stopped (end of file, Ctrl-C or socket error)
    pub async fn run(opts: Options) -> anyhow::Result<()> {
        crate::receiver::run(opts).await
    }
}

pub mod accumulator;
pub mod constants;
pub mod context;
pub mod demux;
pub mod error;
pub mod network;
pub mod packet;
pub mod psi;
pub mod receiver;
pub mod report;
pub mod stats;
pub mod types;

pub use accumulator::{AccumulatorEvent, ContinuityError, SectionAccumulator};
pub use context::{ContextConfig, StreamContext, StreamState};
pub use demux::{Demultiplexer, SectionHandler};
pub use error::{FrameFormatError, TableFormatError};
pub use packet::TsPacket;
pub use types::{Channel, ChannelNumber, ScheduleEvent, StreamEvent};
