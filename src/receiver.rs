//! Receive loop: UDP datagrams or a capture file in, a [`StreamContext`] fed in
//! arrival order, periodic JSON snapshots out.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use bytes::{Buf, BytesMut};
use tokio::io::AsyncReadExt;
use tokio::net::UdpSocket;

use crate::constants::{TS_PACKET_SIZE, TS_SYNC_BYTE};
use crate::context::{ContextConfig, StreamContext};
use crate::network::create_udp_socket;
use crate::report::Reporter;
use crate::types::{Options, Source, StreamEvent};

const READ_CHUNK: usize = TS_PACKET_SIZE * 512;

/// Cuts an arbitrary byte stream into 188-byte packets, keeping partial packets
/// across reads and skipping to the next sync byte when alignment is lost.
#[derive(Debug, Default)]
pub struct PacketAligner {
    pending: BytesMut,
    packets: u64,
    skipped_bytes: u64,
}

impl PacketAligner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds `data` and hands every whole packet to `ctx`. Returns the number of
    /// packets passed on.
    pub fn feed(&mut self, data: &[u8], ctx: &mut StreamContext) -> usize {
        self.pending.extend_from_slice(data);
        let mut fed = 0;
        while self.pending.len() >= TS_PACKET_SIZE {
            if self.pending[0] != TS_SYNC_BYTE {
                let skip = self.pending[1..]
                    .iter()
                    .position(|&b| b == TS_SYNC_BYTE)
                    .map_or(self.pending.len(), |p| p + 1);
                log::debug!("lost packet alignment, skipping {skip} bytes");
                self.skipped_bytes += skip as u64;
                self.pending.advance(skip);
                continue;
            }
            let packet = self.pending.split_to(TS_PACKET_SIZE);
            // a bad frame is already counted by the context
            let _ = ctx.accept(&packet);
            fed += 1;
        }
        self.packets += fed as u64;
        fed
    }

    pub fn packets(&self) -> u64 {
        self.packets
    }

    pub fn skipped_bytes(&self) -> u64 {
        self.skipped_bytes
    }

    /// Bytes held back waiting for the rest of a packet
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Async entry-point; returns at end of file, after `max_packets`, on Ctrl-C,
/// or on a socket error.
pub async fn run(opts: Options) -> anyhow::Result<()> {
    let mut ctx = StreamContext::new(ContextConfig {
        decode_eit: opts.decode_eit,
        ..ContextConfig::default()
    });
    ctx.on_event(log_event);

    let mut aligner = PacketAligner::new();
    match &opts.source {
        Source::Udp(addr) => {
            let socket = UdpSocket::from_std(create_udp_socket(*addr)?.into())?;
            log::info!("listening on {addr}");
            receive_udp(&socket, &mut ctx, &mut aligner, &opts).await?;
        }
        Source::File(path) => read_file(path, &mut ctx, &mut aligner, &opts).await?,
    }

    if aligner.pending() > 0 {
        log::warn!("{} trailing bytes did not form a packet", aligner.pending());
    }
    log::info!(
        "{} packets, {} bytes skipped while realigning",
        aligner.packets(),
        aligner.skipped_bytes()
    );
    println!("{}", Reporter::generate_json_report(&ctx, true));
    Ok(())
}

async fn receive_udp(
    socket: &UdpSocket,
    ctx: &mut StreamContext,
    aligner: &mut PacketAligner,
    opts: &Options,
) -> anyhow::Result<()> {
    let mut buf = [0u8; 2048];
    let mut last_print = Instant::now();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("interrupted");
                return Ok(());
            }
            received = socket.recv(&mut buf) => {
                let n = received.context("receiving datagram")?;
                if n == 0 {
                    continue;
                }
                aligner.feed(&buf[..n], ctx);
            }
        }

        if limit_reached(aligner, opts) {
            return Ok(());
        }
        maybe_print(ctx, &mut last_print, opts.refresh_secs);
    }
}

async fn read_file(
    path: &Path,
    ctx: &mut StreamContext,
    aligner: &mut PacketAligner,
    opts: &Options,
) -> anyhow::Result<()> {
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    let mut buf = vec![0u8; READ_CHUNK];
    let mut last_print = Instant::now();
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        aligner.feed(&buf[..n], ctx);
        if limit_reached(aligner, opts) {
            return Ok(());
        }
        maybe_print(ctx, &mut last_print, opts.refresh_secs);
    }
}

fn limit_reached(aligner: &PacketAligner, opts: &Options) -> bool {
    opts.max_packets.is_some_and(|max| aligner.packets() >= max)
}

fn maybe_print(ctx: &StreamContext, last_print: &mut Instant, refresh_secs: u64) {
    if refresh_secs > 0 && last_print.elapsed() >= Duration::from_secs(refresh_secs) {
        println!("{}", Reporter::generate_json_report(ctx, false));
        *last_print = Instant::now();
    }
}

fn log_event(event: &StreamEvent) {
    match event {
        StreamEvent::TimeChanged { time } => log::debug!("stream time {time}"),
        StreamEvent::Schedule {
            source_id, event, ..
        } => log::info!(
            "source {source_id}: {} ({} min) {}",
            event.start_time,
            event.duration_secs / 60,
            event.title
        ),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::tests::make_packet;

    #[test]
    fn partial_packets_carry_over() {
        let mut ctx = StreamContext::default();
        let mut aligner = PacketAligner::new();
        let a = make_packet(0x100, false, 0, &[]);
        let b = make_packet(0x100, false, 1, &[]);
        let mut stream = a.to_vec();
        stream.extend_from_slice(&b);

        assert_eq!(aligner.feed(&stream[..100], &mut ctx), 0);
        assert_eq!(aligner.pending(), 100);
        assert_eq!(aligner.feed(&stream[100..300], &mut ctx), 1);
        assert_eq!(aligner.feed(&stream[300..], &mut ctx), 1);
        assert_eq!(aligner.pending(), 0);
        assert_eq!(ctx.counters().demux.packets_seen, 2);
    }

    #[test]
    fn resyncs_on_garbage() {
        let mut ctx = StreamContext::default();
        let mut aligner = PacketAligner::new();
        let mut stream = vec![0x00, 0x01, 0x02];
        stream.extend_from_slice(&make_packet(0x100, false, 0, &[]));
        stream.extend_from_slice(&make_packet(0x100, false, 1, &[]));

        assert_eq!(aligner.feed(&stream, &mut ctx), 2);
        assert_eq!(aligner.skipped_bytes(), 3);
        assert_eq!(ctx.counters().frame_errors, 0);
    }

    #[tokio::test]
    async fn reads_capture_file() {
        let path = std::env::temp_dir().join(format!("psip-inspector-{}.ts", std::process::id()));
        let mut data = Vec::new();
        for cc in 0..10 {
            data.extend_from_slice(&make_packet(0x1FFF, false, cc, &[]));
        }
        tokio::fs::write(&path, &data).await.unwrap();

        let opts = Options {
            source: Source::File(path.clone()),
            refresh_secs: 0,
            max_packets: Some(4),
            decode_eit: true,
        };
        let mut ctx = StreamContext::default();
        let mut aligner = PacketAligner::new();
        read_file(&path, &mut ctx, &mut aligner, &opts).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        // the whole chunk is fed before the limit is checked
        assert_eq!(aligner.packets(), 10);
        assert_eq!(ctx.counters().demux.null_packets, 10);
    }
}
