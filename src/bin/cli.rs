use std::path::PathBuf;

use clap::Parser;
use psip_inspector::inspector::{Options, Source, run};

#[derive(Parser)]
#[clap(about = "Reports PSI/PSIP tables found in an MPEG-2 transport stream")]
struct Opt {
    /// UDP socket to bind + listen (IPv4, unicast or multicast)
    #[clap(long, default_value = "239.1.1.2:1234", conflicts_with = "file")]
    addr: String,

    /// Read a capture file instead of listening on UDP
    #[clap(long)]
    file: Option<PathBuf>,

    /// Refresh interval for the JSON snapshot, 0 for a final report only
    #[clap(long, default_value_t = 2)]
    refresh: u64,

    /// Stop after this many packets
    #[clap(long)]
    max_packets: Option<u64>,

    /// Skip EIT decoding (channels and time only)
    #[clap(long, default_value_t = false)]
    no_eit: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[clap(short, long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();

    let default_level = if opt.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let source = match opt.file {
        Some(path) => Source::File(path),
        None => Source::Udp(opt.addr.parse()?),
    };

    run(Options {
        source,
        refresh_secs: opt.refresh,
        max_packets: opt.max_packets,
        decode_eit: !opt.no_eit,
    })
    .await
}
