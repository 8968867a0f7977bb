//! JSON snapshots of what a stream context has learned so far

use serde::Serialize;

use crate::context::StreamContext;
use crate::psi::ProgramMapTable;
use crate::stats::{PidStats, StreamCounters};
use crate::types::Channel;

/// JSON structure for one program (internal serialization)
#[derive(Serialize)]
struct ProgramJson<'a> {
    program: u16,
    pmt_pid: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pmt: Option<&'a ProgramMapTable>,
}

/// JSON structure for one channel (internal serialization)
#[derive(Serialize)]
struct ChannelJson<'a> {
    /// `major-minor`
    display: String,
    #[serde(flatten)]
    channel: &'a Channel,
}

/// JSON structure for complete report (internal serialization)
#[derive(Serialize)]
struct ReportJson<'a> {
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_time: Option<String>,
    psip_present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    transport_stream_id: Option<u16>,
    programs: Vec<ProgramJson<'a>>,
    channels: Vec<ChannelJson<'a>>,
    counters: StreamCounters,
    continuity_error_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pids: Option<Vec<PidStats>>,
}

/// Report generator for stream contexts
pub struct Reporter;

impl Reporter {
    fn build(ctx: &StreamContext, with_pids: bool) -> ReportJson<'_> {
        let programs = ctx
            .pat()
            .map(|pat| {
                pat.programs
                    .iter()
                    .map(|(&program, &pmt_pid)| ProgramJson {
                        program,
                        pmt_pid,
                        pmt: ctx.programs().find(|pmt| pmt.program_number == program),
                    })
                    .collect()
            })
            .unwrap_or_default();

        ReportJson {
            timestamp: chrono::Utc::now().to_rfc3339(),
            stream_time: ctx.system_time().map(|t| t.to_rfc3339()),
            psip_present: ctx.psip_present(),
            transport_stream_id: ctx.pat().map(|pat| pat.transport_stream_id),
            programs,
            channels: ctx
                .channels()
                .map(|channel| ChannelJson {
                    display: channel.number.to_string(),
                    channel,
                })
                .collect(),
            counters: ctx.counters(),
            continuity_error_rate: ctx.counters().continuity_error_rate(),
            pids: with_pids.then(|| ctx.pid_stats()),
        }
    }

    pub fn to_value(ctx: &StreamContext, with_pids: bool) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(Self::build(ctx, with_pids))
    }

    /// Generate pretty-printed JSON string for CLI output
    pub fn generate_json_report(ctx: &StreamContext, with_pids: bool) -> String {
        serde_json::to_string_pretty(&Self::build(ctx, with_pids))
            .unwrap_or_else(|_| "{\"error\": \"JSON serialization failed\"}".to_string())
    }
}
