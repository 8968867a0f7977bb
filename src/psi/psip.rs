// psi/psip.rs
//! Everything carried on the PSIP base PID, dispatched by table_id.

use crate::constants::table_id;
use crate::error::TableFormatError;
use crate::psi::mgt::{MasterGuideTable, parse_mgt};
use crate::psi::section::{Section, TableDecoder};
use crate::psi::stt::{SystemTimeTable, parse_stt};
use crate::psi::vct::parse_vct;
use crate::types::Channel;

#[derive(Debug, Clone, PartialEq)]
pub enum PsipTable {
    Mgt(MasterGuideTable),
    /// TVCT or CVCT
    Vct(Vec<Channel>),
    Stt(SystemTimeTable),
    /// Rating region table; recognised only
    Rrt,
    Other(u8),
}

#[derive(Debug, Default)]
pub struct PsipDecoder;

impl TableDecoder for PsipDecoder {
    type Output = PsipTable;

    fn decode(&mut self, section: &Section<'_>) -> Result<Self::Output, TableFormatError> {
        Ok(match section.table_id() {
            table_id::MGT => PsipTable::Mgt(parse_mgt(section)?),
            table_id::TVCT | table_id::CVCT => PsipTable::Vct(parse_vct(section)?),
            table_id::STT => PsipTable::Stt(parse_stt(section)?),
            table_id::RRT => PsipTable::Rrt,
            other => PsipTable::Other(other),
        })
    }
}
