pub mod section;
pub mod pat;
pub mod pmt;
pub mod mss;
pub mod mgt;
pub mod vct;
pub mod stt;
pub mod eit;
pub mod psip;

pub use section::{Section, SectionHeader, TableDecoder, TableHandler};
pub use pat::{parse_pat, PatDecoder, ProgramAssociationTable};
pub use pmt::{ElementaryStream, PmtDecoder, ProgramMapTable};
pub use mss::decode_mss;
pub use mgt::{parse_mgt, MasterGuideTable, MgtEntry};
pub use vct::parse_vct;
pub use stt::{gps_to_utc, parse_stt, SystemTimeTable};
pub use eit::{EitDecoder, EventInformationTable};
pub use psip::{PsipDecoder, PsipTable};
