pub mod stream;
pub mod tags;

pub use stream::{CsvLayout, DropSummary, PacketEntry, StreamTrace, TraceState, TraceSummary};
pub use tags::PacketTagger;
