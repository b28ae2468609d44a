pub mod bridge;
pub mod error;
pub mod metrics;
pub mod network;
pub mod sim;
pub mod simulation;
pub mod trace;
pub mod traffic;

pub use bridge::{LatencyRegistry, ProcessingBridge};
pub use error::{Result, SimError};
pub use simulation::{RunReport, SimConfig, Simulation, ZonalPreset};
pub use trace::StreamTrace;

pub mod prelude {
    pub use crate::bridge::{BridgeConfig, LatencyRegistry, ProcessingBridge, ProcessingDelay};
    pub use crate::error::{Result, SimError};
    pub use crate::metrics::AnalysisReport;
    pub use crate::network::{Address, DataRate, Packet};
    pub use crate::sim::SimTime;
    pub use crate::simulation::{HopConfig, RunReport, SimConfig, Simulation, ZonalPreset};
    pub use crate::trace::{CsvLayout, StreamTrace, TraceSummary};
    pub use crate::traffic::TrafficPattern;
}
