use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// Processing was started on a port that still holds a packet.
    /// Always a scheduling bug; the run stops.
    #[error("device {device}: processing started on interface {interface} while it was busy")]
    InvariantViolation { device: String, interface: u32 },

    /// A ready timer fired for a port the device never saw.
    #[error("device {device}: no such interface {interface}")]
    UnknownPort { device: String, interface: u32 },

    /// Finalized before a single tracked packet was sent. Not the same as a 100% drop rate.
    #[error("trace {trace}: finalized before any tracked packet was sent")]
    NothingSent { trace: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown latency model: {0}")]
    UnknownLatencyModel(String),

    #[error("invalid data rate: {0}")]
    InvalidRate(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
