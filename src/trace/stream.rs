use super::PacketTagger;
use crate::error::{Result, SimError};
use crate::network::Packet;
use crate::sim::SimTime;
use csv::{Writer, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceState {
    Waiting,
    On,
}

/// Third CSV column: packet size (default) or precomputed one-way delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CsvLayout {
    #[default]
    PacketSize,
    Delay,
}

impl CsvLayout {
    fn header(self) -> [&'static str; 3] {
        match self {
            Self::PacketSize => ["send_time", "recv_time", "packet_size"],
            Self::Delay => ["send_time", "recv_time", "delay"],
        }
    }
}

#[derive(Serialize)]
struct SizeRow {
    send_time: f64,
    recv_time: f64,
    packet_size: u32,
}

#[derive(Serialize)]
struct DelayRow {
    send_time: f64,
    recv_time: f64,
    delay: f64,
}

/// One tracked packet that made it to the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PacketEntry {
    pub send_time: SimTime,
    pub recv_time: SimTime,
    pub packet_size: u32,
}

impl PacketEntry {
    pub fn latency(&self) -> SimTime {
        self.recv_time - self.send_time
    }
}

/// What gets written to `<name>.json` when a trace is finalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropSummary {
    #[serde(rename = "dropRate")]
    pub drop_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSummary {
    pub name: String,
    pub raw_sent: u64,
    pub tracked_sent: u64,
    pub tracked_received: u64,
    pub drop_rate: f64,
}

impl TraceSummary {
    pub fn drop_summary(&self) -> DropSummary {
        DropSummary {
            drop_rate: self.drop_rate,
        }
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &self.drop_summary())?;
        Ok(())
    }
}

/// Measures one flow from a sender to a receiver.
///
/// Starts `Waiting` and switches `On` exactly once at its activation time.
/// Only packets sent at or after activation count: the first tracked id is
/// fixed at activation, so warm-up packets still in flight are ignored when
/// they arrive.
pub struct StreamTrace<W: Write> {
    name: String,
    state: TraceState,
    tagger: PacketTagger,
    first_tracked_id: u64,
    tracked_sent: u64,
    tracked_received: u64,
    layout: CsvLayout,
    sink: Writer<W>,
    entries: Vec<PacketEntry>,
}

impl StreamTrace<File> {
    pub fn create(name: impl Into<String>, path: impl AsRef<Path>, layout: CsvLayout) -> Result<Self> {
        Self::new(name, File::create(path)?, layout)
    }
}

impl<W: Write> StreamTrace<W> {
    pub fn new(name: impl Into<String>, sink: W, layout: CsvLayout) -> Result<Self> {
        let mut sink = WriterBuilder::new().has_headers(false).from_writer(sink);
        sink.write_record(layout.header())?;

        Ok(Self {
            name: name.into(),
            state: TraceState::Waiting,
            tagger: PacketTagger::new(),
            first_tracked_id: 0,
            tracked_sent: 0,
            tracked_received: 0,
            layout,
            sink,
            entries: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> TraceState {
        self.state
    }

    pub fn first_tracked_id(&self) -> u64 {
        self.first_tracked_id
    }

    pub fn raw_sent(&self) -> u64 {
        self.tagger.issued()
    }

    pub fn tracked_sent(&self) -> u64 {
        self.tracked_sent
    }

    pub fn tracked_received(&self) -> u64 {
        self.tracked_received
    }

    pub fn entries(&self) -> &[PacketEntry] {
        &self.entries
    }

    pub fn activate(&mut self, now: SimTime) {
        if self.state == TraceState::On {
            warn!("{}: activated twice, ignoring", self.name);
            return;
        }
        self.state = TraceState::On;
        self.first_tracked_id = self.tagger.issued();
        debug!(
            "{}: tracing on at {}, first tracked id {}",
            self.name, now, self.first_tracked_id
        );
    }

    /// Sender is about to transmit `packet`.
    pub fn on_send(&mut self, packet: &mut Packet, now: SimTime) -> u64 {
        let id = self.tagger.tag(packet, now);
        if self.state == TraceState::On {
            self.tracked_sent += 1;
        }
        id
    }

    /// Receiver got `packet`. Returns true if it counted.
    pub fn on_receive(&mut self, packet: &Packet, now: SimTime) -> Result<bool> {
        let (Some(id), Some(send_time)) = (packet.sequence(), packet.sent_at()) else {
            trace!("{}: untracked packet {:?}", self.name, packet.uid);
            return Ok(false);
        };

        if self.state != TraceState::On || id < self.first_tracked_id {
            return Ok(false);
        }

        let entry = PacketEntry {
            send_time,
            recv_time: now,
            packet_size: packet.size,
        };
        self.write_entry(&entry)?;
        self.entries.push(entry);
        self.tracked_received += 1;
        Ok(true)
    }

    fn write_entry(&mut self, entry: &PacketEntry) -> Result<()> {
        match self.layout {
            CsvLayout::PacketSize => self.sink.serialize(SizeRow {
                send_time: entry.send_time.as_secs_f64(),
                recv_time: entry.recv_time.as_secs_f64(),
                packet_size: entry.packet_size,
            })?,
            CsvLayout::Delay => self.sink.serialize(DelayRow {
                send_time: entry.send_time.as_secs_f64(),
                recv_time: entry.recv_time.as_secs_f64(),
                delay: entry.latency().as_secs_f64(),
            })?,
        }
        Ok(())
    }

    /// Flush the CSV and compute the drop rate over tracked packets.
    pub fn finalize(&mut self) -> Result<TraceSummary> {
        self.sink.flush()?;

        if self.tracked_sent == 0 {
            return Err(SimError::NothingSent {
                trace: self.name.clone(),
            });
        }

        let drop_rate = 1.0 - self.tracked_received as f64 / self.tracked_sent as f64;
        info!(
            "{}: sent {} received {} drop rate {:.4}",
            self.name, self.tracked_sent, self.tracked_received, drop_rate
        );

        Ok(TraceSummary {
            name: self.name.clone(),
            raw_sent: self.raw_sent(),
            tracked_sent: self.tracked_sent,
            tracked_received: self.tracked_received,
            drop_rate,
        })
    }

    pub fn into_sink(self) -> Result<W> {
        self.sink
            .into_inner()
            .map_err(|e| SimError::Io(std::io::Error::new(e.error().kind(), e.error().to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Address, PacketId};

    fn trace() -> StreamTrace<Vec<u8>> {
        StreamTrace::new("flow", Vec::new(), CsvLayout::PacketSize).unwrap()
    }

    fn packet(size: u32) -> Packet {
        Packet::new(PacketId::new(0), size, Address::new(1), Address::new(2))
    }

    fn ms(v: u64) -> SimTime {
        SimTime::from_millis(v)
    }

    #[test]
    fn test_sends_before_activation_are_not_tracked() {
        let mut t = trace();
        for i in 0..4 {
            let id = t.on_send(&mut packet(100), ms(1100 + i * 100));
            assert_eq!(id, i);
        }
        t.activate(ms(1500));
        assert_eq!(t.first_tracked_id(), 4);
        t.on_send(&mut packet(100), ms(1500));
        assert_eq!(t.raw_sent(), 5);
        assert_eq!(t.tracked_sent(), 1);
    }

    #[test]
    fn test_warmup_packet_received_after_activation_is_ignored() {
        let mut t = trace();
        let mut early = packet(100);
        t.on_send(&mut early, ms(1));
        t.activate(ms(2));
        let mut late = packet(100);
        t.on_send(&mut late, ms(3));

        assert!(!t.on_receive(&early, ms(4)).unwrap());
        assert!(t.on_receive(&late, ms(5)).unwrap());
        assert_eq!(t.tracked_sent(), 1);
        assert_eq!(t.tracked_received(), 1);
    }

    #[test]
    fn test_receive_while_waiting_is_ignored() {
        let mut t = trace();
        let mut p = packet(100);
        t.on_send(&mut p, ms(1));
        assert!(!t.on_receive(&p, ms(2)).unwrap());
        assert_eq!(t.tracked_received(), 0);
    }

    #[test]
    fn test_untagged_packet_is_skipped() {
        let mut t = trace();
        t.activate(ms(0));
        assert!(!t.on_receive(&packet(42), ms(1)).unwrap());
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_activation_is_one_shot() {
        let mut t = trace();
        t.activate(ms(0));
        t.on_send(&mut packet(10), ms(1));
        t.activate(ms(2));
        assert_eq!(t.first_tracked_id(), 0);
        assert_eq!(t.state(), TraceState::On);
        assert!(logs_contain("activated twice"));
    }

    #[test]
    fn test_finalize_without_sends_is_an_error() {
        let mut t = trace();
        t.on_send(&mut packet(10), ms(1));
        t.activate(ms(2));
        assert!(matches!(t.finalize(), Err(SimError::NothingSent { .. })));
    }

    #[test]
    fn test_total_loss_is_not_an_error() {
        let mut t = trace();
        t.activate(ms(0));
        t.on_send(&mut packet(10), ms(1));
        let summary = t.finalize().unwrap();
        assert_eq!(summary.drop_rate, 1.0);
    }

    #[test]
    fn test_csv_rows_and_summary_json() {
        let mut t = trace();
        t.activate(SimTime::ZERO);
        let mut p = packet(512);
        t.on_send(&mut p, ms(1000));
        t.on_receive(&p, ms(1500)).unwrap();
        t.on_send(&mut packet(512), ms(2000));

        let summary = t.finalize().unwrap();
        assert_eq!(summary.drop_rate, 0.5);

        let mut json = Vec::new();
        summary.write_json(&mut json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["dropRate"], 0.5);

        let csv = String::from_utf8(t.into_sink().unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec!["send_time,recv_time,packet_size", "1.0,1.5,512"]);
    }

    #[test]
    fn test_delay_layout() {
        let mut t = StreamTrace::new("flow", Vec::new(), CsvLayout::Delay).unwrap();
        t.activate(SimTime::ZERO);
        let mut p = packet(64);
        t.on_send(&mut p, ms(1000));
        t.on_receive(&p, ms(1250)).unwrap();
        t.finalize().unwrap();

        let csv = String::from_utf8(t.into_sink().unwrap()).unwrap();
        assert_eq!(csv.lines().next(), Some("send_time,recv_time,delay"));
        assert_eq!(csv.lines().nth(1), Some("1.0,1.25,0.25"));
    }

    #[test]
    fn test_header_written_even_without_rows() {
        let mut t = trace();
        t.activate(SimTime::ZERO);
        t.on_send(&mut packet(64), ms(1));
        t.finalize().unwrap();
        let csv = String::from_utf8(t.into_sink().unwrap()).unwrap();
        assert_eq!(csv, "send_time,recv_time,packet_size\n");
    }
}
