pub mod config;
pub mod zonal;

pub use config::{HopConfig, LatencySpec, SimConfig};
pub use zonal::ZonalPreset;

use crate::bridge::{BridgeEvent, DeviceId, DeviceStats, ProcessingBridge};
use crate::error::Result;
use crate::metrics::analyzer::{self, AnalysisReport};
use crate::network::{Address, Packet, PacketId, PacketType};
use crate::sim::{Scheduler, SimTime};
use crate::trace::{StreamTrace, TraceSummary};
use crate::traffic::Sender;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

pub const SENDER_ADDRESS: u64 = 0x02_00_00_00_00_01;
pub const RECEIVER_ADDRESS: u64 = 0x02_00_00_00_00_02;
const BRIDGE_ADDRESS_BASE: u64 = 0x02_00_00_00_10_00;

#[derive(Debug, Clone)]
pub enum Event {
    Send,
    ActivateTrace,
    Bridge(BridgeEvent),
}

impl From<BridgeEvent> for Event {
    fn from(event: BridgeEvent) -> Self {
        Event::Bridge(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Host {
    Sender,
    Receiver,
}

/// What sits on the far end of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attachment {
    Device { device: DeviceId, interface: u32 },
    Host(Host),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortReport {
    pub interface: u32,
    pub dropped: u64,
    pub high_water: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HopReport {
    pub name: String,
    pub stats: DeviceStats,
    pub ports: Vec<PortReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub name: String,
    pub summary: TraceSummary,
    pub analysis: AnalysisReport,
    pub hops: Vec<HopReport>,
    pub events_processed: u64,
    pub end_time: SimTime,
}

/// A sender and a receiver joined by a chain of processing bridges.
///
/// Hop `i` faces upstream on interface 0 and downstream on interface 1.
/// Links hand packets over with no delay of their own.
pub struct Simulation {
    config: SimConfig,
    scheduler: Scheduler<Event>,
    devices: Vec<ProcessingBridge>,
    links: HashMap<(DeviceId, u32), Attachment>,
    sender_link: Attachment,
    sender: Sender,
    trace: StreamTrace<Box<dyn Write + Send>>,
    output_dir: Option<PathBuf>,
    next_uid: u64,
    delivered: u64,
    events_processed: u64,
}

impl Simulation {
    /// CSV rows are kept in memory only.
    pub fn new(config: SimConfig) -> Result<Self> {
        Self::build(config, Box::new(std::io::sink()), None)
    }

    /// CSV streams to `<dir>/<name>.csv`; `run` also writes the summary files there.
    pub fn with_output(config: SimConfig, dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let csv = File::create(dir.join(format!("{}.csv", config.name)))?;
        Self::build(config, Box::new(csv), Some(dir))
    }

    fn build(
        config: SimConfig,
        sink: Box<dyn Write + Send>,
        output_dir: Option<PathBuf>,
    ) -> Result<Self> {
        config.validate()?;

        let mut devices = Vec::with_capacity(config.hops.len());
        let mut links = HashMap::new();
        for (id, hop) in config.hops.iter().enumerate() {
            let mut device = ProcessingBridge::new(id, hop.name.clone(), hop.bridge_config()?);
            let upstream = device.add_port();
            let downstream = device.add_port();

            let up_peer = match id {
                0 => Attachment::Host(Host::Sender),
                _ => Attachment::Device { device: id - 1, interface: 1 },
            };
            let down_peer = if id + 1 == config.hops.len() {
                Attachment::Host(Host::Receiver)
            } else {
                Attachment::Device { device: id + 1, interface: 0 }
            };
            links.insert((id, upstream), up_peer);
            links.insert((id, downstream), down_peer);
            devices.push(device);
        }

        let sender_link = if devices.is_empty() {
            Attachment::Host(Host::Receiver)
        } else {
            Attachment::Device { device: 0, interface: 0 }
        };

        let sender = Sender::new(
            Address::new(SENDER_ADDRESS),
            Address::new(RECEIVER_ADDRESS),
            config.packet_size,
            config.traffic.clone(),
            config.start,
            config.stop,
            config.seed,
        )
        .with_message_type(config.message_type.clone());
        let trace = StreamTrace::new(config.name.clone(), sink, config.csv_layout)?;

        Ok(Self {
            config,
            scheduler: Scheduler::new(),
            devices,
            links,
            sender_link,
            sender,
            trace,
            output_dir,
            next_uid: 0,
            delivered: 0,
            events_processed: 0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn devices(&self) -> &[ProcessingBridge] {
        &self.devices
    }

    pub fn trace(&self) -> &StreamTrace<Box<dyn Write + Send>> {
        &self.trace
    }

    /// Packets handed to the receiver, measured or not.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    pub fn run(&mut self) -> Result<RunReport> {
        info!("Starting simulation: {}", self.config.name);
        info!(
            "Hops: {}, packet size: {} B, traffic: {:?}",
            self.devices.len(),
            self.config.packet_size,
            self.config.traffic
        );

        // Scheduled first so it wins a tie with a send at the same instant.
        self.scheduler
            .schedule_at(self.config.trace_start, Event::ActivateTrace);
        if let Some(first) = self.sender.first_send() {
            self.scheduler.schedule_at(first, Event::Send);
        }

        while let Some(time) = self.scheduler.peek_time() {
            if time > self.config.duration {
                debug!("{} events left past {}", self.scheduler.len(), self.config.duration);
                break;
            }
            let Some((_, event)) = self.scheduler.pop() else {
                break;
            };
            self.events_processed += 1;
            self.dispatch(event)?;
        }

        let summary = self.trace.finalize()?;
        let analysis = analyzer::analyze(&self.config.name, self.trace.entries(), summary.drop_rate);
        let hops = self
            .devices
            .iter()
            .map(|d| {
                debug!("{}: {:?}", d.name(), d.stats());
                HopReport {
                    name: d.name().to_string(),
                    stats: d.stats(),
                    ports: d
                        .ports()
                        .iter()
                        .map(|&interface| PortReport {
                            interface,
                            dropped: d.queue_dropped(interface),
                            high_water: d.queue_high_water(interface),
                        })
                        .collect(),
                }
            })
            .collect();

        let report = RunReport {
            name: self.config.name.clone(),
            summary,
            analysis,
            hops,
            events_processed: self.events_processed,
            end_time: self.scheduler.now(),
        };

        info!("Mean latency: {:.3} us", report.analysis.mean_latency_s * 1e6);
        info!("Drop rate: {:.2}%", report.summary.drop_rate * 100.0);

        if let Some(dir) = self.output_dir.clone() {
            self.save_results(&dir, &report)?;
        }
        Ok(report)
    }

    fn dispatch(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Send => self.send(),
            Event::ActivateTrace => {
                self.trace.activate(self.scheduler.now());
                Ok(())
            }
            Event::Bridge(BridgeEvent::PortReady { device, interface }) => {
                self.devices[device].port_ready(interface, &mut self.scheduler)
            }
            Event::Bridge(BridgeEvent::Emit { device, record }) => {
                for port in self.devices[device].emit(&record) {
                    if let Some(&peer) = self.links.get(&(device, port)) {
                        self.deliver(peer, record.packet.clone())?;
                    }
                }
                Ok(())
            }
        }
    }

    fn send(&mut self) -> Result<()> {
        let now = self.scheduler.now();
        let uid = PacketId::new(self.next_uid);
        self.next_uid += 1;

        let mut packet = self.sender.make_packet(uid);
        let id = self.trace.on_send(&mut packet, now);
        trace!("send {:?} as #{} at {}", uid, id, now);
        self.deliver(self.sender_link, packet)?;

        if let Some(next) = self.sender.next_send(now) {
            self.scheduler.schedule_at(next, Event::Send);
        }
        Ok(())
    }

    fn deliver(&mut self, to: Attachment, packet: Packet) -> Result<()> {
        match to {
            Attachment::Device { device, interface } => {
                let local = Address::new(BRIDGE_ADDRESS_BASE + device as u64);
                let packet_type = PacketType::classify(packet.destination, local);
                self.devices[device].receive(interface, packet, packet_type, &mut self.scheduler)?;
            }
            Attachment::Host(Host::Receiver) => {
                let local = Address::new(RECEIVER_ADDRESS);
                if PacketType::classify(packet.destination, local) != PacketType::OtherHost {
                    self.delivered += 1;
                    self.trace.on_receive(&packet, self.scheduler.now())?;
                }
            }
            Attachment::Host(Host::Sender) => {}
        }
        Ok(())
    }

    /// Writes `<name>.json`, `<name>_analysis.json` and `<name>.hops`.
    pub fn save_results(&self, dir: &Path, report: &RunReport) -> Result<()> {
        std::fs::create_dir_all(dir)?;

        let json_path = dir.join(format!("{}.json", report.name));
        report.summary.write_json(File::create(&json_path)?)?;
        info!("Drop rate saved to: {}", json_path.display());

        let analysis_path = dir.join(format!("{}_analysis.json", report.name));
        std::fs::write(&analysis_path, serde_json::to_string_pretty(&report.analysis)?)?;
        info!("Analysis saved to: {}", analysis_path.display());

        let hops_path = dir.join(format!("{}.hops", report.name));
        std::fs::write(&hops_path, self.describe())?;
        Ok(())
    }

    /// Human readable listing of the path, one node per line.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("SENDER {}\n", Address::new(SENDER_ADDRESS)));
        for (hop, device) in self.config.hops.iter().zip(&self.devices) {
            out.push_str(&format!(
                "HOP {} {}: {} {}, {}, {}p{}\n",
                device.id(),
                hop.name,
                device.config().processing_delay.name(),
                device.config().processing_delay.delay(self.config.packet_size),
                hop.throughput,
                hop.queue_capacity,
                if hop.firewall.is_some() { ", firewall" } else { "" },
            ));
        }
        out.push_str(&format!("RECEIVER {}\n", Address::new(RECEIVER_ADDRESS)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traffic::TrafficPattern;

    fn burst(count: u32) -> SimConfig {
        SimConfig::default()
            .with_traffic(TrafficPattern::Burst { count })
            .with_window(SimTime::ZERO, SimTime::from_secs(1), SimTime::ZERO)
            .with_duration(SimTime::from_secs(1))
    }

    #[test]
    fn test_links_chain_hops() {
        let sim = Simulation::new(burst(1).with_preset(ZonalPreset::InterZone)).unwrap();
        assert_eq!(sim.devices().len(), 6);
        assert_eq!(sim.links[&(0, 0)], Attachment::Host(Host::Sender));
        assert_eq!(sim.links[&(2, 1)], Attachment::Device { device: 3, interface: 0 });
        assert_eq!(sim.links[&(5, 1)], Attachment::Host(Host::Receiver));
    }

    #[test]
    fn test_no_hops_delivers_instantly() {
        let mut sim = Simulation::new(burst(3).with_hops(Vec::new())).unwrap();
        let report = sim.run().unwrap();
        assert_eq!(report.summary.tracked_received, 3);
        assert_eq!(report.analysis.max_latency_s, 0.0);
    }

    #[test]
    fn test_describe_lists_every_hop() {
        let sim = Simulation::new(burst(1).with_preset(ZonalPreset::InterZone)).unwrap();
        let text = sim.describe();
        assert_eq!(text.lines().count(), 8);
        assert!(text.contains("zone0-trx-switch-side: macsec"));
    }

    #[test]
    fn test_invalid_config_is_rejected_up_front() {
        assert!(Simulation::new(burst(1).with_packet_size(0)).is_err());
    }
}
