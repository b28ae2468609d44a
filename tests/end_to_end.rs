use std::fs;
use tempfile::TempDir;
use zonalsim::bridge::{FirewallFilter, InterfaceRules};
use zonalsim::prelude::*;

fn burst(count: u32) -> SimConfig {
    SimConfig::default()
        .with_name("burst")
        .with_traffic(TrafficPattern::Burst { count })
        .with_window(SimTime::ZERO, SimTime::from_secs(1), SimTime::ZERO)
        .with_duration(SimTime::from_secs(1))
}

#[test]
fn test_back_to_back_packets_queue_behind_throughput() {
    let mut sim = Simulation::new(burst(5)).unwrap();
    let report = sim.run().unwrap();

    assert_eq!(report.summary.tracked_sent, 5);
    assert_eq!(report.summary.tracked_received, 5);
    assert_eq!(report.summary.drop_rate, 0.0);

    // 512 B at 1 Gbps holds the port for 4096 ns; each emit is 30 ns after its start
    let latencies: Vec<SimTime> = sim.trace().entries().iter().map(|e| e.latency()).collect();
    let expected: Vec<SimTime> = (0..5)
        .map(|k| SimTime::from_nanos(30 + k * 4096))
        .collect();
    assert_eq!(latencies, expected);
}

#[test]
fn test_burst_overflows_input_queue() {
    let mut sim = Simulation::new(burst(150)).unwrap();
    let report = sim.run().unwrap();

    // one in the processing slot, a hundred waiting, the rest dropped
    let stats = report.hops[0].stats;
    assert_eq!(stats.received, 150);
    assert_eq!(stats.dropped, 49);
    assert_eq!(stats.processed, 101);
    assert_eq!(report.summary.tracked_received, 150 - 49);
    assert!((report.summary.drop_rate - 49.0 / 150.0).abs() < 1e-12);

    let switch = &sim.devices()[0];
    assert_eq!(switch.queue_high_water(0), 100);
    assert_eq!(switch.queue_len(0), 0);
}

#[test]
fn test_warm_up_packets_are_excluded() {
    let config = SimConfig::default()
        .with_name("warmup")
        .with_traffic(TrafficPattern::Interval {
            every: SimTime::from_millis(100),
        })
        .with_window(
            SimTime::from_millis(1100),
            SimTime::from_secs(2),
            SimTime::from_millis(1500),
        )
        .with_duration(SimTime::from_secs(3));

    let mut sim = Simulation::new(config).unwrap();
    let report = sim.run().unwrap();

    assert_eq!(sim.trace().first_tracked_id(), 4);
    assert_eq!(report.summary.raw_sent, 9);
    assert_eq!(report.summary.tracked_sent, 5);
    assert_eq!(report.summary.tracked_received, 5);
    assert_eq!(sim.delivered(), 9);
    assert_eq!(
        sim.trace().entries()[0].send_time,
        SimTime::from_millis(1500)
    );
}

#[test]
fn test_inter_zone_adds_four_macsec_hops() {
    let config = burst(1)
        .with_preset(ZonalPreset::InterZone)
        .with_packet_size(1500);
    let mut sim = Simulation::new(config).unwrap();
    sim.run().unwrap();

    // two switches at 30 ns, four transceivers at (1500 * 32 + 6579) / 2
    let latency = sim.trace().entries()[0].latency();
    assert_eq!(latency, SimTime::from_nanos(2 * 30 + 4 * 27_289));
}

#[test]
fn test_no_tracked_sends_is_an_error() {
    let config = SimConfig::default()
        .with_traffic(TrafficPattern::Interval {
            every: SimTime::from_millis(100),
        })
        .with_window(
            SimTime::from_secs(1),
            SimTime::from_secs(2),
            SimTime::from_secs(5),
        )
        .with_duration(SimTime::from_secs(6));

    let err = Simulation::new(config).unwrap().run().unwrap_err();
    assert!(matches!(err, SimError::NothingSent { .. }));
}

#[test]
fn test_events_past_duration_are_not_processed() {
    // sending continues past the end of the run
    let config = SimConfig::default()
        .with_traffic(TrafficPattern::Interval {
            every: SimTime::from_millis(100),
        })
        .with_window(SimTime::ZERO, SimTime::from_secs(10), SimTime::ZERO)
        .with_duration(SimTime::from_millis(450));

    let mut sim = Simulation::new(config).unwrap();
    let report = sim.run().unwrap();
    assert_eq!(report.summary.tracked_sent, 5);
    assert!(report.end_time <= SimTime::from_millis(450));
}

#[test]
fn test_poisson_runs_are_reproducible() {
    let config = SimConfig::default()
        .with_traffic(TrafficPattern::Poisson {
            rate: DataRate::from_mbps(50),
        })
        .with_window(SimTime::ZERO, SimTime::from_millis(20), SimTime::ZERO)
        .with_duration(SimTime::from_millis(30));

    let mut a = Simulation::new(config.clone()).unwrap();
    let mut b = Simulation::new(config).unwrap();
    a.run().unwrap();
    b.run().unwrap();
    assert!(!a.trace().entries().is_empty());
    assert_eq!(a.trace().entries(), b.trace().entries());
}

#[test]
fn test_results_are_written_to_output_dir() {
    let dir = TempDir::new().unwrap();
    let mut sim = Simulation::with_output(burst(3).with_name("flow"), dir.path()).unwrap();
    sim.run().unwrap();

    let csv = fs::read_to_string(dir.path().join("flow.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("send_time,recv_time,packet_size"));
    assert_eq!(lines.count(), 3);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("flow.json")).unwrap()).unwrap();
    assert_eq!(json["dropRate"], 0.0);

    let analysis: AnalysisReport = serde_json::from_str(
        &fs::read_to_string(dir.path().join("flow_analysis.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(analysis.samples, 3);

    let hops = fs::read_to_string(dir.path().join("flow.hops")).unwrap();
    assert!(hops.contains("zone0-switch"));
}

#[test]
fn test_delay_layout_writes_delay_column() {
    let dir = TempDir::new().unwrap();
    let mut config = burst(1).with_name("delay");
    config.csv_layout = CsvLayout::Delay;
    let mut sim = Simulation::with_output(config, dir.path()).unwrap();
    sim.run().unwrap();

    let csv = fs::read_to_string(dir.path().join("delay.csv")).unwrap();
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows[0], "send_time,recv_time,delay");
    let delay: f64 = rows[1].rsplit(',').next().unwrap().parse().unwrap();
    assert!((delay - 30e-9).abs() < 1e-15);
}

#[test]
fn test_config_loads_from_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sim.json");
    let config = burst(2).with_preset(ZonalPreset::InterZone);
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let loaded = SimConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded.hops.len(), 6);
    let report = Simulation::new(loaded).unwrap().run().unwrap();
    assert_eq!(report.summary.tracked_received, 2);
}

fn zone_firewall() -> FirewallFilter {
    // zone0-switch faces the sender on 0, zone1-switch the receiver on 1
    FirewallFilter::new()
        .with_interface(0, InterfaceRules::default().allow_out(["brake"]))
        .with_interface(1, InterfaceRules::default().allow_in(["brake"]))
}

#[test]
fn test_firewall_passes_allowed_message_type() {
    let config = burst(4)
        .with_preset(ZonalPreset::InterZone)
        .with_switch_firewall(zone_firewall())
        .with_message_type("brake");
    let report = Simulation::new(config).unwrap().run().unwrap();

    assert_eq!(report.summary.drop_rate, 0.0);
    assert!(report.hops.iter().all(|h| h.stats.filtered == 0));
}

#[test]
fn test_firewall_blocks_unlisted_message_type() {
    let config = burst(4)
        .with_preset(ZonalPreset::InterZone)
        .with_switch_firewall(zone_firewall())
        .with_message_type("infotainment");
    let report = Simulation::new(config).unwrap().run().unwrap();

    assert_eq!(report.summary.tracked_received, 0);
    assert_eq!(report.summary.drop_rate, 1.0);
    assert_eq!(report.hops[0].stats.filtered, 4);
    // nothing gets past the first switch
    assert_eq!(report.hops[1].stats.received, 0);
}

#[test]
fn test_firewall_ignores_untyped_stream() {
    let config = burst(4)
        .with_preset(ZonalPreset::InterZone)
        .with_switch_firewall(zone_firewall());
    let report = Simulation::new(config).unwrap().run().unwrap();
    assert_eq!(report.summary.tracked_received, 4);
}

#[test]
fn test_hop_report_lists_port_drops() {
    let report = Simulation::new(burst(150)).unwrap().run().unwrap();
    let ports = &report.hops[0].ports;
    assert_eq!(ports.len(), 2);
    assert_eq!(ports[0].dropped, 49);
    assert_eq!(ports[0].high_water, 100);
    assert_eq!(ports[1].dropped, 0);
}
