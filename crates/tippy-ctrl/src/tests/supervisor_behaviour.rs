//! Behavioural tests for project start, stop and mining control.

use std::collections::BTreeSet;
use std::fs;
use std::time::Duration;

use rstest::rstest;
use tippy_config::{ChainType, CommandTemplate, ProcessKind};
use tippy_rpc::PageQuery;
use tippy_rpc::testing::block_hash;

use super::support::{
    Harness, LifecycleEvent, MockProbe, TestProject, fast_settings, harness, wait_until,
};
use crate::{
    LogSource, MiningOutcome, NotApplicable, PortAuditor, ProcessError, SupervisorError,
    SupervisorState,
};

#[rstest]
fn start_launches_node_and_indexer_but_not_miner(mut harness: Harness) {
    harness.supervisor.start().expect("start project");

    assert!(harness.supervisor.is_running());
    assert!(harness.supervisor.is_indexer_running());
    assert!(!harness.supervisor.is_miner_running());
    assert_eq!(harness.supervisor.state(), SupervisorState::Running);
    let events = harness.reporter.events();
    assert!(events.contains(&LifecycleEvent::Started(ProcessKind::Node)));
    assert!(events.contains(&LifecycleEvent::Started(ProcessKind::Indexer)));
    assert!(events.contains(&LifecycleEvent::NodeReady));
    assert!(events.contains(&LifecycleEvent::State(SupervisorState::Starting)));
}

#[rstest]
fn start_twice_keeps_the_same_processes(mut harness: Harness) {
    harness.supervisor.start().expect("first start");
    let node_pid = harness.supervisor.pid(ProcessKind::Node);

    harness.supervisor.start().expect("second start");

    assert_eq!(harness.supervisor.pid(ProcessKind::Node), node_pid);
    assert!(
        harness
            .reporter
            .events()
            .contains(&LifecycleEvent::AlreadyRunning(ProcessKind::Node))
    );
}

#[rstest]
fn stop_tears_down_miner_then_indexer_then_node(mut harness: Harness) {
    harness.supervisor.start().expect("start project");
    let outcome = harness.supervisor.start_miner().expect("start miner");
    assert_eq!(outcome, MiningOutcome::Started);

    harness.supervisor.stop().expect("stop project");

    assert_eq!(
        harness.reporter.stopped(),
        vec![ProcessKind::Miner, ProcessKind::Indexer, ProcessKind::Node]
    );
    assert!(!harness.supervisor.is_running());
    assert!(!harness.supervisor.is_miner_running());
    assert_eq!(harness.supervisor.state(), SupervisorState::Stopped);
}

#[rstest]
fn stop_without_start_is_a_no_op(mut harness: Harness) {
    harness.supervisor.stop().expect("stop idle project");
    harness.supervisor.stop().expect("stop idle project again");

    assert!(harness.reporter.stopped().is_empty());
}

#[rstest]
fn restart_spawns_a_fresh_node(mut harness: Harness) {
    harness.supervisor.start().expect("start project");
    let before = harness.supervisor.pid(ProcessKind::Node);

    harness.supervisor.restart().expect("restart project");

    let after = harness.supervisor.pid(ProcessKind::Node);
    assert!(after.is_some());
    assert_ne!(after, before);
}

#[rstest]
#[case(ChainType::Testnet)]
#[case(ChainType::Mainnet)]
fn public_chains_refuse_every_mining_operation(#[case] chain: ChainType) {
    let mut harness = Harness::with_project(TestProject::new(chain), fast_settings());
    harness.supervisor.start().expect("start project");
    let refused = MiningOutcome::NotApplicable(NotApplicable::NotDevChain(chain));

    assert_eq!(harness.supervisor.start_miner().expect("start miner"), refused);
    assert_eq!(harness.supervisor.mine_one_block(), refused);
    assert_eq!(
        harness
            .supervisor
            .start_advanced_mining(3, Duration::from_millis(10))
            .expect("advanced mining"),
        refused
    );
    assert!(!harness.supervisor.is_miner_running());
    assert!(!harness.supervisor.can_start_mining());
    assert_eq!(harness.chain.generated_blocks(), 0);
}

#[rstest]
fn mining_needs_a_running_node(mut harness: Harness) {
    let refused = MiningOutcome::NotApplicable(NotApplicable::NodeNotRunning);

    assert_eq!(harness.supervisor.start_miner().expect("start miner"), refused);
    assert_eq!(harness.supervisor.mine_one_block(), refused);
    assert_eq!(harness.chain.generated_blocks(), 0);
}

#[rstest]
fn can_start_mining_tracks_the_guard_and_the_miner(mut harness: Harness) {
    assert!(!harness.supervisor.can_start_mining());

    harness.supervisor.start().expect("start project");
    assert!(harness.supervisor.can_start_mining());

    assert_eq!(harness.supervisor.start_miner().expect("start miner"), MiningOutcome::Started);
    assert!(!harness.supervisor.can_start_mining());

    assert!(harness.supervisor.stop_miner().expect("stop miner"));
    assert!(harness.supervisor.can_start_mining());
}

#[rstest]
fn mine_one_block_reports_the_new_hash(mut harness: Harness) {
    harness.supervisor.start().expect("start project");
    let logs = harness.supervisor.subscribe_logs();

    let outcome = harness.supervisor.mine_one_block();

    let expected = block_hash(6);
    assert_eq!(outcome, MiningOutcome::Mined(expected.clone()));
    assert!(
        logs.drain()
            .iter()
            .any(|line| line.source == LogSource::Control
                && line.text == format!("Generated block {expected}"))
    );
    assert!(
        harness
            .reporter
            .events()
            .contains(&LifecycleEvent::BlockMined(expected))
    );
}

#[rstest]
fn mine_one_block_surfaces_node_failures(mut harness: Harness) {
    harness.supervisor.start().expect("start project");
    harness.chain.fail_generation(true);

    let outcome = harness.supervisor.mine_one_block();

    assert!(matches!(outcome, MiningOutcome::Failed(_)));
    assert!(outcome.to_string().starts_with("Failed to generate block: "));
}

#[rstest]
fn at_most_one_advanced_mining_run(mut harness: Harness) {
    harness.supervisor.start().expect("start project");
    let interval = Duration::from_millis(50);

    let first = harness
        .supervisor
        .start_advanced_mining(1_000, interval)
        .expect("first run");
    let second = harness
        .supervisor
        .start_advanced_mining(1_000, interval)
        .expect("second run");

    assert_eq!(first, MiningOutcome::Started);
    assert_eq!(second, MiningOutcome::AlreadyActive);
    assert!(harness.supervisor.is_advanced_mining());
    assert!(!harness.supervisor.can_start_mining());
    assert!(harness.supervisor.stop_advanced_mining().expect("stop run"));
    assert!(!harness.supervisor.is_advanced_mining());
    assert!(!harness.supervisor.stop_advanced_mining().expect("stop again"));
    assert!(
        harness
            .reporter
            .events()
            .contains(&LifecycleEvent::AdvancedMiningStopped)
    );
}

#[rstest]
fn advanced_mining_rejects_zero_blocks(mut harness: Harness) {
    harness.supervisor.start().expect("start project");

    let outcome = harness
        .supervisor
        .start_advanced_mining(0, Duration::from_millis(10))
        .expect("advanced mining");

    assert_eq!(outcome, MiningOutcome::NotApplicable(NotApplicable::ZeroBlocks));
    assert!(!harness.supervisor.is_advanced_mining());
}

#[rstest]
fn a_finished_run_can_be_followed_by_another(mut harness: Harness) {
    harness.supervisor.start().expect("start project");
    let interval = Duration::from_millis(10);

    harness
        .supervisor
        .start_advanced_mining(2, interval)
        .expect("first run");
    assert!(wait_until(Duration::from_secs(2), || {
        !harness.supervisor.is_advanced_mining()
    }));
    assert_eq!(harness.chain.generated_blocks(), 2);

    let again = harness
        .supervisor
        .start_advanced_mining(1, interval)
        .expect("second run");
    assert_eq!(again, MiningOutcome::Started);
}

#[rstest]
fn stop_cancels_advanced_mining(mut harness: Harness) {
    harness.supervisor.start().expect("start project");
    harness
        .supervisor
        .start_advanced_mining(1_000, Duration::from_millis(20))
        .expect("start run");

    harness.supervisor.stop().expect("stop project");

    assert!(!harness.supervisor.is_advanced_mining());
    let mined = harness.chain.generated_blocks();
    std::thread::sleep(Duration::from_millis(80));
    assert_eq!(harness.chain.generated_blocks(), mined);
}

#[rstest]
#[should_panic(expected = "while the node is running")]
fn reset_data_while_running_panics(mut harness: Harness) {
    harness.supervisor.start().expect("start project");

    drop(harness.supervisor.reset_data());
}

#[rstest]
fn reset_data_recreates_an_empty_directory(mut harness: Harness) {
    harness.supervisor.start().expect("start project");
    harness.supervisor.stop().expect("stop project");
    let data_dir = harness.project.root().join("data/node/data");
    fs::create_dir_all(&data_dir).expect("create data dir");
    fs::write(data_dir.join("chain.db"), b"blocks").expect("seed data");

    harness.supervisor.reset_data().expect("reset data");

    assert!(data_dir.is_dir());
    assert_eq!(fs::read_dir(&data_dir).expect("list data").count(), 0);
}

#[rstest]
fn transactions_need_a_running_node(mut harness: Harness) {
    assert!(
        harness
            .supervisor
            .transactions(PageQuery::default())
            .expect("query stopped node")
            .is_none()
    );

    harness.supervisor.start().expect("start project");
    let page = harness
        .supervisor
        .transactions(PageQuery::default())
        .expect("query running node")
        .expect("page while running");

    assert_eq!(page.transactions.len(), 10);
    assert_eq!(page.meta, None);
}

#[rstest]
fn unresponsive_node_times_out_and_start_continues() {
    let mut settings = fast_settings();
    settings.ready_timeout = Duration::from_millis(100);
    let mut harness = Harness::with_project(TestProject::new(ChainType::Dev), settings);
    harness.chain.set_unreachable(true);

    harness.supervisor.start().expect("start project");

    assert!(harness.supervisor.is_running());
    assert!(harness.supervisor.is_indexer_running());
    assert!(
        harness
            .reporter
            .any(|event| matches!(event, LifecycleEvent::NodeNotReady(_)))
    );
}

#[rstest]
fn node_exiting_early_stops_the_readiness_wait() {
    let project = TestProject::new(ChainType::Dev)
        .with_command(ProcessKind::Node, CommandTemplate::new("sh", ["-c", "exit 3"]));
    let mut harness = Harness::with_project(project, fast_settings());
    harness.chain.set_unreachable(true);

    harness.supervisor.start().expect("start project");

    assert!(!harness.supervisor.is_running());
    assert_eq!(harness.supervisor.state(), SupervisorState::Stopped);
    assert!(harness.reporter.any(|event| matches!(
        event,
        LifecycleEvent::NodeNotReady(reason) if reason.contains("exited")
    )));
}

#[rstest]
fn missing_node_binary_fails_start() {
    let project = TestProject::new(ChainType::Dev).with_command(
        ProcessKind::Node,
        CommandTemplate::new("/nonexistent/tippy-node", ["run"]),
    );
    let mut harness = Harness::with_project(project, fast_settings());

    let error = harness.supervisor.start().expect_err("start should fail");

    assert!(matches!(
        error,
        SupervisorError::Process(ProcessError::BinaryNotFound {
            kind: ProcessKind::Node,
            ..
        })
    ));
    assert!(!harness.supervisor.is_indexer_running());
    assert_eq!(harness.supervisor.state(), SupervisorState::Stopped);
}

#[rstest]
fn busy_ports_are_reported_before_start() {
    let project = TestProject::new(ChainType::Dev);
    let busy = project.config.node_network_port;
    let mut probe = MockProbe::new();
    probe
        .expect_busy_ports()
        .returning(move |_| BTreeSet::from([busy]));
    let mut harness = Harness::with_project(project, fast_settings());
    harness.supervisor = harness
        .supervisor
        .with_port_auditor(PortAuditor::new(Box::new(probe)));

    assert_eq!(harness.supervisor.ports_in_use(), vec![busy]);
    harness.supervisor.start().expect("start project");

    assert!(
        harness
            .reporter
            .events()
            .contains(&LifecycleEvent::PortsInUse(vec![busy]))
    );
}

#[rstest]
fn log_folder_points_into_the_node_data(harness: Harness) {
    let folder = harness.supervisor.log_folder();

    assert!(folder.ends_with("data/node/data/logs"));
}
