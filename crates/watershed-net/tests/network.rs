//! End-to-end network tests over real tasks and timers.
//!
//! Run under a paused clock; sleeps auto-advance, so convergence that takes
//! many forwarding intervals of simulated time finishes instantly.

use std::time::Duration;

use watershed_height::NodeId;
use watershed_net::{Network, NetworkConfig, NetworkError, NetworkSnapshot};

/// Honor `RUST_LOG` when debugging a failing scenario.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn triangle() -> NetworkConfig {
    NetworkConfig::new(
        vec![vec![0, 1, 1], vec![1, 0, 1], vec![1, 1, 0]],
        NodeId(0),
        vec![0, 1, 1],
    )
}

/// Poll snapshots until `cond` holds, failing with a state dump on timeout.
async fn settle(net: &Network, what: &str, cond: impl Fn(&NetworkSnapshot) -> bool) {
    let result = tokio::time::timeout(Duration::from_secs(600), async {
        loop {
            if cond(&net.snapshot_all()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    if result.is_err() {
        let dump = net
            .snapshot_all()
            .to_json()
            .unwrap_or_else(|e| format!("<snapshot render failed: {e}>"));
        panic!("timed out waiting for {what}; final state:\n{dump}");
    }
}

fn bootstrapped(snap: &NetworkSnapshot) -> bool {
    let expected = snap.nodes.len() - 1;
    snap.nodes
        .iter()
        .all(|n| n.neighbors.len() == expected && n.peer_heights.len() == expected)
}

#[tokio::test(start_paused = true)]
async fn bootstrap_exchange_reaches_every_node() {
    init_tracing();
    let net = Network::spawn(triangle()).unwrap();
    settle(&net, "bootstrap exchange", bootstrapped).await;

    let snap = net.snapshot_all();
    assert_eq!(snap.agreed_global_leader(), Some(NodeId(0)));
    for node in &snap.nodes {
        assert!(!node.height.rl.is_active());
        assert!(node.forming.is_empty());
    }
    assert_eq!(snap.nodes[0].height.global_delta, 0);
    assert_eq!(snap.nodes[1].height.global_delta, 1);
    assert_eq!(snap.nodes[2].height.global_delta, 1);
}

#[tokio::test(start_paused = true)]
async fn partition_elects_replacement_then_reconnection_spreads_it() {
    init_tracing();
    let net = Network::spawn(triangle()).unwrap();
    settle(&net, "bootstrap exchange", bootstrapped).await;

    net.drop_channel(NodeId(0), NodeId(1)).unwrap();
    net.drop_channel(NodeId(0), NodeId(2)).unwrap();
    settle(&net, "partition re-election", |snap| {
        let (a, b) = (&snap.nodes[1], &snap.nodes[2]);
        a.height.global.leader != NodeId(0)
            && a.height.global.leader == b.height.global.leader
            && !a.height.rl.is_active()
            && !b.height.rl.is_active()
    })
    .await;

    let leader = net.snapshot(NodeId(1)).unwrap().height.global.leader;
    assert!(leader == NodeId(1) || leader == NodeId(2), "got {leader}");
    // The cut-off seeded leader keeps leading its singleton component.
    let lone = net.snapshot(NodeId(0)).unwrap();
    assert_eq!(lone.height.global.leader, NodeId(0));
    assert!(lone.neighbors.is_empty());

    // Restoring one edge is enough: the replacement was elected more
    // recently, so its leadership outranks the seeded one and spreads.
    net.remake_channel(NodeId(0), NodeId(2)).unwrap();
    settle(&net, "reconvergence after remake", |snap| {
        snap.agreed_global_leader() == Some(leader)
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn isolating_a_node_makes_it_lead_itself() {
    init_tracing();
    let config = NetworkConfig::new(
        vec![vec![0, 1], vec![1, 0]],
        NodeId(0),
        vec![0, 1],
    );
    let net = Network::spawn(config).unwrap();
    settle(&net, "bootstrap exchange", bootstrapped).await;

    net.drop_channel(NodeId(0), NodeId(1)).unwrap();
    settle(&net, "self-election of the isolated node", |snap| {
        let n1 = &snap.nodes[1];
        n1.global_leader == NodeId(1) && n1.local_leader == NodeId(1)
    })
    .await;

    let snap = net.snapshot_all();
    assert_eq!(snap.nodes[0].height.global.leader, NodeId(0));
    assert_eq!(snap.nodes[1].height.global.leader, NodeId(1));
    assert!(snap.nodes.iter().all(|n| n.neighbors.is_empty()));
}

#[tokio::test(start_paused = true)]
async fn administrative_operations_check_their_arguments() {
    let net = Network::spawn(triangle()).unwrap();
    assert!(matches!(
        net.drop_channel(NodeId(0), NodeId(9)),
        Err(NetworkError::NodeOutOfRange(9, 3))
    ));
    assert!(matches!(
        net.remake_channel(NodeId(1), NodeId(1)),
        Err(NetworkError::SelfLoop(1))
    ));
    assert!(matches!(
        net.snapshot(NodeId(3)),
        Err(NetworkError::NodeOutOfRange(3, 3))
    ));
}
