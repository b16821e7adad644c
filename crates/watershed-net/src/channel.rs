//! Directed link actor.
//!
//! One channel task per direction of an edge. The task owns the link status
//! and the pending FIFO queue; while `Up` it forwards the head of the queue
//! to the receiving node on a fixed cadence, modeling bounded but non-zero
//! wire latency. Going `Down` clears the queue in the same step that flips
//! the status, so nothing enqueued before the cut can arrive after it.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, trace};
use watershed_election::Event;
use watershed_height::{Height, NodeId};

/// Administrative command from the network to one channel task.
#[derive(Debug, Clone, Copy)]
pub(crate) enum AdminCmd {
    /// Activate the link and notify the receiver.
    Up { timestamp: i64 },
    /// Cut the link, discard the queue and notify the receiver.
    Down { timestamp: i64 },
    /// Activate the link, carrying the sender's bootstrap height.
    SetUp { timestamp: i64, height: Height },
}

/// One height update in flight from the sending node.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Packet {
    pub timestamp: i64,
    pub height: Height,
}

/// State of one directed channel task.
pub(crate) struct Channel {
    /// Node whose updates travel over this channel.
    sender: NodeId,
    /// Node whose mailbox this channel feeds.
    receiver: NodeId,
    up: bool,
    queue: VecDeque<Event>,
    forward_interval: Duration,
    admin: UnboundedReceiver<AdminCmd>,
    packets: UnboundedReceiver<Packet>,
    delivery: UnboundedSender<Event>,
}

impl Channel {
    /// Channels start `Down`; the first `Up`/`SetUp` activates them.
    pub(crate) fn new(
        sender: NodeId,
        receiver: NodeId,
        forward_interval: Duration,
        admin: UnboundedReceiver<AdminCmd>,
        packets: UnboundedReceiver<Packet>,
        delivery: UnboundedSender<Event>,
    ) -> Self {
        Self {
            sender,
            receiver,
            up: false,
            queue: VecDeque::new(),
            forward_interval,
            admin,
            packets,
            delivery,
        }
    }

    /// Drive the channel until the network (or the sending node) goes away.
    pub(crate) async fn run(mut self) {
        // First tick lands a full interval out, so even the queue head
        // experiences the forwarding delay.
        let start = time::Instant::now() + self.forward_interval;
        let mut ticker = time::interval_at(start, self.forward_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                cmd = self.admin.recv() => match cmd {
                    Some(cmd) => self.apply(cmd),
                    None => break,
                },
                packet = self.packets.recv() => match packet {
                    Some(packet) => self.enqueue(packet),
                    None => break,
                },
                _ = ticker.tick(), if self.up && !self.queue.is_empty() => {
                    self.forward_head();
                }
            }
        }
        trace!(from = %self.sender, to = %self.receiver, "channel task stopped");
    }

    fn apply(&mut self, cmd: AdminCmd) {
        match cmd {
            // Up and Down each only act on an actual status flip.
            AdminCmd::Up { timestamp } => {
                if !self.up {
                    self.up = true;
                    debug!(from = %self.sender, to = %self.receiver, "link up");
                    self.deliver(Event::ChannelUp {
                        timestamp,
                        peer: self.sender,
                    });
                }
            }
            AdminCmd::Down { timestamp } => {
                if self.up {
                    self.up = false;
                    let lost = self.queue.len();
                    self.queue.clear();
                    debug!(from = %self.sender, to = %self.receiver, lost, "link down");
                    self.deliver(Event::ChannelDown {
                        timestamp,
                        peer: self.sender,
                    });
                }
            }
            AdminCmd::SetUp { timestamp, height } => {
                if !self.up {
                    self.up = true;
                    debug!(from = %self.sender, to = %self.receiver, "link up (bootstrap)");
                    self.deliver(Event::SetUp {
                        timestamp,
                        peer: self.sender,
                        height,
                    });
                }
            }
        }
    }

    /// Updates only travel over a live link; a downed link eats them.
    fn enqueue(&mut self, packet: Packet) {
        if self.up {
            self.queue.push_back(Event::Update {
                timestamp: packet.timestamp,
                height: packet.height,
            });
        } else {
            trace!(from = %self.sender, to = %self.receiver, "dropping update on dead link");
        }
    }

    fn forward_head(&mut self) {
        if let Some(event) = self.queue.pop_front() {
            self.deliver(event);
        }
    }

    fn deliver(&mut self, event: Event) {
        // The receiving node only disappears during teardown.
        if self.delivery.send(event).is_err() {
            trace!(to = %self.receiver, "receiver mailbox closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    struct Harness {
        admin: UnboundedSender<AdminCmd>,
        packets: UnboundedSender<Packet>,
        inbox: UnboundedReceiver<Event>,
    }

    fn spawn_channel(forward_interval: Duration) -> Harness {
        let (admin_tx, admin_rx) = mpsc::unbounded_channel();
        let (packet_tx, packet_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let channel = Channel::new(
            NodeId(0),
            NodeId(1),
            forward_interval,
            admin_rx,
            packet_rx,
            event_tx,
        );
        tokio::spawn(channel.run());
        Harness {
            admin: admin_tx,
            packets: packet_tx,
            inbox: event_rx,
        }
    }

    fn height(node: u32) -> Height {
        Height::initial(1, NodeId(0), 1, NodeId(0), NodeId(node))
    }

    async fn expect_silence(inbox: &mut UnboundedReceiver<Event>) {
        let quiet = tokio::time::timeout(Duration::from_secs(5), inbox.recv()).await;
        assert!(quiet.is_err(), "unexpected delivery: {quiet:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn forwards_updates_in_fifo_order() {
        let mut h = spawn_channel(Duration::from_millis(100));
        h.admin.send(AdminCmd::Up { timestamp: 0 }).unwrap();
        assert!(matches!(
            h.inbox.recv().await,
            Some(Event::ChannelUp { peer: NodeId(0), .. })
        ));

        for ts in 1..=3 {
            h.packets
                .send(Packet {
                    timestamp: ts,
                    height: height(0),
                })
                .unwrap();
        }
        for expected in 1..=3 {
            match h.inbox.recv().await {
                Some(Event::Update { timestamp, .. }) => assert_eq!(timestamp, expected),
                other => panic!("expected update {expected}, got {other:?}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn down_discards_everything_in_flight() {
        let mut h = spawn_channel(Duration::from_secs(3600));
        h.admin.send(AdminCmd::Up { timestamp: 0 }).unwrap();
        assert!(matches!(
            h.inbox.recv().await,
            Some(Event::ChannelUp { .. })
        ));

        h.packets
            .send(Packet {
                timestamp: 1,
                height: height(0),
            })
            .unwrap();
        h.packets
            .send(Packet {
                timestamp: 2,
                height: height(0),
            })
            .unwrap();
        h.admin.send(AdminCmd::Down { timestamp: 3 }).unwrap();

        assert!(matches!(
            h.inbox.recv().await,
            Some(Event::ChannelDown { timestamp: 3, peer: NodeId(0) })
        ));
        expect_silence(&mut h.inbox).await;
    }

    #[tokio::test(start_paused = true)]
    async fn updates_on_a_dead_link_never_surface() {
        let mut h = spawn_channel(Duration::from_millis(100));
        // Packet arrives while the link is still down.
        h.packets
            .send(Packet {
                timestamp: 1,
                height: height(0),
            })
            .unwrap();
        // Let the task process (and discard) it before activating the link.
        tokio::time::sleep(Duration::from_millis(1)).await;
        h.admin.send(AdminCmd::Up { timestamp: 2 }).unwrap();

        assert!(matches!(
            h.inbox.recv().await,
            Some(Event::ChannelUp { timestamp: 2, .. })
        ));
        expect_silence(&mut h.inbox).await;
    }

    #[tokio::test(start_paused = true)]
    async fn set_up_activates_and_carries_the_height() {
        let mut h = spawn_channel(Duration::from_millis(100));
        h.admin
            .send(AdminCmd::SetUp {
                timestamp: 0,
                height: height(0),
            })
            .unwrap();
        // A second activation while already up is a no-op.
        h.admin.send(AdminCmd::Up { timestamp: 1 }).unwrap();
        h.packets
            .send(Packet {
                timestamp: 2,
                height: height(0),
            })
            .unwrap();

        match h.inbox.recv().await {
            Some(Event::SetUp { peer, height: got, .. }) => {
                assert_eq!(peer, NodeId(0));
                assert_eq!(got, height(0));
            }
            other => panic!("expected SetUp, got {other:?}"),
        }
        assert!(matches!(
            h.inbox.recv().await,
            Some(Event::Update { timestamp: 2, .. })
        ));
    }
}
