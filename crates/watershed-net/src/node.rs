//! Node actor: one task wrapping one election state machine.

use std::collections::HashMap;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tracing::trace;
use watershed_election::Event;
use watershed_height::NodeId;

use crate::channel::Packet;
use crate::snapshot::NodeSnapshot;

/// Drains the node's mailbox, feeds the state machine and fans resulting
/// updates out to the node's outgoing channels. After every event the
/// current state is published on the watch for observers.
pub(crate) struct NodeActor {
    core: watershed_election::Node,
    inbox: UnboundedReceiver<Event>,
    outgoing: HashMap<NodeId, UnboundedSender<Packet>>,
    observe: watch::Sender<NodeSnapshot>,
}

impl NodeActor {
    pub(crate) fn new(
        core: watershed_election::Node,
        inbox: UnboundedReceiver<Event>,
        outgoing: HashMap<NodeId, UnboundedSender<Packet>>,
        observe: watch::Sender<NodeSnapshot>,
    ) -> Self {
        Self {
            core,
            inbox,
            outgoing,
            observe,
        }
    }

    /// Runs until every incoming channel task has stopped.
    pub(crate) async fn run(mut self) {
        while let Some(event) = self.inbox.recv().await {
            let outbound = self.core.handle(event);
            for msg in outbound {
                match self.outgoing.get(&msg.to) {
                    Some(tx) => {
                        // Failure means the channel task is mid-teardown.
                        if tx
                            .send(Packet {
                                timestamp: msg.timestamp,
                                height: msg.height,
                            })
                            .is_err()
                        {
                            trace!(from = %self.core.id(), to = %msg.to, "outgoing channel gone");
                        }
                    }
                    None => trace!(from = %self.core.id(), to = %msg.to, "no channel to peer"),
                }
            }
            self.observe.send_replace(NodeSnapshot::capture(&self.core));
        }
        trace!(node = %self.core.id(), "node task stopped");
    }
}
