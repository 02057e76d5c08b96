//! state.rs — shared network state for the controller.
//!
//! The registry is touched concurrently by `AddNode` and `StartNetwork`
//! handlers while `GetTargetGlobalPosition` reads the active flag on every
//! round, so both pieces sit behind the fair readers/writer lock. The two
//! locks are independent on purpose: admission traffic must not contend
//! with the high-rate active-flag reads.

use mlat_types::sync::FairRwLock;
use mlat_types::Vec3;

/// One admitted sensor node. Immutable after admission; destroyed with the
/// controller.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    pub node_id: i32,
    pub position: Vec3,
    /// Datagram address of the node's router, as announced by the node
    pub reply_address: String,
}

/// Roster of admitted nodes plus the one-shot active flag.
///
/// Lifecycle contract: while active, membership is frozen; the flag flips
/// false → true exactly once per controller lifetime (there is no stop
/// transition).
pub struct NodeRegistry {
    nodes: FairRwLock<Vec<NodeDescriptor>>,
    is_active: FairRwLock<bool>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            nodes: FairRwLock::new(Vec::new()),
            is_active: FairRwLock::new(false),
        }
    }

    /// Insert a node. Returns false if the id is already present; the roster
    /// is left untouched in that case.
    pub fn add_node(&self, descriptor: NodeDescriptor) -> bool {
        let mut nodes = self.nodes.write();
        if nodes.iter().any(|n| n.node_id == descriptor.node_id) {
            return false;
        }
        nodes.push(descriptor);
        true
    }

    /// Clone the roster in admission order.
    pub fn nodes_snapshot(&self) -> Vec<NodeDescriptor> {
        self.nodes.read().clone()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_active(&self) -> bool {
        *self.is_active.read()
    }

    /// Flip the active flag. Forward-only: there is deliberately no way to
    /// deactivate a started network.
    pub fn activate(&self) {
        *self.is_active.write() = true;
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(node_id: i32) -> NodeDescriptor {
        NodeDescriptor {
            node_id,
            position: Vec3::new(node_id as f64, 0.0, 0.0),
            reply_address: format!("127.0.0.1:555{node_id}"),
        }
    }

    #[test]
    fn admission_preserves_order_and_rejects_duplicates() {
        let registry = NodeRegistry::new();
        assert!(registry.add_node(descriptor(2)));
        assert!(registry.add_node(descriptor(1)));
        assert!(registry.add_node(descriptor(3)));
        assert!(!registry.add_node(descriptor(2)));

        let ids: Vec<i32> = registry
            .nodes_snapshot()
            .iter()
            .map(|n| n.node_id)
            .collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn starts_inactive_and_activates_once() {
        let registry = NodeRegistry::new();
        assert!(!registry.is_active());
        registry.activate();
        assert!(registry.is_active());
        // Idempotent; there is no way back.
        registry.activate();
        assert!(registry.is_active());
    }
}
