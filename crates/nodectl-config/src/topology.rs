//! Read-only view over the configured cluster membership.

/// Ordered cluster membership plus this node's own address.
///
/// The first listed member is the seed: it is the node that bootstraps a new
/// cluster on first deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterTopology<'a> {
    members: &'a [String],
    own_address: &'a str,
}

impl<'a> ClusterTopology<'a> {
    /// Builds a topology view over borrowed configuration values.
    #[must_use]
    pub const fn new(members: &'a [String], own_address: &'a str) -> Self {
        Self {
            members,
            own_address,
        }
    }

    /// All configured members in declaration order.
    #[must_use]
    pub const fn members(&self) -> &'a [String] {
        self.members
    }

    /// Address of the node this controller manages.
    #[must_use]
    pub const fn own_address(&self) -> &'a str {
        self.own_address
    }

    /// Whether the topology describes a standalone deployment.
    #[must_use]
    pub const fn is_single_node(&self) -> bool {
        self.members.len() == 1
    }

    /// Whether this node is the seed member.
    #[must_use]
    pub fn is_seed(&self) -> bool {
        self.members
            .first()
            .is_some_and(|seed| seed == self.own_address)
    }

    /// Members other than this node, in declaration order.
    pub fn peers(&self) -> impl Iterator<Item = &'a str> + use<'a> {
        let own = self.own_address;
        self.members
            .iter()
            .map(String::as_str)
            .filter(move |member| *member != own)
    }
}
