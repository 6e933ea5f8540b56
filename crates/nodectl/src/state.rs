//! Persisted node state.

use strum::{Display, EnumString, IntoStaticStr};

use crate::error::StartError;

/// Startup classification of a cluster node.
///
/// The serialised literals are what the state file holds between controller
/// invocations; parsing is exact and rejects anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeState {
    /// The node runs standalone.
    SingleNode,
    /// The node has not yet formed or joined a cluster.
    NeedsBootstrap,
    /// The node is a member of a running cluster.
    Clustered,
}

impl NodeState {
    /// Literal written to the state file.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Parses state file contents, ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`StartError::UnsupportedState`] for any other literal.
    pub fn from_persisted(contents: &str) -> Result<Self, StartError> {
        let literal = contents.trim();
        literal
            .parse()
            .map_err(|_| StartError::UnsupportedState {
                contents: literal.to_owned(),
            })
    }
}
