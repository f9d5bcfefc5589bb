//! State replication between the authoritative controller and observers.
//!
//! The wire format is a single token: the state's name. The authoritative
//! side sends it once per change; replicas resolve it verbatim and refuse
//! anything they do not recognise.

use loadgate_types::{AgentId, LoadingState};
use tracing::debug;

use crate::host::ReplicationSink;

/// Errors raised when reading a replicated state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplicationError {
    /// The token does not name any state.
    #[error("unknown replicated state token {token:?}")]
    UnknownStateToken {
        /// The token as received.
        token: String,
    },
}

/// Resolve a wire token.
///
/// # Errors
///
/// Returns [`ReplicationError::UnknownStateToken`] if the token is not the
/// exact name of a state.
pub fn decode_state(token: &str) -> Result<LoadingState, ReplicationError> {
    LoadingState::from_name(token).ok_or_else(|| ReplicationError::UnknownStateToken {
        token: token.to_owned(),
    })
}

/// Authoritative-side sender that suppresses repeats.
#[derive(Debug, Clone, Default)]
pub struct StatePublisher {
    last_sent: Option<&'static str>,
}

impl StatePublisher {
    /// Create a publisher that has sent nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `state` unless its name equals the last one sent. Returns
    /// whether a token went out.
    pub fn publish<S: ReplicationSink + ?Sized>(
        &mut self,
        sink: &mut S,
        agent: AgentId,
        state: LoadingState,
    ) -> bool {
        let token = state.name();
        if self.last_sent == Some(token) {
            return false;
        }
        sink.publish_state(agent, token);
        debug!(agent = %agent, token, "State replicated");
        self.last_sent = Some(token);
        true
    }

    /// The last token sent.
    pub const fn last_sent(&self) -> Option<&'static str> {
        self.last_sent
    }
}

/// Observer-side mirror of an agent's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaState {
    state: LoadingState,
}

impl Default for ReplicaState {
    fn default() -> Self {
        Self {
            state: LoadingState::Stopped,
        }
    }
}

impl ReplicaState {
    /// A mirror that has not received anything yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a received token. An unknown token leaves the mirror unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ReplicationError::UnknownStateToken`] for an unknown token.
    pub fn apply(&mut self, token: &str) -> Result<LoadingState, ReplicationError> {
        let state = decode_state(token)?;
        self.state = state;
        Ok(state)
    }

    /// The mirrored state.
    pub const fn state(&self) -> LoadingState {
        self.state
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Wire {
        sent: Vec<String>,
    }

    impl ReplicationSink for Wire {
        fn publish_state(&mut self, _agent: AgentId, token: &str) {
            self.sent.push(token.to_owned());
        }
    }

    #[test]
    fn publishes_once_per_change() {
        let mut wire = Wire::default();
        let mut publisher = StatePublisher::new();
        let agent = AgentId::new();
        assert!(publisher.publish(&mut wire, agent, LoadingState::Idle));
        assert!(!publisher.publish(&mut wire, agent, LoadingState::Idle));
        assert!(publisher.publish(&mut wire, agent, LoadingState::Loading));
        assert_eq!(wire.sent, ["Idle", "Loading"]);
        assert_eq!(publisher.last_sent(), Some("Loading"));
    }

    #[test]
    fn replica_reads_back_loading() {
        let mut wire = Wire::default();
        let mut publisher = StatePublisher::new();
        publisher.publish(&mut wire, AgentId::new(), LoadingState::Loading);

        let mut replica = ReplicaState::new();
        let token = wire.sent.last().unwrap();
        assert_eq!(replica.apply(token).unwrap(), LoadingState::Loading);
        assert_eq!(replica.state().name(), LoadingState::Loading.name());
    }

    #[test]
    fn unknown_token_is_a_protocol_error() {
        let mut replica = ReplicaState::new();
        replica.apply("Unloading").unwrap();
        let err = replica.apply("Resting").unwrap_err();
        assert_eq!(
            err,
            ReplicationError::UnknownStateToken {
                token: "Resting".to_owned()
            }
        );
        // Never coerced: the mirror keeps its last good state.
        assert_eq!(replica.state(), LoadingState::Unloading);
    }
}
