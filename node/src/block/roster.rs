use serde::{Deserialize, Serialize};

use crate::block::types::block::{PrepId, Vote};
use crate::config::BlockManagerConfiguration;
use crate::utilities::hash::HashType;

/// Generator and validators of a single block.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ContributorInfo {
    pub(crate) generator: PrepId,
    pub(crate) validators: Vec<PrepId>,
}

impl ContributorInfo {
    fn from_roster(preps: &[PrepId]) -> Option<Self> {
        preps.split_first().map(|(generator, validators)| Self {
            generator: generator.clone(),
            validators: validators.to_vec(),
        })
    }
}

/// Roster position after a committed block, stored next to the block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RosterState {
    pub(crate) preps: Vec<PrepId>,
    pub(crate) prev_contributors: Vec<PrepId>,
    pub(crate) produced_since_rotation: u64,
}

/// Round-robin roster of block producers.
///
/// The head of `preps` produces blocks. With rotation enabled it moves to the tail
/// after `blocks_per_leader` blocks. The manager works on a clone during a cycle and
/// keeps it only when the cycle commits.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ValidatorRoster {
    preps: Vec<PrepId>,
    /// Roster which produced the previous block, head first
    prev_contributors: Vec<PrepId>,
    produced_since_rotation: u64,
    leader_rotation: bool,
    blocks_per_leader: u64,
    default_leader: PrepId,
}

impl ValidatorRoster {
    pub(crate) fn new(config: &BlockManagerConfiguration) -> Self {
        Self {
            preps: config.preps.clone(),
            prev_contributors: vec![],
            produced_since_rotation: 0,
            leader_rotation: config.leader_rotation,
            blocks_per_leader: config.blocks_per_leader,
            default_leader: config.default_leader.clone(),
        }
    }

    /// Continues from a stored position. Rotation settings still come from the configuration.
    pub(crate) fn restore(config: &BlockManagerConfiguration, state: RosterState) -> Self {
        Self {
            preps: state.preps,
            prev_contributors: state.prev_contributors,
            produced_since_rotation: state.produced_since_rotation,
            ..Self::new(config)
        }
    }

    pub(crate) fn state(&self) -> RosterState {
        RosterState {
            preps: self.preps.clone(),
            prev_contributors: self.prev_contributors.clone(),
            produced_since_rotation: self.produced_since_rotation,
        }
    }

    /// Replaces the roster with the one returned by the execution engine.
    pub(crate) fn register(&mut self, update: Option<Vec<PrepId>>) {
        if let Some(preps) = update {
            log::info!("Registering new roster: {:?}", preps);
            self.preps = preps;
            self.produced_since_rotation = 0;
        }
    }

    /// Generator and validators of the block about to be produced.
    ///
    /// Counts the production towards the current leader's quota and rotates the
    /// roster once the quota is used up.
    pub(crate) fn compute_contributor_info(&mut self) -> ContributorInfo {
        let info = ContributorInfo::from_roster(&self.preps).unwrap_or_else(|| ContributorInfo {
            generator: self.default_leader.clone(),
            validators: vec![],
        });

        self.prev_contributors = if self.preps.is_empty() {
            vec![info.generator.clone()]
        } else {
            self.preps.clone()
        };

        if self.leader_rotation {
            self.produced_since_rotation += 1;
            if self.produced_since_rotation >= self.blocks_per_leader {
                self.rotate();
                self.produced_since_rotation = 0;
            }
        }
        info
    }

    /// Placeholder votes of the previous block's validators. The generator doesn't vote.
    pub(crate) fn build_prev_votes(
        &self,
        height: u64,
        prev_hash: Option<HashType>,
        timestamp: u64,
    ) -> Vec<Option<Vote>> {
        self.prev_contributors
            .iter()
            .enumerate()
            .map(|(position, rep)| {
                if position == 0 {
                    None
                } else {
                    Some(Vote::placeholder(rep.clone(), timestamp, height, prev_hash))
                }
            })
            .collect()
    }

    pub(crate) fn prev_block_contributors(&self) -> Option<ContributorInfo> {
        ContributorInfo::from_roster(&self.prev_contributors)
    }

    pub(crate) fn next_leader(&self) -> PrepId {
        self.preps
            .first()
            .cloned()
            .unwrap_or_else(|| self.default_leader.clone())
    }

    pub(crate) fn preps(&self) -> &[PrepId] {
        &self.preps
    }

    pub(crate) fn prev_contributors(&self) -> &[PrepId] {
        &self.prev_contributors
    }

    fn rotate(&mut self) {
        if !self.preps.is_empty() {
            self.preps.rotate_left(1);
            log::debug!("Rotated leader, next leader: {}", self.preps[0]);
        }
    }
}

#[cfg(test)]
mod test {
    use crate::config::BlockManagerConfiguration;

    use super::*;

    fn roster(preps: &[&str], leader_rotation: bool, blocks_per_leader: u64) -> ValidatorRoster {
        let config = BlockManagerConfiguration {
            preps: preps.iter().map(|p| p.to_string()).collect(),
            leader_rotation,
            blocks_per_leader,
            ..Default::default()
        };
        ValidatorRoster::new(&config)
    }

    #[test]
    fn generator_is_head_and_validators_are_the_rest() {
        let mut roster = roster(&["V0", "V1", "V2"], false, 1);

        let info = roster.compute_contributor_info();

        assert_eq!(info.generator, "V0");
        assert_eq!(info.validators, vec!["V1", "V2"]);
    }

    #[test]
    fn rotates_every_k_productions() {
        let mut roster = roster(&["V0", "V1", "V2"], true, 2);

        assert_eq!(roster.compute_contributor_info().generator, "V0");
        assert_eq!(roster.compute_contributor_info().generator, "V0");
        assert_eq!(roster.preps(), &["V1", "V2", "V0"]);

        assert_eq!(roster.compute_contributor_info().generator, "V1");
        assert_eq!(roster.compute_contributor_info().generator, "V1");
        assert_eq!(roster.compute_contributor_info().generator, "V2");
    }

    #[test]
    fn leader_is_stable_without_rotation() {
        let mut roster = roster(&["V0", "V1", "V2"], false, 1);

        for _ in 0..10 {
            assert_eq!(roster.compute_contributor_info().generator, "V0");
        }
        assert_eq!(roster.preps(), &["V0", "V1", "V2"]);
    }

    #[test]
    fn empty_roster_uses_default_leader() {
        let mut roster = roster(&[], true, 1);

        let info = roster.compute_contributor_info();

        assert_eq!(info.generator, BlockManagerConfiguration::default().default_leader);
        assert!(info.validators.is_empty());
        assert_eq!(roster.next_leader(), info.generator);
    }

    #[test]
    fn register_replaces_roster_and_resets_quota() {
        let mut roster = roster(&["V0", "V1"], true, 2);
        roster.compute_contributor_info();

        roster.register(Some(vec!["A".into(), "B".into()]));

        assert_eq!(roster.preps(), &["A", "B"]);
        //Quota starts from zero again
        assert_eq!(roster.compute_contributor_info().generator, "A");
        assert_eq!(roster.preps(), &["A", "B"]);
        assert_eq!(roster.compute_contributor_info().generator, "A");
        assert_eq!(roster.preps(), &["B", "A"]);
    }

    #[test]
    fn absent_update_keeps_roster_and_quota() {
        let mut roster = roster(&["V0", "V1"], true, 2);
        roster.compute_contributor_info();

        roster.register(None);
        roster.compute_contributor_info();

        assert_eq!(roster.preps(), &["V1", "V0"]);
    }

    #[test]
    fn prev_votes_skip_previous_generator() {
        let mut roster = roster(&["V0", "V1", "V2"], false, 1);
        assert!(roster.build_prev_votes(0, None, 1).is_empty());

        roster.compute_contributor_info();
        let prev_hash = Some(HashType::new([7; 32]));
        let votes = roster.build_prev_votes(5, prev_hash, 100);

        assert_eq!(votes.len(), 3);
        assert!(votes[0].is_none());
        let vote = votes[1].as_ref().unwrap();
        assert_eq!(vote.rep, "V1");
        assert_eq!(vote.block_height, 5);
        assert_eq!(vote.block_hash, prev_hash);
        assert_eq!(vote.timestamp, 100);
        assert_eq!(votes[2].as_ref().unwrap().rep, "V2");
    }

    #[test]
    fn restored_roster_continues_rotation() {
        let mut roster = roster(&["V0", "V1"], true, 2);
        roster.compute_contributor_info();

        let config = BlockManagerConfiguration {
            preps: vec!["X".into()],
            leader_rotation: true,
            blocks_per_leader: 2,
            ..Default::default()
        };
        let mut restored = ValidatorRoster::restore(&config, roster.state());

        assert_eq!(restored, roster);
        assert_eq!(restored.prev_block_contributors().unwrap().generator, "V0");
        assert_eq!(restored.compute_contributor_info().generator, "V0");
        assert_eq!(restored.next_leader(), "V1");
    }

    #[test]
    fn prev_contributors_are_the_pre_rotation_roster() {
        let mut roster = roster(&["V0", "V1"], true, 1);

        roster.compute_contributor_info();

        assert_eq!(roster.prev_contributors(), &["V0", "V1"]);
        let prev = roster.prev_block_contributors().unwrap();
        assert_eq!(prev.generator, "V0");
        assert_eq!(roster.next_leader(), "V1");
    }
}
