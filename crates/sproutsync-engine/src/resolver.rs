//! Builds the group -> profiles structure and the per-network partition.

use std::collections::{BTreeMap, HashSet};

use sproutsync_core::{Group, GroupId, NetworkMapping, NetworkType, Profile, ProfileId};

use crate::diagnostics::Diagnostic;

/// Name of the synthetic bucket holding profiles with no known group.
pub const DEFAULT_BUCKET_NAME: &str = "default";

/// Bucket identity. Real groups sort by id; the default bucket sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BucketKey {
    Group(GroupId),
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupBucket {
    pub group_name: String,
    /// Members in input order.
    pub profiles: Vec<Profile>,
}

impl GroupBucket {
    fn named(group_name: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            profiles: Vec::new(),
        }
    }

    #[must_use]
    pub fn profile_ids(&self) -> Vec<ProfileId> {
        self.profiles.iter().map(|p| p.id).collect()
    }
}

/// Groups `profiles` into one bucket per known group plus the default bucket.
///
/// A profile joins every bucket whose group it declares. A profile declaring
/// no known group joins only the default bucket. Buckets may end up empty.
#[must_use]
pub fn resolve(profiles: &[Profile], groups: &[Group]) -> BTreeMap<BucketKey, GroupBucket> {
    let mut buckets: BTreeMap<BucketKey, GroupBucket> = groups
        .iter()
        .map(|g| (BucketKey::Group(g.id), GroupBucket::named(g.name.clone())))
        .collect();
    buckets.insert(BucketKey::Default, GroupBucket::named(DEFAULT_BUCKET_NAME));

    for profile in profiles {
        let mut seen: HashSet<GroupId> = HashSet::new();
        let mut placed = false;
        for group_id in &profile.group_ids {
            if !seen.insert(*group_id) {
                continue;
            }
            if let Some(bucket) = buckets.get_mut(&BucketKey::Group(*group_id)) {
                bucket.profiles.push(profile.clone());
                placed = true;
            }
        }
        if !placed {
            tracing::debug!(
                profile_id = profile.id,
                declared = ?profile.group_ids,
                "profile has no known group; assigning to default bucket"
            );
            if let Some(bucket) = buckets.get_mut(&BucketKey::Default) {
                bucket.profiles.push(profile.clone());
            }
        }
    }

    buckets
}

/// Profiles of one bucket split by canonical network.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkPartition {
    pub by_network: BTreeMap<NetworkType, Vec<Profile>>,
    /// One [`Diagnostic::UnmappedNetwork`] per excluded profile.
    pub diagnostics: Vec<Diagnostic>,
}

impl NetworkPartition {
    /// Networks that have at least one profile.
    pub fn networks(&self) -> impl Iterator<Item = NetworkType> + '_ {
        self.by_network
            .iter()
            .filter(|(_, profiles)| !profiles.is_empty())
            .map(|(network, _)| *network)
    }

    #[must_use]
    pub fn network_of(&self, profile_id: ProfileId) -> Option<NetworkType> {
        self.by_network
            .iter()
            .find(|(_, profiles)| profiles.iter().any(|p| p.id == profile_id))
            .map(|(network, _)| *network)
    }
}

/// Splits `profiles` by canonical network, keeping input order inside each
/// network. Profiles with an unsupported network are excluded and reported.
#[must_use]
pub fn partition_by_network(profiles: &[Profile]) -> NetworkPartition {
    let mut partition = NetworkPartition::default();
    for profile in profiles {
        match profile.network() {
            NetworkMapping::Known(network) => {
                partition
                    .by_network
                    .entry(network)
                    .or_default()
                    .push(profile.clone());
            }
            NetworkMapping::Unmapped(raw) => {
                tracing::warn!(
                    profile_id = profile.id,
                    network_type = %raw,
                    "unsupported network type; profile excluded"
                );
                partition.diagnostics.push(Diagnostic::UnmappedNetwork {
                    profile_id: profile.id,
                    raw,
                });
            }
        }
    }
    partition
}
