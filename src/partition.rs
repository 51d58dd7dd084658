use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::data_loader::GameRecord;
use crate::ranking_context::SweepContext;
use crate::sort_key::{GroupKey, SortKey};

/// A game tagged with the K-factor it will be rated under.
#[derive(Debug, Clone)]
pub struct KeyedGame {
    pub key: SortKey,
    pub game: GameRecord,
}

impl KeyedGame {
    pub fn new(k_factor: u32, game: GameRecord) -> Self {
        Self {
            key: SortKey::new(k_factor, game.season_year, game.year, game.month, game.day),
            game,
        }
    }
}

/// Every record of one K-factor, in chronological order. Owned by value so only one worker can
/// hold it.
#[derive(Debug)]
pub struct Partition {
    pub group: GroupKey,
    pub records: Vec<KeyedGame>,
}

impl Partition {
    pub fn k_factor(&self) -> u32 {
        self.group.0
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug)]
pub struct PartitionSet {
    pub partitions: Vec<Partition>,
    // Records whose K-factor isn't part of the sweep. Handed back rather than dropped.
    pub unrouted: Vec<KeyedGame>,
}

// Fans every game out once per K-factor in the sweep.
pub fn key_games(games: &[GameRecord], ctx: &SweepContext) -> Vec<KeyedGame> {
    let mut keyed = Vec::with_capacity(games.len() * ctx.k_factors().count());
    for k_factor in ctx.k_factors() {
        for g in games {
            keyed.push(KeyedGame::new(k_factor, g.clone()));
        }
    }
    keyed
}

// Routes each record by group key, then orders each partition by the full key. The sort is stable,
// so games sharing a date keep their input order and reruns see the same sequence.
// Records whose K-factor the sweep doesn't contain are handed back in `unrouted`.
pub fn partition_and_order(records: Vec<KeyedGame>, ctx: &SweepContext) -> PartitionSet {
    let mut groups: BTreeMap<GroupKey, Vec<KeyedGame>> = ctx
        .k_factors()
        .map(|k| (GroupKey(k), Vec::new()))
        .collect();
    let mut unrouted = Vec::new();

    for record in records {
        if !ctx.contains_k(record.key.k_factor) {
            warn!(
                key = %record.key,
                game_id = %record.game.game_id,
                "Record K-factor is outside the sweep"
            );
            unrouted.push(record);
            continue;
        }
        groups.entry(record.key.group_key()).or_default().push(record);
    }

    let partitions = groups
        .into_iter()
        .map(|(group, mut records)| {
            records.sort_by(|a, b| a.key.cmp_order(&b.key));
            debug!(k_factor = group.0, records = records.len(), "Partition ready");
            Partition { group, records }
        })
        .collect();

    PartitionSet { partitions, unrouted }
}
