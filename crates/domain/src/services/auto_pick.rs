use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use uuid::Uuid;

use crate::errors::DomainResult;
use crate::repositories::AvailablePlayerPool;

/// What `AutoPickStrategy::select_and_claim` hands back to the caller. Unlike
/// the named slot/team fields the original design sketch suggested, the slot
/// itself is resolved inside `CommitProtocol::commit_auto_pick` (it already
/// does the skip-locked "smallest open overall_pick" claim) — this type only
/// needs to carry which player was chosen, so the strategy and the commit
/// transaction never race over the same slot twice.
#[derive(Debug, Clone, Copy)]
pub struct CommitRequest {
    pub draft_id: Uuid,
    pub player_id: Uuid,
}

/// A pluggable policy invoked on timeout. `select_and_claim` returns `None`
/// ("no-slots") when the available-player pool is empty; the scheduler then
/// checks remaining-picks to decide whether the draft is complete.
#[async_trait]
pub trait AutoPickStrategy: Send + Sync {
    async fn select_and_claim(&self, draft_id: Uuid) -> DomainResult<Option<CommitRequest>>;
}

/// Default strategy: select uniformly at random from the players not yet
/// picked in this draft.
pub struct UniformRandomAutoPick {
    player_pool: Arc<dyn AvailablePlayerPool>,
}

impl UniformRandomAutoPick {
    pub fn new(player_pool: Arc<dyn AvailablePlayerPool>) -> Self {
        Self { player_pool }
    }
}

#[async_trait]
impl AutoPickStrategy for UniformRandomAutoPick {
    async fn select_and_claim(&self, draft_id: Uuid) -> DomainResult<Option<CommitRequest>> {
        let available = self.player_pool.available_players(draft_id).await?;
        let mut rng = rand::rngs::StdRng::from_entropy();
        Ok(available
            .choose(&mut rng)
            .map(|&player_id| CommitRequest { draft_id, player_id }))
    }
}

/// Narrow ranking contract the best-player-available alternate depends on —
/// a stand-in for a real prospect-ranking collaborator. Returns candidates
/// ordered best-first.
#[async_trait]
pub trait PlayerRankingProvider: Send + Sync {
    async fn rank(&self, draft_id: Uuid, candidates: &[Uuid]) -> DomainResult<Vec<Uuid>>;
}

/// Alternate strategy: always take the top-ranked remaining player rather
/// than a uniform random one. Demonstrates that strategies plug in without
/// touching the Orchestrator or the Commit Protocol (§4.5).
pub struct BestPlayerAvailableAutoPick {
    player_pool: Arc<dyn AvailablePlayerPool>,
    ranking: Arc<dyn PlayerRankingProvider>,
}

impl BestPlayerAvailableAutoPick {
    pub fn new(player_pool: Arc<dyn AvailablePlayerPool>, ranking: Arc<dyn PlayerRankingProvider>) -> Self {
        Self { player_pool, ranking }
    }
}

#[async_trait]
impl AutoPickStrategy for BestPlayerAvailableAutoPick {
    async fn select_and_claim(&self, draft_id: Uuid) -> DomainResult<Option<CommitRequest>> {
        let available = self.player_pool.available_players(draft_id).await?;
        if available.is_empty() {
            return Ok(None);
        }
        let ranked = self.ranking.rank(draft_id, &available).await?;
        Ok(ranked
            .first()
            .map(|&player_id| CommitRequest { draft_id, player_id }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use std::sync::Mutex;

    struct FixedPool(Vec<Uuid>);

    #[async_trait]
    impl AvailablePlayerPool for FixedPool {
        async fn available_players(&self, _draft_id: Uuid) -> DomainResult<Vec<Uuid>> {
            Ok(self.0.clone())
        }
    }

    mock! {
        Ranking {}

        #[async_trait::async_trait]
        impl PlayerRankingProvider for Ranking {
            async fn rank(&self, draft_id: Uuid, candidates: &[Uuid]) -> DomainResult<Vec<Uuid>>;
        }
    }

    #[tokio::test]
    async fn uniform_random_returns_none_when_pool_empty() {
        let strategy = UniformRandomAutoPick::new(Arc::new(FixedPool(vec![])));
        let result = strategy.select_and_claim(Uuid::new_v4()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn uniform_random_selects_from_pool() {
        let players = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let strategy = UniformRandomAutoPick::new(Arc::new(FixedPool(players.clone())));
        let draft_id = Uuid::new_v4();
        let request = strategy.select_and_claim(draft_id).await.unwrap().unwrap();
        assert_eq!(request.draft_id, draft_id);
        assert!(players.contains(&request.player_id));
    }

    #[tokio::test]
    async fn uniform_random_covers_full_pool_over_many_draws() {
        let players = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let strategy = UniformRandomAutoPick::new(Arc::new(FixedPool(players.clone())));
        let draft_id = Uuid::new_v4();

        let seen = Mutex::new(std::collections::HashSet::new());
        for _ in 0..200 {
            let request = strategy.select_and_claim(draft_id).await.unwrap().unwrap();
            seen.lock().unwrap().insert(request.player_id);
        }
        assert_eq!(seen.into_inner().unwrap().len(), players.len());
    }

    #[tokio::test]
    async fn best_player_available_picks_top_ranked() {
        let players = vec![Uuid::new_v4(), Uuid::new_v4()];
        let mut sorted = players.clone();
        sorted.sort();
        let best = *sorted.last().unwrap();

        let mut ranking = MockRanking::new();
        ranking.expect_rank().times(1).returning(|_, candidates| {
            let mut sorted = candidates.to_vec();
            sorted.sort();
            sorted.reverse();
            Ok(sorted)
        });

        let strategy = BestPlayerAvailableAutoPick::new(Arc::new(FixedPool(players)), Arc::new(ranking));
        let request = strategy.select_and_claim(Uuid::new_v4()).await.unwrap().unwrap();
        assert_eq!(request.player_id, best);
    }
}
