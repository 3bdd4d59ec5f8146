use serde::Serialize;
use sqlx::FromRow;
use tracing::instrument;

use crate::error::AppError;
use crate::gateway::Gateway;
use crate::profile::repo_types::AccountId;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Position {
    #[sqlx(rename = "account_id")]
    pub id: AccountId,
    pub nickname: String,
    pub record: i32,
}

#[derive(Debug, Serialize)]
pub struct ScoreboardPage {
    pub players: Vec<Position>,
    pub total: i64,
}

/// One page of the leaderboard, best record first, plus the total number of
/// accounts for pagination.
#[instrument(skip(gw))]
pub async fn page(
    gw: &dyn Gateway,
    limit: Option<u64>,
    page: u64,
) -> Result<ScoreboardPage, AppError> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let offset = limit
        .checked_mul(page)
        .and_then(|o| i64::try_from(o).ok())
        .ok_or_else(|| AppError::MalformedInput("page out of range".into()))?;
    // limit is capped above, the cast cannot truncate
    let limit = limit as i64;

    let total = gw.count_accounts().await?;
    let players = gw.list_by_record(limit, offset).await?;
    Ok(ScoreboardPage { players, total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryGateway;

    async fn board() -> MemoryGateway {
        let gw = MemoryGateway::new();
        for (i, record) in [30, 10, 50, 20, 40].into_iter().enumerate() {
            let id = gw.seed(&format!("player{i}"), &format!("p{i}@example.com"), 0).await;
            gw.set_record(id, record).await;
        }
        gw
    }

    #[tokio::test]
    async fn pages_are_sorted_by_record_descending() {
        let gw = board().await;

        let first = page(&gw, Some(2), 0).await.unwrap();
        assert_eq!(first.total, 5);
        let records: Vec<i32> = first.players.iter().map(|p| p.record).collect();
        assert_eq!(records, vec![50, 40]);

        let third = page(&gw, Some(2), 2).await.unwrap();
        let records: Vec<i32> = third.players.iter().map(|p| p.record).collect();
        assert_eq!(records, vec![10]);
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty_but_keeps_total() {
        let gw = board().await;
        let empty = page(&gw, Some(10), 3).await.unwrap();
        assert!(empty.players.is_empty());
        assert_eq!(empty.total, 5);
    }

    #[tokio::test]
    async fn limit_defaults_and_is_capped() {
        let gw = board().await;
        assert_eq!(page(&gw, None, 0).await.unwrap().players.len(), 5);
        assert_eq!(page(&gw, Some(10_000), 0).await.unwrap().players.len(), 5);
    }

    #[tokio::test]
    async fn overflowing_offset_is_malformed() {
        let gw = MemoryGateway::new();
        let err = page(&gw, Some(100), u64::MAX).await.unwrap_err();
        assert!(matches!(err, AppError::MalformedInput(_)));
        assert_eq!(gw.reads(), 0);
    }

    #[test]
    fn position_serializes_like_the_wire_format() {
        let position = Position { id: 42, nickname: "Nick".into(), record: 100500 };
        let json = serde_json::to_value(position).unwrap();
        assert_eq!(json, serde_json::json!({"id": 42, "nickname": "Nick", "record": 100500}));
    }
}
