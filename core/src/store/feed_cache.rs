use super::PlanStore;
use crate::{
    error::EngineResult,
    feed::{AssessmentFeed, FeedStatus},
    model::AssessmentRecord,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

impl PlanStore {
    /// Keep the last good feed for a state. Only live feeds are stored;
    /// returns false for anything else.
    pub fn save_feed_snapshot(
        &self,
        feed: &AssessmentFeed,
        fetched_at: DateTime<Utc>,
    ) -> EngineResult<bool> {
        if feed.status != FeedStatus::Live {
            return Ok(false);
        }
        let records_json = serde_json::to_string(&feed.records)?;
        self.conn.execute(
            "INSERT INTO feed_snapshot (state, fetched_at, record_count, records_json)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(state) DO UPDATE SET
                 fetched_at = excluded.fetched_at,
                 record_count = excluded.record_count,
                 records_json = excluded.records_json",
            params![
                feed.state.to_uppercase(),
                fetched_at.to_rfc3339(),
                feed.records.len() as i64,
                records_json,
            ],
        )?;
        log::debug!("store: cached {} records for {}", feed.records.len(), feed.state);
        Ok(true)
    }

    /// Last good feed for a state, flagged `Cached`.
    pub fn load_feed_snapshot(&self, state: &str) -> EngineResult<Option<AssessmentFeed>> {
        let row = self
            .conn
            .query_row(
                "SELECT fetched_at, records_json FROM feed_snapshot WHERE state = ?1",
                params![state.to_uppercase()],
                |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
            )
            .optional()?;

        let Some((fetched_at, records_json)) = row else {
            return Ok(None);
        };
        let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
            .map_err(|e| anyhow::anyhow!("Bad fetched_at for {state}: {e}"))?
            .with_timezone(&Utc);
        let records: Vec<AssessmentRecord> = serde_json::from_str(&records_json)?;
        Ok(Some(AssessmentFeed {
            state: state.to_string(),
            status: FeedStatus::Cached { fetched_at },
            records,
        }))
    }
}
