use super::PlanStore;
use crate::{
    engine::{JurisdictionReport, PlanningReport},
    error::EngineResult,
    types::RunId,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

#[derive(Debug, Clone, PartialEq)]
pub struct PlanRunSummary {
    pub run_id: String,
    pub as_of: String,
    pub started_at: String,
    pub version: String,
    pub feed_degraded: bool,
    pub change_count: i64,
}

/// Fresh run identifier.
pub fn new_run_id() -> RunId {
    uuid::Uuid::new_v4().to_string()
}

impl PlanStore {
    /// Persist a finished run and one row per jurisdiction, in one transaction.
    pub fn save_plan_run(
        &mut self,
        run_id: &str,
        started_at: DateTime<Utc>,
        report: &PlanningReport,
    ) -> EngineResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO plan_run (run_id, as_of, started_at, version, feed_degraded, change_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run_id,
                report.as_of.format("%Y-%m-%d").to_string(),
                started_at.to_rfc3339(),
                env!("CARGO_PKG_VERSION"),
                report.any_feed_unavailable(),
                report.changes.len() as i64,
            ],
        )?;
        for j in &report.jurisdictions {
            tx.execute(
                "INSERT INTO jurisdiction_report
                     (run_id, jurisdiction_id, priority_id, total_units, annual_savings, report_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    run_id,
                    j.jurisdiction_id,
                    j.priority_waterbody,
                    j.cost.total_units as i64,
                    j.cost.savings,
                    serde_json::to_string(j)?,
                ],
            )?;
        }
        tx.commit()?;
        log::info!(
            "store: saved run {run_id} with {} jurisdiction report(s)",
            report.jurisdictions.len()
        );
        Ok(())
    }

    pub fn get_plan_run(&self, run_id: &str) -> EngineResult<Option<PlanRunSummary>> {
        let row = self
            .conn
            .query_row(
                "SELECT run_id, as_of, started_at, version, feed_degraded, change_count
                 FROM plan_run WHERE run_id = ?1",
                params![run_id],
                |r| {
                    Ok(PlanRunSummary {
                        run_id: r.get(0)?,
                        as_of: r.get(1)?,
                        started_at: r.get(2)?,
                        version: r.get(3)?,
                        feed_degraded: r.get(4)?,
                        change_count: r.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn jurisdiction_reports(&self, run_id: &str) -> EngineResult<Vec<JurisdictionReport>> {
        let mut stmt = self.conn.prepare(
            "SELECT report_json FROM jurisdiction_report
             WHERE run_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let mut reports = Vec::with_capacity(rows.len());
        for json in rows {
            reports.push(serde_json::from_str(&json)?);
        }
        Ok(reports)
    }

    /// Count persisted runs (test helper).
    pub fn plan_run_count(&self) -> EngineResult<i64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM plan_run", [], |r| r.get(0))?;
        Ok(n)
    }
}
