use agentgit_types::{ComparisonResult, MatchType, StepComparison, StepStatus};
use rusqlite::{params, Connection};

use crate::Result;

use super::DagStore;

fn step_status_str(s: StepStatus) -> &'static str {
    match s {
        StepStatus::Match => "match",
        StepStatus::Diverge => "diverge",
        StepStatus::Add => "add",
        StepStatus::Remove => "remove",
        StepStatus::Cascade => "cascade",
    }
}

fn step_status_from_str(s: &str) -> StepStatus {
    match s {
        "diverge" => StepStatus::Diverge,
        "add" => StepStatus::Add,
        "remove" => StepStatus::Remove,
        "cascade" => StepStatus::Cascade,
        _ => StepStatus::Match,
    }
}

fn match_type_str(m: MatchType) -> &'static str {
    match m {
        MatchType::Exact => "exact",
        MatchType::Similar => "similar",
        MatchType::Mismatch => "mismatch",
        MatchType::Unknown => "unknown",
    }
}

fn match_type_from_str(s: &str) -> MatchType {
    match s {
        "exact" => MatchType::Exact,
        "similar" => MatchType::Similar,
        "mismatch" => MatchType::Mismatch,
        _ => MatchType::Unknown,
    }
}

/// Persist a comparison result and its per-step rows, returning the
/// assigned comparison id.
pub fn store_comparison(conn: &Connection, result: &ComparisonResult) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO at_comparisons (
            baseline_recording_id, replay_recording_id, total, matched,
            diverged, added, removed, cascaded, root_cause_index, overall_pass
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            result.baseline_recording_id,
            result.replay_recording_id,
            result.total as i64,
            result.matched as i64,
            result.diverged as i64,
            result.added as i64,
            result.removed as i64,
            result.cascaded as i64,
            result.root_cause_index.map(|v| v as i64),
            result.overall_pass as i64,
        ],
    )?;
    let comparison_id = conn.last_insert_rowid();

    for step in &result.steps {
        conn.execute(
            r#"
            INSERT INTO at_step_comparisons (
                comparison_id, step_index, baseline_index, replay_index,
                status, match_type, similarity_score, diff_summary, root_cause_index
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                comparison_id,
                step.step_index as i64,
                step.baseline_index.map(|v| v as i64),
                step.replay_index.map(|v| v as i64),
                step_status_str(step.status),
                step.match_type.map(match_type_str),
                step.similarity_score,
                step.diff_summary,
                step.root_cause_index.map(|v| v as i64),
            ],
        )?;
    }

    Ok(comparison_id)
}

pub fn get_comparison(conn: &Connection, comparison_id: i64) -> Result<Option<ComparisonResult>> {
    let header = conn.query_row(
        "SELECT * FROM at_comparisons WHERE id = ?1",
        params![comparison_id],
        |row| {
            Ok((
                row.get::<_, String>("baseline_recording_id")?,
                row.get::<_, String>("replay_recording_id")?,
                row.get::<_, i64>("total")?,
                row.get::<_, i64>("matched")?,
                row.get::<_, i64>("diverged")?,
                row.get::<_, i64>("added")?,
                row.get::<_, i64>("removed")?,
                row.get::<_, i64>("cascaded")?,
                row.get::<_, Option<i64>>("root_cause_index")?,
                row.get::<_, i64>("overall_pass")?,
            ))
        },
    );

    let (
        baseline_recording_id,
        replay_recording_id,
        total,
        matched,
        diverged,
        added,
        removed,
        cascaded,
        root_cause_index,
        overall_pass,
    ) = match header {
        Ok(h) => h,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut stmt = conn.prepare(
        "SELECT * FROM at_step_comparisons WHERE comparison_id = ?1 ORDER BY step_index ASC",
    )?;
    let steps = stmt
        .query_map(params![comparison_id], |row| {
            let status: String = row.get("status")?;
            let match_type: Option<String> = row.get("match_type")?;
            Ok(StepComparison {
                step_index: row.get::<_, i64>("step_index")? as usize,
                baseline_index: row.get::<_, Option<i64>>("baseline_index")?.map(|v| v as usize),
                replay_index: row.get::<_, Option<i64>>("replay_index")?.map(|v| v as usize),
                status: step_status_from_str(&status),
                match_type: match_type.as_deref().map(match_type_from_str),
                similarity_score: row.get("similarity_score")?,
                diff_summary: row.get("diff_summary")?,
                root_cause_index: row.get::<_, Option<i64>>("root_cause_index")?.map(|v| v as usize),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Some(ComparisonResult {
        baseline_recording_id,
        replay_recording_id,
        total: total as usize,
        matched: matched as usize,
        diverged: diverged as usize,
        added: added as usize,
        removed: removed as usize,
        cascaded: cascaded as usize,
        root_cause_index: root_cause_index.map(|v| v as usize),
        overall_pass: overall_pass != 0,
        steps,
    }))
}

pub fn list_comparisons(conn: &Connection) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM at_comparisons ORDER BY id ASC")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

impl DagStore {
    pub fn store_comparison(&self, result: &ComparisonResult) -> Result<i64> {
        store_comparison(&self.conn, result)
    }

    pub fn get_comparison(&self, comparison_id: i64) -> Result<Option<ComparisonResult>> {
        get_comparison(&self.conn, comparison_id)
    }

    pub fn list_comparisons(&self) -> Result<Vec<i64>> {
        list_comparisons(&self.conn)
    }
}
