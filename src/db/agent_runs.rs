use rusqlite::{params, OptionalExtension, Row};

use super::{now, parse_ts, AgentRun, AgentRunStatus, AgentType, Database, DbError, DbResult};

const RUN_COLUMNS: &str = "id, task_id, agent_type, status, conversation_id, created_at, completed_at";

fn map_run(row: &Row<'_>) -> rusqlite::Result<AgentRun> {
    let agent_type: String = row.get(2)?;
    let status: String = row.get(3)?;
    let created_at: String = row.get(5)?;
    let completed_at: Option<String> = row.get(6)?;
    // Unknown phase names only appear if the table was edited by hand.
    let agent_type = agent_type.parse::<AgentType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(AgentRun {
        id: row.get(0)?,
        task_id: row.get(1)?,
        agent_type,
        status: AgentRunStatus::from_db(&status),
        conversation_id: row.get(4)?,
        created_at: parse_ts(&created_at),
        completed_at: completed_at.as_deref().map(parse_ts),
    })
}

impl Database {
    /// Insert a new run in `running` state.
    pub fn create_agent_run(
        &self,
        task_id: i64,
        agent_type: AgentType,
        conversation_id: Option<i64>,
    ) -> DbResult<AgentRun> {
        let id = {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO agent_runs (task_id, agent_type, status, conversation_id, created_at) \
                 VALUES (?1, ?2, 'running', ?3, ?4)",
                params![task_id, agent_type.as_str(), conversation_id, now()],
            )?;
            conn.last_insert_rowid()
        };
        self.get_agent_run(id)?
            .ok_or(DbError::NotFound { entity: "Agent run", id })
    }

    pub fn get_agent_run(&self, id: i64) -> DbResult<Option<AgentRun>> {
        let conn = self.lock()?;
        let run = conn
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM agent_runs WHERE id = ?1"),
                params![id],
                map_run,
            )
            .optional()?;
        Ok(run)
    }

    /// All runs for a task, oldest first.
    pub fn list_agent_runs(&self, task_id: i64) -> DbResult<Vec<AgentRun>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM agent_runs WHERE task_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![task_id], map_run)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn link_agent_run_conversation(&self, run_id: i64, conversation_id: i64) -> DbResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE agent_runs SET conversation_id = ?1 WHERE id = ?2",
            params![conversation_id, run_id],
        )?;
        if updated == 0 {
            return Err(DbError::NotFound { entity: "Agent run", id: run_id });
        }
        Ok(())
    }

    /// Set a run's status. `completed_at` is stamped for `completed` and cleared otherwise.
    pub fn update_agent_run_status(&self, run_id: i64, status: AgentRunStatus) -> DbResult<()> {
        let completed_at = (status == AgentRunStatus::Completed).then(now);
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE agent_runs SET status = ?1, completed_at = ?2 WHERE id = ?3",
            params![status.as_str(), completed_at, run_id],
        )?;
        if updated == 0 {
            return Err(DbError::NotFound { entity: "Agent run", id: run_id });
        }
        Ok(())
    }

    /// Mark every running/pending run of the task as completed. Returns the number of rows touched.
    pub fn force_complete_agent_runs(&self, task_id: i64) -> DbResult<usize> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE agent_runs SET status = 'completed', completed_at = ?1 \
             WHERE task_id = ?2 AND status IN ('running', 'pending')",
            params![now(), task_id],
        )?;
        Ok(updated)
    }
}
