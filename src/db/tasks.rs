use rusqlite::{params, OptionalExtension, Row};

use super::{
    now, parse_ts, Database, DbError, DbResult, Task, TaskStatus, TaskUpdate, TaskWithProject,
};

const TASK_COLUMNS: &str = "id, project_id, title, status, workflow_complete, created_at, updated_at";

fn map_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status: String = row.get(3)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(Task {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        status: TaskStatus::from_db(&status),
        workflow_complete: row.get(4)?,
        created_at: parse_ts(&created_at),
        updated_at: parse_ts(&updated_at),
    })
}

impl Database {
    pub fn create_task(&self, project_id: i64, title: &str) -> DbResult<Task> {
        let id = {
            let conn = self.lock()?;
            let ts = now();
            conn.execute(
                "INSERT INTO tasks (project_id, title, status, workflow_complete, created_at, updated_at) \
                 VALUES (?1, ?2, 'pending', 0, ?3, ?3)",
                params![project_id, title, ts],
            )?;
            conn.last_insert_rowid()
        };
        self.get_task(id)?.ok_or(DbError::NotFound { entity: "Task", id })
    }

    pub fn list_tasks(&self, project_id: i64) -> DbResult<Vec<Task>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![project_id], map_task)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_task(&self, id: i64) -> DbResult<Option<Task>> {
        let conn = self.lock()?;
        let task = conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                map_task,
            )
            .optional()?;
        Ok(task)
    }

    pub fn get_task_with_project(&self, id: i64) -> DbResult<Option<TaskWithProject>> {
        let Some(task) = self.get_task(id)? else {
            return Ok(None);
        };
        let Some(project) = self.get_project(task.project_id)? else {
            return Ok(None);
        };
        Ok(Some(TaskWithProject { task, project }))
    }

    /// Apply the set fields of `update`. Returns `None` when the task does not exist.
    ///
    /// Unset fields are left to the row's current value inside the statement, so
    /// concurrent partial updates touching different fields never undo each other.
    pub fn update_task(&self, id: i64, update: TaskUpdate) -> DbResult<Option<Task>> {
        if update.is_empty() {
            return self.get_task(id);
        }

        {
            let conn = self.lock()?;
            conn.execute(
                "UPDATE tasks SET title = COALESCE(?1, title), status = COALESCE(?2, status), \
                 workflow_complete = COALESCE(?3, workflow_complete), updated_at = ?4 \
                 WHERE id = ?5",
                params![
                    update.title,
                    update.status.map(|s| s.as_str()),
                    update.workflow_complete,
                    now(),
                    id
                ],
            )?;
        }
        self.get_task(id)
    }

    pub fn delete_task(&self, id: i64) -> DbResult<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// Tasks that are in progress but have no active agent, i.e. waiting on the user.
    pub fn count_tasks_awaiting_attention(&self) -> DbResult<i64> {
        let conn = self.lock()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM tasks t \
             WHERE t.status = 'in_progress' \
             AND NOT EXISTS ( \
                 SELECT 1 FROM agent_runs r \
                 WHERE r.task_id = t.id AND r.status IN ('running', 'pending') \
             )",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
