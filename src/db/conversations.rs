use rusqlite::{params, OptionalExtension, Row};

use super::{now, parse_ts, Conversation, Database, DbError, DbResult};

fn map_conversation(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    let created_at: String = row.get(3)?;
    Ok(Conversation {
        id: row.get(0)?,
        task_id: row.get(1)?,
        claude_session_id: row.get(2)?,
        created_at: parse_ts(&created_at),
    })
}

impl Database {
    pub fn create_conversation(&self, task_id: i64) -> DbResult<Conversation> {
        let id = {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO conversations (task_id, created_at) VALUES (?1, ?2)",
                params![task_id, now()],
            )?;
            conn.last_insert_rowid()
        };
        self.get_conversation(id)?
            .ok_or(DbError::NotFound { entity: "Conversation", id })
    }

    pub fn get_conversation(&self, id: i64) -> DbResult<Option<Conversation>> {
        let conn = self.lock()?;
        let conversation = conn
            .query_row(
                "SELECT id, task_id, claude_session_id, created_at FROM conversations WHERE id = ?1",
                params![id],
                map_conversation,
            )
            .optional()?;
        Ok(conversation)
    }

    pub fn list_conversations(&self, task_id: i64) -> DbResult<Vec<Conversation>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, task_id, claude_session_id, created_at FROM conversations \
             WHERE task_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![task_id], map_conversation)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn update_claude_session_id(&self, id: i64, session_id: &str) -> DbResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE conversations SET claude_session_id = ?1 WHERE id = ?2",
            params![session_id, id],
        )?;
        if updated == 0 {
            return Err(DbError::NotFound { entity: "Conversation", id });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewProject;

    #[test]
    fn test_session_id_assignment() {
        let db = Database::open_in_memory().unwrap();
        let project = db
            .create_project(NewProject {
                name: "demo".to_string(),
                repo_path: "/tmp/demo".into(),
                description: None,
            })
            .unwrap();
        let task = db.create_task(project.id, "t").unwrap();

        let conversation = db.create_conversation(task.id).unwrap();
        assert!(conversation.claude_session_id.is_none());

        db.update_claude_session_id(conversation.id, "sess-1").unwrap();
        let reloaded = db.get_conversation(conversation.id).unwrap().unwrap();
        assert_eq!(reloaded.claude_session_id.as_deref(), Some("sess-1"));

        assert!(matches!(
            db.update_claude_session_id(999, "sess-2"),
            Err(DbError::NotFound { .. })
        ));
        assert_eq!(db.list_conversations(task.id).unwrap().len(), 1);
    }
}
