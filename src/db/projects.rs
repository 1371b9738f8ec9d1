use std::path::PathBuf;

use rusqlite::{params, OptionalExtension, Row};

use super::{now, parse_ts, Database, DbError, DbResult, NewProject, Project, ProjectUpdate};

const PROJECT_COLUMNS: &str = "id, name, repo_path, description, created_at, updated_at";

fn map_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    let repo_path: String = row.get(2)?;
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        repo_path: PathBuf::from(repo_path),
        description: row.get(3)?,
        created_at: parse_ts(&created_at),
        updated_at: parse_ts(&updated_at),
    })
}

impl Database {
    pub fn create_project(&self, project: NewProject) -> DbResult<Project> {
        let id = {
            let conn = self.lock()?;
            let ts = now();
            conn.execute(
                "INSERT INTO projects (name, repo_path, description, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![
                    project.name,
                    project.repo_path.to_string_lossy(),
                    project.description,
                    ts
                ],
            )?;
            conn.last_insert_rowid()
        };
        self.get_project(id)?
            .ok_or(DbError::NotFound { entity: "Project", id })
    }

    pub fn list_projects(&self) -> DbResult<Vec<Project>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map([], map_project)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_project(&self, id: i64) -> DbResult<Option<Project>> {
        let conn = self.lock()?;
        let project = conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                params![id],
                map_project,
            )
            .optional()?;
        Ok(project)
    }

    /// Apply the non-empty fields of `update`. Returns `None` when the project does not exist.
    pub fn update_project(&self, id: i64, update: ProjectUpdate) -> DbResult<Option<Project>> {
        let Some(mut project) = self.get_project(id)? else {
            return Ok(None);
        };

        if let Some(name) = update.name {
            project.name = name;
        }
        if let Some(repo_path) = update.repo_path {
            project.repo_path = repo_path;
        }
        if update.description.is_some() {
            project.description = update.description;
        }

        {
            let conn = self.lock()?;
            conn.execute(
                "UPDATE projects SET name = ?1, repo_path = ?2, description = ?3, updated_at = ?4 \
                 WHERE id = ?5",
                params![
                    project.name,
                    project.repo_path.to_string_lossy(),
                    project.description,
                    now(),
                    id
                ],
            )?;
        }
        self.get_project(id)
    }

    pub fn delete_project(&self, id: i64) -> DbResult<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}
