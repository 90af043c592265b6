use crate::types::{
    AppError, Assignment, AssignmentKind, Group, Mode, Result, Role, Submission,
    UpdateAssignmentRequest, UpdateSubmissionRequest, User,
};
use chrono::Utc;
use libsql::{Builder, Connection, Database, Row, Value};

const ASSIGNMENT_COLUMNS: &str = "id, kind, title, content, course_title, max_grade, mode,
    owner_id, group_id, student_link, teacher_link, pin, created_at, updated_at";

const GROUP_COLUMNS: &str = "id, name, owner_id, share_link, created_at, updated_at";

const USER_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, role, created_at, updated_at";

const SUBMISSION_COLUMNS: &str = "id, assignment_id, student_id, student_name, response,
    present, grade, comments, submitted_at, updated_at";

/// libSQL-backed store for users, groups, assignments and submissions.
///
/// A single connection is kept for the lifetime of the client so that an
/// in-memory database survives across calls.
pub struct TursoClient {
    _db: Database,
    conn: Connection,
}

impl TursoClient {
    /// Connects to a remote Turso database.
    pub async fn new_remote(url: String, auth_token: String) -> Result<Self> {
        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Turso: {}", e)))?;

        Self::from_database(db).await
    }

    /// Opens (or creates) a local database file. `:memory:` gives an ephemeral one.
    pub async fn new_local(path: &str) -> Result<Self> {
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database {}: {}", path, e)))?;

        Self::from_database(db).await
    }

    pub async fn new_memory() -> Result<Self> {
        Self::new_local(":memory:").await
    }

    async fn from_database(db: Database) -> Result<Self> {
        let conn = db
            .connect()
            .map_err(|e| AppError::Database(format!("Failed to get connection: {}", e)))?;

        let client = Self { _db: db, conn };
        client.initialize_schema().await?;

        Ok(client)
    }

    pub fn connection(&self) -> Result<Connection> {
        Ok(self.conn.clone())
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection()?;

        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| AppError::Database(format!("Failed to enable foreign keys: {}", e)))?;

        // Users table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                role TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create users table: {}", e)))?;

        // Groups and their members; `role` tells students from co-teachers
        conn.execute(
            "CREATE TABLE IF NOT EXISTS groups (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                share_link TEXT UNIQUE NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                FOREIGN KEY (owner_id) REFERENCES users(id)
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create groups table: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS group_members (
                group_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL,
                joined_at INTEGER NOT NULL,
                PRIMARY KEY (group_id, user_id),
                FOREIGN KEY (group_id) REFERENCES groups(id),
                FOREIGN KEY (user_id) REFERENCES users(id)
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create group_members table: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_group_members_user ON group_members(user_id)",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create group_members index: {}", e)))?;

        // Assignments table (homework, quiz, attendance)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS assignments (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                course_title TEXT NOT NULL,
                max_grade REAL NOT NULL,
                mode TEXT NOT NULL,
                owner_id TEXT,
                group_id TEXT,
                student_link TEXT UNIQUE NOT NULL,
                teacher_link TEXT UNIQUE NOT NULL,
                pin TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                FOREIGN KEY (owner_id) REFERENCES users(id),
                FOREIGN KEY (group_id) REFERENCES groups(id)
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create assignments table: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_assignments_owner ON assignments(owner_id, kind)",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create assignments index: {}", e)))?;

        // Submissions table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS submissions (
                id TEXT PRIMARY KEY,
                assignment_id TEXT NOT NULL,
                student_id TEXT,
                student_name TEXT NOT NULL,
                response TEXT NOT NULL,
                present INTEGER NOT NULL DEFAULT 0,
                grade REAL,
                comments TEXT NOT NULL DEFAULT '',
                submitted_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                FOREIGN KEY (assignment_id) REFERENCES assignments(id),
                FOREIGN KEY (student_id) REFERENCES users(id)
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create submissions table: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_submissions_assignment ON submissions(assignment_id)",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create submissions index: {}", e)))?;

        Ok(())
    }

    // User operations
    pub async fn create_user(&self, user: &User) -> Result<()> {
        let conn = self.connection()?;

        conn.execute(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, role, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            (
                user.id.as_str(),
                user.email.as_str(),
                user.password_hash.as_str(),
                user.first_name.as_str(),
                user.last_name.as_str(),
                user.role.as_str(),
                user.created_at,
                user.updated_at,
            ),
        )
        .await
        .map_err(|e| write_error("create user", e))?;

        Ok(())
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.query_user(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS), email)
        .await
    }

    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        self.query_user(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS), id)
        .await
    }

    async fn query_user(&self, sql: &str, key: &str) -> Result<Option<User>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(sql, [key])
            .await
            .map_err(|e| AppError::Database(format!("Failed to query user: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => Ok(Some(user_from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn update_password(&self, user_id: &str, password_hash: &str) -> Result<()> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        let affected = conn
            .execute(
                "UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?",
                (password_hash, now, user_id),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to update password: {}", e)))?;

        if affected == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    // Assignment operations
    pub async fn create_assignment(&self, assignment: &Assignment) -> Result<()> {
        let conn = self.connection()?;

        conn.execute(
            &format!(
                "INSERT INTO assignments ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                ASSIGNMENT_COLUMNS
            ),
            vec![
                Value::from(assignment.id.as_str()),
                Value::from(assignment.kind.as_str()),
                Value::from(assignment.title.as_str()),
                Value::from(assignment.content.as_str()),
                Value::from(assignment.course_title.as_str()),
                Value::from(assignment.max_grade),
                Value::from(assignment.mode.as_str()),
                optional_text(assignment.owner_id.as_deref()),
                optional_text(assignment.group_id.as_deref()),
                Value::from(assignment.student_link.as_str()),
                Value::from(assignment.teacher_link.as_str()),
                optional_text(assignment.pin.as_deref()),
                Value::from(assignment.created_at),
                Value::from(assignment.updated_at),
            ],
        )
        .await
        .map_err(|e| write_error("create assignment", e))?;

        Ok(())
    }

    pub async fn get_assignment(&self, kind: AssignmentKind, id: &str) -> Result<Option<Assignment>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM assignments WHERE id = ? AND kind = ?",
                    ASSIGNMENT_COLUMNS
                ),
                (id, kind.as_str()),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query assignment: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => Ok(Some(assignment_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Finds an assignment whose student or teacher link equals `link`.
    pub async fn get_assignment_by_link(
        &self,
        kind: AssignmentKind,
        link: &str,
    ) -> Result<Option<Assignment>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM assignments
                     WHERE kind = ? AND (student_link = ? OR teacher_link = ?)",
                    ASSIGNMENT_COLUMNS
                ),
                (kind.as_str(), link, link),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query assignment: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => Ok(Some(assignment_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Looks an assignment up by id regardless of kind.
    pub async fn get_assignment_any(&self, id: &str) -> Result<Option<Assignment>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                &format!("SELECT {} FROM assignments WHERE id = ?", ASSIGNMENT_COLUMNS),
                [id],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query assignment: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => Ok(Some(assignment_from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_assignments(
        &self,
        kind: AssignmentKind,
        owner_id: &str,
    ) -> Result<Vec<Assignment>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM assignments WHERE kind = ? AND owner_id = ?
                     ORDER BY created_at DESC",
                    ASSIGNMENT_COLUMNS
                ),
                (kind.as_str(), owner_id),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query assignments: {}", e)))?;

        let mut assignments = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            assignments.push(assignment_from_row(&row)?);
        }

        Ok(assignments)
    }

    /// Applies the fields present in `update`; absent fields keep their value.
    pub async fn update_assignment(&self, id: &str, update: &UpdateAssignmentRequest) -> Result<()> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        let affected = conn
            .execute(
                "UPDATE assignments SET
                    title = COALESCE(?, title),
                    content = COALESCE(?, content),
                    course_title = COALESCE(?, course_title),
                    max_grade = COALESCE(?, max_grade),
                    mode = COALESCE(?, mode),
                    updated_at = ?
                 WHERE id = ?",
                (
                    update.title.clone(),
                    update.content.clone(),
                    update.course_title.clone(),
                    update.max_grade,
                    update.mode.map(|m| m.as_str()),
                    now,
                    id,
                ),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to update assignment: {}", e)))?;

        if affected == 0 {
            return Err(AppError::NotFound("Assignment not found".to_string()));
        }
        Ok(())
    }

    /// Overwrites the attendance PIN.
    pub async fn set_pin(&self, id: &str, pin: &str) -> Result<()> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        let affected = conn
            .execute(
                "UPDATE assignments SET pin = ?, updated_at = ? WHERE id = ?",
                (pin, now, id),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to renew pin: {}", e)))?;

        if affected == 0 {
            return Err(AppError::NotFound("Assignment not found".to_string()));
        }
        Ok(())
    }

    /// Deletes an assignment together with its submissions.
    pub async fn delete_assignment(&self, id: &str) -> Result<()> {
        let conn = self.connection()?;

        conn.execute("DELETE FROM submissions WHERE assignment_id = ?", [id])
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete submissions: {}", e)))?;

        let affected = conn
            .execute("DELETE FROM assignments WHERE id = ?", [id])
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete assignment: {}", e)))?;

        if affected == 0 {
            return Err(AppError::NotFound("Assignment not found".to_string()));
        }
        Ok(())
    }

    // Group operations
    pub async fn create_group(&self, group: &Group) -> Result<()> {
        let conn = self.connection()?;

        conn.execute(
            &format!("INSERT INTO groups ({}) VALUES (?, ?, ?, ?, ?, ?)", GROUP_COLUMNS),
            (
                group.id.as_str(),
                group.name.as_str(),
                group.owner_id.as_str(),
                group.share_link.as_str(),
                group.created_at,
                group.updated_at,
            ),
        )
        .await
        .map_err(|e| write_error("create group", e))?;

        Ok(())
    }

    pub async fn get_group(&self, id: &str) -> Result<Option<Group>> {
        self.query_group(&format!("SELECT {} FROM groups WHERE id = ?", GROUP_COLUMNS), id)
            .await
    }

    pub async fn get_group_by_share_link(&self, link: &str) -> Result<Option<Group>> {
        self.query_group(
            &format!("SELECT {} FROM groups WHERE share_link = ?", GROUP_COLUMNS),
            link,
        )
        .await
    }

    async fn query_group(&self, sql: &str, key: &str) -> Result<Option<Group>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(sql, [key])
            .await
            .map_err(|e| AppError::Database(format!("Failed to query group: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => Ok(Some(group_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Groups the user owns or belongs to, newest first.
    pub async fn list_groups_for_user(&self, user_id: &str) -> Result<Vec<Group>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT g.id, g.name, g.owner_id, g.share_link, g.created_at, g.updated_at
                 FROM groups g
                 WHERE g.owner_id = ?1
                    OR EXISTS (SELECT 1 FROM group_members m
                               WHERE m.group_id = g.id AND m.user_id = ?1)
                 ORDER BY g.created_at DESC",
                [user_id],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query groups: {}", e)))?;

        let mut groups = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            groups.push(group_from_row(&row)?);
        }

        Ok(groups)
    }

    pub async fn rename_group(&self, id: &str, name: &str) -> Result<()> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        let affected = conn
            .execute(
                "UPDATE groups SET name = ?, updated_at = ? WHERE id = ?",
                (name, now, id),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to update group: {}", e)))?;

        if affected == 0 {
            return Err(AppError::NotFound("Group not found".to_string()));
        }
        Ok(())
    }

    /// Deletes a group and its memberships. Groups that still restrict
    /// assignments are kept, since dropping them would open those links.
    pub async fn delete_group(&self, id: &str) -> Result<()> {
        let conn = self.connection()?;

        let mut rows = conn
            .query("SELECT COUNT(*) FROM assignments WHERE group_id = ?", [id])
            .await
            .map_err(|e| AppError::Database(format!("Failed to count assignments: {}", e)))?;
        let in_use: i64 = match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => row.get(0).map_err(db_err)?,
            None => 0,
        };
        if in_use > 0 {
            return Err(AppError::Conflict(format!(
                "Group still has {} assignment(s)",
                in_use
            )));
        }

        conn.execute("DELETE FROM group_members WHERE group_id = ?", [id])
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete members: {}", e)))?;

        let affected = conn
            .execute("DELETE FROM groups WHERE id = ?", [id])
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete group: {}", e)))?;

        if affected == 0 {
            return Err(AppError::NotFound("Group not found".to_string()));
        }
        Ok(())
    }

    /// Adds a member with the given role. Adding an existing member is a no-op.
    pub async fn add_group_member(&self, group_id: &str, user_id: &str, role: Role) -> Result<()> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        conn.execute(
            "INSERT OR IGNORE INTO group_members (group_id, user_id, role, joined_at)
             VALUES (?, ?, ?, ?)",
            (group_id, user_id, role.as_str(), now),
        )
        .await
        .map_err(|e| write_error("add group member", e))?;

        Ok(())
    }

    pub async fn remove_group_member(&self, group_id: &str, user_id: &str) -> Result<()> {
        let conn = self.connection()?;

        let affected = conn
            .execute(
                "DELETE FROM group_members WHERE group_id = ? AND user_id = ?",
                (group_id, user_id),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to remove member: {}", e)))?;

        if affected == 0 {
            return Err(AppError::NotFound("Member not found".to_string()));
        }
        Ok(())
    }

    /// The role `user_id` holds in the group, if they are a member.
    pub async fn group_role(&self, group_id: &str, user_id: &str) -> Result<Option<Role>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT role FROM group_members WHERE group_id = ? AND user_id = ?",
                (group_id, user_id),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query membership: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => {
                let role: String = row.get(0).map_err(db_err)?;
                Role::parse(&role)
                    .map(Some)
                    .ok_or_else(|| AppError::Database(format!("Unknown role: {}", role)))
            }
            None => Ok(None),
        }
    }

    /// Members holding `role`, in the order they joined.
    pub async fn list_group_members(&self, group_id: &str, role: Role) -> Result<Vec<User>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT u.id, u.email, u.password_hash, u.first_name, u.last_name, u.role,
                        u.created_at, u.updated_at
                 FROM group_members m JOIN users u ON u.id = m.user_id
                 WHERE m.group_id = ? AND m.role = ?
                 ORDER BY m.joined_at ASC, u.email ASC",
                (group_id, role.as_str()),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query members: {}", e)))?;

        let mut users = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            users.push(user_from_row(&row)?);
        }

        Ok(users)
    }

    // Submission operations
    pub async fn create_submission(&self, submission: &Submission) -> Result<()> {
        let conn = self.connection()?;

        conn.execute(
            &format!(
                "INSERT INTO submissions ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                SUBMISSION_COLUMNS
            ),
            vec![
                Value::from(submission.id.as_str()),
                Value::from(submission.assignment_id.as_str()),
                optional_text(submission.student_id.as_deref()),
                Value::from(submission.student_name.as_str()),
                Value::from(submission.response.as_str()),
                Value::from(i64::from(submission.present)),
                submission.grade.map(Value::from).unwrap_or(Value::Null),
                Value::from(submission.comments.as_str()),
                Value::from(submission.submitted_at),
                Value::from(submission.updated_at),
            ],
        )
        .await
        .map_err(|e| write_error("create submission", e))?;

        Ok(())
    }

    pub async fn get_submission(&self, id: &str) -> Result<Option<Submission>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                &format!("SELECT {} FROM submissions WHERE id = ?", SUBMISSION_COLUMNS),
                [id],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query submission: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => Ok(Some(submission_from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_submissions_for_assignment(
        &self,
        assignment_id: &str,
    ) -> Result<Vec<Submission>> {
        self.query_submissions(
            &format!(
                "SELECT {} FROM submissions WHERE assignment_id = ? ORDER BY submitted_at ASC",
                SUBMISSION_COLUMNS
            ),
            assignment_id,
        )
        .await
    }

    pub async fn list_submissions_for_student(&self, student_id: &str) -> Result<Vec<Submission>> {
        self.query_submissions(
            &format!(
                "SELECT {} FROM submissions WHERE student_id = ? ORDER BY submitted_at DESC",
                SUBMISSION_COLUMNS
            ),
            student_id,
        )
        .await
    }

    async fn query_submissions(&self, sql: &str, key: &str) -> Result<Vec<Submission>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(sql, [key])
            .await
            .map_err(|e| AppError::Database(format!("Failed to query submissions: {}", e)))?;

        let mut submissions = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            submissions.push(submission_from_row(&row)?);
        }

        Ok(submissions)
    }

    pub async fn update_submission(&self, id: &str, update: &UpdateSubmissionRequest) -> Result<()> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        let affected = conn
            .execute(
                "UPDATE submissions SET
                    response = COALESCE(?, response),
                    grade = COALESCE(?, grade),
                    comments = COALESCE(?, comments),
                    present = COALESCE(?, present),
                    updated_at = ?
                 WHERE id = ?",
                (
                    update.response.clone(),
                    update.grade,
                    update.comments.clone(),
                    update.present.map(i64::from),
                    now,
                    id,
                ),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to update submission: {}", e)))?;

        if affected == 0 {
            return Err(AppError::NotFound("Submission not found".to_string()));
        }
        Ok(())
    }

    pub async fn delete_submission(&self, id: &str) -> Result<()> {
        let conn = self.connection()?;

        let affected = conn
            .execute("DELETE FROM submissions WHERE id = ?", [id])
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete submission: {}", e)))?;

        if affected == 0 {
            return Err(AppError::NotFound("Submission not found".to_string()));
        }
        Ok(())
    }
}

/// Unique-index violations become `Conflict` so callers can retry or report them.
fn write_error(action: &str, e: libsql::Error) -> AppError {
    let msg = e.to_string();
    if msg.contains("UNIQUE constraint failed") {
        AppError::Conflict(format!("Failed to {}: duplicate value", action))
    } else {
        AppError::Database(format!("Failed to {}: {}", action, msg))
    }
}

fn optional_text(value: Option<&str>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

fn db_err(e: libsql::Error) -> AppError {
    AppError::Database(e.to_string())
}

fn user_from_row(row: &Row) -> Result<User> {
    let role: String = row.get(5).map_err(db_err)?;
    Ok(User {
        id: row.get(0).map_err(db_err)?,
        email: row.get(1).map_err(db_err)?,
        password_hash: row.get(2).map_err(db_err)?,
        first_name: row.get(3).map_err(db_err)?,
        last_name: row.get(4).map_err(db_err)?,
        role: Role::parse(&role)
            .ok_or_else(|| AppError::Database(format!("Unknown role: {}", role)))?,
        created_at: row.get(6).map_err(db_err)?,
        updated_at: row.get(7).map_err(db_err)?,
    })
}

fn assignment_from_row(row: &Row) -> Result<Assignment> {
    let kind: String = row.get(1).map_err(db_err)?;
    let mode: String = row.get(6).map_err(db_err)?;
    Ok(Assignment {
        id: row.get(0).map_err(db_err)?,
        kind: AssignmentKind::parse(&kind)
            .ok_or_else(|| AppError::Database(format!("Unknown assignment kind: {}", kind)))?,
        title: row.get(2).map_err(db_err)?,
        content: row.get(3).map_err(db_err)?,
        course_title: row.get(4).map_err(db_err)?,
        max_grade: row.get(5).map_err(db_err)?,
        mode: Mode::parse(&mode)
            .ok_or_else(|| AppError::Database(format!("Unknown mode: {}", mode)))?,
        owner_id: row.get(7).map_err(db_err)?,
        group_id: row.get(8).map_err(db_err)?,
        student_link: row.get(9).map_err(db_err)?,
        teacher_link: row.get(10).map_err(db_err)?,
        pin: row.get(11).map_err(db_err)?,
        created_at: row.get(12).map_err(db_err)?,
        updated_at: row.get(13).map_err(db_err)?,
    })
}

fn group_from_row(row: &Row) -> Result<Group> {
    Ok(Group {
        id: row.get(0).map_err(db_err)?,
        name: row.get(1).map_err(db_err)?,
        owner_id: row.get(2).map_err(db_err)?,
        share_link: row.get(3).map_err(db_err)?,
        created_at: row.get(4).map_err(db_err)?,
        updated_at: row.get(5).map_err(db_err)?,
    })
}

fn submission_from_row(row: &Row) -> Result<Submission> {
    Ok(Submission {
        id: row.get(0).map_err(db_err)?,
        assignment_id: row.get(1).map_err(db_err)?,
        student_id: row.get(2).map_err(db_err)?,
        student_name: row.get(3).map_err(db_err)?,
        response: row.get(4).map_err(db_err)?,
        present: row.get::<i64>(5).map_err(db_err)? != 0,
        grade: row.get(6).map_err(db_err)?,
        comments: row.get(7).map_err(db_err)?,
        submitted_at: row.get(8).map_err(db_err)?,
        updated_at: row.get(9).map_err(db_err)?,
    })
}
