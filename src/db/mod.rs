mod schema;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use hierarchy_core::{lifecycle, HierarchyParticipant, RecordId, RecordRef, RelationRecord};
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use uuid::Uuid;

use crate::models::*;

/// A row an operation depends on does not exist.
#[derive(Debug, Error)]
pub enum MissingRow {
    #[error("project {0} not found")]
    Project(Uuid),

    #[error("record {0} not found")]
    Record(RecordRef),
}

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Project operations
    // ============================================================

    pub fn get_all_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, description, created_at, updated_at
             FROM projects ORDER BY name",
        )?;

        let projects = stmt
            .query_map([], read_project)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(projects)
    }

    pub fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let project = conn
            .query_row(
                "SELECT id, name, description, created_at, updated_at
                 FROM projects WHERE id = ?",
                [id.to_string()],
                read_project,
            )
            .optional()?;
        Ok(project)
    }

    pub fn create_project(&self, input: CreateProjectInput) -> Result<Project> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO projects (id, name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.name,
                &input.description,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Project {
            id,
            name: input.name,
            description: input.description,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_project(&self, id: Uuid, input: UpdateProjectInput) -> Result<Option<Project>> {
        let Some(existing) = self.get_project(id)? else {
            return Ok(None);
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let name = input.name.unwrap_or(existing.name);
        let description = input.description.or(existing.description);

        conn.execute(
            "UPDATE projects SET name = ?, description = ?, updated_at = ? WHERE id = ?",
            (&name, &description, now.to_rfc3339(), id.to_string()),
        )?;

        Ok(Some(Project {
            id,
            name,
            description,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    /// Delete a project and, through the foreign keys, every record it owns.
    pub fn delete_project(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM projects WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Record creation
    //
    // Every record is created as a root. Its relation is attached here and
    // only ever changed through `Backlog::set_parent`.
    // ============================================================

    pub fn create_epic(&self, project_id: Uuid, input: CreateEpicInput) -> Result<Epic> {
        self.require_project(project_id)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let state = input.state.unwrap_or_default();

        conn.execute(
            "INSERT INTO epics (project_id, title, description, state, created_at, updated_at, business_value)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                project_id.to_string(),
                &input.title,
                &input.description,
                state.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
                &input.business_value,
            ),
        )?;
        let id = conn.last_insert_rowid();

        Ok(Epic {
            id,
            project_id,
            relation: lifecycle::attach(RecordRef::new(Epic::TYPE_NAME, id), &input.title),
            title: input.title,
            description: input.description,
            business_value: input.business_value,
            state,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn create_feature(&self, project_id: Uuid, input: CreateFeatureInput) -> Result<Feature> {
        self.require_project(project_id)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let state = input.state.unwrap_or_default();

        conn.execute(
            "INSERT INTO features (project_id, title, description, state, created_at, updated_at, acceptance_criteria)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                project_id.to_string(),
                &input.title,
                &input.description,
                state.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
                &input.acceptance_criteria,
            ),
        )?;
        let id = conn.last_insert_rowid();

        Ok(Feature {
            id,
            project_id,
            relation: lifecycle::attach(RecordRef::new(Feature::TYPE_NAME, id), &input.title),
            title: input.title,
            description: input.description,
            acceptance_criteria: input.acceptance_criteria,
            state,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn create_user_story(
        &self,
        project_id: Uuid,
        input: CreateUserStoryInput,
    ) -> Result<UserStory> {
        self.require_project(project_id)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let state = input.state.unwrap_or_default();

        conn.execute(
            "INSERT INTO user_stories (project_id, title, description, state, created_at, updated_at, story, story_points)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            (
                project_id.to_string(),
                &input.title,
                &input.description,
                state.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
                &input.story,
                input.story_points,
            ),
        )?;
        let id = conn.last_insert_rowid();

        Ok(UserStory {
            id,
            project_id,
            relation: lifecycle::attach(RecordRef::new(UserStory::TYPE_NAME, id), &input.title),
            title: input.title,
            description: input.description,
            story: input.story,
            story_points: input.story_points,
            state,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn create_item(&self, project_id: Uuid, input: CreateItemInput) -> Result<Item> {
        self.require_project(project_id)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let state = input.state.unwrap_or_default();

        conn.execute(
            "INSERT INTO items (project_id, title, description, state, created_at, updated_at, kind, details)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            (
                project_id.to_string(),
                &input.title,
                &input.description,
                state.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
                input.kind.type_name(),
                &input.details,
            ),
        )?;
        let id = conn.last_insert_rowid();

        Ok(Item {
            id,
            project_id,
            kind: input.kind,
            relation: lifecycle::attach(RecordRef::new(input.kind.type_name(), id), &input.title),
            title: input.title,
            description: input.description,
            details: input.details,
            state,
            created_at: now,
            updated_at: now,
        })
    }

    fn require_project(&self, project_id: Uuid) -> Result<Project> {
        self.get_project(project_id)?
            .ok_or_else(|| MissingRow::Project(project_id).into())
    }

    // ============================================================
    // Record lookup
    // ============================================================

    pub fn get_epic(&self, id: RecordId) -> Result<Option<Epic>> {
        Ok(match self.fetch(Table::Epics, id)? {
            Some(Record::Epic(epic)) => Some(epic),
            _ => None,
        })
    }

    pub fn get_feature(&self, id: RecordId) -> Result<Option<Feature>> {
        Ok(match self.fetch(Table::Features, id)? {
            Some(Record::Feature(feature)) => Some(feature),
            _ => None,
        })
    }

    pub fn get_user_story(&self, id: RecordId) -> Result<Option<UserStory>> {
        Ok(match self.fetch(Table::UserStories, id)? {
            Some(Record::UserStory(story)) => Some(story),
            _ => None,
        })
    }

    /// Load a leaf item of any kind.
    pub fn get_item(&self, id: RecordId) -> Result<Option<Item>> {
        Ok(match self.fetch(Table::Items, id)? {
            Some(Record::Item(item)) => Some(item),
            _ => None,
        })
    }

    /// Load a record by its registered type name and id.
    ///
    /// Unknown type names, and item ids whose stored kind differs from the
    /// requested type, yield `None`.
    pub fn get_record(&self, record: &RecordRef) -> Result<Option<Record>> {
        let Some((table, kind)) = Table::for_type(&record.type_name) else {
            return Ok(None);
        };

        let found = self.fetch(table, record.id)?;
        Ok(match kind {
            Some(kind) => found.filter(|r| matches!(r, Record::Item(item) if item.kind == kind)),
            None => found,
        })
    }

    /// All records of a project, parents before children, then by title.
    pub fn get_records_by_project(&self, project_id: Uuid) -> Result<Vec<Record>> {
        self.fetch_where("project_id = ?", params![project_id.to_string()])
    }

    /// Records whose stored parent is `parent`, whether or not it still exists.
    pub fn get_children(&self, parent: &RecordRef) -> Result<Vec<Record>> {
        self.fetch_where(
            "parent_type = ? AND parent_id = ?",
            params![parent.type_name, parent.id],
        )
    }

    fn fetch(&self, table: Table, id: RecordId) -> Result<Option<Record>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?",
            table.columns(),
            table.name()
        );
        let record = conn
            .query_row(&sql, [id], |row| table.read(row))
            .optional()?
            .flatten();
        Ok(record)
    }

    fn fetch_where(&self, clause: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Record>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut records = Vec::new();

        for table in Table::ALL {
            let sql = format!(
                "SELECT {} FROM {} WHERE {}",
                table.columns(),
                table.name(),
                clause
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params, |row| table.read(row))?
                .collect::<Result<Vec<_>, _>>()?;
            records.extend(rows.into_iter().flatten());
        }

        records.sort_by(|a, b| {
            a.category()
                .depth()
                .cmp(&b.category().depth())
                .then_with(|| a.title().cmp(b.title()))
                .then_with(|| a.record_id().cmp(&b.record_id()))
        });
        Ok(records)
    }

    // ============================================================
    // Record mutation
    // ============================================================

    pub fn update_record(
        &self,
        record: &RecordRef,
        input: UpdateRecordInput,
    ) -> Result<Option<Record>> {
        let Some(existing) = self.get_record(record)? else {
            return Ok(None);
        };
        let Some((table, _)) = Table::for_type(&record.type_name) else {
            return Ok(None);
        };

        let title = input.title.unwrap_or_else(|| existing.title().to_string());
        let description = input
            .description
            .or_else(|| existing.description().map(str::to_string));
        let state = input.state.unwrap_or(existing.state());

        {
            let conn = self.conn.lock().expect("database lock poisoned");
            conn.execute(
                &format!(
                    "UPDATE {} SET title = ?, description = ?, state = ?, updated_at = ? WHERE id = ?",
                    table.name()
                ),
                (
                    &title,
                    &description,
                    state.as_str(),
                    Utc::now().to_rfc3339(),
                    record.id,
                ),
            )?;
        }

        self.get_record(record)
    }

    /// Persist the parent pair of `record`.
    ///
    /// The pair is stored in the record's own row. A record carrying a
    /// relation that belongs to another record is refused.
    pub(crate) fn save_relation(&self, record: &Record) -> Result<()> {
        lifecycle::ensure_owned(record)?;

        let record_ref = record.record_ref();
        let (table, _) = Table::for_type(&record_ref.type_name)
            .ok_or_else(|| anyhow::anyhow!("Unknown record type {}", record_ref.type_name))?;
        let parent = record.relation().parent_ref();

        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            &format!(
                "UPDATE {} SET parent_id = ?, parent_type = ?, updated_at = ? WHERE id = ?",
                table.name()
            ),
            (
                parent.map(|p| p.id),
                parent.map(|p| p.type_name.as_str()),
                Utc::now().to_rfc3339(),
                record_ref.id,
            ),
        )?;

        if rows == 0 {
            return Err(MissingRow::Record(record_ref).into());
        }
        Ok(())
    }

    /// Delete a record. Its relation goes with it; children keep pointing at
    /// it and resolve to no parent from then on.
    pub fn delete_record(&self, record: &RecordRef) -> Result<bool> {
        let Some((table, kind)) = Table::for_type(&record.type_name) else {
            return Ok(false);
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = match kind {
            Some(kind) => conn.execute(
                "DELETE FROM items WHERE id = ? AND kind = ?",
                (record.id, kind.type_name()),
            )?,
            None => conn.execute(
                &format!("DELETE FROM {} WHERE id = ?", table.name()),
                [record.id],
            )?,
        };
        Ok(rows > 0)
    }

    // ============================================================
    // Hierarchy tree
    // ============================================================

    /// Build the project's hierarchy.
    ///
    /// Records whose parent no longer exists in the project are shown at the
    /// top level, next to the epics.
    pub fn get_hierarchy_tree(&self, project_id: Uuid) -> Result<Vec<HierarchyTreeNode>> {
        let summaries: Vec<RecordSummary> = self
            .get_records_by_project(project_id)?
            .iter()
            .map(Record::summary)
            .collect();
        let known: HashSet<RecordRef> = summaries.iter().map(RecordSummary::record_ref).collect();

        let mut children_map: HashMap<Option<RecordRef>, Vec<RecordSummary>> = HashMap::new();
        for summary in summaries {
            let parent = summary.parent.clone().filter(|p| known.contains(p));
            children_map.entry(parent).or_default().push(summary);
        }

        fn build_subtree(
            parent: Option<RecordRef>,
            children_map: &HashMap<Option<RecordRef>, Vec<RecordSummary>>,
        ) -> Vec<HierarchyTreeNode> {
            children_map
                .get(&parent)
                .map(|records| {
                    records
                        .iter()
                        .map(|r| HierarchyTreeNode {
                            record: r.clone(),
                            children: build_subtree(Some(r.record_ref()), children_map),
                        })
                        .collect()
                })
                .unwrap_or_default()
        }

        Ok(build_subtree(None, &children_map))
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

/// Default on-disk location, inside the platform data directory.
pub fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "agile-manifest")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("agile-manifest.db"))
}

/// The four hierarchy tables. Their first nine columns are shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Table {
    Epics,
    Features,
    UserStories,
    Items,
}

impl Table {
    const ALL: [Table; 4] = [
        Table::Epics,
        Table::Features,
        Table::UserStories,
        Table::Items,
    ];

    fn name(&self) -> &'static str {
        match self {
            Self::Epics => "epics",
            Self::Features => "features",
            Self::UserStories => "user_stories",
            Self::Items => "items",
        }
    }

    fn columns(&self) -> &'static str {
        match self {
            Self::Epics => {
                "id, project_id, title, description, state, parent_id, parent_type, created_at, updated_at, business_value"
            }
            Self::Features => {
                "id, project_id, title, description, state, parent_id, parent_type, created_at, updated_at, acceptance_criteria"
            }
            Self::UserStories => {
                "id, project_id, title, description, state, parent_id, parent_type, created_at, updated_at, story, story_points"
            }
            Self::Items => {
                "id, project_id, title, description, state, parent_id, parent_type, created_at, updated_at, kind, details"
            }
        }
    }

    /// Table storing `type_name`, plus the item kind for leaf item types.
    fn for_type(type_name: &str) -> Option<(Table, Option<ItemKind>)> {
        match type_name {
            Epic::TYPE_NAME => Some((Self::Epics, None)),
            Feature::TYPE_NAME => Some((Self::Features, None)),
            UserStory::TYPE_NAME => Some((Self::UserStories, None)),
            other => ItemKind::from_type_name(other).map(|kind| (Self::Items, Some(kind))),
        }
    }

    /// Map a row to its record. Items of a kind that is no longer known are
    /// skipped with a warning.
    fn read(&self, row: &Row<'_>) -> rusqlite::Result<Option<Record>> {
        let common = Common::read(row)?;

        let record = match self {
            Self::Epics => Record::Epic(Epic {
                relation: common.relation(Epic::TYPE_NAME),
                id: common.id,
                project_id: common.project_id,
                title: common.title,
                description: common.description,
                business_value: row.get(9)?,
                state: common.state,
                created_at: common.created_at,
                updated_at: common.updated_at,
            }),
            Self::Features => Record::Feature(Feature {
                relation: common.relation(Feature::TYPE_NAME),
                id: common.id,
                project_id: common.project_id,
                title: common.title,
                description: common.description,
                acceptance_criteria: row.get(9)?,
                state: common.state,
                created_at: common.created_at,
                updated_at: common.updated_at,
            }),
            Self::UserStories => Record::UserStory(UserStory {
                relation: common.relation(UserStory::TYPE_NAME),
                id: common.id,
                project_id: common.project_id,
                title: common.title,
                description: common.description,
                story: row.get(9)?,
                story_points: row.get(10)?,
                state: common.state,
                created_at: common.created_at,
                updated_at: common.updated_at,
            }),
            Self::Items => {
                let stored: String = row.get(9)?;
                let Some(kind) = ItemKind::from_type_name(&stored) else {
                    tracing::warn!(id = common.id, kind = %stored, "skipping item of unknown kind");
                    return Ok(None);
                };
                Record::Item(Item {
                    relation: common.relation(kind.type_name()),
                    id: common.id,
                    project_id: common.project_id,
                    kind,
                    title: common.title,
                    description: common.description,
                    details: row.get(10)?,
                    state: common.state,
                    created_at: common.created_at,
                    updated_at: common.updated_at,
                })
            }
        };

        Ok(Some(record))
    }
}

/// Columns shared by every hierarchy table.
struct Common {
    id: RecordId,
    project_id: Uuid,
    title: String,
    description: Option<String>,
    state: WorkState,
    parent: Option<RecordRef>,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl Common {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: parse_uuid(row.get::<_, String>(1)?),
            title: row.get(2)?,
            description: row.get(3)?,
            state: WorkState::from_str(&row.get::<_, String>(4)?).unwrap_or_default(),
            parent: RecordRef::from_columns(row.get(5)?, row.get(6)?),
            created_at: parse_datetime(row.get::<_, String>(7)?),
            updated_at: parse_datetime(row.get::<_, String>(8)?),
        })
    }

    fn relation(&self, type_name: &str) -> RelationRecord {
        lifecycle::restore(
            RecordRef::new(type_name, self.id),
            self.title.clone(),
            self.parent.clone(),
        )
    }
}

fn read_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_datetime(row.get::<_, String>(3)?),
        updated_at: parse_datetime(row.get::<_, String>(4)?),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
