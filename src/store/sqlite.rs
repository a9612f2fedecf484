use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use uuid::Uuid;

use super::schema::SCHEMA;
use super::{NamespaceApi, ResourceStore};
use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::types::*;

/// Resource store backed by a local SQLite database.
///
/// Used for dry runs and tests. Member clusters share the database; their
/// namespaces are keyed by cluster name, the host cluster being `""`.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// An initialized store that lives as long as the value.
    pub fn in_memory() -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        };
        store.initialize()?;
        Ok(store)
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        lock(&self.conn)
    }

    /// Creates or replaces a namespace of `cluster` (`""` for the host).
    pub fn put_namespace(&self, cluster: &str, namespace: &Namespace) -> Result<()> {
        let labels = serde_json::to_string(&namespace.metadata.labels)?;
        self.conn().execute(
            "INSERT INTO namespaces (cluster, name, labels) VALUES (?1, ?2, ?3)
             ON CONFLICT(cluster, name) DO UPDATE SET labels = excluded.labels",
            params![cluster, namespace.name(), labels],
        )?;
        Ok(())
    }

    /// Registers a member cluster.
    pub fn put_cluster(&self, cluster: &Cluster) -> Result<Cluster> {
        self.create(&CallContext::background(), cluster)
    }

    fn create<R: Resource>(&self, ctx: &CallContext, resource: &R) -> Result<R> {
        ctx.check()?;
        let name = resource.name();
        if name.is_empty() {
            return Err(Error::Api {
                status: 422,
                message: format!("{} name is required", R::KIND),
            });
        }

        let mut created = resource.clone();
        let uid = Uuid::new_v4().to_string();
        {
            let meta = created.metadata_mut();
            meta.uid = uid.clone();
            meta.resource_version = "1".to_string();
            meta.creation_timestamp = Some(Utc::now());
        }
        let body = serde_json::to_string(&created)?;

        let result = self.conn().execute(
            "INSERT INTO resources (kind, name, uid, resource_version, body)
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![R::KIND, name, uid, body],
        );

        match result {
            Ok(_) => Ok(created),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::AlreadyExists(format!("{} {name}", R::KIND)))
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get<R: Resource>(&self, ctx: &CallContext, name: &str) -> Result<R> {
        ctx.check()?;
        let body: Option<String> = self
            .conn()
            .query_row(
                "SELECT body FROM resources WHERE kind = ?1 AND name = ?2",
                params![R::KIND, name],
                |row| row.get(0),
            )
            .optional()?;

        let body = body.ok_or_else(|| not_found::<R>(name))?;
        Ok(serde_json::from_str(&body)?)
    }

    fn list<R: Resource>(&self, ctx: &CallContext, selector: &LabelSelector) -> Result<Vec<R>> {
        ctx.check()?;
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT body FROM resources WHERE kind = ?1 ORDER BY seq")?;
        let bodies = stmt
            .query_map(params![R::KIND], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut items = Vec::new();
        for body in bodies {
            let item: R = serde_json::from_str(&body)?;
            if selector.matches(&item.metadata().labels) {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Replaces the status of the stored resource, keeping its spec. The
    /// caller's resource version must match the stored one.
    fn update_status<R: Resource>(&self, ctx: &CallContext, resource: &R) -> Result<R> {
        ctx.check()?;
        let name = resource.name();
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let row: Option<(i64, String)> = tx
            .query_row(
                "SELECT resource_version, body FROM resources WHERE kind = ?1 AND name = ?2",
                params![R::KIND, name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (current_version, body) = row.ok_or_else(|| not_found::<R>(name))?;

        let given_version = &resource.metadata().resource_version;
        if *given_version != current_version.to_string() {
            return Err(Error::Conflict(format!(
                "{} {name}: resource version {given_version} is stale, current is {current_version}",
                R::KIND
            )));
        }

        let next_version = current_version + 1;
        let mut stored: Value = serde_json::from_str(&body)?;
        let incoming = serde_json::to_value(resource)?;
        stored["status"] = incoming.get("status").cloned().unwrap_or(Value::Null);
        stored["metadata"]["resourceVersion"] = Value::String(next_version.to_string());

        tx.execute(
            "UPDATE resources SET resource_version = ?1, body = ?2, updated_at = datetime('now')
             WHERE kind = ?3 AND name = ?4",
            params![next_version, stored.to_string(), R::KIND, name],
        )?;
        tx.commit()?;

        Ok(serde_json::from_value(stored)?)
    }
}

fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(|e| e.into_inner())
}

fn not_found<R: Resource>(name: &str) -> Error {
    Error::NotFound(format!("{} {name}", R::KIND))
}

fn lookup_namespace(conn: &Connection, cluster: &str, name: &str) -> Result<Namespace> {
    let labels: Option<String> = conn
        .query_row(
            "SELECT labels FROM namespaces WHERE cluster = ?1 AND name = ?2",
            params![cluster, name],
            |row| row.get(0),
        )
        .optional()?;

    let labels = labels.ok_or_else(|| not_found::<Namespace>(name))?;
    let labels: BTreeMap<String, String> = serde_json::from_str(&labels)?;
    Ok(Namespace {
        metadata: ObjectMeta {
            labels,
            ..ObjectMeta::named(name)
        },
    })
}

/// Namespace view of a member cluster stored in the same database.
struct MemberNamespaces {
    conn: Arc<Mutex<Connection>>,
    cluster: String,
}

impl NamespaceApi for MemberNamespaces {
    fn get_namespace(&self, ctx: &CallContext, name: &str) -> Result<Namespace> {
        ctx.check()?;
        lookup_namespace(&lock(&self.conn), &self.cluster, name)
    }
}

impl NamespaceApi for SqliteStore {
    fn get_namespace(&self, ctx: &CallContext, name: &str) -> Result<Namespace> {
        ctx.check()?;
        lookup_namespace(&self.conn(), "", name)
    }
}

impl ResourceStore for SqliteStore {
    // Category operations

    fn create_category(&self, ctx: &CallContext, category: &Category) -> Result<Category> {
        self.create(ctx, category)
    }

    fn get_category(&self, ctx: &CallContext, name: &str) -> Result<Category> {
        self.get(ctx, name)
    }

    fn list_categories(
        &self,
        ctx: &CallContext,
        selector: &LabelSelector,
    ) -> Result<Vec<Category>> {
        self.list(ctx, selector)
    }

    // Repository operations

    fn create_repository(&self, ctx: &CallContext, repo: &Repository) -> Result<Repository> {
        self.create(ctx, repo)
    }

    fn get_repository(&self, ctx: &CallContext, name: &str) -> Result<Repository> {
        self.get(ctx, name)
    }

    fn list_repositories(
        &self,
        ctx: &CallContext,
        selector: &LabelSelector,
    ) -> Result<Vec<Repository>> {
        self.list(ctx, selector)
    }

    fn update_repository_status(
        &self,
        ctx: &CallContext,
        repo: &Repository,
    ) -> Result<Repository> {
        self.update_status(ctx, repo)
    }

    // Application operations

    fn create_application(&self, ctx: &CallContext, app: &Application) -> Result<Application> {
        self.create(ctx, app)
    }

    fn get_application(&self, ctx: &CallContext, name: &str) -> Result<Application> {
        self.get(ctx, name)
    }

    fn list_applications(
        &self,
        ctx: &CallContext,
        selector: &LabelSelector,
    ) -> Result<Vec<Application>> {
        self.list(ctx, selector)
    }

    // Application version operations

    fn create_application_version(
        &self,
        ctx: &CallContext,
        version: &ApplicationVersion,
    ) -> Result<ApplicationVersion> {
        self.create(ctx, version)
    }

    fn get_application_version(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<ApplicationVersion> {
        self.get(ctx, name)
    }

    fn list_application_versions(
        &self,
        ctx: &CallContext,
        selector: &LabelSelector,
    ) -> Result<Vec<ApplicationVersion>> {
        self.list(ctx, selector)
    }

    fn update_application_version_status(
        &self,
        ctx: &CallContext,
        version: &ApplicationVersion,
    ) -> Result<ApplicationVersion> {
        self.update_status(ctx, version)
    }

    // Release operations

    fn create_release(&self, ctx: &CallContext, release: &Release) -> Result<Release> {
        self.create(ctx, release)
    }

    fn get_release(&self, ctx: &CallContext, name: &str) -> Result<Release> {
        self.get(ctx, name)
    }

    fn list_releases(&self, ctx: &CallContext, selector: &LabelSelector) -> Result<Vec<Release>> {
        self.list(ctx, selector)
    }

    // Member clusters

    fn get_cluster(&self, ctx: &CallContext, name: &str) -> Result<Cluster> {
        self.get(ctx, name)
    }

    fn connect_cluster(
        &self,
        ctx: &CallContext,
        cluster: &Cluster,
    ) -> Result<Box<dyn NamespaceApi>> {
        ctx.check()?;
        Ok(Box::new(MemberNamespaces {
            conn: Arc::clone(&self.conn),
            cluster: cluster.name().to_string(),
        }))
    }
}
