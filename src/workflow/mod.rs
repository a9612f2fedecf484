//! The migration itself.
//!
//! A [`Workflow`] owns the resource store and blob store it writes into and
//! runs against one [`Source`]: a legacy dump directory is converted
//! (categories, applications and their versions, repositories, releases, in
//! that order), a chart list or chart path is imported as built-in
//! applications.

mod app;
mod category;
mod import;
mod release;
mod repo;
mod status;

pub use import::DEFAULT_CHART_LIST_URL;
pub use status::{Reconciled, RetryPolicy, StatusResource, reconcile_status};

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::blob::BlobStore;
use crate::chart::ChartResolver;
use crate::context::CallContext;
use crate::error::Result;
use crate::legacy::{Relations, Snapshot, convert_creator};
use crate::store::{NamespaceApi, ResourceStore};
use crate::types::{CREATOR_ANNOTATION_KEY, ObjectMeta};
use import::ChartSource;

/// Where a run reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A legacy dump: the seven table files plus attachment directories.
    LegacyDir(PathBuf),
    /// URL of a newline separated list of chart archive URLs.
    ChartList(String),
    /// A chart archive, or a directory of `*.tgz` archives.
    ChartPath(PathBuf),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LegacyDir(dir) => write!(f, "legacy dump {}", dir.display()),
            Self::ChartList(url) => write!(f, "chart list {url}"),
            Self::ChartPath(path) => write!(f, "charts at {}", path.display()),
        }
    }
}

/// Per-kind outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub created: usize,
    /// Already present from an earlier run.
    pub existing: usize,
    pub skipped: usize,
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} existing, {} skipped",
            self.created, self.existing, self.skipped
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTally {
    pub updated: usize,
    pub unchanged: usize,
    /// Gave up after the retry budget; left un-reconciled.
    pub exhausted: usize,
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub categories: Tally,
    pub repositories: Tally,
    pub applications: Tally,
    pub versions: Tally,
    pub releases: Tally,
    pub statuses: StatusTally,
}

impl Report {
    fn record_status(&mut self, outcome: Reconciled) {
        match outcome {
            Reconciled::Unchanged => self.statuses.unchanged += 1,
            Reconciled::Updated { .. } => self.statuses.updated += 1,
            Reconciled::Exhausted { .. } => self.statuses.exhausted += 1,
        }
    }

    /// Resources created by the run, over every kind.
    #[must_use]
    pub fn created(&self) -> usize {
        self.categories.created
            + self.repositories.created
            + self.applications.created
            + self.versions.created
            + self.releases.created
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "categories:   {}", self.categories)?;
        writeln!(f, "repositories: {}", self.repositories)?;
        writeln!(f, "applications: {}", self.applications)?;
        writeln!(f, "versions:     {}", self.versions)?;
        writeln!(f, "releases:     {}", self.releases)?;
        write!(
            f,
            "statuses:     {} updated, {} unchanged, {} exhausted",
            self.statuses.updated, self.statuses.unchanged, self.statuses.exhausted
        )
    }
}

pub struct Workflow {
    store: Arc<dyn ResourceStore>,
    blobs: Arc<dyn BlobStore>,
    retry: RetryPolicy,
    multi_cluster: bool,
}

impl Workflow {
    pub fn new(store: Arc<dyn ResourceStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            blobs,
            retry: RetryPolicy::default(),
            multi_cluster: false,
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Resolve release workspaces on the member cluster each release runs in.
    #[must_use]
    pub fn with_multi_cluster(mut self, enabled: bool) -> Self {
        self.multi_cluster = enabled;
        self
    }

    pub fn run(&self, ctx: &CallContext, source: &Source) -> Result<Report> {
        info!("migrate from {source}");
        let report = match source {
            Source::LegacyDir(dir) => self.convert(ctx, dir)?,
            Source::ChartList(url) => self.import(ctx, ChartSource::List(url))?,
            Source::ChartPath(path) => self.import(ctx, ChartSource::Path(path))?,
        };
        info!("migrate from {source} finished");
        Ok(report)
    }

    fn import(&self, ctx: &CallContext, source: ChartSource<'_>) -> Result<Report> {
        import::run(
            ctx,
            self.store.as_ref(),
            self.blobs.as_ref(),
            &self.retry,
            source,
        )
    }

    fn convert(&self, ctx: &CallContext, legacy_dir: &Path) -> Result<Report> {
        let snapshot = Snapshot::load(legacy_dir)?;
        let relations = Relations::build(
            &snapshot.apps,
            &snapshot.app_versions,
            &snapshot.category_resources,
            &snapshot.repo_labels,
        );
        let resolver = ChartResolver::new(legacy_dir);

        let mut conversion = Conversion {
            ctx,
            store: self.store.as_ref(),
            blobs: self.blobs.as_ref(),
            retry: &self.retry,
            multi_cluster: self.multi_cluster,
            snapshot: &snapshot,
            relations: &relations,
            resolver: &resolver,
            members: HashMap::new(),
            report: Report::default(),
        };

        conversion.create_categories()?;
        conversion.create_apps()?;
        conversion.create_repos()?;
        conversion.create_releases()?;

        Ok(conversion.report)
    }
}

/// State of one conversion run over a loaded dump.
struct Conversion<'a> {
    ctx: &'a CallContext,
    store: &'a dyn ResourceStore,
    blobs: &'a dyn BlobStore,
    retry: &'a RetryPolicy,
    multi_cluster: bool,
    snapshot: &'a Snapshot,
    relations: &'a Relations,
    resolver: &'a ChartResolver,
    /// Namespace clients of member clusters, by cluster name.
    members: HashMap<String, Box<dyn NamespaceApi>>,
    report: Report,
}

/// Metadata of a new resource: its name and the creator annotation.
fn object_meta(name: impl Into<String>, legacy_owner: &str) -> ObjectMeta {
    ObjectMeta {
        name: name.into(),
        annotations: BTreeMap::from([(
            CREATOR_ANNOTATION_KEY.to_string(),
            convert_creator(legacy_owner).to_string(),
        )]),
        ..Default::default()
    }
}
