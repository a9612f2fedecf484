use std::fmt;
use std::fs;
use std::path::{self, Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::Client;
use tracing::{debug, error, info};

use super::status::{RetryPolicy, reconcile_status};
use super::{Report, object_meta};
use crate::blob::{BlobStore, package_key};
use crate::chart::{Chart, digest, load_archive, parse_chart_file_name};
use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::store::{ResourceStore, owner_reference};
use crate::types::*;

/// Chart list the public app store is seeded from.
pub const DEFAULT_CHART_LIST_URL: &str =
    "https://raw.githubusercontent.com/openpitrix/helm-package-repository/master/package/urls.txt";

const IMPORT_OPERATOR: &str = "admin";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Where the charts to import come from.
pub(super) enum ChartSource<'a> {
    List(&'a str),
    Path(&'a Path),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ChartLocation {
    Url(String),
    File(PathBuf),
}

impl fmt::Display for ChartLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Imports every chart of `source` as a built-in application. A chart that
/// cannot be named, fetched or loaded aborts the import; a version that
/// cannot be created is logged.
pub(super) fn run(
    ctx: &CallContext,
    store: &dyn ResourceStore,
    blobs: &dyn BlobStore,
    retry: &RetryPolicy,
    source: ChartSource<'_>,
) -> Result<Report> {
    let mut import = Import {
        ctx,
        store,
        blobs,
        retry,
        client: Client::builder().timeout(DOWNLOAD_TIMEOUT).build()?,
        report: Report::default(),
    };

    let locations = match source {
        ChartSource::List(url) => import.fetch_chart_list(url)?,
        ChartSource::Path(path) => local_charts(path)?,
    };
    info!("import {} charts", locations.len());

    for location in &locations {
        ctx.check()?;
        import.import_chart(location)?;
    }
    Ok(import.report)
}

/// Splits a chart list into its URLs, ignoring blank lines.
fn parse_chart_list(content: &str) -> Vec<ChartLocation> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| ChartLocation::Url(line.to_string()))
        .collect()
}

/// A single archive, or the `*.tgz` archives of a directory in name order.
fn local_charts(path: &Path) -> Result<Vec<ChartLocation>> {
    let path = path::absolute(path)?;
    if path.is_file() {
        return Ok(vec![ChartLocation::File(path)]);
    }
    if !path.is_dir() {
        return Err(Error::NotFound(format!("chart path {}", path.display())));
    }

    let pattern = format!(
        "{}/*.tgz",
        glob::Pattern::escape(&path.to_string_lossy())
    );
    let paths = glob::glob(&pattern)
        .map_err(|e| Error::Config(format!("invalid chart path {}: {e}", path.display())))?;

    let mut charts = Vec::new();
    for entry in paths {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if entry.is_file() {
            charts.push(entry);
        }
    }
    charts.sort();
    Ok(charts.into_iter().map(ChartLocation::File).collect())
}

struct Import<'a> {
    ctx: &'a CallContext,
    store: &'a dyn ResourceStore,
    blobs: &'a dyn BlobStore,
    retry: &'a RetryPolicy,
    client: Client,
    report: Report,
}

impl Import<'_> {
    fn download(&self, url: &str) -> Result<Vec<u8>> {
        self.ctx.check()?;
        let mut request = self.client.get(url);
        if let Some(remaining) = self.ctx.remaining() {
            request = request.timeout(remaining);
        }
        let resp = request.send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: format!("download {url} failed"),
            });
        }
        Ok(resp.bytes()?.to_vec())
    }

    fn fetch_chart_list(&self, url: &str) -> Result<Vec<ChartLocation>> {
        if url.is_empty() {
            return Err(Error::Config("chart list url is empty".to_string()));
        }
        let data = self.download(url).inspect_err(|e| {
            error!("get chart list {url} failed: {e}");
        })?;
        Ok(parse_chart_list(&String::from_utf8_lossy(&data)))
    }

    fn import_chart(&mut self, location: &ChartLocation) -> Result<()> {
        let source = location.to_string();
        let (name, version) = parse_chart_file_name(&source).inspect_err(|e| {
            error!("parse chart name and version of {source} failed: {e}");
        })?;
        info!("import chart {name}, version {version}, from {source}");

        let data = match location {
            ChartLocation::Url(url) => self.download(url),
            ChartLocation::File(path) => fs::read(path).map_err(Error::from),
        }
        .inspect_err(|e| error!("download chart {source} failed: {e}"))?;
        let chart = load_archive(data.as_slice())
            .inspect_err(|e| error!("load chart {source} failed: {e}"))?;

        let app = self
            .find_or_create_app(&chart)
            .inspect_err(|e| error!("create app for chart {name} failed: {e}"))?;

        if let Err(e) = self.import_version(&app, &chart, &data) {
            if e.is_interrupted() {
                return Err(e);
            }
            error!("create version {version} of chart {name} failed: {e}");
            self.report.versions.skipped += 1;
        }
        Ok(())
    }

    /// Finds the built-in application for the chart by scanning every
    /// built-in application, creating one when there is none.
    fn find_or_create_app(&mut self, chart: &Chart) -> Result<Application> {
        let builtin = LabelSelector::new().with(BUILTIN_LABEL_KEY, "true");
        // Linear in the number of built-in applications; nothing indexes the
        // chart name.
        let existing = self
            .store
            .list_applications(self.ctx, &builtin)?
            .into_iter()
            .find(|app| app.true_name() == chart.name());
        if let Some(app) = existing {
            info!("app {} of chart {} already exists", app.name(), chart.name());
            self.report.applications.existing += 1;
            return Ok(app);
        }

        let mut metadata = object_meta(new_id(APPLICATION_ID_PREFIX), IMPORT_OPERATOR);
        metadata
            .labels
            .insert(BUILTIN_LABEL_KEY.to_string(), "true".to_string());
        let app = Application {
            metadata,
            spec: ApplicationSpec {
                name: chart.name().to_string(),
                description: chart.metadata.description.clone(),
                icon: chart.metadata.icon.clone(),
                ..Default::default()
            },
        };

        let created = self.store.create_application(self.ctx, &app)?;
        info!("create app {} for chart {}", created.name(), chart.name());
        self.report.applications.created += 1;
        Ok(created)
    }

    /// Makes sure `app` has an active version for the chart's version with
    /// the archive uploaded.
    fn import_version(&mut self, app: &Application, chart: &Chart, data: &[u8]) -> Result<()> {
        let selector = LabelSelector::new().with(APP_ID_LABEL_KEY, app.name());
        let existing = self
            .store
            .list_application_versions(self.ctx, &selector)?
            .into_iter()
            .find(|version| version.chart_version() == chart.version());

        let name = match existing {
            Some(version) => {
                info!("app version {} already exists", version.name());
                if version.spec.data_key.is_empty() {
                    self.upload(version.name(), data)?;
                }
                self.report.versions.existing += 1;
                version.name().to_string()
            }
            None => {
                let id = new_id(APPLICATION_VERSION_ID_PREFIX);
                self.upload(&id, data)?;
                self.create_version(app, chart, data, &id)?;
                id
            }
        };

        let outcome = reconcile_status::<ApplicationVersion>(
            self.store,
            self.ctx,
            self.retry,
            &name,
            |current| current.status.state == STATE_ACTIVE,
            |current| {
                current
                    .status
                    .transition(STATE_ACTIVE, IMPORT_OPERATOR, Utc::now());
            },
        )?;
        debug!("update app version {name} status: {outcome:?}");
        self.report.record_status(outcome);
        Ok(())
    }

    fn upload(&self, version_id: &str, data: &[u8]) -> Result<()> {
        let mut content = data;
        self.blobs
            .upload(self.ctx, &package_key("", version_id), version_id, &mut content)
    }

    fn create_version(
        &mut self,
        app: &Application,
        chart: &Chart,
        data: &[u8],
        id: &str,
    ) -> Result<()> {
        let mut metadata = object_meta(id, IMPORT_OPERATOR);
        metadata
            .labels
            .insert(APP_ID_LABEL_KEY.to_string(), app.name().to_string());
        metadata.owner_references.push(owner_reference(app));

        let version = ApplicationVersion {
            metadata,
            spec: ApplicationVersionSpec {
                metadata: VersionMetadata {
                    name: chart.name().to_string(),
                    version: chart.version().to_string(),
                    app_version: chart.app_version().to_string(),
                    ..Default::default()
                },
                digest: digest(data),
                data_key: id.to_string(),
                ..Default::default()
            },
            status: ApplicationVersionStatus::default(),
        };

        self.store.create_application_version(self.ctx, &version)?;
        info!("create app version {id} for chart {}", chart.name());
        self.report.versions.created += 1;
        Ok(())
    }
}
