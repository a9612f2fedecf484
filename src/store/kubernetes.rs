use ::kube::api::{Api, ListParams, PostParams};
use ::kube::config::{KubeConfigOptions, Kubeconfig, KubeconfigError};
use ::kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use ::kube::{Client, Config};
use tracing::debug;

use super::{NamespaceApi, ResourceStore};
use crate::config::KubeStoreConfig;
use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::runtime::BlockingRuntime;
use crate::types::*;

/// Resource store backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeClient {
    client: Client,
    runtime: BlockingRuntime,
}

impl KubeClient {
    /// Connects with the configured kubeconfig, or whatever `Config::infer`
    /// finds (`KUBECONFIG`, `~/.kube/config`, then the in-cluster account).
    pub fn new(settings: &KubeStoreConfig, runtime: BlockingRuntime) -> Result<Self> {
        let kubeconfig = match &settings.kubeconfig {
            Some(path) => Some(Kubeconfig::read_from(path).map_err(kubeconfig_error)?),
            None => None,
        };
        let token = settings.token()?;
        let server = settings.server.clone();
        let insecure = settings.insecure_skip_tls_verify;

        let config = runtime.setup(async move {
            let mut config = match kubeconfig {
                Some(kubeconfig) => {
                    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                        .await
                        .map_err(kubeconfig_error)?
                }
                None => Config::infer().await.map_err(|e| {
                    Error::Config(format!("no usable kubernetes configuration: {e}"))
                })?,
            };
            if let Some(server) = server {
                config.cluster_url = server
                    .parse()
                    .map_err(|e| Error::Config(format!("invalid server {server:?}: {e}")))?;
            }
            if let Some(token) = token {
                config.auth_info.token = Some(token.into());
            }
            config.accept_invalid_certs |= insecure;
            Ok::<_, Error>(config)
        })?;

        Self::from_config(config, runtime)
    }

    /// Client for a member cluster described by a kubeconfig document.
    pub fn from_kubeconfig(document: &str, runtime: BlockingRuntime) -> Result<Self> {
        let kubeconfig = Kubeconfig::from_yaml(document).map_err(kubeconfig_error)?;
        let config = runtime.setup(async move {
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(kubeconfig_error)
        })?;
        Self::from_config(config, runtime)
    }

    pub fn from_config(config: Config, runtime: BlockingRuntime) -> Result<Self> {
        debug!("kubernetes api at {}", config.cluster_url);
        // The client spawns its buffer task, so it is built on the runtime.
        let client = runtime.setup(async move { Client::try_from(config).map_err(Error::from) })?;
        Ok(Self { client, runtime })
    }

    fn api<R: Resource>(&self) -> Api<DynamicObject> {
        Api::all_with(self.client.clone(), &api_resource::<R>())
    }

    fn create<R: Resource>(&self, ctx: &CallContext, resource: &R) -> Result<R> {
        debug!("create {} {}", R::KIND, resource.name());
        let object = to_dynamic(resource)?;
        let api = self.api::<R>();
        let created = self.runtime.run(ctx, async move {
            api.create(&PostParams::default(), &object)
                .await
                .map_err(api_error)
        })?;
        from_dynamic(created)
    }

    fn get<R: Resource>(&self, ctx: &CallContext, name: &str) -> Result<R> {
        let api = self.api::<R>();
        let object = self
            .runtime
            .run(ctx, async move { api.get(name).await.map_err(api_error) })?;
        from_dynamic(object)
    }

    fn list<R: Resource>(&self, ctx: &CallContext, selector: &LabelSelector) -> Result<Vec<R>> {
        let mut params = ListParams::default();
        if !selector.is_empty() {
            params = params.labels(&selector.to_string());
        }
        let api = self.api::<R>();
        let list = self
            .runtime
            .run(ctx, async move { api.list(&params).await.map_err(api_error) })?;
        list.items.into_iter().map(from_dynamic).collect()
    }

    fn update_status<R: Resource>(&self, ctx: &CallContext, resource: &R) -> Result<R> {
        debug!(
            "update {} {} status at version {}",
            R::KIND,
            resource.name(),
            resource.metadata().resource_version
        );
        let body = serde_json::to_vec(&to_dynamic(resource)?)?;
        let api = self.api::<R>();
        let name = resource.name();
        let updated = self.runtime.run(ctx, async move {
            api.replace_status(name, &PostParams::default(), body)
                .await
                .map_err(api_error)
        })?;
        from_dynamic(updated)
    }
}

fn api_resource<R: Resource>() -> ApiResource {
    // Core group kinds carry a bare version such as `v1`.
    let (group, version) = R::API_VERSION
        .rsplit_once('/')
        .unwrap_or(("", R::API_VERSION));
    ApiResource::from_gvk_with_plural(&GroupVersionKind::gvk(group, version, R::KIND), R::PLURAL)
}

fn to_dynamic<R: Resource>(resource: &R) -> Result<DynamicObject> {
    let mut body = serde_json::to_value(resource)?;
    if let serde_json::Value::Object(map) = &mut body {
        map.insert("apiVersion".to_string(), R::API_VERSION.into());
        map.insert("kind".to_string(), R::KIND.into());
    }
    Ok(serde_json::from_value(body)?)
}

fn from_dynamic<R: Resource>(object: DynamicObject) -> Result<R> {
    Ok(serde_json::from_value(serde_json::to_value(object)?)?)
}

fn api_error(err: ::kube::Error) -> Error {
    match err {
        ::kube::Error::Api(response) => match (response.code, response.reason.as_str()) {
            (404, _) => Error::NotFound(response.message),
            (409, "AlreadyExists") => Error::AlreadyExists(response.message),
            (409, _) => Error::Conflict(response.message),
            (status, _) => Error::Api {
                status,
                message: response.message,
            },
        },
        other => Error::Kube(other),
    }
}

fn kubeconfig_error(err: KubeconfigError) -> Error {
    Error::Config(format!("invalid kubeconfig: {err}"))
}

impl NamespaceApi for KubeClient {
    fn get_namespace(&self, ctx: &CallContext, name: &str) -> Result<Namespace> {
        self.get(ctx, name)
    }
}

impl ResourceStore for KubeClient {
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
        let kube_config = &cluster.spec.connection.kube_config;
        if kube_config.is_empty() {
            return Err(Error::Config(format!(
                "cluster {} has no kubeconfig",
                cluster.name()
            )));
        }
        Ok(Box::new(Self::from_kubeconfig(
            kube_config,
            self.runtime.clone(),
        )?))
    }
}
