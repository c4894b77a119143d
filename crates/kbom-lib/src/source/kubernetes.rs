//! Live cluster access through the `kube` client

use super::{async_trait, ApiResourceKind, ClusterSource};
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Node, Pod};
use kube::api::{Api, ApiResource, DynamicObject, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::{verbs, Discovery, Scope};
use kube::{Client, Config};
use tracing::debug;

const IN_CLUSTER_NAME: &str = "in-cluster";
const ROOT_CA_CONFIG_MAP: &str = "kube-root-ca.crt";
const ROOT_CA_NAMESPACE: &str = "kube-system";
const ROOT_CA_KEY: &str = "ca.crt";
const SERVICE_ACCOUNT_CA: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// [`ClusterSource`] backed by a Kubernetes API server
#[derive(Clone)]
pub struct KubeSource {
    client: Client,
    context: String,
    /// PEM CA data the client was configured with
    client_ca: Option<Vec<u8>>,
}

impl KubeSource {
    /// Connect using the kubeconfig, optionally selecting a named context.
    ///
    /// Without a context the usual inference applies: the current kubeconfig
    /// context, then the in-cluster service account.
    pub async fn connect(context: Option<&str>) -> Result<Self> {
        let client_ca = client_ca_data(context)?;
        let (config, context) = match context {
            Some(name) => {
                let options = KubeConfigOptions {
                    context: Some(name.to_string()),
                    ..Default::default()
                };
                let config = Config::from_kubeconfig(&options)
                    .await
                    .with_context(|| format!("failed to load kubeconfig context {}", name))?;
                (config, name.to_string())
            }
            None => {
                let config = Config::infer()
                    .await
                    .context("failed to infer kubernetes client configuration")?;
                (config, current_context_name())
            }
        };

        let client = Client::try_from(config).context("can not create kubernetes client")?;

        debug!(context = %context, "Kubernetes client created");

        Ok(Self {
            client,
            context,
            client_ca,
        })
    }

    fn resource_api(&self, kind: &ApiResourceKind, namespace: Option<&str>) -> Api<DynamicObject> {
        let ar = ApiResource::from(kind);
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        }
    }
}

/// PEM CA data from the kubeconfig, or the service account when in-cluster.
///
/// `kube::Config` keeps decoded DER certificates only, so the raw bytes are
/// read here to hash the same data the `kube-root-ca.crt` config map holds.
fn client_ca_data(context: Option<&str>) -> Result<Option<Vec<u8>>> {
    match Kubeconfig::read() {
        Ok(kubeconfig) => kubeconfig_ca_data(&kubeconfig, context),
        Err(e) => {
            debug!(error = %e, "No kubeconfig, using service account CA");
            Ok(std::fs::read(SERVICE_ACCOUNT_CA).ok())
        }
    }
}

/// CA data of the cluster behind `context`, or the current context
fn kubeconfig_ca_data(kubeconfig: &Kubeconfig, context: Option<&str>) -> Result<Option<Vec<u8>>> {
    let Some(context_name) = context.or(kubeconfig.current_context.as_deref()) else {
        return Ok(None);
    };
    let Some(cluster_name) = kubeconfig
        .contexts
        .iter()
        .find(|named| named.name == context_name)
        .and_then(|named| named.context.as_ref())
        .map(|ctx| ctx.cluster.as_str())
    else {
        return Ok(None);
    };
    let Some(cluster) = kubeconfig
        .clusters
        .iter()
        .find(|named| named.name == cluster_name)
        .and_then(|named| named.cluster.as_ref())
    else {
        return Ok(None);
    };

    if let Some(data) = &cluster.certificate_authority_data {
        let compact: String = data.split_whitespace().collect();
        let pem = general_purpose::STANDARD
            .decode(compact)
            .with_context(|| format!("invalid certificate-authority-data for cluster {}", cluster_name))?;
        return Ok(Some(pem));
    }
    if let Some(path) = &cluster.certificate_authority {
        let pem = std::fs::read(path)
            .with_context(|| format!("failed to read certificate authority {}", path))?;
        return Ok(Some(pem));
    }
    Ok(None)
}

fn current_context_name() -> String {
    Kubeconfig::read()
        .ok()
        .and_then(|kubeconfig| kubeconfig.current_context)
        .unwrap_or_else(|| IN_CLUSTER_NAME.to_string())
}

#[async_trait]
impl ClusterSource for KubeSource {
    fn cluster_name(&self) -> String {
        self.context.clone()
    }

    async fn server_version(&self) -> Result<String> {
        let info = self
            .client
            .apiserver_version()
            .await
            .context("error getting k8s version")?;
        Ok(info.git_version)
    }

    async fn ca_data(&self) -> Result<Option<Vec<u8>>> {
        let config_maps: Api<ConfigMap> =
            Api::namespaced(self.client.clone(), ROOT_CA_NAMESPACE);

        match config_maps.get_opt(ROOT_CA_CONFIG_MAP).await {
            Ok(Some(config_map)) => {
                let cert = config_map
                    .data
                    .as_ref()
                    .and_then(|data| data.get(ROOT_CA_KEY))
                    .ok_or_else(|| {
                        anyhow!(
                            "can't find '{}' in configMap '{}'",
                            ROOT_CA_KEY,
                            ROOT_CA_CONFIG_MAP
                        )
                    })?;
                return Ok(Some(cert.as_bytes().to_vec()));
            }
            Ok(None) => debug!("ConfigMap {} not found", ROOT_CA_CONFIG_MAP),
            Err(e) => debug!(error = %e, "Failed to get {}", ROOT_CA_CONFIG_MAP),
        }

        Ok(self.client_ca.clone())
    }

    async fn list_nodes(&self, limit: Option<u32>) -> Result<Vec<Node>> {
        let mut params = ListParams::default();
        if let Some(limit) = limit {
            params = params.limit(limit);
        }

        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes.list(&params).await.context("failed to list nodes")?;
        Ok(list.items)
    }

    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces
            .list(&ListParams::default())
            .await
            .context("failed to list namespaces")?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|ns| ns.metadata.name)
            .collect())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods
            .list(&ListParams::default())
            .await
            .with_context(|| format!("failed to list pods in namespace {}", namespace))?;
        Ok(list.items)
    }

    async fn list_preferred_resource_kinds(&self) -> Result<Vec<ApiResourceKind>> {
        let discovery = Discovery::new(self.client.clone())
            .run()
            .await
            .context("failed to get api groups")?;

        let mut kinds = Vec::new();
        for group in discovery.groups() {
            for (ar, caps) in group.recommended_resources() {
                if !caps.supports_operation(verbs::LIST) {
                    continue;
                }
                kinds.push(ApiResourceKind {
                    group: ar.group,
                    version: ar.version,
                    resource: ar.plural,
                    kind: ar.kind,
                    namespaced: caps.scope == Scope::Namespaced,
                });
            }
        }

        debug!(count = kinds.len(), "Discovered preferred resource kinds");
        Ok(kinds)
    }

    async fn list_resources(
        &self,
        kind: &ApiResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<DynamicObject>> {
        let list = self
            .resource_api(kind, namespace)
            .list(&ListParams::default())
            .await
            .with_context(|| format!("failed to list {}", kind.gvr_key()))?;
        Ok(list.items)
    }
}
