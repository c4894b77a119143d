//! In-memory cluster used by tests

use super::{async_trait, ApiResourceKind, ClusterSource};
use anyhow::{bail, Result};
use k8s_openapi::api::core::v1::{
    Container, ContainerState, ContainerStateRunning, ContainerStatus, Node, NodeStatus,
    NodeSystemInfo, Pod, PodSpec, PodStatus,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{ApiResource, DynamicObject};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Operations a [`FixtureCluster`] can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FixtureOperation {
    ServerVersion,
    CaData,
    ListNodes,
    ListNamespaces,
    ListPods,
    ListKinds,
}

/// A canned cluster built up with builder methods
///
/// Every trait call increments [`FixtureCluster::calls`], so tests can
/// assert that nothing touched the cluster.
#[derive(Debug, Default)]
pub struct FixtureCluster {
    name: String,
    version: String,
    ca: Option<Vec<u8>>,
    nodes: Vec<Node>,
    namespaces: Vec<String>,
    pods: BTreeMap<String, Vec<Pod>>,
    kinds: Vec<ApiResourceKind>,
    objects: BTreeMap<String, Vec<DynamicObject>>,
    failures: BTreeSet<FixtureOperation>,
    failing_kinds: BTreeSet<String>,
    failing_namespaces: BTreeSet<String>,
    calls: AtomicUsize,
}

impl FixtureCluster {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn with_ca(mut self, ca: impl Into<Vec<u8>>) -> Self {
        self.ca = Some(ca.into());
        self
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add a namespace; adding pods to an unknown namespace adds it too
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        if !self.namespaces.contains(&namespace) {
            self.namespaces.push(namespace);
        }
        self
    }

    pub fn with_pod(mut self, pod: Pod) -> Self {
        let namespace = pod.metadata.namespace.clone().unwrap_or_default();
        self = self.with_namespace(namespace.clone());
        self.pods.entry(namespace).or_default().push(pod);
        self
    }

    /// Register a resource kind with its instances
    pub fn with_kind(mut self, kind: ApiResourceKind, objects: Vec<DynamicObject>) -> Self {
        self.objects.insert(kind.gvr_key(), objects);
        self.kinds.push(kind);
        self
    }

    pub fn failing(mut self, operation: FixtureOperation) -> Self {
        self.failures.insert(operation);
        self
    }

    /// Make listing one resource kind fail, by plural resource name
    pub fn failing_kind(mut self, resource: impl Into<String>) -> Self {
        self.failing_kinds.insert(resource.into());
        self
    }

    /// Make namespace-scoped resource listing fail in one namespace
    pub fn failing_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.failing_namespaces.insert(namespace.into());
        self
    }

    /// Number of trait calls served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self, operation: FixtureOperation) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failures.contains(&operation) {
            bail!("fixture failure: {:?}", operation);
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterSource for FixtureCluster {
    fn cluster_name(&self) -> String {
        self.name.clone()
    }

    async fn server_version(&self) -> Result<String> {
        self.enter(FixtureOperation::ServerVersion)?;
        Ok(self.version.clone())
    }

    async fn ca_data(&self) -> Result<Option<Vec<u8>>> {
        self.enter(FixtureOperation::CaData)?;
        Ok(self.ca.clone())
    }

    async fn list_nodes(&self, limit: Option<u32>) -> Result<Vec<Node>> {
        self.enter(FixtureOperation::ListNodes)?;
        let limit = limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(self.nodes.iter().take(limit).cloned().collect())
    }

    async fn list_namespaces(&self) -> Result<Vec<String>> {
        self.enter(FixtureOperation::ListNamespaces)?;
        Ok(self.namespaces.clone())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>> {
        self.enter(FixtureOperation::ListPods)?;
        Ok(self.pods.get(namespace).cloned().unwrap_or_default())
    }

    async fn list_preferred_resource_kinds(&self) -> Result<Vec<ApiResourceKind>> {
        self.enter(FixtureOperation::ListKinds)?;
        Ok(self.kinds.clone())
    }

    async fn list_resources(
        &self,
        kind: &ApiResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<DynamicObject>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_kinds.contains(&kind.resource) {
            bail!("{} is forbidden", kind.gvr_key());
        }
        if let Some(ns) = namespace.filter(|ns| self.failing_namespaces.contains(*ns)) {
            bail!("{} is forbidden in namespace {}", kind.gvr_key(), ns);
        }

        let objects = self.objects.get(&kind.gvr_key()).cloned().unwrap_or_default();
        Ok(match namespace {
            Some(ns) => objects
                .into_iter()
                .filter(|o| o.metadata.namespace.as_deref() == Some(ns))
                .collect(),
            None => objects,
        })
    }
}

/// A node with the given labels, capacity `(cpu, memory, pods, ephemeral-storage)`
/// and a fixed node info
pub fn node(name: &str, labels: &[(&str, &str)], capacity: [&str; 4]) -> Node {
    let quantities: BTreeMap<String, Quantity> = ["cpu", "memory", "pods", "ephemeral-storage"]
        .iter()
        .zip(capacity.iter())
        .map(|(key, value)| (key.to_string(), Quantity(value.to_string())))
        .collect();

    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(
                labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        },
        status: Some(NodeStatus {
            capacity: Some(quantities.clone()),
            allocatable: Some(quantities),
            node_info: Some(NodeSystemInfo {
                architecture: "amd64".to_string(),
                boot_id: format!("{}-boot", name),
                container_runtime_version: "containerd://1.7.2".to_string(),
                kernel_version: "5.15.0".to_string(),
                kube_proxy_version: "v1.25.1".to_string(),
                kubelet_version: "v1.25.1".to_string(),
                machine_id: format!("{}-machine", name),
                operating_system: "linux".to_string(),
                os_image: "Ubuntu 22.04.3 LTS".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A pod with one running container per `(container name, image, image id)`
pub fn pod(namespace: &str, name: &str, containers: &[(&str, &str, &str)]) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: containers
                .iter()
                .map(|(container, image, _)| Container {
                    name: container.to_string(),
                    image: Some(image.to_string()),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }),
        status: Some(PodStatus {
            container_statuses: Some(
                containers
                    .iter()
                    .map(|(container, _, image_id)| ContainerStatus {
                        name: container.to_string(),
                        image_id: image_id.to_string(),
                        state: Some(ContainerState {
                            running: Some(ContainerStateRunning::default()),
                            ..Default::default()
                        }),
                        ..Default::default()
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
    }
}

/// A resource kind as discovery would report it
pub fn kind(group: &str, version: &str, resource: &str, kind: &str, namespaced: bool) -> ApiResourceKind {
    ApiResourceKind {
        group: group.to_string(),
        version: version.to_string(),
        resource: resource.to_string(),
        kind: kind.to_string(),
        namespaced,
    }
}

/// An instance of `kind`, namespaced when `namespace` is given
pub fn object(kind: &ApiResourceKind, name: &str, namespace: Option<&str>) -> DynamicObject {
    let object = DynamicObject::new(name, &ApiResource::from(kind));
    match namespace {
        Some(ns) => object.within(ns),
        None => object,
    }
}
