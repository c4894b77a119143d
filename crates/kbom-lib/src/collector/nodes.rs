//! Node inventory and cluster location

use super::{query_error, Collector, Mode};
use crate::error::{KbomError, Result};
use crate::models::{Capacity, Location, Node, UNKNOWN_LOCATION};
use k8s_openapi::api::core::v1::Node as KubeNode;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;
use tracing::debug;

const HOSTNAME_LABEL: &str = "kubernetes.io/hostname";
const INSTANCE_TYPE_LABEL: &str = "node.kubernetes.io/instance-type";
const REGION_LABEL: &str = "topology.kubernetes.io/region";
const ZONE_LABEL: &str = "topology.kubernetes.io/zone";

/// Label whose presence identifies a cloud provider, in lookup order
const CLOUD_PROVIDER_LABELS: &[(&str, &str)] = &[
    ("k8s.io/cloud-provider-aws", "aws"),
    ("topology.gke.io/zone", "gcloud"),
    ("kubernetes.azure.com/cluster", "azure"),
];

impl Collector {
    pub(super) async fn nodes(&self) -> Result<Vec<Node>> {
        let nodes = self
            .bounded("list nodes", self.source.list_nodes(None))
            .await?
            .map_err(|e| query_error("list nodes", e))?;

        debug!(count = nodes.len(), "Found nodes");
        Ok(nodes
            .iter()
            .map(|node| node_from_kube(node, self.config.mode))
            .collect())
    }

    /// Location read from the labels of an arbitrary node
    pub(super) async fn location(&self) -> Result<Location> {
        let nodes = self
            .bounded("list nodes", self.source.list_nodes(Some(1)))
            .await?
            .map_err(|e| query_error("list nodes", e))?;

        let node = nodes.first().ok_or(KbomError::NoNodesFound)?;
        Ok(location_from_labels(node.metadata.labels.as_ref()))
    }
}

fn node_from_kube(node: &KubeNode, mode: Mode) -> Node {
    let labels = node.metadata.labels.as_ref();
    let status = node.status.as_ref();
    let info = status.and_then(|s| s.node_info.clone()).unwrap_or_default();

    let (node_labels, node_annotations) = match mode {
        Mode::Full => (
            node.metadata.labels.clone(),
            node.metadata.annotations.clone(),
        ),
        Mode::Short => (None, None),
    };

    Node {
        name: node.metadata.name.clone().unwrap_or_default(),
        instance_type: label(labels, INSTANCE_TYPE_LABEL),
        hostname: label(labels, HOSTNAME_LABEL),
        capacity: capacity(status.and_then(|s| s.capacity.as_ref())),
        allocatable: capacity(status.and_then(|s| s.allocatable.as_ref())),
        labels: node_labels,
        annotations: node_annotations,
        machine_id: info.machine_id,
        architecture: info.architecture,
        container_runtime_version: info.container_runtime_version,
        boot_id: info.boot_id,
        kernel_version: info.kernel_version,
        kube_proxy_version: info.kube_proxy_version,
        kubelet_version: info.kubelet_version,
        operating_system: info.operating_system,
        os_image: info.os_image,
    }
}

/// Quantities are copied verbatim; a missing dimension stays empty
fn capacity(quantities: Option<&BTreeMap<String, Quantity>>) -> Capacity {
    let get = |key: &str| {
        quantities
            .and_then(|q| q.get(key))
            .map(|q| q.0.clone())
            .unwrap_or_default()
    };

    Capacity {
        cpu: get("cpu"),
        memory: get("memory"),
        pods: get("pods"),
        ephemeral_storage: get("ephemeral-storage"),
    }
}

fn location_from_labels(labels: Option<&BTreeMap<String, String>>) -> Location {
    let name = labels
        .and_then(|labels| {
            CLOUD_PROVIDER_LABELS
                .iter()
                .find(|(key, _)| labels.contains_key(*key))
                .map(|(_, provider)| provider.to_string())
        })
        .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());

    Location {
        name,
        region: label(labels, REGION_LABEL),
        zone: label(labels, ZONE_LABEL),
    }
}

fn label(labels: Option<&BTreeMap<String, String>>, key: &str) -> String {
    labels
        .and_then(|labels| labels.get(key))
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fixture;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_location_aws() {
        let l = labels(&[
            ("k8s.io/cloud-provider-aws", "12345"),
            (REGION_LABEL, "us-east-1"),
            (ZONE_LABEL, "us-east-1a"),
        ]);
        let location = location_from_labels(Some(&l));
        assert_eq!(location.name, "aws");
        assert_eq!(location.region, "us-east-1");
        assert_eq!(location.zone, "us-east-1a");
    }

    #[test]
    fn test_location_gke_and_azure() {
        let gke = labels(&[("topology.gke.io/zone", "europe-west1-b")]);
        assert_eq!(location_from_labels(Some(&gke)).name, "gcloud");

        let aks = labels(&[("kubernetes.azure.com/cluster", "MC_rg")]);
        assert_eq!(location_from_labels(Some(&aks)).name, "azure");
    }

    #[test]
    fn test_location_unknown() {
        let location = location_from_labels(None);
        assert_eq!(location.name, UNKNOWN_LOCATION);
        assert_eq!(location.region, "");

        let other = labels(&[("kubernetes.io/os", "linux")]);
        assert_eq!(location_from_labels(Some(&other)).name, UNKNOWN_LOCATION);
    }

    #[test]
    fn test_node_capacity_kept_verbatim() {
        let kube_node = fixture::node(
            "node-1",
            &[(HOSTNAME_LABEL, "node-1.local"), (INSTANCE_TYPE_LABEL, "m5.large")],
            ["1930m", "1483088Ki", "11", "482098735124"],
        );
        let node = node_from_kube(&kube_node, Mode::Full);

        assert_eq!(node.name, "node-1");
        assert_eq!(node.hostname, "node-1.local");
        assert_eq!(node.instance_type, "m5.large");
        assert_eq!(node.capacity.cpu, "1930m");
        assert_eq!(node.capacity.memory, "1483088Ki");
        assert_eq!(node.capacity.pods, "11");
        assert_eq!(node.allocatable.ephemeral_storage, "482098735124");
        assert_eq!(node.machine_id, "node-1-machine");
        assert!(node.labels.is_some());
    }

    #[test]
    fn test_short_mode_drops_labels_and_annotations() {
        let kube_node = fixture::node("node-1", &[(HOSTNAME_LABEL, "node-1")], ["1", "1Gi", "110", "10Gi"]);
        let node = node_from_kube(&kube_node, Mode::Short);
        assert!(node.labels.is_none());
        assert!(node.annotations.is_none());
        assert_eq!(node.hostname, "node-1");
    }

    #[test]
    fn test_missing_status_gives_empty_capacity() {
        let node = node_from_kube(&KubeNode::default(), Mode::Full);
        assert_eq!(node.capacity, Capacity::default());
        assert_eq!(node.allocatable, Capacity::default());
    }
}
