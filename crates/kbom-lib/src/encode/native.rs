//! Native document encoders
//!
//! JSON is the snapshot's own serde form. YAML uses the same layout with
//! lowercase run-together keys (`bomformat`, `k8sversion`, ...), written
//! through the borrowed views below.

use super::encoding_failed;
use crate::error::Result;
use crate::models::{
    AdditionalProperties, Capacity, Cluster, Components, Image, Location, Node, Resource,
    ResourceList, Snapshot, Tool,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

pub(super) fn to_json(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let mut out = serde_json::to_vec_pretty(snapshot).map_err(encoding_failed)?;
    out.push(b'\n');
    Ok(out)
}

pub(super) fn to_yaml(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let document = serde_yaml::to_string(&SnapshotView::from(snapshot)).map_err(encoding_failed)?;
    Ok(document.into_bytes())
}

#[derive(Serialize)]
struct SnapshotView<'a> {
    id: &'a str,
    bomformat: &'a str,
    specversion: &'a str,
    generatedat: &'a DateTime<Utc>,
    generatedby: ToolView<'a>,
    cluster: ClusterView<'a>,
}

#[derive(Serialize)]
struct ToolView<'a> {
    vendor: &'a str,
    name: &'a str,
    buildtime: &'a str,
    version: &'a str,
    commit: &'a str,
    committime: &'a str,
}

#[derive(Serialize)]
struct ClusterView<'a> {
    name: &'a str,
    cacertdigest: &'a str,
    k8sversion: &'a str,
    location: Option<&'a Location>,
    nodescount: usize,
    nodes: Vec<NodeView<'a>>,
    components: ComponentsView<'a>,
}

#[derive(Serialize)]
struct NodeView<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    instance_type: &'a str,
    hostname: &'a str,
    capacity: CapacityView<'a>,
    allocatable: CapacityView<'a>,
    labels: &'a Option<BTreeMap<String, String>>,
    annotations: &'a Option<BTreeMap<String, String>>,
    machineid: &'a str,
    architecture: &'a str,
    containerruntimeversion: &'a str,
    bootid: &'a str,
    kernelversion: &'a str,
    kubeproxyversion: &'a str,
    kubeletversion: &'a str,
    operatingsystem: &'a str,
    osimage: &'a str,
}

#[derive(Serialize)]
struct CapacityView<'a> {
    cpu: &'a str,
    memory: &'a str,
    pods: &'a str,
    ephemeralstorage: &'a str,
}

#[derive(Serialize)]
struct ComponentsView<'a> {
    images: Vec<ImageView<'a>>,
    resources: BTreeMap<&'a str, ResourceListView<'a>>,
}

#[derive(Serialize)]
struct ImageView<'a> {
    fullname: &'a str,
    name: &'a str,
    version: &'a str,
    digest: &'a str,
    controlplane: bool,
    namespace: &'a str,
}

#[derive(Serialize)]
struct ResourceListView<'a> {
    kind: &'a str,
    apiversion: &'a str,
    namespaced: bool,
    resourcescount: usize,
    resources: Vec<ResourceView<'a>>,
}

#[derive(Serialize)]
struct ResourceView<'a> {
    kind: &'a str,
    apiversion: &'a str,
    name: &'a str,
    namespace: &'a str,
    additionalproperties: Option<AdditionalPropertiesView<'a>>,
}

#[derive(Serialize)]
struct AdditionalPropertiesView<'a> {
    version: &'a str,
}

impl<'a> From<&'a Snapshot> for SnapshotView<'a> {
    fn from(s: &'a Snapshot) -> Self {
        Self {
            id: &s.id,
            bomformat: &s.bom_format,
            specversion: &s.spec_version,
            generatedat: &s.generated_at,
            generatedby: ToolView::from(&s.generated_by),
            cluster: ClusterView::from(&s.cluster),
        }
    }
}

impl<'a> From<&'a Tool> for ToolView<'a> {
    fn from(t: &'a Tool) -> Self {
        Self {
            vendor: &t.vendor,
            name: &t.name,
            buildtime: &t.build_time,
            version: &t.version,
            commit: &t.commit,
            committime: &t.commit_time,
        }
    }
}

impl<'a> From<&'a Cluster> for ClusterView<'a> {
    fn from(c: &'a Cluster) -> Self {
        Self {
            name: &c.name,
            cacertdigest: &c.ca_cert_digest,
            k8sversion: &c.k8s_version,
            location: c.location.as_ref(),
            nodescount: c.nodes_count,
            nodes: c.nodes.iter().map(NodeView::from).collect(),
            components: ComponentsView::from(&c.components),
        }
    }
}

impl<'a> From<&'a Node> for NodeView<'a> {
    fn from(n: &'a Node) -> Self {
        Self {
            name: &n.name,
            instance_type: &n.instance_type,
            hostname: &n.hostname,
            capacity: CapacityView::from(&n.capacity),
            allocatable: CapacityView::from(&n.allocatable),
            labels: &n.labels,
            annotations: &n.annotations,
            machineid: &n.machine_id,
            architecture: &n.architecture,
            containerruntimeversion: &n.container_runtime_version,
            bootid: &n.boot_id,
            kernelversion: &n.kernel_version,
            kubeproxyversion: &n.kube_proxy_version,
            kubeletversion: &n.kubelet_version,
            operatingsystem: &n.operating_system,
            osimage: &n.os_image,
        }
    }
}

impl<'a> From<&'a Capacity> for CapacityView<'a> {
    fn from(c: &'a Capacity) -> Self {
        Self {
            cpu: &c.cpu,
            memory: &c.memory,
            pods: &c.pods,
            ephemeralstorage: &c.ephemeral_storage,
        }
    }
}

impl<'a> From<&'a Components> for ComponentsView<'a> {
    fn from(c: &'a Components) -> Self {
        Self {
            images: c.images.iter().map(ImageView::from).collect(),
            resources: c
                .resources
                .iter()
                .map(|(key, list)| (key.as_str(), ResourceListView::from(list)))
                .collect(),
        }
    }
}

impl<'a> From<&'a Image> for ImageView<'a> {
    fn from(i: &'a Image) -> Self {
        Self {
            fullname: &i.full_name,
            name: &i.name,
            version: &i.version,
            digest: &i.digest,
            controlplane: i.control_plane,
            namespace: &i.namespace,
        }
    }
}

impl<'a> From<&'a ResourceList> for ResourceListView<'a> {
    fn from(l: &'a ResourceList) -> Self {
        Self {
            kind: &l.kind,
            apiversion: &l.api_version,
            namespaced: l.namespaced,
            resourcescount: l.resources_count,
            resources: l.resources.iter().map(ResourceView::from).collect(),
        }
    }
}

impl<'a> From<&'a Resource> for ResourceView<'a> {
    fn from(r: &'a Resource) -> Self {
        Self {
            kind: &r.kind,
            apiversion: &r.api_version,
            name: &r.name,
            namespace: &r.namespace,
            additionalproperties: r
                .additional_properties
                .as_ref()
                .map(AdditionalPropertiesView::from),
        }
    }
}

impl<'a> From<&'a AdditionalProperties> for AdditionalPropertiesView<'a> {
    fn from(p: &'a AdditionalProperties) -> Self {
        Self {
            version: &p.version,
        }
    }
}
