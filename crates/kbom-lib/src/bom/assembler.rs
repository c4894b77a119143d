//! Snapshot to CycloneDX transformation

use super::{
    Bom, Component, ComponentType, Dependency, Metadata, PropertyList, Tool, BOM_FORMAT,
    SPEC_VERSION,
};
use crate::fingerprint::fingerprint;
use crate::models::{Cluster, Image, Node, Resource, ResourceList, Snapshot};
use chrono::SecondsFormat;
use serde::Serialize;
use std::collections::BTreeSet;

const CLUSTER_TYPE: &str = "cluster";
const NODE_TYPE: &str = "node";
const CONTAINER_TYPE: &str = "container";

/// What a generic resource reference is minted from
#[derive(Serialize)]
struct ResourceIdentity<'a> {
    kind: &'a str,
    api_version: &'a str,
    name: &'a str,
    namespace: &'a str,
}

/// Build the CycloneDX document for a snapshot.
///
/// Pure and deterministic: the same snapshot always yields the same document.
pub fn assemble(snapshot: &Snapshot) -> Bom {
    let cluster = &snapshot.cluster;
    let cluster_component = cluster_component(cluster);

    let mut components = Vec::new();
    let mut depends_on = BTreeSet::new();

    for node in &cluster.nodes {
        let component = node_component(node);
        if let Some(bom_ref) = &component.bom_ref {
            depends_on.insert(bom_ref.clone());
        }
        components.push(component);
    }

    for image in &cluster.components.images {
        let component = image_component(image);
        if image.control_plane {
            if let Some(bom_ref) = &component.bom_ref {
                depends_on.insert(bom_ref.clone());
            }
        }
        components.push(component);
    }

    for list in cluster.components.resources.values() {
        components.extend(list.resources.iter().map(|r| resource_component(list, r)));
    }

    let dependencies = cluster_component
        .bom_ref
        .clone()
        .map(|reference| Dependency {
            reference,
            depends_on: depends_on.into_iter().collect(),
        })
        .into_iter()
        .collect();

    Bom {
        bom_format: BOM_FORMAT.to_string(),
        spec_version: SPEC_VERSION.to_string(),
        serial_number: format!("urn:uuid:{}", snapshot.id),
        version: 1,
        metadata: Metadata {
            timestamp: snapshot
                .generated_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            tools: vec![Tool {
                vendor: snapshot.generated_by.vendor.clone(),
                name: snapshot.generated_by.name.clone(),
                version: snapshot.generated_by.version.clone(),
            }],
            component: cluster_component,
        },
        components,
        dependencies,
    }
}

fn cluster_component(cluster: &Cluster) -> Component {
    let mut properties = PropertyList::for_component(CLUSTER_TYPE, &cluster.name)
        .vendor("k8s:cluster:nodes", cluster.nodes_count.to_string());

    if let Some(location) = &cluster.location {
        if location.is_known() {
            properties = properties.vendor("k8s:cluster:location:name", location.name.as_str());
        }
        if !location.region.is_empty() {
            properties = properties.vendor("k8s:cluster:location:region", location.region.as_str());
        }
        if !location.zone.is_empty() {
            properties = properties.vendor("k8s:cluster:location:zone", location.zone.as_str());
        }
    }

    Component {
        bom_ref: Some(cluster.bom_ref()),
        component_type: ComponentType::Platform,
        name: cluster.bom_name().to_string(),
        version: cluster.k8s_version.clone(),
        purl: None,
        properties,
    }
}

fn node_component(node: &Node) -> Component {
    let properties = PropertyList::for_component(NODE_TYPE, &node.name)
        .vendor("k8s:node:osImage", node.os_image.as_str())
        .vendor("k8s:node:arch", node.architecture.as_str())
        .vendor("k8s:node:kernel", node.kernel_version.as_str())
        .vendor("k8s:node:bootId", node.boot_id.as_str())
        .vendor("k8s:node:type", node.instance_type.as_str())
        .vendor("k8s:node:operatingSystem", node.operating_system.as_str())
        .vendor("k8s:node:machineId", node.machine_id.as_str())
        .vendor("k8s:node:hostname", node.hostname.as_str())
        .vendor(
            "k8s:node:containerRuntimeVersion",
            node.container_runtime_version.as_str(),
        )
        .vendor("k8s:node:kubeletVersion", node.kubelet_version.as_str())
        .vendor("k8s:node:kubeProxyVersion", node.kube_proxy_version.as_str())
        .vendor("k8s:node:capacity:cpu", node.capacity.cpu.as_str())
        .vendor("k8s:node:capacity:memory", node.capacity.memory.as_str())
        .vendor("k8s:node:capacity:pods", node.capacity.pods.as_str())
        .vendor(
            "k8s:node:capacity:ephemeralStorage",
            node.capacity.ephemeral_storage.as_str(),
        )
        .vendor("k8s:node:allocatable:cpu", node.allocatable.cpu.as_str())
        .vendor("k8s:node:allocatable:memory", node.allocatable.memory.as_str())
        .vendor("k8s:node:allocatable:pods", node.allocatable.pods.as_str())
        .vendor(
            "k8s:node:allocatable:ephemeralStorage",
            node.allocatable.ephemeral_storage.as_str(),
        );

    Component {
        bom_ref: minted(fingerprint(node)),
        component_type: ComponentType::Platform,
        name: node.name.clone(),
        version: String::new(),
        purl: None,
        properties,
    }
}

fn image_component(image: &Image) -> Component {
    let pkg_id = image.pkg_id();
    let properties = PropertyList::for_component(CONTAINER_TYPE, &image.name)
        .vendor("pkg:type", "oci")
        .vendor("pkg:name", image.name.as_str())
        .vendor("pkg:version", image.version.as_str())
        .vendor("pkg:digest", image.digest.as_str());

    Component {
        bom_ref: Some(pkg_id.clone()),
        component_type: ComponentType::Container,
        name: image.name.clone(),
        version: image.digest.clone(),
        purl: Some(pkg_id),
        properties,
    }
}

fn resource_component(list: &ResourceList, resource: &Resource) -> Component {
    let mut properties = PropertyList::for_component(&list.kind, &resource.name)
        .vendor("k8s:component:apiVersion", list.api_version.as_str());
    if list.namespaced {
        properties = properties.vendor("k8s:component:namespace", resource.namespace.as_str());
    }

    let identity = ResourceIdentity {
        kind: &list.kind,
        api_version: &list.api_version,
        name: &resource.name,
        namespace: &resource.namespace,
    };

    Component {
        bom_ref: minted(fingerprint(&identity)),
        component_type: ComponentType::Application,
        name: resource.name.clone(),
        version: list.api_version.clone(),
        purl: None,
        properties,
    }
}

/// An empty fingerprint means the reference stays unset
fn minted(reference: String) -> Option<String> {
    Some(reference).filter(|r| !r.is_empty())
}
