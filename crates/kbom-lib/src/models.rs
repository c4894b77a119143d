//! Core data models for the cluster bill of materials
//!
//! A [`Snapshot`] is built once per run by the collector and is read-only
//! from then on. Field names and nesting are the native JSON document.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::form_urlencoded;

const PKG_PREFIX: &str = "pkg";
const OCI_PREFIX: &str = "oci";
const K8S_PREFIX: &str = "k8s";

/// Format tag of the native document
pub const BOM_FORMAT: &str = "kbom";

/// Version of the native document layout
pub const SPEC_VERSION: &str = "0.3";

/// Package name used for the cluster itself
pub const KUBERNETES_PKG_NAME: &str = "k8s.io/kubernetes";

/// Namespace whose images are treated as control-plane images
pub const CONTROL_PLANE_NAMESPACE: &str = "kube-system";

/// Location value used when the cloud provider cannot be determined
pub const UNKNOWN_LOCATION: &str = "unknown";

/// Root of the native document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Snapshot {
    pub id: String,
    pub bom_format: String,
    pub spec_version: String,
    pub generated_at: DateTime<Utc>,
    pub generated_by: Tool,
    pub cluster: Cluster,
}

/// Descriptor of the tool that generated a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Tool {
    pub vendor: String,
    pub name: String,
    pub build_time: String,
    pub version: String,
    pub commit: String,
    pub commit_time: String,
}

impl Default for Tool {
    fn default() -> Self {
        Self {
            vendor: "kbom".to_string(),
            name: "kbom".to_string(),
            build_time: option_env!("KBOM_BUILD_TIME").unwrap_or("unknown").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            commit: option_env!("KBOM_COMMIT").unwrap_or("unknown").to_string(),
            commit_time: option_env!("KBOM_COMMIT_TIME").unwrap_or("unknown").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Cluster {
    pub name: String,
    pub ca_cert_digest: String,
    pub k8s_version: String,
    pub location: Option<Location>,
    pub nodes_count: usize,
    pub nodes: Vec<Node>,
    pub components: Components,
}

impl Cluster {
    /// Package reference of the cluster, e.g. `pkg:k8s/k8s.io%2Fkubernetes@1.25.1`
    pub fn bom_ref(&self) -> String {
        format!(
            "{}:{}/{}@{}",
            PKG_PREFIX,
            K8S_PREFIX,
            query_escape(KUBERNETES_PKG_NAME),
            self.k8s_version
        )
    }

    pub fn bom_name(&self) -> &'static str {
        KUBERNETES_PKG_NAME
    }
}

/// Cloud provider, region and zone of a cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Location {
    pub name: String,
    pub region: String,
    pub zone: String,
}

impl Location {
    /// Whether the provider name carries information
    pub fn is_known(&self) -> bool {
        !self.name.is_empty() && self.name != UNKNOWN_LOCATION
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Node {
    pub name: String,
    #[serde(rename = "type")]
    pub instance_type: String,
    pub hostname: String,
    pub capacity: Capacity,
    pub allocatable: Capacity,
    /// Only populated in full mode
    pub labels: Option<BTreeMap<String, String>>,
    /// Only populated in full mode
    pub annotations: Option<BTreeMap<String, String>>,
    pub machine_id: String,
    pub architecture: String,
    pub container_runtime_version: String,
    pub boot_id: String,
    pub kernel_version: String,
    pub kube_proxy_version: String,
    pub kubelet_version: String,
    pub operating_system: String,
    pub os_image: String,
}

/// Node resource quantities, kept in the cluster's own quantity notation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Capacity {
    pub cpu: String,
    pub memory: String,
    pub pods: String,
    pub ephemeral_storage: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Components {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
    /// Keyed by group/version/resource, e.g. `apps/v1, Resource=deployments`
    pub resources: BTreeMap<String, ResourceList>,
}

/// A container image seen running in the cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Image {
    pub full_name: String,
    pub name: String,
    pub version: String,
    pub digest: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(skip)]
    pub control_plane: bool,
}

impl Image {
    /// Package URL of the image; doubles as its BOM reference.
    ///
    /// `pkg:oci/nginx@sha256%3A...?repository_url=docker.io%2Flibrary%2Fnginx&tag=1.17.1`
    pub fn pkg_id(&self) -> String {
        let base = self.name.rsplit('/').next().unwrap_or_default();
        let mut pkg = format!("{}:{}/{}", PKG_PREFIX, OCI_PREFIX, base);

        if !self.digest.is_empty() {
            pkg.push('@');
            pkg.push_str(&query_escape(&self.digest));
        }

        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("repository_url", &self.name);
        if !self.version.is_empty() {
            query.append_pair("tag", &self.version);
        }

        format!("{}?{}", pkg, query.finish())
    }

    /// Fold a later sighting of the same image into this one.
    ///
    /// The first sighting wins, except that a missing digest is filled in.
    pub fn merge(&mut self, later: Image) {
        if self.digest.is_empty() && !later.digest.is_empty() {
            self.digest = later.digest;
        }
    }
}

/// All instances of one group/version/resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResourceList {
    pub kind: String,
    pub api_version: String,
    pub namespaced: bool,
    #[serde(rename = "count")]
    pub resources_count: usize,
    /// Only populated in full mode
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Resource {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AdditionalProperties {
    #[serde(rename = "spec.version", default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

/// Escape a value for use in a URL query, spaces become `+`
pub(crate) fn query_escape(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str, version: &str, digest: &str) -> Image {
        Image {
            full_name: "full_name".to_string(),
            name: name.to_string(),
            version: version.to_string(),
            digest: digest.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_pkg_id_with_version_and_digest() {
        let img = image("repo/name", "version", "sha256:digest");
        assert_eq!(
            img.pkg_id(),
            "pkg:oci/name@sha256%3Adigest?repository_url=repo%2Fname&tag=version"
        );
    }

    #[test]
    fn test_pkg_id_version_only() {
        let img = image("repo/name", "version", "");
        assert_eq!(img.pkg_id(), "pkg:oci/name?repository_url=repo%2Fname&tag=version");
    }

    #[test]
    fn test_pkg_id_digest_only() {
        let img = image("repo/subrepo/name", "", "sha256:digest");
        assert_eq!(
            img.pkg_id(),
            "pkg:oci/name@sha256%3Adigest?repository_url=repo%2Fsubrepo%2Fname"
        );
    }

    #[test]
    fn test_pkg_id_without_version_or_digest() {
        let img = image("repo/name", "", "");
        assert_eq!(img.pkg_id(), "pkg:oci/name?repository_url=repo%2Fname");
    }

    #[test]
    fn test_merge_fills_missing_digest_only() {
        let mut first = image("docker.io/library/nginx", "1.17.1", "");
        first.namespace = "default".to_string();

        let mut later = image("docker.io/library/nginx", "1.17.1", "sha256:01");
        later.namespace = "kube-system".to_string();
        later.control_plane = true;

        first.merge(later);
        assert_eq!(first.digest, "sha256:01");
        assert_eq!(first.namespace, "default");
        assert!(!first.control_plane);

        first.merge(image("docker.io/library/nginx", "1.17.1", "sha256:02"));
        assert_eq!(first.digest, "sha256:01");

        first.merge(image("docker.io/library/nginx", "1.17.1", ""));
        assert_eq!(first.digest, "sha256:01");
    }

    #[test]
    fn test_cluster_bom_ref() {
        let cluster = Cluster {
            name: "test".to_string(),
            ca_cert_digest: String::new(),
            k8s_version: "1.25.1".to_string(),
            location: None,
            nodes_count: 0,
            nodes: vec![],
            components: Components::default(),
        };
        assert_eq!(cluster.bom_ref(), "pkg:k8s/k8s.io%2Fkubernetes@1.25.1");
        assert_eq!(cluster.bom_name(), "k8s.io/kubernetes");
    }

    #[test]
    fn test_location_known() {
        let mut location = Location {
            name: "aws".to_string(),
            region: String::new(),
            zone: String::new(),
        };
        assert!(location.is_known());
        location.name = UNKNOWN_LOCATION.to_string();
        assert!(!location.is_known());
    }

    #[test]
    fn test_capacity_quantities_kept_verbatim() {
        let capacity = Capacity {
            cpu: "1930m".to_string(),
            memory: "1483088Ki".to_string(),
            pods: "11".to_string(),
            ephemeral_storage: "482098735124".to_string(),
        };
        let json = serde_json::to_value(&capacity).unwrap();
        assert_eq!(json["cpu"], "1930m");
        assert_eq!(json["memory"], "1483088Ki");
        assert_eq!(json["ephemeral_storage"], "482098735124");
    }

    #[test]
    fn test_control_plane_flag_not_serialized() {
        let mut img = image("docker.io/library/nginx", "1.17.1", "");
        img.control_plane = true;
        let json = serde_json::to_value(&img).unwrap();
        assert!(json.get("control_plane").is_none());
    }
}
