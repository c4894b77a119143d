//! Cluster data sources
//!
//! The collector only ever talks to a cluster through [`ClusterSource`].
//! [`KubeSource`] is the production implementation backed by the `kube`
//! client; [`FixtureCluster`] serves canned objects for tests.

pub mod fixture;
mod kubernetes;

pub use kubernetes::KubeSource;
pub use fixture::{FixtureCluster, FixtureOperation};

use kube::api::{ApiResource, DynamicObject};
use anyhow::Result;
use k8s_openapi::api::core::v1::{Node, Pod};

pub use async_trait::async_trait;

/// One preferred, listable API resource kind as reported by discovery
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ApiResourceKind {
    /// API group, empty for the core group
    pub group: String,
    pub version: String,
    /// Plural resource name, e.g. `deployments`
    pub resource: String,
    pub kind: String,
    pub namespaced: bool,
}

impl ApiResourceKind {
    /// `group/version`, or just `version` for the core group
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Catalog key, e.g. `apps/v1, Resource=deployments` or `/v1, Resource=namespaces`
    pub fn gvr_key(&self) -> String {
        format!("{}/{}, Resource={}", self.group, self.version, self.resource)
    }
}

impl From<&ApiResourceKind> for ApiResource {
    fn from(kind: &ApiResourceKind) -> Self {
        ApiResource {
            group: kind.group.clone(),
            version: kind.version.clone(),
            api_version: kind.api_version(),
            kind: kind.kind.clone(),
            plural: kind.resource.clone(),
        }
    }
}

/// Read-only view of a cluster
#[async_trait]
pub trait ClusterSource: Send + Sync {
    /// Display name of the cluster
    fn cluster_name(&self) -> String;

    /// Raw server git version, e.g. `v1.25.1+build`
    async fn server_version(&self) -> Result<String>;

    /// Root CA certificate data, if any can be found
    async fn ca_data(&self) -> Result<Option<Vec<u8>>>;

    /// List nodes, at most `limit` when given
    async fn list_nodes(&self, limit: Option<u32>) -> Result<Vec<Node>>;

    async fn list_namespaces(&self) -> Result<Vec<String>>;

    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>>;

    /// Every preferred resource kind that supports `list`
    async fn list_preferred_resource_kinds(&self) -> Result<Vec<ApiResourceKind>>;

    /// List instances of a kind, cluster-wide when `namespace` is `None`
    async fn list_resources(
        &self,
        kind: &ApiResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<DynamicObject>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(group: &str, version: &str, resource: &str) -> ApiResourceKind {
        ApiResourceKind {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
            kind: "Kind".to_string(),
            namespaced: true,
        }
    }

    #[test]
    fn test_core_group_key() {
        let namespaces = kind("", "v1", "namespaces");
        assert_eq!(namespaces.gvr_key(), "/v1, Resource=namespaces");
        assert_eq!(namespaces.api_version(), "v1");
    }

    #[test]
    fn test_named_group_key() {
        let deployments = kind("apps", "v1", "deployments");
        assert_eq!(deployments.gvr_key(), "apps/v1, Resource=deployments");
        assert_eq!(deployments.api_version(), "apps/v1");
    }

    #[test]
    fn test_into_api_resource() {
        let ar = ApiResource::from(&kind("apps", "v1", "deployments"));
        assert_eq!(ar.plural, "deployments");
        assert_eq!(ar.api_version, "apps/v1");
    }
}
