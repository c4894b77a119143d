//! Generic resource catalog

use super::{Collector, Mode};
use crate::error::{KbomError, Result};
use crate::models::{AdditionalProperties, Resource, ResourceList};
use crate::source::ApiResourceKind;
use futures::stream::{self, StreamExt};
use kube::api::DynamicObject;
use std::collections::BTreeMap;
use tracing::debug;

impl Collector {
    /// One [`ResourceList`] per group/version/resource with at least one instance.
    ///
    /// Kinds are listed concurrently but merged in sorted order, and a kind
    /// that cannot be listed is logged and left out.
    pub(super) async fn resources(&self) -> Result<BTreeMap<String, ResourceList>> {
        let mut kinds: Vec<ApiResourceKind> = self
            .bounded(
                "list resource kinds",
                self.source.list_preferred_resource_kinds(),
            )
            .await?
            .map_err(|e| super::query_error("list resource kinds", e))?
            .into_iter()
            .filter(|kind| self.config.filters.allows_kind(&kind.kind))
            .filter(|kind| kind.namespaced || !self.config.filters.filters_namespaces())
            .collect();
        kinds.sort();

        let listed: Vec<(ApiResourceKind, Result<Vec<DynamicObject>>)> = stream::iter(kinds)
            .map(|kind| async move {
                let objects = self.list_kind(&kind).await;
                (kind, objects)
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut catalog = BTreeMap::new();
        for (kind, objects) in listed {
            let objects = match objects {
                Ok(objects) => objects,
                Err(e) if e.is_recoverable() => {
                    self.logger.log_listing_skipped(&e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            debug!(gvr = %kind.gvr_key(), count = objects.len(), "Found resources");
            if objects.is_empty() {
                continue;
            }
            catalog.insert(kind.gvr_key(), resource_list(&kind, &objects, self.config.mode));
        }

        Ok(catalog)
    }

    /// List one kind, once per allowed namespace when namespaces are filtered
    async fn list_kind(&self, kind: &ApiResourceKind) -> Result<Vec<DynamicObject>> {
        let listing_failed = |reason: String| KbomError::ResourceListingFailed {
            gvr: kind.gvr_key(),
            reason,
        };

        if !self.config.filters.filters_namespaces() {
            return self
                .bounded("list resources", self.source.list_resources(kind, None))
                .await
                .map_err(|e| listing_failed(e.to_string()))?
                .map_err(|e| listing_failed(format!("{:#}", e)));
        }

        let mut objects = Vec::new();
        for namespace in &self.config.filters.namespaces {
            let listed = self
                .bounded(
                    "list resources",
                    self.source.list_resources(kind, Some(namespace.as_str())),
                )
                .await;

            match listed {
                Ok(Ok(mut items)) => objects.append(&mut items),
                Ok(Err(e)) => self.logger.log_listing_skipped(&listing_failed(format!(
                    "namespace {}: {:#}",
                    namespace, e
                ))),
                Err(e) => self
                    .logger
                    .log_listing_skipped(&listing_failed(format!("namespace {}: {}", namespace, e))),
            }
        }

        Ok(objects)
    }
}

fn resource_list(kind: &ApiResourceKind, objects: &[DynamicObject], mode: Mode) -> ResourceList {
    let resources = match mode {
        Mode::Full => objects.iter().map(resource_from_object).collect(),
        Mode::Short => Vec::new(),
    };

    ResourceList {
        kind: kind.kind.clone(),
        api_version: kind.api_version(),
        namespaced: kind.namespaced,
        resources_count: objects.len(),
        resources,
    }
}

fn resource_from_object(object: &DynamicObject) -> Resource {
    let version = object
        .data
        .get("spec")
        .and_then(|spec| spec.get("version"))
        .and_then(|version| version.as_str())
        .filter(|version| !version.is_empty());

    Resource {
        name: object.metadata.name.clone().unwrap_or_default(),
        namespace: object.metadata.namespace.clone().unwrap_or_default(),
        additional_properties: version.map(|version| AdditionalProperties {
            version: version.to_string(),
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fixture;
    use serde_json::json;

    #[test]
    fn test_full_mode_records_members() {
        let deployments = fixture::kind("apps", "v1", "deployments", "Deployment", true);
        let objects = vec![
            fixture::object(&deployments, "api", Some("backend")),
            fixture::object(&deployments, "web", Some("frontend")),
        ];

        let list = resource_list(&deployments, &objects, Mode::Full);
        assert_eq!(list.kind, "Deployment");
        assert_eq!(list.api_version, "apps/v1");
        assert!(list.namespaced);
        assert_eq!(list.resources_count, 2);
        assert_eq!(list.resources[0].name, "api");
        assert_eq!(list.resources[0].namespace, "backend");
        assert!(list.resources[0].additional_properties.is_none());
    }

    #[test]
    fn test_short_mode_keeps_count_only() {
        let namespaces = fixture::kind("", "v1", "namespaces", "Namespace", false);
        let objects = vec![fixture::object(&namespaces, "backend", None)];

        let list = resource_list(&namespaces, &objects, Mode::Short);
        assert_eq!(list.api_version, "v1");
        assert_eq!(list.resources_count, 1);
        assert!(list.resources.is_empty());
    }

    #[test]
    fn test_spec_version_captured() {
        let clusters = fixture::kind("postgresql.cnpg.io", "v1", "clusters", "Cluster", true);
        let object = fixture::object(&clusters, "db", Some("data"))
            .data(json!({ "spec": { "version": "15.4" } }));

        let resource = resource_from_object(&object);
        assert_eq!(
            resource.additional_properties,
            Some(AdditionalProperties {
                version: "15.4".to_string()
            })
        );
    }

    #[test]
    fn test_non_string_spec_version_ignored() {
        let kind = fixture::kind("example.io", "v1", "widgets", "Widget", true);
        let object = fixture::object(&kind, "w", Some("default")).data(json!({ "spec": { "version": 3 } }));
        assert!(resource_from_object(&object).additional_properties.is_none());
    }
}
