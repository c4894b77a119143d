//! Container image inventory

use super::{query_error, Collector};
use crate::error::Result;
use crate::image::resolve_image;
use crate::models::Image;
use k8s_openapi::api::core::v1::{ContainerStatus, Pod};
use std::collections::BTreeMap;
use tracing::debug;

impl Collector {
    /// Every distinct image running in the allowed namespaces, sorted by name
    pub(super) async fn images(&self) -> Result<Vec<Image>> {
        let namespaces = self
            .bounded("list namespaces", self.source.list_namespaces())
            .await?
            .map_err(|e| query_error("list namespaces", e))?;

        let mut images = ImageSet::default();
        for namespace in namespaces {
            if !self.config.filters.allows_namespace(&namespace) {
                continue;
            }

            let pods = self
                .bounded("list pods", self.source.list_pods(&namespace))
                .await?
                .map_err(|e| query_error("list pods", e))?;

            debug!(namespace = %namespace, count = pods.len(), "Found pods in namespace");

            for pod in &pods {
                for image in pod_images(pod, &namespace)? {
                    images.insert(image);
                }
            }
        }

        Ok(images.into_sorted())
    }
}

/// Images keyed by normalized name
#[derive(Debug, Default)]
pub(super) struct ImageSet {
    by_name: BTreeMap<String, Image>,
}

impl ImageSet {
    pub(super) fn insert(&mut self, image: Image) {
        match self.by_name.get_mut(&image.name) {
            Some(existing) => existing.merge(image),
            None => {
                self.by_name.insert(image.name.clone(), image);
            }
        }
    }

    pub(super) fn into_sorted(self) -> Vec<Image> {
        self.by_name.into_values().collect()
    }
}

/// Resolve the init, regular and ephemeral containers of a pod
fn pod_images(pod: &Pod, namespace: &str) -> Result<Vec<Image>> {
    let Some(spec) = pod.spec.as_ref() else {
        return Ok(Vec::new());
    };
    let status = pod.status.as_ref();

    let init: Vec<_> = spec
        .init_containers
        .iter()
        .flatten()
        .map(|c| (c.name.as_str(), c.image.as_deref()))
        .collect();
    let regular: Vec<_> = spec
        .containers
        .iter()
        .map(|c| (c.name.as_str(), c.image.as_deref()))
        .collect();
    let ephemeral: Vec<_> = spec
        .ephemeral_containers
        .iter()
        .flatten()
        .map(|c| (c.name.as_str(), c.image.as_deref()))
        .collect();

    let groups = [
        (init, or_empty(status.and_then(|s| s.init_container_statuses.as_ref()))),
        (regular, or_empty(status.and_then(|s| s.container_statuses.as_ref()))),
        (ephemeral, or_empty(status.and_then(|s| s.ephemeral_container_statuses.as_ref()))),
    ];

    let mut images = Vec::new();
    for (containers, statuses) in groups {
        for (name, image) in containers {
            images.push(resolve_image(
                image.unwrap_or_default(),
                name,
                statuses,
                namespace,
            )?);
        }
    }

    Ok(images)
}

fn or_empty(statuses: Option<&Vec<ContainerStatus>>) -> &[ContainerStatus] {
    statuses.map(Vec::as_slice).unwrap_or_default()
}
