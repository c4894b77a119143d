//! Container image reference resolution
//!
//! Normalizes image references the way container runtimes do
//! (`nginx:1.17` is `docker.io/library/nginx:1.17`) and recovers digests
//! from pod runtime status when the declared reference has none.

use crate::error::{KbomError, Result};
use crate::models::{Image, CONTROL_PLANE_NAMESPACE};
use k8s_openapi::api::core::v1::ContainerStatus;
use regex::Regex;
use std::sync::OnceLock;

const DEFAULT_DOMAIN: &str = "docker.io";
const LEGACY_DEFAULT_DOMAIN: &str = "index.docker.io";
const OFFICIAL_REPO_PREFIX: &str = "library";
const LOCALHOST: &str = "localhost";
const MAX_NAME_LENGTH: usize = 255;

static REFERENCE_RE: OnceLock<Regex> = OnceLock::new();
static IDENTIFIER_RE: OnceLock<Regex> = OnceLock::new();

fn reference_regex() -> &'static Regex {
    REFERENCE_RE.get_or_init(|| {
        let domain_component = r"(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])";
        let domain = format!(
            r"(?:{dc}(?:\.{dc})*|\[[a-fA-F0-9:]+\])(?::[0-9]+)?",
            dc = domain_component
        );
        let path_component = r"[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*";
        let tag = r"[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}";
        let digest = r"[A-Za-z][A-Za-z0-9]*(?:[-_+.][A-Za-z][A-Za-z0-9]*)*:[0-9a-fA-F]{32,}";
        let pattern = format!(
            r"^((?:{domain}/)?{pc}(?:/{pc})*)(?::({tag}))?(?:@({digest}))?$",
            domain = domain,
            pc = path_component,
            tag = tag,
            digest = digest
        );
        Regex::new(&pattern).expect("image reference pattern is valid")
    })
}

fn identifier_regex() -> &'static Regex {
    IDENTIFIER_RE.get_or_init(|| Regex::new(r"^[a-f0-9]{64}$").expect("identifier pattern is valid"))
}

/// A parsed, normalized image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Fully qualified repository, e.g. `docker.io/library/nginx`
    pub name: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl ImageReference {
    /// Parse and normalize a reference such as `nginx:1.17.1` or
    /// `gcr.io/project/app@sha256:...`
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| KbomError::InvalidReference {
            reference: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("reference is empty"));
        }
        if identifier_regex().is_match(raw) {
            return Err(invalid("cannot specify 64-byte hexadecimal strings"));
        }

        let (domain, remainder) = split_domain(raw);
        let remote_name = remainder.split([':', '@']).next().unwrap_or_default();
        if remote_name.to_lowercase() != remote_name {
            return Err(invalid("repository name must be lowercase"));
        }

        let normalized = format!("{}/{}", domain, remainder);
        let captures = reference_regex()
            .captures(&normalized)
            .ok_or_else(|| invalid("invalid reference format"))?;

        let name = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        if name.len() > MAX_NAME_LENGTH {
            return Err(invalid("repository name must not be more than 255 characters"));
        }

        Ok(Self {
            name: name.to_string(),
            tag: captures.get(2).map(|m| m.as_str().to_string()),
            digest: captures.get(3).map(|m| m.as_str().to_string()),
        })
    }
}

/// Split a reference into registry domain and the rest, applying the
/// Docker Hub defaults.
fn split_domain(raw: &str) -> (String, String) {
    let (mut domain, mut remainder) = match raw.split_once('/') {
        Some((first, rest))
            if first.contains(['.', ':'])
                || first == LOCALHOST
                || first.to_lowercase() != first =>
        {
            (first.to_string(), rest.to_string())
        }
        _ => (DEFAULT_DOMAIN.to_string(), raw.to_string()),
    };

    if domain == LEGACY_DEFAULT_DOMAIN {
        domain = DEFAULT_DOMAIN.to_string();
    }
    if domain == DEFAULT_DOMAIN && !remainder.contains('/') {
        remainder = format!("{}/{}", OFFICIAL_REPO_PREFIX, remainder);
    }

    (domain, remainder)
}

/// Find the digest the runtime actually pulled for a container.
///
/// Only the first status with a matching name is consulted, and only when
/// that container is running or terminated; a waiting container may report
/// a stale image ID.
pub fn digest_from_statuses(container_name: &str, statuses: &[ContainerStatus]) -> Option<String> {
    let status = statuses.iter().find(|s| s.name == container_name)?;

    let settled = status
        .state
        .as_ref()
        .map(|state| state.running.is_some() || state.terminated.is_some())
        .unwrap_or(false);
    if !settled {
        return None;
    }

    let image_id = status.image_id.as_str();
    if let Some(digest) = image_id.split('@').nth(1) {
        Some(digest.to_string())
    } else if image_id.starts_with("sha256:") {
        Some(image_id.to_string())
    } else {
        None
    }
}

/// Resolve one declared container image into an [`Image`] record
pub fn resolve_image(
    raw: &str,
    container_name: &str,
    statuses: &[ContainerStatus],
    namespace: &str,
) -> Result<Image> {
    let reference = ImageReference::parse(raw)?;

    let digest = match reference.digest {
        Some(digest) => digest,
        None => digest_from_statuses(container_name, statuses).unwrap_or_default(),
    };

    Ok(Image {
        full_name: raw.to_string(),
        name: reference.name,
        version: reference.tag.unwrap_or_default(),
        digest,
        namespace: namespace.to_string(),
        control_plane: namespace == CONTROL_PLANE_NAMESPACE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{
        ContainerState, ContainerStateRunning, ContainerStateTerminated, ContainerStateWaiting,
    };

    const DIGEST: &str = "sha256:0000000000000000000000000000000000000000000000000000000000000001";

    fn status(name: &str, image_id: &str, state: ContainerState) -> ContainerStatus {
        ContainerStatus {
            name: name.to_string(),
            image_id: image_id.to_string(),
            state: Some(state),
            ..Default::default()
        }
    }

    fn running() -> ContainerState {
        ContainerState {
            running: Some(ContainerStateRunning::default()),
            ..Default::default()
        }
    }

    fn terminated() -> ContainerState {
        ContainerState {
            terminated: Some(ContainerStateTerminated::default()),
            ..Default::default()
        }
    }

    fn waiting() -> ContainerState {
        ContainerState {
            waiting: Some(ContainerStateWaiting::default()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_official_image() {
        let r = ImageReference::parse("nginx:1.17.1").unwrap();
        assert_eq!(r.name, "docker.io/library/nginx");
        assert_eq!(r.tag.as_deref(), Some("1.17.1"));
        assert_eq!(r.digest, None);
    }

    #[test]
    fn test_parse_user_repository() {
        let r = ImageReference::parse("bitnami/redis").unwrap();
        assert_eq!(r.name, "docker.io/bitnami/redis");
        assert_eq!(r.tag, None);
    }

    #[test]
    fn test_parse_legacy_docker_domain() {
        let r = ImageReference::parse("index.docker.io/nginx:latest").unwrap();
        assert_eq!(r.name, "docker.io/library/nginx");
    }

    #[test]
    fn test_parse_registry_with_port_and_digest() {
        let raw = format!("localhost:5000/team/app:v2@{}", DIGEST);
        let r = ImageReference::parse(&raw).unwrap();
        assert_eq!(r.name, "localhost:5000/team/app");
        assert_eq!(r.tag.as_deref(), Some("v2"));
        assert_eq!(r.digest.as_deref(), Some(DIGEST));
    }

    #[test]
    fn test_parse_private_registry() {
        let r = ImageReference::parse("registry.k8s.io/kube-proxy:v1.28.2").unwrap();
        assert_eq!(r.name, "registry.k8s.io/kube-proxy");
        assert_eq!(r.tag.as_deref(), Some("v1.28.2"));
    }

    #[test]
    fn test_parse_rejects_bad_references() {
        assert!(matches!(
            ImageReference::parse(""),
            Err(KbomError::InvalidReference { .. })
        ));
        assert!(ImageReference::parse("Nginx:1.0").is_err());
        assert!(ImageReference::parse("nginx:").is_err());
        assert!(ImageReference::parse("nginx@sha256:short").is_err());
        assert!(ImageReference::parse(&"f".repeat(64)).is_err());
    }

    #[test]
    fn test_digest_from_running_container() {
        let statuses = vec![status(
            "web",
            &format!("docker.io/library/nginx@{}", DIGEST),
            running(),
        )];
        assert_eq!(digest_from_statuses("web", &statuses).as_deref(), Some(DIGEST));
    }

    #[test]
    fn test_digest_from_terminated_container_bare_id() {
        let statuses = vec![status("job", DIGEST, terminated())];
        assert_eq!(digest_from_statuses("job", &statuses).as_deref(), Some(DIGEST));
    }

    #[test]
    fn test_waiting_container_never_contributes_digest() {
        let statuses = vec![status("web", &format!("nginx@{}", DIGEST), waiting())];
        assert_eq!(digest_from_statuses("web", &statuses), None);
    }

    #[test]
    fn test_unmatched_or_unrecognized_image_id() {
        let statuses = vec![
            status("other", DIGEST, running()),
            status("web", "docker://1234", running()),
        ];
        assert_eq!(digest_from_statuses("web", &statuses), None);
        assert_eq!(digest_from_statuses("missing", &statuses), None);
    }

    #[test]
    fn test_resolve_image_fills_digest_and_control_plane() {
        let statuses = vec![status("coredns", &format!("coredns@{}", DIGEST), running())];
        let img = resolve_image(
            "registry.k8s.io/coredns/coredns:v1.10.1",
            "coredns",
            &statuses,
            "kube-system",
        )
        .unwrap();

        assert_eq!(img.full_name, "registry.k8s.io/coredns/coredns:v1.10.1");
        assert_eq!(img.name, "registry.k8s.io/coredns/coredns");
        assert_eq!(img.version, "v1.10.1");
        assert_eq!(img.digest, DIGEST);
        assert_eq!(img.namespace, "kube-system");
        assert!(img.control_plane);
    }

    #[test]
    fn test_resolve_image_keeps_declared_digest() {
        let declared = format!("nginx@{}", DIGEST);
        let statuses = vec![status("web", "sha256:ffff", running())];
        let img = resolve_image(&declared, "web", &statuses, "default").unwrap();
        assert_eq!(img.digest, DIGEST);
        assert!(!img.control_plane);
    }

    #[test]
    fn test_resolve_image_without_digest_source() {
        let img = resolve_image("nginx:1.17.1", "web", &[], "default").unwrap();
        assert_eq!(img.digest, "");
    }
}
