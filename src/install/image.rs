// SPDX-License-Identifier: MPL-2.0

//! Image and container naming.
//!
//! Catalog entries historically pointed at Docker Hub pages instead of image
//! names, so the derivation below has to keep accepting those URLs:
//!
//! ```text
//! https://hub.docker.com/_/hello-world             → hello-world
//! https://hub.docker.com/r/example/lane-keep-assist → lane-keep-assist
//! bare-name                                        → bare-name
//! ```

/// Prefix for every container this application creates.
pub const CONTAINER_PREFIX: &str = "adas-";

/// Docker Hub path segments that precede the image name.
const HUB_MARKERS: [&str; 2] = ["/_/", "/r/"];

/// Extract an image name from a bare name or a Docker Hub URL.
pub fn derive_image_name(reference: &str) -> String {
    let reference = reference.trim();

    let tail = HUB_MARKERS
        .iter()
        .find_map(|marker| reference.rsplit_once(marker).map(|(_, tail)| tail))
        .unwrap_or(reference);

    tail.trim_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Namespaced container name for an image.
///
/// Path, tag and digest separators (and anything else a container name may not
/// contain) become `-`, so the same image always maps to the same container.
pub fn derive_container_name(image_name: &str) -> String {
    let safe: String = image_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("{}{}", CONTAINER_PREFIX, safe)
}

/// One user-initiated install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Location reference as found in the catalog
    pub image_ref: String,
    /// Local image name used for lookup and pull
    pub image_name: String,
    /// Name of the container kept running for this image
    pub container_name: String,
}

impl InstallRequest {
    pub fn new(image_ref: &str) -> Self {
        let image_name = derive_image_name(image_ref);
        let container_name = derive_container_name(&image_name);
        Self {
            image_ref: image_ref.to_string(),
            image_name,
            container_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docker_hub_urls() {
        assert_eq!(derive_image_name("https://hub.docker.com/_/hello-world"), "hello-world");
        assert_eq!(
            derive_image_name("https://hub.docker.com/r/example/lane-keep-assist"),
            "lane-keep-assist"
        );
        assert_eq!(derive_image_name("https://hub.docker.com/_/hello-world/"), "hello-world");
    }

    #[test]
    fn test_bare_and_other_references() {
        assert_eq!(derive_image_name("bare-name"), "bare-name");
        assert_eq!(derive_image_name("  nginx:1.25  "), "nginx:1.25");
        assert_eq!(derive_image_name("quay.io/podman/hello/"), "hello");
        assert_eq!(derive_image_name(""), "");
    }

    #[test]
    fn test_container_names() {
        assert_eq!(derive_container_name("hello-world"), "adas-hello-world");
        assert_eq!(derive_container_name("library/nginx:1.25"), "adas-library-nginx-1.25");
        assert_eq!(derive_container_name("img@sha256:abc"), "adas-img-sha256-abc");
    }

    #[test]
    fn test_request_is_stable() {
        let a = InstallRequest::new("https://hub.docker.com/_/hello-world");
        let b = InstallRequest::new("hello-world");
        assert_eq!(a.image_name, b.image_name);
        assert_eq!(a.container_name, "adas-hello-world");
        assert_eq!(a.container_name, b.container_name);
    }
}
