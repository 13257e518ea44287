//! Host address resolution.
//!
//! Without an explicit host the local machine name is used. Under WSL the
//! bare machine name does not resolve on the virtual network, so `.local`
//! is appended there.

use tracing::debug;

const WSL_MARKER: &str = "microsoft";
const OS_RELEASE_PATHS: [&str; 2] = ["/proc/sys/kernel/osrelease", "/proc/version"];

pub fn resolve_host(explicit: Option<&str>) -> String {
    if let Some(host) = explicit {
        return host.to_string();
    }
    let node = local_node_name();
    let wsl = running_under_wsl();
    debug!("resolving host from node name {node:?} (wsl: {wsl})");
    host_for_node(&node, wsl)
}

pub fn host_for_node(node: &str, wsl: bool) -> String {
    if wsl {
        format!("{node}.local")
    } else {
        node.to_string()
    }
}

pub fn websocket_url(host: &str, port: u16) -> String {
    format!("ws://{host}:{port}")
}

fn local_node_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

pub fn running_under_wsl() -> bool {
    if !cfg!(target_os = "linux") {
        return false;
    }
    OS_RELEASE_PATHS.iter().any(|path| {
        std::fs::read_to_string(path)
            .map(|text| is_wsl_kernel(&text))
            .unwrap_or(false)
    })
}

/// WSL kernels identify themselves with "microsoft" in the release string.
pub fn is_wsl_kernel(release: &str) -> bool {
    release.to_lowercase().contains(WSL_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_host_wins() {
        assert_eq!(resolve_host(Some("10.0.0.5")), "10.0.0.5");
    }

    #[test]
    fn wsl_appends_local_suffix() {
        assert_eq!(host_for_node("DESKTOP-42", true), "DESKTOP-42.local");
        assert_eq!(host_for_node("DESKTOP-42", false), "DESKTOP-42");
    }

    #[test]
    fn detects_wsl_kernel_release() {
        assert!(is_wsl_kernel("5.15.153.1-microsoft-standard-WSL2"));
        assert!(is_wsl_kernel("4.4.0-19041-Microsoft"));
        assert!(!is_wsl_kernel("6.8.0-45-generic"));
    }

    #[test]
    fn url_has_ws_scheme() {
        assert_eq!(websocket_url("localhost", 8001), "ws://localhost:8001");
    }
}
