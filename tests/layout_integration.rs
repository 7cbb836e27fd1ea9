//! ---
//! mtr_section: "15-testing-qa-runbook"
//! mtr_subsection: "integration-tests"
//! mtr_type: "source"
//! mtr_scope: "code"
//! mtr_description: "Integration and validation tests for the MTR stack."
//! mtr_version: "v0.0.0-prealpha"
//! mtr_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use mtr_common::AppConfig;
use mtr_core::{DirectoryTenantDiscovery, TenantDiscovery};
use walkdir::WalkDir;

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..")
}

fn read(path: &str) -> String {
    let full = workspace_root().join(path);
    fs::read_to_string(&full)
        .unwrap_or_else(|err| panic!("failed to read {}: {}", full.display(), err))
}

#[test]
fn rust_sources_carry_frontmatter() {
    for dir in ["crates", "bin", "tests"] {
        let root = workspace_root().join(dir);
        for entry in WalkDir::new(&root)
            .into_iter()
            .filter_entry(|entry| entry.file_name() != "target")
        {
            let entry = entry.expect("walk workspace");
            if entry.path().extension().and_then(|ext| ext.to_str()) != Some("rs") {
                continue;
            }
            let content = fs::read_to_string(entry.path()).expect("read source");
            assert!(
                content.starts_with("//! ---"),
                "{} must include frontmatter header",
                entry.path().display()
            );
            assert!(
                content.contains("mtr_section:"),
                "{} must declare its section",
                entry.path().display()
            );
        }
    }
}

#[test]
fn example_config_parses_and_points_at_shipped_tenants() {
    let config: AppConfig = read("configs/example.toml")
        .parse()
        .expect("example config parses");
    assert!(config.tenants.static_tenants.is_empty());
    assert_eq!(config.tenants.root, Path::new("configs/tenants"));
}

#[tokio::test]
async fn shipped_tenant_directories_are_discoverable() {
    let discovery = DirectoryTenantDiscovery::new(workspace_root().join("configs/tenants"));
    let tenants = discovery
        .discover_tenant_configurations()
        .await
        .expect("discover shipped tenants");
    let ids: Vec<_> = tenants.iter().map(|t| t.tenant_id.as_str()).collect();
    assert_eq!(ids, vec!["acme", "globex"]);
    assert!(tenants.iter().all(|t| t.config_root.is_some()));
}
