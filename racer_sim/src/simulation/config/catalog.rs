// racer_sim/src/simulation/config/catalog.rs

//! The `PrefabCatalog` resource: every TOML file under `assets/catalog`,
//! keyed by its dotted relative path.

use bevy::prelude::*;
use figment::{
    providers::{Format, Toml},
    value::Value,
    Figment,
};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Raw prefab data keyed by namespace, e.g. `"cars.nfs3_diablo"` for
/// `assets/catalog/cars/nfs3_diablo.toml`.
#[derive(Resource, Default, Debug)]
pub struct PrefabCatalog(pub HashMap<String, Value>);

/// Where the catalog lives. Overridable so tests and tools can point
/// elsewhere.
#[derive(Resource, Debug, Clone)]
pub struct CatalogRoot(pub PathBuf);

impl Default for CatalogRoot {
    fn default() -> Self {
        Self(PathBuf::from("assets/catalog"))
    }
}

/// `cars/nfs3_diablo.toml` under `root` becomes `cars.nfs3_diablo`.
fn catalog_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    (!parts.is_empty()).then(|| parts.join("."))
}

/// Parses every `.toml` file below `root`. Unreadable entries are logged and
/// skipped.
pub fn read_catalog(root: &Path) -> HashMap<String, Value> {
    let mut entries = HashMap::new();
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "toml"))
    {
        let path = entry.path();
        let Some(key) = catalog_key(root, path) else {
            continue;
        };

        match Figment::new().merge(Toml::file(path)).extract::<Value>() {
            Ok(data) => {
                debug!("Loaded catalog item '{}'", key);
                entries.insert(key, data);
            }
            Err(e) => {
                error!("Failed to load catalog item from {:?}: {}", path, e);
            }
        }
    }
    entries
}

pub fn load_catalog_from_disk(root: Res<CatalogRoot>, mut catalog: ResMut<PrefabCatalog>) {
    if !root.0.exists() {
        warn!(
            "Catalog directory not found at {:?}, no prefabs will be loaded.",
            root.0
        );
        return;
    }

    catalog.0 = read_catalog(&root.0);
    info!("Loaded {} prefabs from {:?}", catalog.0.len(), root.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_the_directory_layout() {
        let root = Path::new("assets/catalog");
        assert_eq!(
            catalog_key(root, &root.join("cars").join("nfs4_clk.toml")).as_deref(),
            Some("cars.nfs4_clk")
        );
        assert_eq!(
            catalog_key(root, &root.join("tuning.toml")).as_deref(),
            Some("tuning")
        );
        assert_eq!(catalog_key(root, Path::new("elsewhere/x.toml")), None);
    }

    #[test]
    fn bundled_catalog_loads() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/catalog");
        let catalog = read_catalog(&root);
        assert!(catalog.contains_key("cars.nfs3_diablo"));
        assert!(catalog.contains_key("cars.nfs4_clk"));
    }
}
