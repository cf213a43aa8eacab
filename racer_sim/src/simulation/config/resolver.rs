// racer_sim/src/simulation/config/resolver.rs

//! Prefab composition. A table with a `from = "<catalog key>"` entry is
//! replaced by that prefab, with the table's other keys deep-merged on top.

use super::catalog::PrefabCatalog;
use figment::value::{Dict, Tag, Value};

/// Prefabs referring to prefabs referring to ... this deep is a cycle.
const MAX_DEPTH: usize = 32;

pub fn resolve_agent_value(agent_value: &Value, catalog: &PrefabCatalog) -> Result<Value, String> {
    resolve_value(agent_value, catalog, 0)
}

/// Merges `overrides` into `base`. Nested tables merge key by key; anything
/// else replaces. An override that is itself a `from` reference replaces the
/// whole base entry.
fn deep_merge(base: &mut Dict, overrides: &Dict) {
    for (key, override_val) in overrides {
        if key == "from" {
            continue;
        }

        let is_reference = override_val
            .as_dict()
            .is_some_and(|d| d.contains_key("from"));
        if !is_reference {
            if let (Some(Value::Dict(_, base_sub)), Some(override_sub)) =
                (base.get_mut(key), override_val.as_dict())
            {
                deep_merge(base_sub, override_sub);
                continue;
            }
        }
        base.insert(key.clone(), override_val.clone());
    }
}

fn resolve_value(value: &Value, catalog: &PrefabCatalog, depth: usize) -> Result<Value, String> {
    if depth > MAX_DEPTH {
        return Err(format!(
            "prefab references nest deeper than {MAX_DEPTH}; is there a cycle?"
        ));
    }

    // Resolve this node first, then its children.
    let node = match value.as_dict() {
        Some(dict) => match dict.get("from") {
            Some(from) => {
                let key = from
                    .as_str()
                    .ok_or_else(|| format!("'from' must be a catalog key string, got {from:?}"))?;
                let prefab = catalog
                    .0
                    .get(key)
                    .ok_or_else(|| format!("Prefab '{key}' not found in catalog"))?;

                let mut merged = resolve_value(prefab, catalog, depth + 1)?
                    .into_dict()
                    .ok_or_else(|| format!("Prefab '{key}' must be a table to be merged"))?;
                deep_merge(&mut merged, dict);
                Value::Dict(Tag::Default, merged)
            }
            None => value.clone(),
        },
        None => value.clone(),
    };

    match node {
        Value::Dict(tag, dict) => {
            let mut resolved = Dict::new();
            for (key, val) in &dict {
                resolved.insert(key.clone(), resolve_value(val, catalog, depth + 1)?);
            }
            Ok(Value::Dict(tag, resolved))
        }
        Value::Array(tag, items) => {
            let resolved = items
                .iter()
                .map(|item| resolve_value(item, catalog, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(tag, resolved))
        }
        leaf => Ok(leaf),
    }
}
