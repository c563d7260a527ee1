//! Opt-in application of proposed patches to a spec artifact.
//!
//! The convergence loop never calls this; patches stay inert data on the
//! blackboard until a caller decides to apply one. Application is pure: the
//! input artifact is untouched and a new value is returned, ready to be
//! deposited with `ArtifactStore::put_spec`.
//!
//! Supported paths:
//!
//! | path                               | add | modify | delete |
//! |------------------------------------|-----|--------|--------|
//! | `components/<name>`                | yes | yes    | yes    |
//! | `components/<name>/<field>`        | yes | yes    | yes    |
//! | `components/<name>/props/<key>`    | yes | yes    | yes    |
//! | `data_sources/<source>`            | yes | no     | yes    |

use serde_json::{Map, Value};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ConflictPatch, PatchOperation, SpecArtifact, SpecComponent};

/// Fields of a component a patch may address directly.
const COMPONENT_FIELDS: &[&str] = &["kind", "data_binding", "interactive", "children", "label"];

/// Apply one spec-targeted patch and return the patched artifact.
pub fn apply_spec_patch(spec: &SpecArtifact, patch: &ConflictPatch) -> DomainResult<SpecArtifact> {
    if !patch.target.routes_to_design() {
        return Err(invalid(patch, "patch does not target the spec"));
    }

    let segments: Vec<&str> = patch.path.split('/').collect();
    let mut patched = spec.clone();

    match segments.as_slice() {
        ["components", name] => patch_component(&mut patched, name, patch)?,
        ["components", name, field] => {
            let component = find_component(&mut patched, name, patch)?;
            patch_field(component, field, patch)?;
        }
        ["components", name, "props", key] => {
            let component = find_component(&mut patched, name, patch)?;
            patch_prop(component, key, patch)?;
        }
        ["data_sources", source] => patch_data_source(&mut patched, source, patch)?,
        _ => return Err(invalid(patch, "unsupported path")),
    }

    patched.ensure_well_formed()?;
    tracing::debug!(path = %patch.path, operation = ?patch.operation, "Patch applied");
    Ok(patched)
}

/// Apply patches in order, stopping at the first failure.
pub fn apply_spec_patches<'a>(
    spec: &SpecArtifact,
    patches: impl IntoIterator<Item = &'a ConflictPatch>,
) -> DomainResult<SpecArtifact> {
    patches
        .into_iter()
        .try_fold(spec.clone(), |current, patch| apply_spec_patch(&current, patch))
}

fn patch_component(spec: &mut SpecArtifact, name: &str, patch: &ConflictPatch) -> DomainResult<()> {
    let position = spec.components.iter().position(|c| c.name == name);
    match (patch.operation, position) {
        (PatchOperation::Add, Some(_)) => Err(invalid(patch, "component already exists")),
        (PatchOperation::Add, None) => {
            let mut component = component_from(patch)?;
            component.name = name.to_string();
            spec.components.push(component);
            Ok(())
        }
        (PatchOperation::Modify, Some(index)) => {
            let mut component = component_from(patch)?;
            component.name = name.to_string();
            spec.components[index] = component;
            Ok(())
        }
        (PatchOperation::Delete, Some(index)) => {
            spec.components.remove(index);
            for other in &mut spec.components {
                other.children.retain(|child| child != name);
            }
            Ok(())
        }
        (PatchOperation::Modify | PatchOperation::Delete, None) => {
            Err(invalid(patch, "no such component"))
        }
    }
}

fn patch_field(component: &mut SpecComponent, field: &str, patch: &ConflictPatch) -> DomainResult<()> {
    if !COMPONENT_FIELDS.contains(&field) {
        return Err(invalid(patch, &format!("unknown component field '{field}'")));
    }

    let mut record = match serde_json::to_value(&*component)? {
        Value::Object(map) => map,
        _ => return Err(invalid(patch, "component is not a record")),
    };

    match (patch.operation, field) {
        (PatchOperation::Add, "children") => {
            let child = patch
                .value
                .as_str()
                .ok_or_else(|| invalid(patch, "child must be a string"))?;
            component.children.push(child.to_string());
            return Ok(());
        }
        (PatchOperation::Delete, "children") => {
            match patch.value.as_str() {
                Some(child) => component.children.retain(|c| c != child),
                None => component.children.clear(),
            }
            return Ok(());
        }
        (PatchOperation::Delete, "kind") => return Err(invalid(patch, "kind cannot be deleted")),
        (PatchOperation::Delete, _) => {
            record.remove(field);
        }
        (PatchOperation::Add | PatchOperation::Modify, _) => {
            record.insert(field.to_string(), patch.value.clone());
        }
    }

    *component = serde_json::from_value(Value::Object(record))
        .map_err(|err| invalid(patch, &format!("value does not fit '{field}': {err}")))?;
    Ok(())
}

fn patch_prop(component: &mut SpecComponent, key: &str, patch: &ConflictPatch) -> DomainResult<()> {
    let exists = component.props.contains_key(key);
    match (patch.operation, exists) {
        (PatchOperation::Add, true) => Err(invalid(patch, "prop already exists")),
        (PatchOperation::Add, false) | (PatchOperation::Modify, true) => {
            component.props.insert(key.to_string(), patch.value.clone());
            Ok(())
        }
        (PatchOperation::Delete, true) => {
            component.props.remove(key);
            Ok(())
        }
        (PatchOperation::Modify | PatchOperation::Delete, false) => {
            Err(invalid(patch, "no such prop"))
        }
    }
}

fn patch_data_source(spec: &mut SpecArtifact, source: &str, patch: &ConflictPatch) -> DomainResult<()> {
    let exists = spec.data_sources.iter().any(|s| s == source);
    match (patch.operation, exists) {
        (PatchOperation::Add, false) => {
            spec.data_sources.push(source.to_string());
            Ok(())
        }
        (PatchOperation::Add, true) => Err(invalid(patch, "data source already declared")),
        (PatchOperation::Delete, true) => {
            spec.data_sources.retain(|s| s != source);
            Ok(())
        }
        (PatchOperation::Delete, false) => Err(invalid(patch, "no such data source")),
        (PatchOperation::Modify, _) => Err(invalid(patch, "data sources can only be added or deleted")),
    }
}

fn find_component<'a>(
    spec: &'a mut SpecArtifact,
    name: &str,
    patch: &ConflictPatch,
) -> DomainResult<&'a mut SpecComponent> {
    spec.components
        .iter_mut()
        .find(|c| c.name == name)
        .ok_or_else(|| invalid(patch, "no such component"))
}

/// A whole component from the patch value. The name comes from the path,
/// so the value may omit it.
fn component_from(patch: &ConflictPatch) -> DomainResult<SpecComponent> {
    let Value::Object(fields) = &patch.value else {
        return Err(invalid(patch, "component value must be a record"));
    };
    let mut fields: Map<String, Value> = fields.clone();
    fields
        .entry("name")
        .or_insert_with(|| Value::String(String::new()));
    serde_json::from_value(Value::Object(fields))
        .map_err(|err| invalid(patch, &format!("not a component: {err}")))
}

fn invalid(patch: &ConflictPatch, reason: &str) -> DomainError {
    DomainError::InvalidPatch(format!("{} {}: {reason}", operation_name(patch), patch.path))
}

fn operation_name(patch: &ConflictPatch) -> &'static str {
    match patch.operation {
        PatchOperation::Add => "add",
        PatchOperation::Modify => "modify",
        PatchOperation::Delete => "delete",
    }
}
