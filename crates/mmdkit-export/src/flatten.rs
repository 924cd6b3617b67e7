//! Scene flattening: object list to concrete (object, world matrix) pairs

use glam::Mat4;
use mmdkit_core::{name_compat, ObjectId, Result};
use mmdkit_scene::{InstancingMode, SceneHost};
use tracing::debug;

/// One object to export, with the world matrix it is exported at
#[derive(Debug, Clone, PartialEq)]
pub struct FlatObject {
    /// Object from the host's list that produced this entry
    pub source: ObjectId,
    /// Object whose geometry is exported
    pub object: ObjectId,
    /// Name of the exported object
    pub name: String,
    /// Resolved world matrix
    pub matrix: Mat4,
}

/// Resolve the host's object list into export order.
///
/// Children of vertex/face instancers are skipped since their copies come
/// from the parent's expansion; instancers expand into their instances.
pub fn flatten_scene<H>(host: &H, selection_only: bool) -> Result<Vec<FlatObject>>
where
    H: SceneHost + ?Sized,
{
    let mut flat = Vec::new();

    for id in host.object_ids(selection_only) {
        let object = host.require(id)?;

        if host.parent_instancing(id).hides_children() {
            debug!(object = %name_compat(Some(object.name.as_str())), "is a dupli child - ignoring");
            continue;
        }

        if object.instancing == InstancingMode::None {
            flat.push(FlatObject {
                source: id,
                object: id,
                name: object.name.clone(),
                matrix: object.matrix_world,
            });
            continue;
        }

        let instances = host.instances(id)?;
        debug!(
            object = %name_compat(Some(object.name.as_str())),
            count = instances.len(),
            "expanding instances"
        );
        for instance in instances {
            let instanced = host.require(instance.object)?;
            flat.push(FlatObject {
                source: id,
                object: instance.object,
                name: instanced.name.clone(),
                matrix: instance.matrix,
            });
        }
    }

    Ok(flat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use mmdkit_scene::{Mesh, ObjectData, Scene, SceneObject};

    fn triangle() -> Mesh {
        Mesh::from_polygons(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![vec![0, 1, 2]])
    }

    #[test]
    fn test_plain_objects_keep_order() {
        let mut scene = Scene::new("s");
        let a = scene.add_object(SceneObject::mesh("a", triangle()));
        let b = scene.add_object(SceneObject::new("b", ObjectData::Empty));
        let c = scene.add_object(
            SceneObject::mesh("c", triangle()).with_matrix(Mat4::from_translation(Vec3::X)),
        );

        let flat = flatten_scene(&scene, false).unwrap();
        let ids: Vec<_> = flat.iter().map(|f| f.object).collect();
        assert_eq!(ids, vec![a, b, c]);
        assert_eq!(flat[2].matrix, Mat4::from_translation(Vec3::X));
    }

    #[test]
    fn test_instancer_expands_and_children_skip() {
        let mut scene = Scene::new("s");
        let emitter_mesh = Mesh::from_polygons(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![]);
        let emitter = scene.add_object(
            SceneObject::mesh("emitter", emitter_mesh).with_instancing(InstancingMode::Verts),
        );
        let leaf = scene.add_object(SceneObject::mesh("leaf", triangle()).with_parent(emitter));

        let flat = flatten_scene(&scene, false).unwrap();
        assert_eq!(flat.len(), 3);
        assert!(flat.iter().all(|f| f.object == leaf && f.source == emitter));
        assert_eq!(flat[1].matrix.w_axis.truncate(), Vec3::X);
    }

    #[test]
    fn test_regular_parent_keeps_children() {
        let mut scene = Scene::new("s");
        let parent = scene.add_object(SceneObject::mesh("parent", triangle()));
        scene.add_object(SceneObject::mesh("child", triangle()).with_parent(parent));

        assert_eq!(flatten_scene(&scene, false).unwrap().len(), 2);
    }

    #[test]
    fn test_selection_only() {
        let mut scene = Scene::new("s");
        scene.add_object(SceneObject::mesh("a", triangle()));
        let b = scene.add_object(SceneObject::mesh("b", triangle()));
        scene.select(b);

        let flat = flatten_scene(&scene, true).unwrap();
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].name, "b");
    }

    #[test]
    fn test_unknown_selection_fails() {
        let mut scene = Scene::new("s");
        scene.selection.push(ObjectId::new(3));
        match flatten_scene(&scene, true) {
            Err(mmdkit_core::Error::ObjectNotFound { name }) => assert_eq!(name, "#3"),
            other => panic!("expected a missing object, got {:?}", other),
        }
    }
}
