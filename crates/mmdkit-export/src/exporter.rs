//! MMD export orchestration

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use mmdkit_core::logging::instrument_export;
use mmdkit_core::{name_compat, Error, Result, ResultExt};
use mmdkit_scene::SceneHost;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bones::write_skeleton;
use crate::flatten::flatten_scene;
use crate::options::ExportOptions;
use crate::paths::{copy_referenced_files, ReferencedFiles};
use crate::progress::{CancelFlag, ExportPhase, ExportProgress, ProgressCallback};
use crate::realize::realize_object;
use crate::writer::{IndexOffsets, ObjectStats, ObjectWriter};

/// Summary of one written object
#[derive(Debug, Clone, Serialize)]
pub struct ObjectReport {
    pub name: String,
    #[serde(flatten)]
    pub stats: ObjectStats,
    pub joints: usize,
}

/// Summary of an export
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    pub scene: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub objects_exported: usize,
    pub objects_skipped: usize,
    pub totals: ObjectStats,
    pub joints: usize,
    pub objects: Vec<ObjectReport>,
    pub copied_files: Vec<PathBuf>,
    pub elapsed_secs: f64,
}

/// Writes a host scene as one MMD file
pub struct MmdExporter {
    options: ExportOptions,
    progress: Option<ProgressCallback>,
    cancel: Option<CancelFlag>,
}

impl MmdExporter {
    /// Create an exporter with the given options
    pub fn new(options: ExportOptions) -> Self {
        Self {
            options,
            progress: None,
            cancel: None,
        }
    }

    /// Report progress once per object
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ExportProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Stop between objects once `flag` is cancelled
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export to a file.
    ///
    /// A cancelled export removes the partially written file. Other failures
    /// leave whatever was written in place.
    pub fn export_to_path<H>(&self, host: &H, path: impl AsRef<Path>) -> Result<ExportReport>
    where
        H: SceneHost + ?Sized,
    {
        let path = path.as_ref();
        self.options.validate()?;

        instrument_export(&path.display().to_string(), || {
            info!("Exporting MMD: {}", path.display());

            let file = File::create(path)
                .map_err(Error::from)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut out = BufWriter::new(file);

            let result = self.write_scene(host, &mut out).and_then(|report| {
                out.flush()?;
                Ok(report)
            });
            drop(out);

            let mut report = match result {
                Ok(report) => report,
                Err(e) => {
                    if e.is_cancelled() {
                        if let Err(remove) = fs::remove_file(path) {
                            warn!(error = %remove, "could not remove cancelled output");
                        }
                    }
                    return Err(e);
                }
            };

            let dest_dir = path.parent().unwrap_or_else(|| Path::new("."));
            report.copied_files =
                copy_referenced_files(&ReferencedFiles::new(), self.options.path_mode, dest_dir)?;
            report.output = Some(path.to_path_buf());
            Ok(report)
        })
    }

    /// Export to any writer
    pub fn export_to_writer<H, W>(&self, host: &H, out: &mut W) -> Result<ExportReport>
    where
        H: SceneHost + ?Sized,
        W: Write,
    {
        self.options.validate()?;
        self.write_scene(host, out)
    }

    fn write_scene<H, W>(&self, host: &H, out: &mut W) -> Result<ExportReport>
    where
        H: SceneHost + ?Sized,
        W: Write,
    {
        let start = Instant::now();
        let mut report = ExportReport {
            scene: host.scene_name().to_string(),
            ..Default::default()
        };

        self.report_progress(ExportPhase::Flattening, 0, 0, None);
        let objects = flatten_scene(host, self.options.selection_only)?;
        let total = objects.len();
        debug!(objects = total, "scene flattened");

        write_header(out, host.scene_name())?;

        let writer = ObjectWriter::new(self.options.face_layout(), self.options.tag_vertices);
        let mut offsets = IndexOffsets::new();

        for (processed, object) in objects.iter().enumerate() {
            if self.is_cancelled() {
                info!(processed, total, "export cancelled");
                return Err(Error::Cancelled);
            }
            self.report_progress(
                ExportPhase::Writing,
                processed,
                total,
                Some(object.name.clone()),
            );

            let Some(snapshot) = realize_object(host, object, &self.options) else {
                report.objects_skipped += 1;
                continue;
            };

            let joints = if self.options.include_bones {
                let armature = host.find_armature(object.object).ok_or_else(|| {
                    Error::NoArmature {
                        object: object.name.clone(),
                    }
                })?;
                armature.validate()?;
                let posed = armature.transformed(self.options.global_matrix * object.matrix);
                write_skeleton(out, &posed, 1)?.joints
            } else {
                0
            };

            let (stats, next) = writer.write(out, &snapshot, offsets)?;
            offsets = next;

            debug!(
                object = %name_compat(Some(object.name.as_str())),
                vertices = stats.vertices,
                uvs = stats.uvs,
                normals = stats.normals,
                faces = stats.faces,
                joints,
                "object written"
            );

            report.totals += stats;
            report.joints += joints;
            report.objects_exported += 1;
            report.objects.push(ObjectReport {
                name: name_compat(Some(object.name.as_str())),
                stats,
                joints,
            });
        }

        report.elapsed_secs = start.elapsed().as_secs_f64();
        self.report_progress(ExportPhase::Complete, total, total, None);
        info!(
            exported = report.objects_exported,
            skipped = report.objects_skipped,
            vertices = report.totals.vertices,
            faces = report.totals.faces,
            "MMD export finished"
        );

        Ok(report)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }

    fn report_progress(
        &self,
        phase: ExportPhase,
        objects_processed: usize,
        total_objects: usize,
        current_object: Option<String>,
    ) {
        if let Some(callback) = &self.progress {
            callback(ExportProgress {
                phase,
                objects_processed,
                total_objects,
                current_object,
            });
        }
    }
}

fn write_header<W: Write>(out: &mut W, scene: &str) -> Result<()> {
    writeln!(out, "# mmdkit v{} MMD File", crate::VERSION)?;
    writeln!(out, "# Scene: '{}'", scene)?;
    writeln!(out, "# MMD File for use in the Morchonic Engine")?;
    writeln!(out, "# MMD is a simplified version of OBJ, with added support for Bones")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};
    use mmdkit_scene::{Armature, Bone, Mesh, ObjectData, Scene, SceneObject};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn triangle() -> Mesh {
        Mesh::from_polygons(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![vec![0, 1, 2]])
    }

    fn export(scene: &Scene, options: ExportOptions) -> Result<(String, ExportReport)> {
        let mut buf = Vec::new();
        let report = MmdExporter::new(options).export_to_writer(scene, &mut buf)?;
        Ok((String::from_utf8(buf).unwrap(), report))
    }

    #[test]
    fn test_header() {
        let (text, report) = export(&Scene::new("demo"), ExportOptions::default()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| l.starts_with("# ")));
        assert_eq!(lines[1], "# Scene: 'demo'");
        assert_eq!(report.objects_exported, 0);
    }

    #[test]
    fn test_skips_are_counted() {
        let mut scene = Scene::new("s");
        scene.add_object(SceneObject::new("empty", ObjectData::Empty));
        scene.add_object(SceneObject::mesh("My Tri", triangle()));

        let (_, report) = export(&scene, ExportOptions::default()).unwrap();
        assert_eq!(report.objects_exported, 1);
        assert_eq!(report.objects_skipped, 1);
        assert_eq!(report.objects[0].name, "My_Tri");
        assert_eq!(report.totals.faces, 1);
    }

    #[test]
    fn test_bones_precede_vertices() {
        let mut armature = Armature::new();
        armature.add_bone(Bone::new("root", Vec3::ZERO, Vec3::Z));
        let mut scene = Scene::new("s");
        let rig = scene.add_object(SceneObject::armature("rig", armature));
        scene.add_object(
            SceneObject::mesh("body", triangle())
                .with_armature(rig)
                .with_matrix(Mat4::from_translation(Vec3::X)),
        );

        let options = ExportOptions {
            include_bones: true,
            ..Default::default()
        };
        let (text, report) = export(&scene, options).unwrap();
        let body: Vec<&str> = text.lines().skip(4).collect();
        assert_eq!(body[0], "j 1.000000 0.000000 0.000000 0");
        assert_eq!(body[1], "j 1.000000 0.000000 1.000000 1");
        assert!(body[2].starts_with("v "));
        assert_eq!(report.joints, 2);
        assert_eq!(report.objects_skipped, 1);
    }

    #[test]
    fn test_missing_armature() {
        let mut scene = Scene::new("s");
        scene.add_object(SceneObject::mesh("body", triangle()));
        let options = ExportOptions {
            include_bones: true,
            ..Default::default()
        };
        match export(&scene, options) {
            Err(Error::NoArmature { object }) => assert_eq!(object, "body"),
            other => panic!("expected NoArmature, got {:?}", other.map(|(_, r)| r)),
        }
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = ExportOptions {
            global_matrix: Mat4::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            export(&Scene::new("s"), options),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_progress_and_cancel() {
        let mut scene = Scene::new("s");
        scene.add_object(SceneObject::mesh("a", triangle()));
        scene.add_object(SceneObject::mesh("b", triangle()));

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let flag = CancelFlag::new();
        let trigger = flag.clone();

        let exporter = MmdExporter::new(ExportOptions::default())
            .with_cancel_flag(flag)
            .with_progress(move |progress| {
                seen.fetch_add(1, Ordering::SeqCst);
                if progress.phase == ExportPhase::Writing {
                    trigger.cancel();
                }
            });

        let mut buf = Vec::new();
        let result = exporter.export_to_writer(&scene, &mut buf);
        assert!(matches!(result, Err(Error::Cancelled)));
        // Flattening, then the first object before the check trips
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
