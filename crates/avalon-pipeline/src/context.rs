//! Work context: task switching, work directories and published file
//! paths.

use std::path::Path;

use avalon_events::TASK_CHANGED;
use avalon_plugins::normalize_path;
use avalon_store::{active_project, find_document, representation_context, Filter};
use avalon_types::{format_template, Asset, Document, DocumentKind, Representation, TemplateData};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult};
use crate::kernel::{forward_slashes, PipelineKernel};
use crate::session::{
    Session, SessionChanges, AVALON_APP, AVALON_ASSET, AVALON_HIERARCHY, AVALON_PROJECT,
    AVALON_SILO, AVALON_TASK, AVALON_WORKDIR,
};

impl PipelineKernel {
    /// The session changes needed to move `session` to another task, asset
    /// or application. Does not modify anything.
    ///
    /// Only values that differ from `session` are reported. An asset change
    /// also recomputes `AVALON_SILO` and `AVALON_HIERARCHY`, and any change
    /// recomputes `AVALON_WORKDIR` from the project work template.
    pub fn compute_session_changes(
        &self,
        session: &Session,
        task: Option<&str>,
        asset: Option<&str>,
        app: Option<&str>,
    ) -> PipelineResult<SessionChanges> {
        let mut changes = SessionChanges::new();
        if task.is_none() && asset.is_none() && app.is_none() {
            return Ok(changes);
        }

        let asset_doc = asset.map(|name| self.find_asset(name)).transpose()?;

        for (key, value) in [(AVALON_ASSET, asset), (AVALON_TASK, task), (AVALON_APP, app)] {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                if session.get(key) != Some(value) {
                    changes.insert(key.to_string(), value.to_string());
                }
            }
        }
        if changes.is_empty() {
            return Ok(changes);
        }

        if let Some(asset) = asset_doc.filter(|_| changes.contains_key(AVALON_ASSET)) {
            changes.insert(AVALON_SILO.into(), asset.silo.clone().unwrap_or_default());
            changes.insert(AVALON_HIERARCHY.into(), asset.parents().join("/"));
        }

        let project = active_project(self.store.as_ref())?.ok_or_else(|| PipelineError::NotFound {
            kind: "project",
            what: session.get(AVALON_PROJECT).unwrap_or_default().to_string(),
        })?;
        let mut preview = session.clone();
        preview.apply(&changes);
        let workdir = self.format_work_template(&project.config.template.work, &preview)?;
        changes.insert(AVALON_WORKDIR.into(), workdir);

        Ok(changes)
    }

    /// Move the live session to another task, asset or application.
    ///
    /// Applies [`compute_session_changes`](Self::compute_session_changes) to
    /// the session and the environment, then emits `taskChanged` with the
    /// changes.
    pub fn update_current_task(
        &mut self,
        task: Option<&str>,
        asset: Option<&str>,
        app: Option<&str>,
    ) -> PipelineResult<SessionChanges> {
        let changes = self.compute_session_changes(&self.session, task, asset, app)?;

        self.session.apply(&changes);
        for (key, value) in &changes {
            if value.is_empty() {
                self.environment.remove(key);
            } else {
                self.environment.set(key.clone(), value.clone());
            }
        }
        info!(changes = ?changes, "task changed");

        let args = serde_json::to_value(&changes).unwrap_or(Value::Null);
        self.emit(TASK_CHANGED, &args);
        Ok(changes)
    }

    /// Format a work template with values from `session`.
    ///
    /// Published file paths need a representation; see
    /// [`get_representation_path`](Self::get_representation_path).
    pub fn format_work_template(&self, template: &str, session: &Session) -> PipelineResult<String> {
        let mut data = TemplateData::new();
        data.insert("root".into(), self.registered_root());
        for (field, key) in [
            ("project", AVALON_PROJECT),
            ("asset", AVALON_ASSET),
            ("task", AVALON_TASK),
            ("app", AVALON_APP),
            ("silo", AVALON_SILO),
            ("hierarchy", AVALON_HIERARCHY),
        ] {
            data.insert(field.into(), session.get(key).unwrap_or_default().to_string());
        }
        data.insert("user".into(), self.user());
        Ok(format_template(template, &data)?)
    }

    /// The path of a published representation on disk.
    ///
    /// Tries, in order, the representation's own template and context, the
    /// project publish template, and the representation's stored path. The
    /// first candidate that exists wins. Returns `None` when none exists.
    pub fn get_representation_path(&self, representation: &Representation) -> Option<String> {
        self.path_from_representation(representation)
            .or_else(|| self.path_from_config(representation))
            .or_else(|| representation.path().and_then(existing))
    }

    fn path_from_representation(&self, representation: &Representation) -> Option<String> {
        let template = representation.template()?;
        let context = representation.context.as_ref()?;

        let mut data: TemplateData = context
            .iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return None,
                };
                Some((key.clone(), text))
            })
            .collect();
        data.insert("root".into(), self.registered_root());

        match format_template(template, &data) {
            Ok(path) => existing(&path),
            Err(err) => {
                debug!(representation = %representation.id, error = %err, "representation template unusable");
                None
            }
        }
    }

    fn path_from_config(&self, representation: &Representation) -> Option<String> {
        let context = match representation_context(self.store.as_ref(), representation.id) {
            Ok(context) => context,
            Err(err) => {
                debug!(representation = %representation.id, error = %err, "representation not resolvable");
                return None;
            }
        };
        match self.loader_context(context) {
            Ok(loader_context) => existing(&loader_context.fname),
            Err(err) => {
                debug!(representation = %representation.id, error = %err, "publish template unusable");
                None
            }
        }
    }

    fn find_asset(&self, name: &str) -> PipelineResult<Asset> {
        let filter = Filter::kind(DocumentKind::Asset).eq("name", name);
        match find_document(self.store.as_ref(), &filter)? {
            Some(Document::Asset(asset)) => Ok(asset),
            _ => Err(PipelineError::NotFound {
                kind: "asset",
                what: name.to_string(),
            }),
        }
    }
}

fn existing(path: &str) -> Option<String> {
    let path = Path::new(path);
    path.exists()
        .then(|| forward_slashes(&normalize_path(path).to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{installed_kernel, seeded_kernel};
    use crate::session::AVALON_PROJECTS;
    use serde_json::{json, Map};
    use std::sync::{Arc, Mutex};

    #[test]
    fn no_arguments_means_no_changes() {
        let (kernel, _seed, _host) = installed_kernel();
        let changes = kernel
            .compute_session_changes(kernel.session(), None, None, None)
            .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn unchanged_values_are_not_reported() {
        let (kernel, _seed, _host) = installed_kernel();
        let changes = kernel
            .compute_session_changes(kernel.session(), Some("model"), Some("bruce"), Some("maya"))
            .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn task_change_recomputes_workdir() {
        let (kernel, _seed, _host) = installed_kernel();
        let changes = kernel
            .compute_session_changes(kernel.session(), Some("rig"), None, None)
            .unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[AVALON_TASK], "rig");
        assert_eq!(changes[AVALON_WORKDIR], "/projects/batman/assets/bruce/work/rig/maya");
        assert_eq!(kernel.session().get(AVALON_TASK), Some("model"));
    }

    #[test]
    fn asset_change_updates_silo_and_hierarchy() {
        let (kernel, _seed, _host) = installed_kernel();
        let changes = kernel
            .compute_session_changes(kernel.session(), None, Some("joker"), None)
            .unwrap();
        assert_eq!(changes[AVALON_ASSET], "joker");
        assert_eq!(changes[AVALON_SILO], "");
        assert_eq!(changes[AVALON_HIERARCHY], "characters");
        assert_eq!(changes[AVALON_WORKDIR], "/projects/batman//joker/work/model/maya");
    }

    #[test]
    fn unknown_asset_is_an_error() {
        let (kernel, _seed, _host) = installed_kernel();
        let err = kernel
            .compute_session_changes(kernel.session(), None, Some("penguin"), None)
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { kind: "asset", .. }));
    }

    #[test]
    fn update_current_task_applies_and_emits() {
        let (mut kernel, _seed, _host) = installed_kernel();
        let seen = Arc::new(Mutex::new(Value::Null));
        let sink = seen.clone();
        kernel
            .events()
            .on(TASK_CHANGED, move |args| {
                *sink.lock().unwrap() = args.clone();
                Ok(())
            })
            .unwrap();

        let changes = kernel.update_current_task(Some("lookdev"), None, None).unwrap();
        assert_eq!(kernel.session().get(AVALON_TASK), Some("lookdev"));
        assert_eq!(kernel.environment().get(AVALON_TASK), Some("lookdev"));
        assert_eq!(
            kernel.session().get(AVALON_WORKDIR),
            Some("/projects/batman/assets/bruce/work/lookdev/maya")
        );
        assert_eq!(*seen.lock().unwrap(), serde_json::to_value(&changes).unwrap());
    }

    #[test]
    fn work_template_uses_root_and_user() {
        let (mut kernel, _seed, _config) = seeded_kernel();
        kernel.register_root(r"C:\show");
        let path = kernel
            .format_work_template("{root}/{project}/{asset}/{task}/{user}", kernel.session())
            .unwrap();
        assert_eq!(path, "C:/show/batman/bruce/model/wayne");

        let err = kernel
            .format_work_template("{root}/{shot}", kernel.session())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Type(_)));
    }

    #[test]
    fn representation_path_prefers_own_template() {
        let (mut kernel, seed, _host) = installed_kernel();
        let dir = tempfile::tempdir().unwrap();
        kernel.register_root(dir.path());
        let file = dir.path().join("bruce_v001.ma");
        std::fs::write(&file, b"").unwrap();

        let mut context = Map::new();
        context.insert("asset".into(), json!("bruce"));
        context.insert("version".into(), json!(1));
        let representation = avalon_types::Representation::new("ma", seed.model_v1)
            .with_template("{root}/{asset}_v{version:0>3}.ma", context);

        let path = kernel.get_representation_path(&representation).unwrap();
        assert_eq!(path, forward_slashes(&file.to_string_lossy()));
    }

    #[test]
    fn representation_path_falls_back_to_publish_template() {
        let (mut kernel, seed, _host) = installed_kernel();
        let dir = tempfile::tempdir().unwrap();
        kernel.register_root(dir.path());
        let publish = dir
            .path()
            .join("batman/assets/bruce/publish/modelDefault/v002");
        std::fs::create_dir_all(&publish).unwrap();
        std::fs::write(publish.join("modelDefault.abc"), b"").unwrap();

        let representation = seed.representation(kernel.store().as_ref(), seed.model_v2_abc);
        let path = kernel.get_representation_path(&representation).unwrap();
        assert!(path.ends_with("batman/assets/bruce/publish/modelDefault/v002/modelDefault.abc"));
        assert!(!path.contains('\\'));
    }

    #[test]
    fn representation_path_falls_back_to_stored_path() {
        let (kernel, seed, _host) = installed_kernel();
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("stored.abc");
        std::fs::write(&file, b"").unwrap();

        let representation =
            avalon_types::Representation::new("abc", seed.model_v1).with_path(file.to_string_lossy());
        assert_eq!(
            kernel.get_representation_path(&representation),
            Some(forward_slashes(&file.to_string_lossy()))
        );

        let missing = avalon_types::Representation::new("abc", seed.model_v1).with_path("/nowhere/x.abc");
        assert_eq!(kernel.get_representation_path(&missing), None);
    }

    #[test]
    fn session_root_is_used_without_registered_root() {
        let (mut kernel, _seed, _host) = installed_kernel();
        kernel.session_mut().set(AVALON_PROJECTS, "/mnt/projects");
        let path = kernel
            .format_work_template("{root}/{project}", &kernel.session().clone())
            .unwrap();
        assert_eq!(path, "/mnt/projects/batman");
    }
}
