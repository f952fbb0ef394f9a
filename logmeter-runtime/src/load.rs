//! Program loading.
//!
//! Programs are compiled once at startup. A file that fails to compile is
//! logged and skipped; only an unreadable program directory is an error.

use crate::vm::Vm;
use logmeter_core::MetricStore;
use logmeter_dsl::compile_source;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read program directory {}: {source}", .path.display())]
    ReadDir { path: PathBuf, source: io::Error },
}

pub type LoadResult<T> = Result<T, LoadError>;

/// Compile one program read from `source`.
///
/// Returns the VM when at least one rule compiled, along with every
/// diagnostic produced. The caller decides how to report the diagnostics.
pub fn compile_program(
    label: &str,
    mut source: impl Read,
    store: Arc<MetricStore>,
) -> (Option<Vm>, Vec<String>) {
    let mut text = String::new();
    if let Err(err) = source.read_to_string(&mut text) {
        return (None, vec![format!("{label}: cannot read program: {err}")]);
    }

    let (program, errors) = compile_source(label, &text);
    let diagnostics = errors.iter().map(ToString::to_string).collect();
    (program.map(|program| Vm::new(program, store)), diagnostics)
}

/// Compile every regular file in `dir`, in file name order.
pub fn load_programs(dir: impl AsRef<Path>, store: &Arc<MetricStore>) -> LoadResult<Vec<Vm>> {
    let dir = dir.as_ref();
    let read_dir_error = |source: io::Error| LoadError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_error)? {
        let path = entry.map_err(read_dir_error)?.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut vms = Vec::with_capacity(paths.len());
    for path in paths {
        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) => {
                warn!(program = %label, error = %err, "Cannot open program, skipping");
                continue;
            }
        };

        let (vm, diagnostics) = compile_program(&label, file, Arc::clone(store));
        for diagnostic in &diagnostics {
            warn!(program = %label, "{}", diagnostic);
        }

        match vm {
            Some(vm) => {
                info!(program = %label, rules = vm.program().rules.len(), "Program loaded");
                vms.push(vm);
            }
            None => warn!(program = %label, "Program rejected, skipping"),
        }
    }

    info!(dir = %dir.display(), programs = vms.len(), "Programs loaded");
    Ok(vms)
}
