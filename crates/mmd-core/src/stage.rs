//! Staging a model's input files.
//!
//! Staging renders every non-metadata file under a model's metadata
//! directory into a destination directory, substituting parameter values
//! into `{name}`-style placeholders in text files and copying binary
//! files byte for byte.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{MetadataError, Result};
use crate::find::find_model_data_files;
use crate::param::Scalar;

/// Substitute `{name}` placeholders in a template.
///
/// Substitution is permissive: unknown placeholders, anything that is
/// not a bare identifier (`{name:0.2f}`, `{not valid}`), unmatched
/// braces, and stray `}` are all left verbatim. `{{` and `}}` escape to
/// literal braces.
pub fn render_template(template: &str, values: &IndexMap<String, Scalar>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find(['{', '}']) {
        let (head, tail) = rest.split_at(open);
        out.push_str(head);

        if let Some(stripped) = tail.strip_prefix("{{") {
            out.push('{');
            rest = stripped;
        } else if let Some(stripped) = tail.strip_prefix("}}") {
            out.push('}');
            rest = stripped;
        } else if let Some(stripped) = tail.strip_prefix('}') {
            out.push('}');
            rest = stripped;
        } else {
            // A single '{'. Find its closing brace; no closing brace
            // means the rest of the template is literal text.
            let body = &tail[1..];
            let Some(close) = body.find(['{', '}']) else {
                out.push_str(tail);
                break;
            };
            if !body[close..].starts_with('}') {
                // Nested or re-opened brace: emit the '{' and rescan
                // from the next brace.
                out.push('{');
                out.push_str(&body[..close]);
                rest = &body[close..];
                continue;
            }
            let name = &body[..close];
            match values.get(name) {
                Some(value) => out.push_str(&value.to_string()),
                None => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            }
            rest = &body[close + 1..];
        }
    }
    out.push_str(rest);

    out
}

/// Check if a buffer looks like text rather than binary data.
///
/// Any byte outside the printable range plus the usual control
/// characters (tab, newlines, form feed, escape, ...) marks the buffer
/// as binary.
pub fn is_text(buffer: &[u8]) -> bool {
    buffer.iter().all(|&byte| {
        matches!(byte, 7..=10 | 12 | 13 | 27) || (0x20..0x7f).contains(&byte) || byte >= 0x80
    })
}

/// Check if a file is text, judging by its first kilobyte.
pub fn is_text_file(path: &Path) -> Result<bool> {
    let mut file = fs::File::open(path)
        .map_err(|err| MetadataError::io("failed to open data file", path, err))?;
    let mut buffer = [0u8; 1024];
    let mut filled = 0;
    while filled < buffer.len() {
        let n = file
            .read(&mut buffer[filled..])
            .map_err(|err| MetadataError::io("failed to read data file", path, err))?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(is_text(&buffer[..filled]))
}

/// Stages a model's data files out of its metadata directory.
#[derive(Debug)]
pub struct FileSystemLoader {
    base: PathBuf,
}

impl FileSystemLoader {
    pub fn new(searchpath: impl AsRef<Path>) -> Result<FileSystemLoader> {
        let base = std::path::absolute(searchpath.as_ref()).map_err(|err| {
            MetadataError::io("failed to resolve data directory", searchpath.as_ref(), err)
        })?;
        Ok(FileSystemLoader { base })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The data files that would be staged, relative to the base.
    pub fn sources(&self) -> Result<Vec<PathBuf>> {
        find_model_data_files(&self.base)
    }

    /// Stage every data file into `dest`, creating it if needed.
    ///
    /// Returns the manifest: the relative paths written, in source
    /// order. Text files are rendered with [`render_template`]; binary
    /// files are copied unchanged. A trailing `.tmpl` extension is
    /// stripped from rendered names.
    pub fn stage_all(
        &self,
        dest: impl AsRef<Path>,
        values: &IndexMap<String, Scalar>,
    ) -> Result<Vec<PathBuf>> {
        let dest = dest.as_ref();
        fs::create_dir_all(dest)
            .map_err(|err| MetadataError::io("failed to create staging directory", dest, err))?;

        let mut manifest = Vec::new();
        for relpath in self.sources()? {
            manifest.push(self.stage(&relpath, dest, values)?);
        }
        Ok(manifest)
    }

    fn stage(
        &self,
        relpath: &Path,
        dest: &Path,
        values: &IndexMap<String, Scalar>,
    ) -> Result<PathBuf> {
        let src = self.base.join(relpath);
        let out_rel = strip_tmpl(relpath);
        let out = dest.join(&out_rel);

        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| MetadataError::io("failed to create staging directory", parent, err))?;
        }

        if is_text_file(&src)? {
            let template = fs::read_to_string(&src)
                .map_err(|err| MetadataError::io("failed to read template", &src, err))?;
            fs::write(&out, render_template(&template, values))
                .map_err(|err| MetadataError::io("failed to write staged file", &out, err))?;
        } else {
            fs::copy(&src, &out)
                .map_err(|err| MetadataError::io("failed to copy data file", &src, err))?;
        }
        debug!("staged {}", out.display());

        Ok(out_rel)
    }
}

fn strip_tmpl(relpath: &Path) -> PathBuf {
    match relpath.extension() {
        Some(ext) if ext == "tmpl" => relpath.with_extension(""),
        _ => relpath.to_path_buf(),
    }
}
