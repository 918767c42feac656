use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

use crate::{LensError, LensResult};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceEncoding {
    Utf8,
    Latin1,
}

impl SourceEncoding {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Utf8 => "utf8",
            Self::Latin1 => "latin1",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceText {
    pub path: PathBuf,
    pub source_file: String,
    pub content: String,
    pub encoding: SourceEncoding,
}

/// Reads a POS export, tolerating legacy single-byte encodings.
pub fn read_source(path: &Path) -> LensResult<SourceText> {
    let bytes =
        fs::read(path).map_err(|error| LensError::source_unreadable(path, &error.to_string()))?;
    let (content, encoding) = decode_bytes(&bytes);
    if encoding == SourceEncoding::Latin1 {
        warn!(
            path = %path.display(),
            "Source is not valid UTF-8; decoded as Latin-1"
        );
    }

    Ok(SourceText {
        path: path.to_path_buf(),
        source_file: source_file_name(path),
        content,
        encoding,
    })
}

pub fn decode_bytes(bytes: &[u8]) -> (String, SourceEncoding) {
    let body = bytes.strip_prefix(&UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(body) {
        Ok(text) => (text.to_string(), SourceEncoding::Utf8),
        // Latin-1 maps every byte to the code point of the same value.
        Err(_) => (
            body.iter().map(|byte| char::from(*byte)).collect(),
            SourceEncoding::Latin1,
        ),
    }
}

pub fn source_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Provenance labels for a batch of sources, in input order.
///
/// A file is labelled by its name unless another source shares that name, in
/// which case the path as given keeps the two apart.
pub fn source_labels(paths: &[PathBuf]) -> Vec<String> {
    let names = paths
        .iter()
        .map(|path| source_file_name(path))
        .collect::<Vec<String>>();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in &names {
        *counts.entry(name.as_str()).or_default() += 1;
    }

    paths
        .iter()
        .zip(&names)
        .map(|(path, name)| {
            if counts.get(name.as_str()).copied().unwrap_or(0) > 1 {
                path.display().to_string()
            } else {
                name.clone()
            }
        })
        .collect()
}
