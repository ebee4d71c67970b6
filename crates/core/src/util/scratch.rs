use std::io;
use std::path::Path;
use tempfile::NamedTempFile;

const LOG_TARGET: &str = "util::scratch";
const MAX_STEM_LEN: usize = 64;

/// Create an empty `{stem}-XXXXXX.{extension}` file inside `dir`.
///
/// The file is removed when the returned handle drops, or when the `TempPath` split off it
/// with `into_parts`/`into_temp_path` drops.
pub fn scratch_file(dir: &Path, stem: &str, extension: &str) -> io::Result<NamedTempFile> {
    let prefix = format!("{}-", sanitize_stem(stem));
    let extension = extension.trim_start_matches('.');
    let suffix = if extension.is_empty() {
        String::new()
    } else {
        format!(".{extension}")
    };

    let file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(&suffix)
        .tempfile_in(dir)?;
    tracing::debug!(target: LOG_TARGET, path = %file.path().display(), "created scratch file");
    Ok(file)
}

/// Reduce an uploaded filename stem to `[A-Za-z0-9_-]`, never empty.
pub fn sanitize_stem(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let stem = match base.rsplit_once('.') {
        Some((s, _)) if !s.is_empty() => s,
        _ => base,
    };
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STEM_LEN)
        .collect();
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        "upload".to_owned()
    } else {
        trimmed.to_owned()
    }
}
