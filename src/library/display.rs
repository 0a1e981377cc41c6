use std::path::Path;

use crate::config::TrackDisplayField;

/// Compose a track's playlist label from the configured field order.
///
/// Fields that are absent or blank for this track are skipped. When every
/// configured field comes up empty the title is used as-is, so a track always
/// renders something selectable.
pub fn display_from_fields(
    path: &Path,
    title: &str,
    artist: Option<&str>,
    album: Option<&str>,
    fields: &[TrackDisplayField],
    sep: &str,
) -> String {
    let parts: Vec<String> = fields
        .iter()
        .flat_map(|f| field_values(f, path, title, artist, album))
        .collect();

    if parts.is_empty() {
        title.to_string()
    } else {
        parts.join(sep)
    }
}

fn field_values(
    field: &TrackDisplayField,
    path: &Path,
    title: &str,
    artist: Option<&str>,
    album: Option<&str>,
) -> Vec<String> {
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    match field {
        // The composite field is shorthand for the artist/title pair.
        TrackDisplayField::Display => artist
            .and_then(non_empty)
            .into_iter()
            .chain(non_empty(title))
            .collect(),
        TrackDisplayField::Title => non_empty(title).into_iter().collect(),
        TrackDisplayField::Artist => artist.and_then(non_empty).into_iter().collect(),
        TrackDisplayField::Album => album.and_then(non_empty).into_iter().collect(),
        TrackDisplayField::Filename => path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(non_empty)
            .into_iter()
            .collect(),
        TrackDisplayField::Path => vec![path.display().to_string()],
    }
}
