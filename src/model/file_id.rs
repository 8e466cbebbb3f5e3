use crate::model::Cell;
use url::Url;

/// Extracts a Google Drive file ID from a photo cell.
///
/// Only text cells holding an absolute URL can yield an ID. See [`file_id_from_url`].
pub fn file_id(cell: &Cell) -> Option<String> {
    cell.as_text().and_then(file_id_from_url)
}

/// Extracts a Google Drive file ID from a sharing URL.
///
/// The ID is the path segment that follows a `d` segment, e.g.
/// `https://drive.google.com/file/d/FILE_ID/view`. If there is no such segment (or it is empty)
/// the value of an `id` query parameter is used instead, e.g.
/// `https://drive.google.com/open?id=FILE_ID`.
pub fn file_id_from_url(url: &str) -> Option<String> {
    let url = Url::parse(url.trim()).ok()?;

    if let Some(segments) = url.path_segments() {
        let segments: Vec<&str> = segments.collect();
        if let Some(pos) = segments.iter().position(|s| *s == "d") {
            if let Some(id) = segments.get(pos + 1).filter(|s| !s.is_empty()) {
                return Some((*id).to_string());
            }
        }
    }

    url.query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segment() {
        assert_eq!(
            file_id_from_url("https://drive.google.com/file/d/1AbC-xYz_09/view?usp=sharing"),
            Some("1AbC-xYz_09".to_string())
        );
        assert_eq!(
            file_id_from_url("https://docs.google.com/spreadsheets/d/ABC123"),
            Some("ABC123".to_string())
        );
    }

    #[test]
    fn test_path_segment_wins_over_query() {
        assert_eq!(
            file_id_from_url("https://drive.google.com/file/d/PATHID/view?id=QUERYID"),
            Some("PATHID".to_string())
        );
    }

    #[test]
    fn test_query_parameter() {
        assert_eq!(
            file_id_from_url("https://drive.google.com/open?id=1qWeRtY"),
            Some("1qWeRtY".to_string())
        );
        assert_eq!(
            file_id_from_url("https://drive.google.com/uc?export=download&id=XYZ"),
            Some("XYZ".to_string())
        );
    }

    #[test]
    fn test_no_id() {
        assert_eq!(file_id_from_url("https://drive.google.com/drive/my-drive"), None);
        assert_eq!(file_id_from_url("https://drive.google.com/file/d/"), None);
        assert_eq!(file_id_from_url("https://drive.google.com/open?id="), None);
        assert_eq!(file_id_from_url("https://drive.google.com/open?uid=abc"), None);
        assert_eq!(file_id_from_url("not a url"), None);
        assert_eq!(file_id_from_url(""), None);
    }

    #[test]
    fn test_cell() {
        assert_eq!(
            file_id(&Cell::text("https://drive.google.com/open?id=K1")),
            Some("K1".to_string())
        );
        assert_eq!(file_id(&Cell::Empty), None);
        assert_eq!(file_id(&Cell::Number(12.0)), None);
        assert_eq!(file_id(&Cell::Bool(true)), None);
    }
}
