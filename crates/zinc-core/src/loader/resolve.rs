//! Resolution of item URLs against the metadata document location

use std::path::Path;

use url::Url;

/// Resolve `target` against the document's resolved `reference`
///
/// Absolute targets are returned unchanged. When the target carries no
/// query string, the reference's query is carried over. References that
/// are not URLs are treated as file paths.
pub fn resolve_url(reference: Option<&str>, target: &str) -> String {
    if Url::parse(target).is_ok() {
        return target.to_string();
    }
    let Some(reference) = reference else {
        return target.to_string();
    };
    match Url::parse(reference) {
        Ok(base) => match base.join(target) {
            Ok(mut resolved) => {
                if resolved.query().is_none() && base.query().is_some() {
                    resolved.set_query(base.query());
                }
                resolved.to_string()
            }
            Err(_) => target.to_string(),
        },
        Err(_) => {
            let target_path = Path::new(target);
            if target_path.is_absolute() {
                return target.to_string();
            }
            Path::new(reference)
                .parent()
                .map(|dir| dir.join(target_path).to_string_lossy().into_owned())
                .unwrap_or_else(|| target.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_to_document() {
        assert_eq!(
            resolve_url(Some("https://models.example.org/scaffold/metadata.json"), "heart.json"),
            "https://models.example.org/scaffold/heart.json"
        );
        assert_eq!(
            resolve_url(Some("https://models.example.org/scaffold/metadata.json"), "../views/a.json"),
            "https://models.example.org/views/a.json"
        );
    }

    #[test]
    fn test_query_carry_over() {
        let reference = "https://models.example.org/s3/metadata.json?token=abc";
        assert_eq!(
            resolve_url(Some(reference), "heart.json"),
            "https://models.example.org/s3/heart.json?token=abc"
        );
        assert_eq!(
            resolve_url(Some(reference), "heart.json?v=2"),
            "https://models.example.org/s3/heart.json?v=2"
        );
    }

    #[test]
    fn test_absolute_target_untouched() {
        assert_eq!(
            resolve_url(Some("https://a.example.org/m.json"), "https://b.example.org/x.json"),
            "https://b.example.org/x.json"
        );
        assert_eq!(resolve_url(None, "x.json"), "x.json");
    }

    #[test]
    fn test_file_paths() {
        let resolved = resolve_url(Some("data/scaffold/metadata.json"), "heart.json");
        assert_eq!(Path::new(&resolved), Path::new("data/scaffold/heart.json"));
        let bare = resolve_url(Some("metadata.json"), "heart.json");
        assert_eq!(Path::new(&bare), Path::new("heart.json"));
    }
}
