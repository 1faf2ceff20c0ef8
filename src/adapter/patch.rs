/// Marker lines that introduce a file in an apply_patch body.
const FILE_MARKERS: [&str; 3] = ["*** Update File:", "*** Add File:", "*** Delete File:"];

/// Target path of the first file header in a patch, if any.
pub fn scan_patch_path(body: &str) -> Option<String> {
    body.lines().find_map(|line| {
        let line = line.trim_start();
        FILE_MARKERS.iter().find_map(|marker| {
            let path = line.strip_prefix(marker)?.trim();
            (!path.is_empty()).then(|| path.to_string())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_first_header() {
        let body = "*** Begin Patch\n*** Update File: src/main.rs\n@@\n-a\n+b\n*** Add File: other.rs\n*** End Patch";
        assert_eq!(scan_patch_path(body).as_deref(), Some("src/main.rs"));
    }

    #[test]
    fn add_and_delete_headers() {
        assert_eq!(scan_patch_path("*** Add File: /repo/.env\n+X=1").as_deref(), Some("/repo/.env"));
        assert_eq!(scan_patch_path("*** Delete File: old.txt").as_deref(), Some("old.txt"));
    }

    #[test]
    fn no_header_or_empty_path() {
        assert_eq!(scan_patch_path("just some text"), None);
        assert_eq!(scan_patch_path("*** Update File:   \n"), None);
    }
}
