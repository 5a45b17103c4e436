//! URL canonicalization for duplicate detection.
//!
//! Share links for the same video differ in tracking query params,
//! fragments, and trailing slashes. Two URLs are the same submission iff
//! their normalized forms are byte-equal.

/// Strip the query string, fragment, and trailing slashes.
/// Pure and total; never touches the network.
pub fn normalize_url(url: &str) -> String {
    let url = url.split('?').next().unwrap_or(url);
    let url = url.split('#').next().unwrap_or(url);
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_query_string() {
        assert_eq!(
            normalize_url("https://tiktok.com/@chef/video/123?x=1&utm_source=share"),
            "https://tiktok.com/@chef/video/123"
        );
    }

    #[test]
    fn strips_fragment() {
        assert_eq!(
            normalize_url("https://tiktok.com/@chef/video/123#comments"),
            "https://tiktok.com/@chef/video/123"
        );
    }

    #[test]
    fn strips_trailing_slashes() {
        assert_eq!(
            normalize_url("https://tiktok.com/@chef/video/123//"),
            "https://tiktok.com/@chef/video/123"
        );
    }

    #[test]
    fn query_fragment_and_slash_variants_collapse() {
        let variants = [
            "https://vm.tiktok.com/ZMabc",
            "https://vm.tiktok.com/ZMabc/",
            "https://vm.tiktok.com/ZMabc?share=1",
            "https://vm.tiktok.com/ZMabc/?share=1#top",
        ];
        let normalized: Vec<String> = variants.iter().map(|u| normalize_url(u)).collect();
        assert!(normalized.iter().all(|n| n == "https://vm.tiktok.com/ZMabc"));
    }

    #[test]
    fn plain_url_unchanged() {
        assert_eq!(
            normalize_url("https://tiktok.com/@chef/video/123"),
            "https://tiktok.com/@chef/video/123"
        );
    }
}
