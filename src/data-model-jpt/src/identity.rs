//! Job identity.
//!
//! A job's `job_id` is derived only from its title and link, after both are normalized
//! aggressively enough that cosmetic differences between two scrapes of the same posting
//! (casing, punctuation, spacing, tracking parameters, trailing slashes, fragments)
//! produce the same fingerprint.

/// Joins the normalized title and URL before hashing.
const SEPARATOR: char = '|';

/// Lowercases the title and drops every character that isn't alphanumeric.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Drops the fragment, the query string and any trailing slashes, then lowercases.
///
/// Works on relative links too (`/jobs/42?ref=feed` becomes `/jobs/42`).
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    let url = url.split_once('#').map_or(url, |(before, _)| before);
    let url = url.split_once('?').map_or(url, |(before, _)| before);
    url.trim_end_matches('/').to_lowercase()
}

/// The storage key of a job: hex MD5 over `normalized title | normalized url`.
pub fn fingerprint(title: &str, url: &str) -> String {
    let key = format!("{}{}{}", normalize_title(title), SEPARATOR, normalize_url(url));
    format!("{:x}", md5::compute(key.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Software Engineer "), "softwareengineer");
        assert_eq!(normalize_title("software-engineer"), "softwareengineer");
        assert_eq!(normalize_title("Sr. C++ Dev (Remote)"), "srcdevremote");
        assert_eq!(normalize_title(""), "");
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("https://x.com/job?ref=1"), "https://x.com/job");
        assert_eq!(normalize_url("https://x.com/job/"), "https://x.com/job");
        assert_eq!(normalize_url("https://X.com/Job/#apply"), "https://x.com/job");
        assert_eq!(normalize_url("https://x.com/job#top?x=1"), "https://x.com/job");
        assert_eq!(normalize_url("/jobs/42?utm_source=feed"), "/jobs/42");
        assert_eq!(normalize_url(""), "");
    }

    #[test]
    fn test_fingerprint_ignores_cosmetic_differences() {
        assert_eq!(
            fingerprint("Software Engineer ", "https://x.com/job?ref=1"),
            fingerprint("software-engineer", "https://x.com/job/")
        );
    }

    #[test]
    fn test_fingerprint_distinguishes_jobs() {
        assert_ne!(
            fingerprint("Software Engineer", "https://x.com/job/1"),
            fingerprint("Software Engineer", "https://x.com/job/2")
        );
        assert_ne!(
            fingerprint("Backend Engineer", "https://x.com/job/1"),
            fingerprint("Frontend Engineer", "https://x.com/job/1")
        );
    }

    #[test]
    fn test_fingerprint_is_128_bit_hex() {
        let id = fingerprint("Backend Engineer", "https://a.example/jobs/42");
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, fingerprint("Backend Engineer", "https://a.example/jobs/42"));
    }

    #[test]
    fn test_separator_keeps_title_and_url_apart() {
        // "ab" + "c" must not collide with "a" + "bc"
        assert_ne!(fingerprint("ab", "c"), fingerprint("a", "bc"));
    }
}
