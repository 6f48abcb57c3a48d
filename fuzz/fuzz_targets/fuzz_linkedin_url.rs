#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use linkedin_mcp::invariants::{parse_company_url, parse_job_url, parse_profile_url};

#[derive(Debug, Arbitrary)]
struct Urls<'a> {
    profile: &'a str,
    company: &'a str,
    job: &'a str,
}

fuzz_target!(|urls: Urls| {
    if let Ok(id) = parse_profile_url(urls.profile) {
        assert!(!id.is_empty());
        assert!(!id.contains('/'));
    }

    if let Ok(name) = parse_company_url(urls.company) {
        assert!(!name.is_empty());
        assert!(!name.contains('/'));
    }

    if let Ok(job_id) = parse_job_url(urls.job) {
        assert!(job_id.chars().all(|c| c.is_ascii_digit()));
    }
});
