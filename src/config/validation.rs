//! Configuration validation logic.

use regex::Regex;
use url::Url;

use crate::config::loader::RunOptions;
use crate::config::modes::Site;
use crate::error::{Error, Result};
use crate::fs::naming::template_fields;

/// Validate a pull's options before anything touches the network.
pub fn validate_run_options(options: &RunOptions) -> Result<()> {
    validate_site_url(&options.site)?;

    if options.workers == 0 {
        return Err(Error::ConfigValidation {
            field: "workers".to_string(),
            message: "At least one worker is required".to_string(),
        });
    }

    if options.size_limit < -1 {
        return Err(Error::ConfigValidation {
            field: "size_limit".to_string(),
            message: format!(
                "Size limit must be -1 (unlimited) or a number of megabytes (got {})",
                options.size_limit
            ),
        });
    }

    if options.limit == Some(0) {
        return Err(Error::ConfigValidation {
            field: "limit".to_string(),
            message: "Post limit must be at least 1".to_string(),
        });
    }

    template_fields(&options.file_format).map_err(|e| Error::ConfigValidation {
        field: "file_format".to_string(),
        message: e.to_string(),
    })?;

    Ok(())
}

/// The site must be an absolute http(s) URL.
pub fn validate_site_url(site: &str) -> Result<()> {
    if site.is_empty() {
        return Err(Error::MissingConfig("site".to_string()));
    }

    let url = Url::parse(site).map_err(|e| Error::ConfigValidation {
        field: "site".to_string(),
        message: format!("'{}' is not a valid URL: {}", site, e),
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(Error::ConfigValidation {
            field: "site".to_string(),
            message: format!("'{}' must be an http(s) URL with a host", site),
        });
    }

    Ok(())
}

/// Service identifiers are short lowercase slugs (patreon, onlyfans, ...).
pub fn validate_service(service: &str) -> Result<()> {
    let pattern = Regex::new(r"^[a-z0-9_-]{2,32}$").unwrap();

    if !pattern.is_match(service) {
        return Err(Error::ConfigValidation {
            field: "service".to_string(),
            message: format!(
                "Service '{}' is invalid. Use a lowercase service name such as patreon or onlyfans.",
                service
            ),
        });
    }

    Ok(())
}

/// The site family behind `site` when it is known not to host `service`.
///
/// Custom base URLs are never flagged.
pub fn unhosted_service(site: &str, service: &str) -> Option<Site> {
    let family: Site = site.parse().ok()?;
    (!family.services().contains(&service)).then_some(family)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        assert!(validate_run_options(&RunOptions::default()).is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let options = RunOptions {
            workers: 0,
            ..RunOptions::default()
        };
        assert!(matches!(
            validate_run_options(&options),
            Err(Error::ConfigValidation { field, .. }) if field == "workers"
        ));
    }

    #[test]
    fn test_size_limit_bounds() {
        let mut options = RunOptions::default();
        options.size_limit = -2;
        assert!(validate_run_options(&options).is_err());
        options.size_limit = 0;
        assert!(validate_run_options(&options).is_ok());
    }

    #[test]
    fn test_bad_template_rejected() {
        let options = RunOptions {
            file_format: "{post_date}_{filename}".to_string(),
            ..RunOptions::default()
        };
        assert!(validate_run_options(&options).is_err());
    }

    #[test]
    fn test_site_url() {
        assert!(validate_site_url("https://kemono.su").is_ok());
        assert!(validate_site_url("http://127.0.0.1:8080").is_ok());
        assert!(validate_site_url("kemono.su").is_err());
        assert!(validate_site_url("ftp://kemono.su").is_err());
        assert!(matches!(validate_site_url(""), Err(Error::MissingConfig(_))));
    }

    #[test]
    fn test_unhosted_service() {
        assert_eq!(unhosted_service("https://kemono.su", "onlyfans"), Some(Site::Kemono));
        assert_eq!(unhosted_service("https://coomer.su", "onlyfans"), None);
        assert_eq!(unhosted_service("https://kemono.su", "patreon"), None);
        assert_eq!(unhosted_service("http://127.0.0.1:8080", "onlyfans"), None);
    }

    #[test]
    fn test_service() {
        assert!(validate_service("patreon").is_ok());
        assert!(validate_service("onlyfans").is_ok());
        assert!(validate_service("Patreon").is_err());
        assert!(validate_service("a/b").is_err());
    }
}
