//! URL construction for daemon endpoints.

use url::Url;

pub const TAGS: &str = "api/tags";
pub const SHOW: &str = "api/show";
pub const DELETE: &str = "api/delete";
pub const PULL: &str = "api/pull";
pub const CREATE: &str = "api/create";
pub const COPY: &str = "api/copy";

/// Parse the configured base URL so endpoints can be joined onto it.
///
/// A path prefix (e.g. behind a reverse proxy) is kept.
pub fn parse_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Full URL of `endpoint` under `base`.
pub fn endpoint(base: &Url, endpoint: &str) -> Result<Url, url::ParseError> {
    base.join(endpoint)
}
