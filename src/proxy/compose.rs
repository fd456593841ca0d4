//! Forward-target URL composition.
//!
//! The destination URL is the base; the inbound path is appended with
//! exactly one `/` between the two, and the inbound query follows any
//! query the destination already carries.

use url::Url;

use crate::error::DispatchError;

pub fn compose_url(base: &str, path: &str, query: Option<&str>) -> Result<Url, DispatchError> {
    let invalid = |reason: String| DispatchError::InvalidDestinationUrl {
        url: base.to_string(),
        reason,
    };

    let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!(
            "unsupported scheme '{}' (expected http or https)",
            url.scheme()
        )));
    }

    let joined = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);

    let query = match (
        url.query().filter(|q| !q.is_empty()),
        query.filter(|q| !q.is_empty()),
    ) {
        (Some(own), Some(inbound)) => Some(format!("{own}&{inbound}")),
        (own, inbound) => own.or(inbound).map(str::to_string),
    };
    url.set_query(query.as_deref());
    url.set_fragment(None);

    Ok(url)
}
