//! Minimal OpenID 2.0 relying party.
//!
//! Supports provider discovery through an XRDS document or HTML `<link>` tags,
//! the `checkid_setup` redirect, and verification of the positive assertion by
//! direct `check_authentication` request. Associations, nonces and attribute
//! exchange are not implemented.

use std::collections::HashMap;

use futures::future::BoxFuture;
use reqwest::{Client, Response, Url, header};
use thiserror::Error;
use tracing::{debug, warn};

const OPENID_NS: &str = "http://specs.openid.net/auth/2.0";
const SERVER_TYPE: &str = "http://specs.openid.net/auth/2.0/server";
const SIGNON_TYPE: &str = "http://specs.openid.net/auth/2.0/signon";
const IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";

/// Largest response body read from an identifier or provider; the rest is dropped.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Failures raised while logging a user in through OpenID.
#[derive(Debug, Error)]
pub enum OpenIdError {
    #[error("invalid OpenID identifier `{0}`")]
    InvalidIdentifier(String),
    #[error("failed to build OpenID HTTP client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    #[error("discovery request to `{url}` failed")]
    Discovery {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("no OpenID provider endpoint advertised by `{0}`")]
    NoEndpoint(String),
    #[error("authentication was cancelled at the provider")]
    Cancelled,
    #[error("unexpected assertion mode `{0}`")]
    UnexpectedMode(String),
    #[error("assertion is missing `{0}`")]
    MissingField(&'static str),
    #[error("assertion was issued for `{got}`, expected `{expected}`")]
    ReturnToMismatch { expected: String, got: String },
    #[error("verification request to `{url}` failed")]
    Verification {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("provider did not confirm the assertion")]
    Rejected,
}

/// Something able to turn a user-supplied identifier into a verified identity.
pub trait IdentityProvider: Send + Sync {
    /// Resolve `identifier` and return the provider URL the browser should be sent to.
    fn authenticate(
        &self,
        identifier: String,
        return_to: String,
    ) -> BoxFuture<'static, Result<String, OpenIdError>>;

    /// Check the provider's response parameters and return the claimed identifier.
    fn verify(
        &self,
        return_to: String,
        params: HashMap<String, String>,
    ) -> BoxFuture<'static, Result<String, OpenIdError>>;
}

/// Provider endpoint and identifiers found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Endpoint {
    op_endpoint: String,
    claimed_id: String,
    local_id: String,
}

/// [`IdentityProvider`] speaking OpenID 2.0 over `reqwest`.
#[derive(Clone)]
pub struct OpenIdRelyingParty {
    client: Client,
}

impl OpenIdRelyingParty {
    pub fn new() -> Result<Self, OpenIdError> {
        let client = Client::builder()
            .build()
            .map_err(|source| OpenIdError::ClientBuilder { source })?;
        Ok(Self { client })
    }

    async fn discover(&self, identifier: &str) -> Result<Endpoint, OpenIdError> {
        let url = normalize_identifier(identifier)?;
        let response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "application/xrds+xml, text/html;q=0.9")
            .send()
            .await
            .map_err(|source| OpenIdError::Discovery {
                url: url.to_string(),
                source,
            })?;

        let final_url = response.url().to_string();
        let body = read_capped(response, MAX_BODY_BYTES)
            .await
            .map_err(|source| OpenIdError::Discovery {
                url: url.to_string(),
                source,
            })?;

        let lower = body.to_ascii_lowercase();
        let page = Markup::new(&body, &lower);
        parse_xrds(page, &final_url)
            .or_else(|| parse_html_links(page, &final_url))
            .ok_or_else(|| OpenIdError::NoEndpoint(url.to_string()))
    }

    async fn check_authentication(
        &self,
        op_endpoint: &str,
        params: &HashMap<String, String>,
    ) -> Result<bool, OpenIdError> {
        let mut form: Vec<(&str, &str)> = params
            .iter()
            .filter(|(key, _)| key.starts_with("openid.") && key.as_str() != "openid.mode")
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        form.push(("openid.mode", "check_authentication"));

        let response = self
            .client
            .post(op_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|source| OpenIdError::Verification {
                url: op_endpoint.to_owned(),
                source,
            })?;
        let body = read_capped(response, MAX_BODY_BYTES)
            .await
            .map_err(|source| OpenIdError::Verification {
                url: op_endpoint.to_owned(),
                source,
            })?;

        let fields = parse_key_values(&body);
        Ok(fields.get("is_valid").map(String::as_str) == Some("true"))
    }
}

/// Assertions are confirmed with whichever `openid.op_endpoint` they name; that
/// endpoint is not checked against discovery of the claimed identifier.
impl IdentityProvider for OpenIdRelyingParty {
    fn authenticate(
        &self,
        identifier: String,
        return_to: String,
    ) -> BoxFuture<'static, Result<String, OpenIdError>> {
        let party = self.clone();
        Box::pin(async move {
            let endpoint = party.discover(&identifier).await?;
            debug!(op_endpoint = %endpoint.op_endpoint, "discovered OpenID provider");
            build_auth_url(&endpoint, &return_to)
        })
    }

    fn verify(
        &self,
        return_to: String,
        params: HashMap<String, String>,
    ) -> BoxFuture<'static, Result<String, OpenIdError>> {
        let party = self.clone();
        Box::pin(async move {
            let assertion = check_assertion(&return_to, &params)?;
            // TODO: re-run discovery on the claimed id and compare op_endpoint before trusting it.
            if party
                .check_authentication(&assertion.op_endpoint, &params)
                .await?
            {
                Ok(assertion.claimed_id)
            } else {
                warn!(op_endpoint = %assertion.op_endpoint, "provider rejected assertion");
                Err(OpenIdError::Rejected)
            }
        })
    }
}

/// Fields of a positive assertion needed to finish verification.
#[derive(Debug)]
struct Assertion {
    op_endpoint: String,
    claimed_id: String,
}

fn check_assertion(
    return_to: &str,
    params: &HashMap<String, String>,
) -> Result<Assertion, OpenIdError> {
    let field = |name: &'static str| {
        params
            .get(name)
            .cloned()
            .ok_or(OpenIdError::MissingField(name))
    };

    match field("openid.mode")?.as_str() {
        "id_res" => {}
        "cancel" => return Err(OpenIdError::Cancelled),
        other => return Err(OpenIdError::UnexpectedMode(other.to_owned())),
    }

    let got = field("openid.return_to")?;
    let got_base = got.split('?').next().unwrap_or_default();
    if got_base != return_to {
        return Err(OpenIdError::ReturnToMismatch {
            expected: return_to.to_owned(),
            got,
        });
    }

    Ok(Assertion {
        op_endpoint: field("openid.op_endpoint")?,
        claimed_id: field("openid.claimed_id")?,
    })
}

fn normalize_identifier(identifier: &str) -> Result<Url, OpenIdError> {
    let trimmed = identifier.trim();
    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_owned()
    } else {
        format!("http://{trimmed}")
    };
    let mut url =
        Url::parse(&candidate).map_err(|_| OpenIdError::InvalidIdentifier(identifier.to_owned()))?;
    url.set_fragment(None);
    Ok(url)
}

fn build_auth_url(endpoint: &Endpoint, return_to: &str) -> Result<String, OpenIdError> {
    let mut url = Url::parse(&endpoint.op_endpoint)
        .map_err(|_| OpenIdError::NoEndpoint(endpoint.op_endpoint.clone()))?;
    let realm = Url::parse(return_to)
        .map(|parsed| format!("{}/", parsed.origin().ascii_serialization()))
        .unwrap_or_else(|_| return_to.to_owned());

    url.query_pairs_mut()
        .append_pair("openid.ns", OPENID_NS)
        .append_pair("openid.mode", "checkid_setup")
        .append_pair("openid.claimed_id", &endpoint.claimed_id)
        .append_pair("openid.identity", &endpoint.local_id)
        .append_pair("openid.return_to", return_to)
        .append_pair("openid.realm", &realm);
    Ok(url.into())
}

/// Read at most `limit` bytes of the body, decoding it lossily.
async fn read_capped(mut response: Response, limit: usize) -> Result<String, reqwest::Error> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit - body.len();
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Markup paired with its ASCII-lowercased copy.
///
/// ASCII lowercasing keeps every byte offset, so positions found in `lower`
/// slice `raw` directly. Needles passed to [`Markup::find`] must be lowercase.
#[derive(Debug, Clone, Copy)]
struct Markup<'a> {
    raw: &'a str,
    lower: &'a str,
}

impl<'a> Markup<'a> {
    fn new(raw: &'a str, lower: &'a str) -> Self {
        debug_assert_eq!(raw.len(), lower.len());
        Self { raw, lower }
    }

    fn find(self, needle: &str) -> Option<usize> {
        self.lower.find(needle)
    }

    fn head(self, end: usize) -> Self {
        Self::new(&self.raw[..end], &self.lower[..end])
    }

    fn tail(self, start: usize) -> Self {
        Self::new(&self.raw[start..], &self.lower[start..])
    }
}

/// Pull the first OpenID 2.0 service out of an XRDS document.
fn parse_xrds(page: Markup<'_>, claimed_id: &str) -> Option<Endpoint> {
    if !page.lower.contains("<xrd") {
        return None;
    }

    let mut rest = page;
    while let Some(start) = rest.find("<service") {
        let after = rest.tail(start);
        let end = after
            .find("</service>")
            .map_or(after.raw.len(), |idx| idx + "</service>".len());
        let service = after.head(end);
        rest = after.tail(end);

        let Some(uri) = element_text(service, "uri") else {
            continue;
        };
        if service.raw.contains(SERVER_TYPE) {
            return Some(Endpoint {
                op_endpoint: uri,
                claimed_id: IDENTIFIER_SELECT.to_owned(),
                local_id: IDENTIFIER_SELECT.to_owned(),
            });
        }
        if service.raw.contains(SIGNON_TYPE) {
            let local_id = element_text(service, "localid").unwrap_or_else(|| claimed_id.to_owned());
            return Some(Endpoint {
                op_endpoint: uri,
                claimed_id: claimed_id.to_owned(),
                local_id,
            });
        }
    }
    None
}

/// HTML-based discovery via `<link rel="openid2.provider">` and `openid2.local_id`.
fn parse_html_links(page: Markup<'_>, claimed_id: &str) -> Option<Endpoint> {
    let mut provider = None;
    let mut local_id = None;

    let mut rest = page;
    while let Some(start) = rest.find("<link") {
        let after = rest.tail(start);
        let end = after.raw.find('>').unwrap_or(after.raw.len());
        let tag = after.head(end);
        rest = after.tail(end);

        let (Some(rel), Some(href)) = (attribute(tag, "rel"), attribute(tag, "href")) else {
            continue;
        };
        for token in rel.split_ascii_whitespace() {
            if token.eq_ignore_ascii_case("openid2.provider") && provider.is_none() {
                provider = Some(href.clone());
            } else if token.eq_ignore_ascii_case("openid2.local_id") && local_id.is_none() {
                local_id = Some(href.clone());
            }
        }
    }

    provider.map(|op_endpoint| Endpoint {
        op_endpoint,
        claimed_id: claimed_id.to_owned(),
        local_id: local_id.unwrap_or_else(|| claimed_id.to_owned()),
    })
}

/// Parse an OpenID key-value form body (`key:value` per line).
fn parse_key_values(body: &str) -> HashMap<String, String> {
    body.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
        .collect()
}

fn element_text(fragment: Markup<'_>, name: &str) -> Option<String> {
    let open = fragment.find(&format!("<{name}"))?;
    let after_open = fragment.tail(open);
    let content_start = after_open.raw.find('>')? + 1;
    let content = after_open.tail(content_start);
    let close = content.find(&format!("</{name}>"))?;
    let text = content.raw[..close].trim();
    (!text.is_empty()).then(|| text.to_owned())
}

fn attribute(tag: Markup<'_>, name: &str) -> Option<String> {
    let Markup { raw, lower } = tag;
    let mut search_from = 0;
    while let Some(found) = lower[search_from..].find(name) {
        let idx = search_from + found;
        search_from = idx + name.len();

        let preceded_by_space = lower[..idx]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace);
        let rest = lower[search_from..].trim_start();
        if !preceded_by_space || !rest.starts_with('=') {
            continue;
        }

        let value_start = raw.len() - rest.len() + 1;
        let value = raw[value_start..].trim_start();
        let (quote, body) = match value.chars().next()? {
            q @ ('"' | '\'') => (Some(q), &value[1..]),
            _ => (None, value),
        };
        let end = match quote {
            Some(q) => body.find(q)?,
            None => body
                .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
                .unwrap_or(body.len()),
        };
        return Some(body[..end].to_owned());
    }
    None
}
