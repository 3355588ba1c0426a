//! HTTP client for the World App username service.

use futures_util::future::BoxFuture;
use url::Url;

use crate::{concepts::UsernameResolver, errors::BoxError, types::UserProfile};

/// Base URL of the public username service.
pub const USERNAMES_API_URL: &str = "https://usernames.worldcoin.org/api/v1/";

/// Resolves `GET {base_url}{address}` to a [`UserProfile`].
#[derive(Debug, Clone)]
pub struct UsernamesApiClient {
    pub base_url: Url,
    pub client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum UsernamesApiError {
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
    #[error("HTTP request error: {0}")]
    HttpRequestError(#[from] reqwest::Error),
}

impl UsernamesApiClient {
    pub fn new_from_url(base_url: Url) -> Self {
        UsernamesApiClient {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn world_app() -> Result<Self, UsernamesApiError> {
        Ok(Self::new_from_url(Url::parse(USERNAMES_API_URL)?))
    }

    pub fn lookup_url(&self, address: &str) -> Result<Url, UsernamesApiError> {
        Ok(self.base_url.join(address)?)
    }

    pub async fn lookup(&self, address: &str) -> Result<UserProfile, UsernamesApiError> {
        let profile = self
            .client
            .get(self.lookup_url(address)?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(profile)
    }
}

impl UsernameResolver for UsernamesApiClient {
    fn resolve<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<UserProfile, BoxError>> {
        Box::pin(async move { self.lookup(address).await.map_err(BoxError::from) })
    }
}
