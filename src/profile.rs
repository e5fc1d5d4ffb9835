//! Client for the users service holding [`ProfileData`].
//!
//! A profile record is created right after registration, keyed by the
//! identity id. Failures never block the authentication flow.

use crate::{session::ProfileData, APP_USER_AGENT};
use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, instrument};
use url::Url;

#[derive(Debug, Serialize)]
struct NewProfile<'a> {
    id: &'a str,
    country: &'a str,
    city: &'a str,
    zipcode: &'a str,
}

#[derive(Clone, Debug)]
pub struct ProfileClient {
    client: Client,
    url: Url,
}

impl ProfileClient {
    /// `url` is the users collection, e.g. `http://localhost:8080/users`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build profile client")?;
        Ok(Self { client, url })
    }

    /// Creates an empty profile for a freshly registered identity.
    ///
    /// # Errors
    /// Returns an error if the request fails or the service does not accept it.
    #[instrument(skip(self))]
    pub async fn create(&self, identity_id: &str) -> Result<()> {
        let body = NewProfile {
            id: identity_id,
            country: "",
            city: "",
            zipcode: "",
        };
        let response = self.client.post(self.url.clone()).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("{} - {}", self.url, response.status()));
        }

        debug!("profile created for {identity_id}");
        Ok(())
    }

    /// Creates the profile in the background, logging failures.
    pub fn spawn_create(&self, identity_id: String) {
        let client = self.clone();
        tokio::spawn(async move {
            if let Err(err) = client.create(&identity_id).await {
                error!("Failed to create profile for {identity_id}: {err}");
            }
        });
    }

    /// Fetches the profile of an identity, `None` when the service has none.
    ///
    /// # Errors
    /// Returns an error if the request fails or the body is not a profile.
    #[instrument(skip(self))]
    pub async fn fetch(&self, identity_id: &str) -> Result<Option<ProfileData>> {
        let url = self.member_url(identity_id)?;
        let response = self.client.get(url.clone()).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(anyhow!("{} - {}", url, response.status()));
        }

        let profile = response
            .json::<ProfileData>()
            .await
            .context("Error parsing profile response")?;
        Ok(Some(profile))
    }

    fn member_url(&self, identity_id: &str) -> Result<Url> {
        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("Profile URL cannot be a base: {}", self.url))?
            .pop_if_empty()
            .push(identity_id);
        Ok(url)
    }
}
