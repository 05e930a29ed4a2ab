//! Songbook REST API client
//!
//! Implements [`CatalogStore`] and [`MappingStore`] over HTTP/JSON.
//!
//! | Operation     | Request                                             |
//! |---------------|-----------------------------------------------------|
//! | list songs    | `GET {base}/songs`                                  |
//! | list singers  | `GET {base}/singers`                                |
//! | create singer | `POST {base}/singers`                               |
//! | upsert pitch  | `POST {base}/pitches`                               |
//! | song mapping  | `GET/DELETE {base}/song-mappings/{key}`, `POST {base}/song-mappings`   |
//! | pitch mapping | `GET/DELETE {base}/pitch-mappings/{token}`, `POST {base}/pitch-mappings` |
//!
//! A 404 on a mapping lookup is [`Lookup::NotFound`], not an error.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use super::{song_mapping_key, CatalogStore, Lookup, MappingStore, StoreError};
use crate::models::{CreatedSinger, PitchUpsertOutcome, Singer, Song, SongMapping};

const USER_AGENT: &str = concat!("songbook-import/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct CreateSingerRequest<'a> {
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpsertPitchRequest<'a> {
    song_id: &'a str,
    singer_id: &'a str,
    pitch: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveSongMappingRequest<'a> {
    key: &'a str,
    song_id: &'a str,
    song_name: &'a str,
}

#[derive(Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct PitchMappingBody {
    source_format: String,
    canonical_pitch: String,
}

/// Songbook API client
pub struct RestClient {
    http_client: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
}

impl RestClient {
    /// Create a client for `base_url` (e.g. `http://localhost:3001/api`)
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| StoreError::Parse(format!("Invalid API URL {base_url}: {e}")))?;

        if base_url.cannot_be_a_base() {
            return Err(StoreError::Parse(format!("API URL cannot be a base: {base_url}")));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            api_token,
        })
    }

    /// Build `{base}/{segments...}` with each segment percent-encoded
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        url
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.http_client.request(method, url);
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        builder
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(StoreError::Api(status.as_u16(), error_text));
        }
        Ok(response)
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StoreError> {
        response
            .json()
            .await
            .map_err(|e| StoreError::Parse(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, StoreError> {
        tracing::debug!(url = %url, "GET");
        let response = self.send(self.request(reqwest::Method::GET, url)).await?;
        Self::parse(Self::check(response).await?).await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, StoreError> {
        tracing::debug!(url = %url, "POST");
        let response = self
            .send(self.request(reqwest::Method::POST, url).json(body))
            .await?;
        Self::parse(Self::check(response).await?).await
    }

    async fn post_no_content<B: Serialize + Sync>(&self, url: Url, body: &B) -> Result<(), StoreError> {
        tracing::debug!(url = %url, "POST");
        let response = self
            .send(self.request(reqwest::Method::POST, url).json(body))
            .await?;
        Self::check(response).await.map(|_| ())
    }

    /// GET that maps 404 to `NotFound`
    async fn lookup<T: DeserializeOwned>(&self, url: Url) -> Result<Lookup<T>, StoreError> {
        tracing::debug!(url = %url, "GET (lookup)");
        let response = self.send(self.request(reqwest::Method::GET, url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Lookup::NotFound);
        }
        let value = Self::parse(Self::check(response).await?).await?;
        Ok(Lookup::Found(value))
    }

    /// DELETE that treats 404 as already deleted
    async fn delete(&self, url: Url) -> Result<(), StoreError> {
        tracing::debug!(url = %url, "DELETE");
        let response = self.send(self.request(reqwest::Method::DELETE, url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response).await.map(|_| ())
    }
}

#[async_trait]
impl CatalogStore for RestClient {
    async fn list_songs(&self) -> Result<Vec<Song>, StoreError> {
        self.get_json(self.endpoint(&["songs"])).await
    }

    async fn list_singers(&self) -> Result<Vec<Singer>, StoreError> {
        self.get_json(self.endpoint(&["singers"])).await
    }

    async fn create_singer(&self, name: &str) -> Result<CreatedSinger, StoreError> {
        self.post_json(self.endpoint(&["singers"]), &CreateSingerRequest { name })
            .await
    }

    async fn upsert_pitch(
        &self,
        song_id: &str,
        singer_id: &str,
        pitch: &str,
    ) -> Result<PitchUpsertOutcome, StoreError> {
        self.post_json(
            self.endpoint(&["pitches"]),
            &UpsertPitchRequest {
                song_id,
                singer_id,
                pitch,
            },
        )
        .await
    }
}

#[async_trait]
impl MappingStore for RestClient {
    async fn lookup_song_mapping(&self, key: &str) -> Result<Lookup<SongMapping>, StoreError> {
        self.lookup(self.endpoint(&["song-mappings", key])).await
    }

    async fn save_song_mapping(
        &self,
        raw_song_name: &str,
        song_id: &str,
        song_name: &str,
    ) -> Result<(), StoreError> {
        let key = song_mapping_key(raw_song_name);
        self.post_no_content(
            self.endpoint(&["song-mappings"]),
            &SaveSongMappingRequest {
                key: &key,
                song_id,
                song_name,
            },
        )
        .await
    }

    async fn delete_song_mapping(&self, raw_song_name: &str) -> Result<(), StoreError> {
        let key = song_mapping_key(raw_song_name);
        self.delete(self.endpoint(&["song-mappings", &key])).await
    }

    async fn lookup_pitch_mapping(&self, cleaned_token: &str) -> Result<Lookup<String>, StoreError> {
        let found: Lookup<PitchMappingBody> = self
            .lookup(self.endpoint(&["pitch-mappings", cleaned_token]))
            .await?;
        Ok(match found {
            Lookup::Found(body) => Lookup::Found(body.canonical_pitch),
            Lookup::NotFound => Lookup::NotFound,
        })
    }

    async fn save_pitch_mapping(&self, cleaned_token: &str, canonical: &str) -> Result<(), StoreError> {
        self.post_no_content(
            self.endpoint(&["pitch-mappings"]),
            &PitchMappingBody {
                source_format: cleaned_token.to_string(),
                canonical_pitch: canonical.to_string(),
            },
        )
        .await
    }

    async fn delete_pitch_mapping(&self, cleaned_token: &str) -> Result<(), StoreError> {
        self.delete(self.endpoint(&["pitch-mappings", cleaned_token]))
            .await
    }
}
