//! A [`Remote`] backed by a Supabase project's PostgREST endpoint.
//! Paths are relative to `/rest/v1/`, e.g. `gym_sessions?id=eq.<id>`.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use crate::remote::{Method, Remote, RemoteError, WriteRequest};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SupabaseConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

#[derive(Clone, Debug)]
pub struct SupabaseRemote {
    config: SupabaseConfig,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl SupabaseRemote {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            config,
            access_token: None,
            client: reqwest::Client::new(),
        }
    }

    /// Requests are sent with the user's token when present, otherwise with the anon key.
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        let SupabaseConfig { supabase_url, .. } = &self.config;
        format!(
            "{}/rest/v1/{}",
            supabase_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn headers(&self) -> Result<HeaderMap, RemoteError> {
        let SupabaseConfig {
            supabase_anon_key, ..
        } = &self.config;
        let token = self.access_token.as_deref().unwrap_or(supabase_anon_key);

        let invalid = |e: reqwest::header::InvalidHeaderValue| RemoteError::Transport(format!("{e:?}"));
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(supabase_anon_key).map_err(invalid)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(invalid)?,
        );
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        Ok(headers)
    }

    /// Call a server-side function.
    pub async fn rpc(
        &self,
        function: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, RemoteError> {
        self.write(WriteRequest::post(format!("rpc/{function}"), args))
            .await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<serde_json::Value, RemoteError> {
        let response = request
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(format!("{e:?}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Transport(format!("{e:?}")))?;

        if !status.is_success() {
            log::error!("Request failed: {status} - {body}");
            return Err(RemoteError::rejected(status.as_u16(), &body));
        }

        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| RemoteError::Parse(format!("{e}. Body: {body}")))
    }
}

impl Remote for SupabaseRemote {
    async fn fetch(&self, path: &str) -> Result<serde_json::Value, RemoteError> {
        self.send(self.client.get(self.url(path))).await
    }

    async fn write(&self, request: WriteRequest) -> Result<serde_json::Value, RemoteError> {
        let url = self.url(&request.path);
        let builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Patch => self.client.patch(url),
            Method::Delete => self.client.delete(url),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };
        self.send(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> SupabaseRemote {
        SupabaseRemote::new(SupabaseConfig {
            supabase_url: "https://example.supabase.co/".to_string(),
            supabase_anon_key: "anon".to_string(),
        })
    }

    #[test]
    fn urls_are_joined_under_rest_v1() {
        assert_eq!(
            remote().url("/gym_sessions?id=eq.1"),
            "https://example.supabase.co/rest/v1/gym_sessions?id=eq.1"
        );
    }

    #[test]
    fn access_token_replaces_anon_bearer() {
        let headers = remote().with_access_token("user-token").headers().unwrap();
        assert_eq!(headers["apikey"], "anon");
        assert_eq!(headers[AUTHORIZATION], "Bearer user-token");

        let headers = remote().headers().unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer anon");
    }
}
