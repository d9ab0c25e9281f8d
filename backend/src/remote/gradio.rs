use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client as HttpClient, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use url::Url;

use super::{RemoteServiceError, SpaceTransport};
use crate::config::RemoteConfig;

#[derive(Debug, Deserialize)]
struct SpaceHost {
    host: String,
}

#[derive(Debug, Deserialize)]
struct EventId {
    event_id: String,
}

/// Resolved endpoint of a running space.
#[derive(Debug, Clone)]
struct SpaceSession {
    api_base: String,
}

/// Client for a Gradio app hosted on Hugging Face Spaces.
///
/// The space is resolved and its config fetched on first use; the session is
/// then kept for the lifetime of the process. A failed connect leaves the
/// cell empty so the next request tries again.
pub struct GradioTransport {
    http_client: HttpClient,
    config: RemoteConfig,
    session: OnceCell<SpaceSession>,
}

impl GradioTransport {
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteServiceError> {
        let http_client = HttpClient::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http_client,
            config,
            session: OnceCell::new(),
        })
    }

    pub fn space_id(&self) -> &str {
        &self.config.space_id
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.http_client.request(method, url);
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn session(&self) -> Result<&SpaceSession, RemoteServiceError> {
        self.session.get_or_try_init(|| self.connect()).await
    }

    async fn resolve_host(&self) -> Result<String, RemoteServiceError> {
        let url = format!(
            "{}/api/spaces/{}/host",
            self.config.hub_endpoint.trim_end_matches('/'),
            self.config.space_id
        );
        let host: SpaceHost = self
            .request(Method::GET, &url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(host.host)
    }

    async fn connect(&self) -> Result<SpaceSession, RemoteServiceError> {
        log::info!("Connecting to Hugging Face Space: {}", self.config.space_id);

        let host = match &self.config.space_host {
            Some(host) => host.clone(),
            None => self.resolve_host().await?,
        };
        let host = Url::parse(&host)?;
        let host = host.as_str().trim_end_matches('/');

        let space_config: Value = self
            .request(Method::GET, &format!("{}/config", host))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let api_prefix = space_config
            .get("api_prefix")
            .and_then(Value::as_str)
            .unwrap_or("");

        let session = SpaceSession {
            api_base: api_base(host, api_prefix),
        };
        log::info!("Space connected at {}", session.api_base);
        Ok(session)
    }

    async fn upload(
        &self,
        session: &SpaceSession,
        image_path: &Path,
    ) -> Result<String, RemoteServiceError> {
        let file = tokio::fs::File::open(image_path).await?;
        let length = file.metadata().await?.len();
        let file_name = image_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.jpg".to_string());

        let part = Part::stream_with_length(Body::from(file), length).file_name(file_name);
        let form = Form::new().part("files", part);

        let paths: Vec<String> = self
            .request(Method::POST, &format!("{}/upload", session.api_base))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        paths
            .into_iter()
            .next()
            .ok_or_else(|| RemoteServiceError::Protocol("upload returned no file path".to_string()))
    }
}

#[async_trait]
impl SpaceTransport for GradioTransport {
    async fn predict(&self, image_path: &Path) -> Result<Value, RemoteServiceError> {
        let session = self.session().await?;
        let remote_path = self.upload(session, image_path).await?;

        let call_url = format!(
            "{}/call/{}",
            session.api_base,
            self.config.api_name.trim_start_matches('/')
        );
        let payload = json!({
            "data": [{
                "path": remote_path,
                "meta": { "_type": "gradio.FileData" },
            }]
        });

        let event: EventId = self
            .request(Method::POST, &call_url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let stream = self
            .request(Method::GET, &format!("{}/{}", call_url, event.event_id))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_event_stream(&stream)
    }
}

fn api_base(host: &str, api_prefix: &str) -> String {
    format!(
        "{}/{}",
        host.trim_end_matches('/'),
        api_prefix.trim_matches('/')
    )
    .trim_end_matches('/')
    .to_string()
}

/// Reads the outcome of a `/call` event stream: the data of the `complete`
/// event, or the error the space reported.
pub fn parse_event_stream(body: &str) -> Result<Value, RemoteServiceError> {
    let mut event = "";
    for line in body.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            event = name.trim();
        } else if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            match event {
                "complete" => {
                    let outputs: Value = serde_json::from_str(data)?;
                    return Ok(match outputs {
                        Value::Array(mut items) if items.len() == 1 => items.remove(0),
                        other => other,
                    });
                }
                "error" => {
                    let message = match data {
                        "" | "null" => "no details".to_string(),
                        other => other.to_string(),
                    };
                    return Err(RemoteServiceError::Space(message));
                }
                _ => {}
            }
        }
    }
    Err(RemoteServiceError::Protocol(
        "event stream ended without a result".to_string(),
    ))
}
