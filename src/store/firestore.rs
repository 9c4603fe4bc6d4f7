use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::{json, Map, Value};
use tracing::debug;
use url::Url;

use crate::config::FirestoreConfig;
use crate::error::{Error, Result};

use super::api_types::{
  aggregation_count, count_query, encode_fields, structured_query, ApiAggregationItem,
  ApiDocument, ApiRunQueryItem,
};
use super::{CollectionQuery, Document, RemoteStore};

const FIRESTORE_API: &str = "https://firestore.googleapis.com/v1";

/// Firestore REST client
#[derive(Clone)]
pub struct FirestoreClient {
  http: reqwest::Client,
  base: Url,
  project_id: String,
  database: String,
  token: Option<String>,
}

impl FirestoreClient {
  /// Create a client for the configured project.
  ///
  /// `token` is sent as a bearer token; the emulator accepts requests without one.
  pub fn new(config: &FirestoreConfig, token: Option<String>) -> Result<Self> {
    let base = match &config.emulator_host {
      Some(host) => format!("http://{}/v1", host),
      None => FIRESTORE_API.to_string(),
    };
    let base = Url::parse(&base)
      .map_err(|e| Error::Invalid(format!("Bad Firestore URL {}: {}", base, e)))?;

    let http = reqwest::Client::builder()
      .user_agent(concat!("spadesk/", env!("CARGO_PKG_VERSION")))
      .build()?;

    Ok(Self {
      http,
      base,
      project_id: config.project_id.clone(),
      database: config.database.clone(),
      token,
    })
  }

  /// Full resource name of a document.
  fn document_name(&self, collection: &str, id: &str) -> String {
    format!(
      "projects/{}/databases/{}/documents/{}/{}",
      self.project_id, self.database, collection, id
    )
  }

  /// Build an endpoint URL under `projects/{p}/databases/{d}/`.
  fn endpoint(&self, tail: &[&str]) -> Result<Url> {
    let mut url = self.base.clone();
    url
      .path_segments_mut()
      .map_err(|_| Error::Invalid(format!("Firestore URL cannot be a base: {}", self.base)))?
      .pop_if_empty()
      .extend([
        "projects",
        self.project_id.as_str(),
        "databases",
        self.database.as_str(),
      ])
      .extend(tail);
    Ok(url)
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    let builder = self.http.request(method, url);
    match &self.token {
      Some(token) => builder.bearer_auth(token),
      None => builder,
    }
  }

  /// Turn a non-success response into an error, keeping the body for context.
  async fn check(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Remote(format!("{} ({}): {}", context, status, body)))
  }

  async fn document_response(
    response: Response,
    collection: &str,
    id: &str,
    context: &str,
  ) -> Result<Document> {
    if response.status() == StatusCode::NOT_FOUND {
      return Err(Error::not_found(collection, id));
    }
    let response = Self::check(response, context).await?;
    let doc: ApiDocument = response.json().await?;
    doc.into_document()
  }
}

#[async_trait]
impl RemoteStore for FirestoreClient {
  async fn run_query(&self, query: &CollectionQuery) -> Result<Vec<Document>> {
    debug!(query = %query.describe(), "firestore runQuery");

    let url = self.endpoint(&["documents:runQuery"])?;
    let body = json!({
      "structuredQuery": structured_query(query, |id| self.document_name(&query.collection, id)),
    });

    let response = self.request(Method::POST, url).json(&body).send().await?;
    let response = Self::check(response, "Failed to run query").await?;
    let items: Vec<ApiRunQueryItem> = response.json().await?;

    items
      .into_iter()
      .filter_map(|item| item.document)
      .map(ApiDocument::into_document)
      .collect()
  }

  async fn count(&self, query: &CollectionQuery) -> Result<u64> {
    debug!(query = %query.describe(), "firestore count");

    let url = self.endpoint(&["documents:runAggregationQuery"])?;
    let response = self
      .request(Method::POST, url)
      .json(&count_query(query))
      .send()
      .await?;
    let response = Self::check(response, "Failed to count documents").await?;
    let items: Vec<ApiAggregationItem> = response.json().await?;

    aggregation_count(&items)
  }

  async fn get(&self, collection: &str, id: &str) -> Result<Document> {
    let url = self.endpoint(&["documents", collection, id])?;
    let response = self.request(Method::GET, url).send().await?;
    Self::document_response(response, collection, id, "Failed to get document").await
  }

  async fn create(
    &self,
    collection: &str,
    id: Option<&str>,
    fields: Map<String, Value>,
  ) -> Result<Document> {
    let mut url = self.endpoint(&["documents", collection])?;
    if let Some(id) = id {
      url.query_pairs_mut().append_pair("documentId", id);
    }

    let body = json!({ "fields": encode_fields(&fields) });
    let response = self.request(Method::POST, url).json(&body).send().await?;
    let response = Self::check(response, "Failed to create document").await?;
    let doc: ApiDocument = response.json().await?;
    doc.into_document()
  }

  async fn patch(
    &self,
    collection: &str,
    id: &str,
    fields: Map<String, Value>,
  ) -> Result<Document> {
    // An empty update mask would replace the whole document
    if fields.is_empty() {
      return self.get(collection, id).await;
    }

    let mut url = self.endpoint(&["documents", collection, id])?;
    {
      let mut pairs = url.query_pairs_mut();
      for field in fields.keys() {
        pairs.append_pair("updateMask.fieldPaths", field);
      }
      pairs.append_pair("currentDocument.exists", "true");
    }

    let body = json!({ "fields": encode_fields(&fields) });
    let response = self.request(Method::PATCH, url).json(&body).send().await?;
    Self::document_response(response, collection, id, "Failed to update document").await
  }

  async fn delete(&self, collection: &str, id: &str) -> Result<()> {
    let url = self.endpoint(&["documents", collection, id])?;
    let response = self.request(Method::DELETE, url).send().await?;
    Self::check(response, "Failed to delete document").await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config(emulator: Option<&str>) -> FirestoreConfig {
    FirestoreConfig {
      project_id: "spa-demo".to_string(),
      database: "(default)".to_string(),
      emulator_host: emulator.map(String::from),
    }
  }

  #[test]
  fn test_endpoint_paths() {
    let client = FirestoreClient::new(&config(None), None).unwrap();
    let url = client.endpoint(&["documents:runQuery"]).unwrap();
    assert_eq!(
      url.as_str(),
      "https://firestore.googleapis.com/v1/projects/spa-demo/databases/(default)/documents:runQuery"
    );
  }

  #[test]
  fn test_endpoint_escapes_ids() {
    let client = FirestoreClient::new(&config(Some("localhost:8085")), None).unwrap();
    let url = client.endpoint(&["documents", "bookings", "a b"]).unwrap();
    assert_eq!(
      url.as_str(),
      "http://localhost:8085/v1/projects/spa-demo/databases/(default)/documents/bookings/a%20b"
    );
  }

  #[test]
  fn test_document_name() {
    let client = FirestoreClient::new(&config(None), None).unwrap();
    assert_eq!(
      client.document_name("staffs", "s1"),
      "projects/spa-demo/databases/(default)/documents/staffs/s1"
    );
  }
}
