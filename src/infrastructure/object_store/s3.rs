// ============================================================
// S3 STORE
// ============================================================
// Path-style S3 REST client (MinIO, AWS) signed with SigV4

use async_trait::async_trait;
use chrono::Utc;
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;
use reqwest::{Method, StatusCode};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::sigv4::{self, SigningInput, Signer, EMPTY_PAYLOAD_SHA256};
use super::ObjectStore;
use crate::domain::error::{AppError, Result};
use crate::domain::storage::ObjectSummary;

#[derive(Clone)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .finish()
    }
}

pub struct S3Store {
    client: reqwest::Client,
    endpoint: Url,
    bucket: String,
    region: String,
    credentials: S3Credentials,
}

/// One page of a ListObjectsV2 response
#[derive(Debug, Default, PartialEq)]
struct ListPage {
    objects: Vec<ObjectSummary>,
    next_token: Option<String>,
}

impl S3Store {
    pub fn new(
        endpoint: &str,
        bucket: &str,
        region: &str,
        credentials: S3Credentials,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            AppError::ConfigError(format!("Invalid storage endpoint '{}': {}", endpoint, e))
        })?;
        if endpoint.host_str().is_none() {
            return Err(AppError::ConfigError(format!(
                "Storage endpoint '{}' has no host",
                endpoint
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::StorageError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            bucket: bucket.to_string(),
            region: region.to_string(),
            credentials,
        })
    }

    /// Encoded request path for the bucket or an object in it.
    fn canonical_uri(&self, key: Option<&str>) -> String {
        let base = self.endpoint.path().trim_end_matches('/');
        let mut uri = format!("{}/{}", base, sigv4::uri_encode(&self.bucket, true));
        if let Some(key) = key {
            uri.push('/');
            uri.push_str(&sigv4::uri_encode(key, false));
        }
        uri
    }

    fn host_header(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    fn request_url(&self, canonical_uri: &str, query: &[(String, String)]) -> Result<Url> {
        let mut url = format!(
            "{}://{}{}",
            self.endpoint.scheme(),
            self.host_header(),
            canonical_uri
        );
        if !query.is_empty() {
            let encoded = query
                .iter()
                .map(|(k, v)| {
                    format!("{}={}", sigv4::uri_encode(k, true), sigv4::uri_encode(v, true))
                })
                .collect::<Vec<_>>()
                .join("&");
            url.push('?');
            url.push_str(&encoded);
        }
        Url::parse(&url).map_err(|e| AppError::StorageError(format!("Invalid request URL: {}", e)))
    }

    async fn send(
        &self,
        method: Method,
        key: Option<&str>,
        query: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Result<reqwest::Response> {
        let canonical_uri = self.canonical_uri(key);
        let url = self.request_url(&canonical_uri, &query)?;

        let now = Utc::now();
        let payload_sha256 = if body.is_empty() {
            EMPTY_PAYLOAD_SHA256.to_string()
        } else {
            sigv4::sha256_hex(&body)
        };

        let headers = vec![
            ("host".to_string(), self.host_header()),
            ("x-amz-content-sha256".to_string(), payload_sha256.clone()),
            ("x-amz-date".to_string(), sigv4::amz_date(now)),
        ];

        let signer = Signer {
            access_key_id: &self.credentials.access_key_id,
            secret_access_key: &self.credentials.secret_access_key,
            region: &self.region,
            service: "s3",
        };
        let authorization = signer.authorization(
            &SigningInput {
                method: method.as_str(),
                canonical_uri: &canonical_uri,
                query: &query,
                headers: &headers,
                payload_sha256: &payload_sha256,
            },
            now,
        );

        let mut request = self.client.request(method.clone(), url);
        for (name, value) in headers.iter().filter(|(name, _)| name != "host") {
            request = request.header(name.as_str(), value.as_str());
        }
        request = request.header("authorization", authorization);
        if !body.is_empty() || method == Method::PUT {
            request = request.body(body);
        }

        debug!(method = %method, uri = %canonical_uri, "S3 request");

        request.send().await.map_err(|e| {
            AppError::StorageError(format!("{} {} failed: {}", method, canonical_uri, e))
        })
    }

    async fn expect_success(
        &self,
        response: reqwest::Response,
        action: &str,
        key: &str,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = parse_error_message(&body).unwrap_or_else(|| status.to_string());
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "s3://{}/{}: {}",
                self.bucket, key, detail
            )));
        }
        Err(AppError::StorageError(format!(
            "Failed to {} s3://{}/{}: {}",
            action, self.bucket, key, detail
        )))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>> {
        let mut objects = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut query = vec![
                ("list-type".to_string(), "2".to_string()),
                ("prefix".to_string(), prefix.to_string()),
            ];
            if let Some(token) = &token {
                query.push(("continuation-token".to_string(), token.clone()));
            }

            let response = self.send(Method::GET, None, query, Vec::new()).await?;
            let response = self.expect_success(response, "list", prefix).await?;
            let body = response.text().await.map_err(|e| {
                AppError::StorageError(format!("Failed to read list response: {}", e))
            })?;

            let page = parse_list_response(&body)?;
            objects.extend(page.objects);
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        Ok(objects)
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectSummary>> {
        let response = self
            .send(Method::HEAD, Some(key), Vec::new(), Vec::new())
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = self.expect_success(response, "head", key).await?;
        let size = response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        Ok(Some(ObjectSummary {
            key: key.to_string(),
            size,
        }))
    }

    async fn download(&self, key: &str, dest: &Path) -> Result<()> {
        let response = self
            .send(Method::GET, Some(key), Vec::new(), Vec::new())
            .await?;
        let response = self.expect_success(response, "download", key).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::StorageError(format!("Failed to read {}: {}", key, e)))?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }

    async fn upload(&self, src: &Path, key: &str) -> Result<()> {
        let body = tokio::fs::read(src).await.map_err(|e| {
            AppError::IoError(format!("Failed to read {}: {}", src.display(), e))
        })?;
        let response = self
            .send(Method::PUT, Some(key), Vec::new(), body)
            .await?;
        self.expect_success(response, "upload", key).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let response = self
            .send(Method::DELETE, Some(key), Vec::new(), Vec::new())
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        self.expect_success(response, "delete", key).await?;
        Ok(())
    }
}

fn parse_list_response(xml: &str) -> Result<ListPage> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut page = ListPage::default();
    let mut truncated = false;
    let mut path: Vec<String> = Vec::new();
    let mut current: Option<ObjectSummary> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(XmlEvent::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == "Contents" {
                    current = Some(ObjectSummary {
                        key: String::new(),
                        size: 0,
                    });
                }
                path.push(name);
            }
            Ok(XmlEvent::Text(ref t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| AppError::StorageError(format!("Bad list response: {}", e)))?
                    .to_string();
                let parent_is_contents = path.len() >= 2 && path[path.len() - 2] == "Contents";
                match path.last().map(String::as_str) {
                    Some("Key") if parent_is_contents => {
                        if let Some(object) = current.as_mut() {
                            object.key = text;
                        }
                    }
                    Some("Size") if parent_is_contents => {
                        if let Some(object) = current.as_mut() {
                            object.size = text.parse().unwrap_or(0);
                        }
                    }
                    Some("IsTruncated") => truncated = text == "true",
                    Some("NextContinuationToken") => page.next_token = Some(text),
                    _ => {}
                }
            }
            Ok(XmlEvent::End(ref e)) => {
                if e.local_name().as_ref() == b"Contents" {
                    if let Some(object) = current.take() {
                        page.objects.push(object);
                    }
                }
                path.pop();
            }
            Ok(XmlEvent::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(AppError::StorageError(format!(
                    "Bad list response at {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
        buf.clear();
    }

    if !truncated {
        page.next_token = None;
    }
    Ok(page)
}

/// `Code: Message` from an S3 `<Error>` document.
fn parse_error_message(xml: &str) -> Option<String> {
    if !xml.contains("<Error>") {
        return None;
    }

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut element = String::new();
    let mut code = None;
    let mut message = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(XmlEvent::Start(ref e)) => {
                element = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
            }
            Ok(XmlEvent::Text(ref t)) => {
                let text = t.unescape().ok()?.to_string();
                match element.as_str() {
                    "Code" => code = Some(text),
                    "Message" => message = Some(text),
                    _ => {}
                }
            }
            Ok(XmlEvent::End(_)) => element.clear(),
            Ok(XmlEvent::Eof) | Err(_) => break,
            Ok(_) => {}
        }
        buf.clear();
    }

    match (code, message) {
        (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
        (Some(code), None) => Some(code),
        (None, message) => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(endpoint: &str) -> S3Store {
        S3Store::new(
            endpoint,
            "csv-data",
            "us-east-1",
            S3Credentials {
                access_key_id: "minio".to_string(),
                secret_access_key: "minio123".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_path_style_urls() {
        let store = store("http://s3:9000");
        assert_eq!(store.host_header(), "s3:9000");
        assert_eq!(
            store.canonical_uri(Some("incoming/batch 1.csv")),
            "/csv-data/incoming/batch%201.csv"
        );

        let query = vec![
            ("list-type".to_string(), "2".to_string()),
            ("prefix".to_string(), "incoming/".to_string()),
        ];
        let url = store.request_url(&store.canonical_uri(None), &query).unwrap();
        assert_eq!(
            url.as_str(),
            "http://s3:9000/csv-data?list-type=2&prefix=incoming%2F"
        );
    }

    #[test]
    fn test_default_port_is_omitted() {
        let store = store("https://s3.amazonaws.com");
        assert_eq!(store.host_header(), "s3.amazonaws.com");
    }

    #[test]
    fn test_invalid_endpoint() {
        let result = S3Store::new(
            "not a url",
            "b",
            "us-east-1",
            S3Credentials {
                access_key_id: String::new(),
                secret_access_key: String::new(),
            },
        );
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_parse_list_response() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>csv-data</Name>
  <Prefix>incoming/</Prefix>
  <KeyCount>2</KeyCount>
  <MaxKeys>1000</MaxKeys>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>abc==</NextContinuationToken>
  <Contents>
    <Key>incoming/</Key>
    <Size>0</Size>
  </Contents>
  <Contents>
    <Key>incoming/a&amp;b.csv</Key>
    <LastModified>2024-01-01T00:00:00.000Z</LastModified>
    <Size>120</Size>
    <Owner><ID>x</ID></Owner>
  </Contents>
</ListBucketResult>"#;
        let page = parse_list_response(xml).unwrap();
        assert_eq!(page.objects.len(), 2);
        assert_eq!(page.objects[1].key, "incoming/a&b.csv");
        assert_eq!(page.objects[1].size, 120);
        assert_eq!(page.next_token.as_deref(), Some("abc=="));
    }

    #[test]
    fn test_parse_list_response_last_page() {
        let xml = "<ListBucketResult><IsTruncated>false</IsTruncated></ListBucketResult>";
        let page = parse_list_response(xml).unwrap();
        assert!(page.objects.is_empty());
        assert_eq!(page.next_token, None);
    }

    #[test]
    fn test_parse_error_message() {
        let xml = "<Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message></Error>";
        assert_eq!(
            parse_error_message(xml).as_deref(),
            Some("NoSuchKey: The specified key does not exist.")
        );
        assert_eq!(parse_error_message("<ListBucketResult/>"), None);
    }

    mod live {
        use super::*;
        use crate::infrastructure::test_server::TestServer;
        use actix_web::{web, HttpRequest, HttpResponse};
        use chrono::NaiveDateTime;
        use std::sync::Mutex;

        type Seen = web::Data<Mutex<Vec<String>>>;

        fn header(req: &HttpRequest, name: &str) -> String {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        }

        fn query_pairs(req: &HttpRequest) -> Vec<(String, String)> {
            url::form_urlencoded::parse(req.query_string().as_bytes())
                .into_owned()
                .collect()
        }

        /// Re-signs the received request and records whether it matches.
        async fn check_signature(req: HttpRequest, body: web::Bytes, seen: Seen) -> HttpResponse {
            let amz_date = header(&req, "x-amz-date");
            let payload_sha256 = header(&req, "x-amz-content-sha256");
            let now = NaiveDateTime::parse_from_str(&amz_date, "%Y%m%dT%H%M%SZ")
                .unwrap()
                .and_utc();
            let headers = vec![
                ("host".to_string(), header(&req, "host")),
                ("x-amz-content-sha256".to_string(), payload_sha256.clone()),
                ("x-amz-date".to_string(), amz_date),
            ];
            let signer = Signer {
                access_key_id: "minio",
                secret_access_key: "minio123",
                region: "us-east-1",
                service: "s3",
            };
            let expected = signer.authorization(
                &SigningInput {
                    method: req.method().as_str(),
                    canonical_uri: req.uri().path(),
                    query: &query_pairs(&req),
                    headers: &headers,
                    payload_sha256: &payload_sha256,
                },
                now,
            );

            let signed = header(&req, "authorization") == expected;
            let hashed = payload_sha256 == sigv4::sha256_hex(&body);
            seen.lock().unwrap().push(format!(
                "{} {} signed={} hashed={}",
                req.method(),
                req.uri().path(),
                signed,
                hashed
            ));
            HttpResponse::Ok().finish()
        }

        async fn list_pages(req: HttpRequest, seen: Seen) -> HttpResponse {
            let query = query_pairs(&req);
            let token = query
                .iter()
                .find(|(k, _)| k == "continuation-token")
                .map(|(_, v)| v.clone());
            seen.lock()
                .unwrap()
                .push(token.clone().unwrap_or_else(|| "-".to_string()));

            let body = match token.as_deref() {
                None => {
                    "<ListBucketResult><IsTruncated>true</IsTruncated>\
                     <NextContinuationToken>page/2==</NextContinuationToken>\
                     <Contents><Key>incoming/a.csv</Key><Size>10</Size></Contents>\
                     <Contents><Key>incoming/b.csv</Key><Size>20</Size></Contents>\
                     </ListBucketResult>"
                }
                Some("page/2==") => {
                    "<ListBucketResult><IsTruncated>false</IsTruncated>\
                     <Contents><Key>incoming/c.csv</Key><Size>30</Size></Contents>\
                     </ListBucketResult>"
                }
                Some(_) => return HttpResponse::BadRequest().finish(),
            };
            HttpResponse::Ok().content_type("application/xml").body(body)
        }

        async fn missing_or_broken(req: HttpRequest) -> HttpResponse {
            if req.method() == actix_web::http::Method::PUT {
                return HttpResponse::InternalServerError().content_type("application/xml").body(
                    "<Error><Code>InternalError</Code><Message>Disk full</Message></Error>",
                );
            }
            HttpResponse::NotFound().content_type("application/xml").body(
                "<Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message></Error>",
            )
        }

        #[actix_web::test]
        async fn test_requests_are_signed_as_sent() {
            let seen: Seen = web::Data::new(Mutex::new(Vec::new()));
            let data = seen.clone();
            let server = TestServer::start(move |cfg: &mut web::ServiceConfig| {
                cfg.app_data(data.clone())
                    .route("/{tail:.*}", web::route().to(check_signature));
            });

            let dir = tempfile::tempdir().unwrap();
            let src = dir.path().join("batch.csv");
            std::fs::write(&src, "a,b\n1,2\n").unwrap();

            let store = store(&server.url);
            store.upload(&src, "processed/batch 1.csv").await.unwrap();
            store.delete("incoming/batch 1.csv").await.unwrap();
            server.stop().await;

            assert_eq!(
                *seen.lock().unwrap(),
                vec![
                    "PUT /csv-data/processed/batch%201.csv signed=true hashed=true".to_string(),
                    "DELETE /csv-data/incoming/batch%201.csv signed=true hashed=true".to_string(),
                ]
            );
        }

        #[actix_web::test]
        async fn test_list_follows_continuation_token() {
            let seen: Seen = web::Data::new(Mutex::new(Vec::new()));
            let data = seen.clone();
            let server = TestServer::start(move |cfg: &mut web::ServiceConfig| {
                cfg.app_data(data.clone())
                    .route("/csv-data", web::get().to(list_pages));
            });

            let objects = store(&server.url).list("incoming/").await.unwrap();
            server.stop().await;

            let keys: Vec<&str> = objects.iter().map(|o| o.key.as_str()).collect();
            assert_eq!(keys, vec!["incoming/a.csv", "incoming/b.csv", "incoming/c.csv"]);
            assert_eq!(objects[2].size, 30);
            assert_eq!(
                *seen.lock().unwrap(),
                vec!["-".to_string(), "page/2==".to_string()]
            );
        }

        #[actix_web::test]
        async fn test_missing_keys_and_server_errors() {
            let server = TestServer::start(|cfg: &mut web::ServiceConfig| {
                cfg.route("/{tail:.*}", web::route().to(missing_or_broken));
            });
            let store = store(&server.url);

            assert_eq!(store.head("incoming/gone.csv").await.unwrap(), None);
            store.delete("incoming/gone.csv").await.unwrap();

            let dir = tempfile::tempdir().unwrap();
            let err = store
                .download("incoming/gone.csv", &dir.path().join("gone.csv"))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::NotFound(ref msg) if msg.contains("NoSuchKey")));

            let src = dir.path().join("up.csv");
            std::fs::write(&src, "x\n").unwrap();
            let err = store.upload(&src, "processed/up.csv").await.unwrap_err();
            server.stop().await;
            assert_eq!(
                err.to_string(),
                "Storage error: Failed to upload s3://csv-data/processed/up.csv: InternalError: Disk full"
            );
        }
    }
}
