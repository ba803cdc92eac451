//! True-color Sentinel-2 acquisition through the Sentinel Hub Process API.
//!
//! Authentication uses the OAuth2 client-credentials grant. The process request
//! asks for a single PNG rendering of bands B04/B03/B02 with a brightness gain,
//! which is then decoded like any local image.

use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use crate::carbon_pipeline::common::error::{EstimationError, Result};
use crate::carbon_pipeline::source::local_source::LocalImageSource;
use crate::carbon_pipeline::source::reader::ImageSource;
use crate::carbon_pipeline::source::sentinel_config::SentinelHubConfig;
use crate::carbon_pipeline::source::types::{AreaOfInterest, DecodedImage, ImageDescriptor};

const WGS84_CRS: &str = "http://www.opengis.net/def/crs/EPSG/0/4326";
const COLLECTION: &str = "sentinel-2-l2a";

/// Red, green and blue reflectance scaled for display, green boosted and blue
/// damped for lush vegetation; alpha carries the data mask.
const TRUE_COLOR_EVALSCRIPT: &str = r#"//VERSION=3
function setup() {
    return {
        input: ["B04", "B03", "B02", "dataMask"],
        output: { bands: 4 }
    };
}

function evaluatePixel(sample) {
    let gain = 3.0;
    return [
        sample.B04 * gain,
        sample.B03 * gain * 1.1,
        sample.B02 * gain * 0.9,
        sample.dataMask
    ];
}
"#;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct SentinelHubSource {
    config: SentinelHubConfig,
    client: Client,
    local: LocalImageSource,
}

impl SentinelHubSource {
    pub fn new(config: SentinelHubConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EstimationError::NetworkError(e.to_string()))?;
        Ok(Self {
            config,
            client,
            local: LocalImageSource,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(SentinelHubConfig::from_env()?)
    }

    pub fn config(&self) -> &SentinelHubConfig {
        &self.config
    }

    /// JSON body of a Process API request for `area`.
    pub fn process_request_body(&self, area: &AreaOfInterest) -> Value {
        let (from, to) = area.time_range.to_rfc3339();
        json!({
            "input": {
                "bounds": {
                    "bbox": area.bbox.to_array(),
                    "properties": { "crs": WGS84_CRS }
                },
                "data": [{
                    "type": COLLECTION,
                    "dataFilter": {
                        "timeRange": { "from": from, "to": to },
                        "maxCloudCoverage": area.max_cloud_coverage
                    }
                }]
            },
            "output": {
                "width": self.config.output_width,
                "height": self.config.output_height,
                "responses": [{
                    "identifier": "default",
                    "format": { "type": "image/png" }
                }]
            },
            "evalscript": TRUE_COLOR_EVALSCRIPT
        })
    }

    #[instrument(skip(self))]
    fn request_token(&self) -> Result<String> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret()),
            ])
            .send()
            .map_err(|e| EstimationError::NetworkError(e.to_string()))?;

        let response = ensure_success(response)?;
        let token: TokenResponse = response.json().map_err(|e| {
            EstimationError::NetworkError(format!("malformed token response: {}", e))
        })?;

        debug!("Access token obtained");
        Ok(token.access_token)
    }

    /// Downloads and decodes the true-color rendering of `area`.
    ///
    /// # Errors
    ///
    /// * `ConfigError` - `area` is not a valid request
    /// * `AcquisitionError` - the provider answered with a non-success status
    /// * `NetworkError` - the request could not be sent or read
    /// * `InvalidImage` - the response body is not a decodable image
    #[instrument(skip(self, area), fields(bbox = ?area.bbox.to_array()))]
    pub fn fetch_area(&self, area: &AreaOfInterest) -> Result<DecodedImage> {
        area.validate()?;

        let token = self.request_token()?;
        let body = self.process_request_body(area);

        info!("Requesting Sentinel-2 true-color image");
        let response = self
            .client
            .post(&self.config.process_url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .map_err(|e| EstimationError::NetworkError(e.to_string()))?;

        let bytes = ensure_success(response)?
            .bytes()
            .map_err(|e| EstimationError::NetworkError(e.to_string()))?;

        debug!("Received {} bytes of imagery", bytes.len());
        self.local.decode(&bytes)
    }
}

impl ImageSource for SentinelHubSource {
    fn fetch(&self, descriptor: &ImageDescriptor) -> Result<DecodedImage> {
        match descriptor {
            ImageDescriptor::AreaOfInterest(area) => self.fetch_area(area),
            other => self.local.fetch(other),
        }
    }
}

fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().unwrap_or_default();
    Err(EstimationError::AcquisitionError {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carbon_pipeline::source::types::{BoundingBox, TimeRange};
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::{Cursor, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    struct CannedResponse {
        status: u16,
        content_type: &'static str,
        body: Vec<u8>,
    }

    /// Serves `responses` in order, one per connection, and returns the raw requests.
    fn serve(responses: Vec<CannedResponse>) -> (String, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let mut requests = Vec::new();
            for response in responses {
                let (mut stream, _) = listener.accept().unwrap();
                requests.push(read_request(&mut stream));
                let head = format!(
                    "HTTP/1.1 {} Canned\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    response.status,
                    response.content_type,
                    response.body.len()
                );
                stream.write_all(head.as_bytes()).unwrap();
                stream.write_all(&response.body).unwrap();
                stream.flush().unwrap();
            }
            requests
        });
        (format!("http://{}", addr), handle)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_string();
                let content_length = head
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    fn source_for(base: &str) -> SentinelHubSource {
        let config = SentinelHubConfig::builder()
            .client_id("test-client")
            .client_secret("test-secret")
            .token_url(format!("{}/oauth/token", base))
            .process_url(format!("{}/api/v1/process", base))
            .output_size(64, 32)
            .build()
            .unwrap();
        SentinelHubSource::new(config).unwrap()
    }

    fn area() -> AreaOfInterest {
        AreaOfInterest::new(BoundingBox::new(-60.1, -3.2, -59.9, -3.0))
    }

    fn token_ok() -> CannedResponse {
        CannedResponse {
            status: 200,
            content_type: "application/json",
            body: br#"{"access_token":"tok-42","expires_in":3600,"token_type":"Bearer"}"#.to_vec(),
        }
    }

    #[test]
    fn test_process_request_body_shape() {
        let source = source_for("http://127.0.0.1:9");
        let area = area()
            .with_max_cloud_coverage(35.0)
            .with_time_range(TimeRange::from_rfc3339("2025-06-01T00:00:00Z", "2025-06-30T23:59:59Z").unwrap());
        let body = source.process_request_body(&area);

        assert_eq!(body["input"]["bounds"]["bbox"], json!([-60.1, -3.2, -59.9, -3.0]));
        assert_eq!(body["input"]["bounds"]["properties"]["crs"], WGS84_CRS);
        assert_eq!(body["input"]["data"][0]["type"], "sentinel-2-l2a");
        assert_eq!(body["input"]["data"][0]["dataFilter"]["maxCloudCoverage"], 35.0);
        assert_eq!(
            body["input"]["data"][0]["dataFilter"]["timeRange"]["from"],
            "2025-06-01T00:00:00Z"
        );
        assert_eq!(body["output"]["width"], 64);
        assert_eq!(body["output"]["height"], 32);
        assert_eq!(body["output"]["responses"][0]["format"]["type"], "image/png");
        assert!(body["evalscript"].as_str().unwrap().contains("B04"));
    }

    #[test]
    fn test_token_rejection_surfaces_status_and_body() {
        let (base, server) = serve(vec![CannedResponse {
            status: 401,
            content_type: "application/json",
            body: br#"{"error":"invalid_client"}"#.to_vec(),
        }]);

        let err = source_for(&base).fetch_area(&area()).unwrap_err();
        match err {
            EstimationError::AcquisitionError { status, message } => {
                assert_eq!(status, 401);
                assert!(message.contains("invalid_client"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let requests = server.join().unwrap();
        assert!(requests[0].starts_with("POST /oauth/token"));
        assert!(requests[0].contains("grant_type=client_credentials"));
        assert!(requests[0].contains("client_id=test-client"));
    }

    #[test]
    fn test_malformed_token_body_reports_decode_failure() {
        let (base, server) = serve(vec![CannedResponse {
            status: 200,
            content_type: "application/json",
            body: b"<html>maintenance</html>".to_vec(),
        }]);

        let err = source_for(&base).fetch_area(&area()).unwrap_err();
        assert!(matches!(err, EstimationError::NetworkError(ref m) if m.contains("token")));
        server.join().unwrap();
    }

    #[test]
    fn test_process_rejection_surfaces_status() {
        let (base, server) = serve(vec![
            token_ok(),
            CannedResponse {
                status: 400,
                content_type: "application/json",
                body: br#"{"error":{"message":"No data found"}}"#.to_vec(),
            },
        ]);

        let err = source_for(&base).fetch_area(&area()).unwrap_err();
        assert!(matches!(
            err,
            EstimationError::AcquisitionError { status: 400, ref message } if message.contains("No data found")
        ));

        let requests = server.join().unwrap();
        assert!(requests[1].starts_with("POST /api/v1/process"));
        assert!(requests[1].to_ascii_lowercase().contains("authorization: bearer tok-42"));
    }

    #[test]
    fn test_successful_fetch_decodes_png() {
        let mut png = Cursor::new(Vec::new());
        RgbaImage::from_pixel(8, 4, Rgba([20, 180, 30, 255]))
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();

        let (base, server) = serve(vec![
            token_ok(),
            CannedResponse {
                status: 200,
                content_type: "image/png",
                body: png.into_inner(),
            },
        ]);

        let image = source_for(&base).fetch(&area().into()).unwrap();
        assert_eq!((image.width(), image.height()), (8, 4));
        server.join().unwrap();
    }

    #[test]
    fn test_invalid_area_is_rejected_before_any_request() {
        let source = source_for("http://127.0.0.1:9");
        let bad = AreaOfInterest::new(BoundingBox::new(1.0, 1.0, 0.0, 0.0));
        let err = source.fetch_area(&bad).unwrap_err();
        assert!(matches!(err, EstimationError::ConfigError(_)));
    }
}
