//! Client for the government planning portal API.
//!
//! A lookup takes three calls: `address` resolves the address to a property
//! id, `layerintersect` lists the planning layers over the lot, and
//! `boundary` returns the lot outline, whose vertex centroid becomes the
//! coordinates. Results are cached per normalized address.

use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{PropertyError, PropertyLookup, PropertyMatch};
use crate::config::PropertyApiConfig;
use crate::model::{Coordinates, PlanningLayer, PropertyData, LEP_LAYER};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const CACHE_CAPACITY: u64 = 1_000;
const MAX_ERROR_BODY_LENGTH: usize = 200;

const PROTECTION_KEYWORDS: &[&str] = &[
    "heritage",
    "bushfire",
    "flood",
    "biodiversity",
    "acid sulfate",
    "riparian",
    "coastal",
    "environmentally sensitive",
];

const EPI_KEYWORDS: &[&str] = &[
    "local environmental plan",
    "zoning",
    "height of building",
    "floor space ratio",
    "lot size",
    "state environmental planning policy",
];

#[derive(Debug, Deserialize)]
struct AddressRecord {
    address: String,
    #[serde(rename = "propId")]
    prop_id: Value,
}

#[derive(Debug, Deserialize)]
struct LayerRecord {
    #[serde(rename = "layerName")]
    layer_name: String,
    #[serde(default)]
    results: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct BoundaryRecord {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(default)]
    rings: Vec<Vec<[f64; 2]>>,
}

pub struct PlanningPortalClient {
    client: Client,
    base_url: String,
    cache: Option<Cache<String, PropertyMatch>>,
}

impl PlanningPortalClient {
    pub fn new(config: &PropertyApiConfig) -> Result<Self, PropertyError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let cache = (config.cache_ttl_secs > 0).then(|| {
            Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(Duration::from_secs(config.cache_ttl_secs))
                .build()
        });

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, PropertyError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("GET {} {:?}", url, query);

        let response = self.client.get(&url).query(query).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY_LENGTH {
                let cut = (0..=MAX_ERROR_BODY_LENGTH)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(PropertyError::Upstream { status, body });
        }

        let value: Value = response.json().await?;
        serde_json::from_value(value)
            .map_err(|e| PropertyError::Malformed(format!("{}: {}", endpoint, e)))
    }

    async fn fetch(&self, address: &str) -> Result<PropertyMatch, PropertyError> {
        let matches: Vec<AddressRecord> = self
            .get_json("address", &[("a", address), ("noOfRecords", "1")])
            .await?;
        let found = matches
            .into_iter()
            .next()
            .ok_or_else(|| PropertyError::AddressNotFound(address.to_string()))?;

        let property_id = match &found.prop_id {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            other => {
                return Err(PropertyError::Malformed(format!(
                    "address: unexpected propId {}",
                    other
                )))
            }
        };

        let layers: Vec<LayerRecord> = self
            .get_json(
                "layerintersect",
                &[("type", "property"), ("id", property_id.as_str()), ("layers", "epi")],
            )
            .await?;

        let boundary: Vec<BoundaryRecord> = self
            .get_json("boundary", &[("id", property_id.as_str()), ("Type", "property")])
            .await?;

        let mut property_data = classify_layers(layers);
        property_data.coordinates = boundary.first().and_then(|b| centroid(&b.geometry));

        Ok(PropertyMatch {
            address: found.address,
            property_id: Some(property_id),
            property_data,
        })
    }
}

#[async_trait]
impl PropertyLookup for PlanningPortalClient {
    async fn lookup(&self, address: &str) -> Result<PropertyMatch, PropertyError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(PropertyError::AddressNotFound(String::new()));
        }
        let key = address.to_lowercase();

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key) {
                log::debug!("Property cache hit for {:?}", address);
                return Ok(hit);
            }
        }

        let found = self.fetch(address).await?;
        log::info!(
            "Resolved {:?} to property {:?} with {} layer(s)",
            address,
            found.property_id,
            found.property_data.all_layers().count()
        );

        if let Some(cache) = &self.cache {
            cache.insert(key, found.clone());
        }
        Ok(found)
    }
}

enum LayerGroup {
    Epi,
    Protection,
    Other,
}

fn group_of(layer_name: &str) -> LayerGroup {
    if layer_name == LEP_LAYER {
        return LayerGroup::Epi;
    }
    let lower = layer_name.to_lowercase();
    if PROTECTION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        LayerGroup::Protection
    } else if EPI_KEYWORDS.iter().any(|k| lower.contains(k)) {
        LayerGroup::Epi
    } else {
        LayerGroup::Other
    }
}

/// One [`PlanningLayer`] per result row, grouped by layer name.
fn classify_layers(records: Vec<LayerRecord>) -> PropertyData {
    let mut data = PropertyData::default();
    for record in records {
        let target = match group_of(&record.layer_name) {
            LayerGroup::Epi => &mut data.epi_layers,
            LayerGroup::Protection => &mut data.protection_layers,
            LayerGroup::Other => &mut data.other_layers,
        };
        if record.results.is_empty() {
            target.push(PlanningLayer::new(record.layer_name));
            continue;
        }
        for attributes in record.results {
            target.push(PlanningLayer {
                layer: record.layer_name.clone(),
                attributes,
            });
        }
    }
    data
}

/// Mean of the outer ring's vertices, ignoring the closing vertex.
fn centroid(geometry: &Geometry) -> Option<Coordinates> {
    let ring = geometry.rings.first()?;
    let points = match ring.split_last() {
        Some((last, rest)) if !rest.is_empty() && rest.first() == Some(last) => rest,
        _ => ring.as_slice(),
    };
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0, 0.0), |(x, y), p| (x + p[0], y + p[1]));
    Some(Coordinates {
        latitude: sum_y / n,
        longitude: sum_x / n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str, cache_ttl_secs: u64) -> PropertyApiConfig {
        PropertyApiConfig {
            enabled: true,
            base_url: base_url.to_string(),
            timeout_secs: 5,
            cache_ttl_secs,
        }
    }

    async fn mount_property(server: &MockServer, expected_address_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/address"))
            .and(query_param("a", "9 Viola Place"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "address": "9 VIOLA PLACE GREYSTANES 2145", "propId": 4242 }
            ])))
            .expect(expected_address_calls)
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/layerintersect"))
            .and(query_param("id", "4242"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "layerName": "Local Environmental Plan",
                    "results": [{ "EPI Name": "Cumberland Local Environmental Plan 2021" }]
                },
                {
                    "layerName": "Land Zoning Map",
                    "results": [{ "Zone": "R2", "Land Use": "Low Density Residential" }]
                },
                {
                    "layerName": "Heritage Map",
                    "results": []
                },
                {
                    "layerName": "Acid Sulfate Soils Map",
                    "results": [{ "Class": "5" }]
                },
                {
                    "layerName": "Local Government Area",
                    "results": [{ "LGA Name": "CUMBERLAND" }]
                }
            ])))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/boundary"))
            .and(query_param("id", "4242"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "geometry": {
                        "rings": [[
                            [150.0, -33.0],
                            [150.2, -33.0],
                            [150.2, -33.2],
                            [150.0, -33.2],
                            [150.0, -33.0]
                        ]]
                    }
                }
            ])))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_lookup_classifies_layers() {
        let server = MockServer::start().await;
        mount_property(&server, 1).await;
        let client = PlanningPortalClient::new(&config(&server.uri(), 0)).unwrap();

        let found = client.lookup("9 Viola Place").await.unwrap();

        assert_eq!(found.address, "9 VIOLA PLACE GREYSTANES 2145");
        assert_eq!(found.property_id.as_deref(), Some("4242"));
        let data = &found.property_data;
        assert_eq!(
            data.lep_name(),
            Some("Cumberland Local Environmental Plan 2021")
        );
        let epi: Vec<&str> = data.epi_layers.iter().map(|l| l.layer.as_str()).collect();
        assert_eq!(epi, vec!["Local Environmental Plan", "Land Zoning Map"]);
        let protection: Vec<&str> = data
            .protection_layers
            .iter()
            .map(|l| l.layer.as_str())
            .collect();
        assert_eq!(protection, vec!["Heritage Map", "Acid Sulfate Soils Map"]);
        assert_eq!(data.other_layers.len(), 1);

        let coords = data.coordinates.unwrap();
        assert!((coords.longitude - 150.1).abs() < 1e-9);
        assert!((coords.latitude + 33.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_lookup_is_cached() {
        let server = MockServer::start().await;
        mount_property(&server, 1).await;
        let client = PlanningPortalClient::new(&config(&server.uri(), 60)).unwrap();

        let first = client.lookup("9 Viola Place").await.unwrap();
        let second = client.lookup("  9 Viola Place ").await.unwrap();
        assert_eq!(first, second);
        // The address mock's expectation of one call is verified on drop.
    }

    #[tokio::test]
    async fn test_unknown_address() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/address"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        let client = PlanningPortalClient::new(&config(&server.uri(), 0)).unwrap();

        let result = client.lookup("1 Nowhere Rd").await;
        assert!(matches!(result, Err(PropertyError::AddressNotFound(_))));
    }

    #[tokio::test]
    async fn test_upstream_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/address"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;
        let client = PlanningPortalClient::new(&config(&server.uri(), 0)).unwrap();

        match client.lookup("9 Viola Place").await {
            Err(PropertyError::Upstream { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("Expected upstream error, got {:?}", other),
        }
    }

    #[test]
    fn test_centroid_of_empty_geometry() {
        assert!(centroid(&Geometry { rings: vec![] }).is_none());
        assert!(centroid(&Geometry {
            rings: vec![vec![]]
        })
        .is_none());
    }
}
