// HTTP implementation of the dashboard backend source
use crate::application::telemetry_source::{PlantRef, TelemetrySource};
use crate::domain::metric::ChartView;
use crate::domain::telemetry::{parse_timestamp, round_value, IrrigationReceipt, TankStatus};
use crate::error::TelemetryError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpTelemetrySource {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TankResponse {
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    time: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IrrigateRequest<'a> {
    subject: &'a str,
    plant_serial: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    percentage: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct IrrigateResponse {
    #[serde(default)]
    percentage_used: Option<f64>,
}

impl HttpTelemetrySource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TelemetryError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| TelemetryError::Request {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self { base_url, client })
    }

    fn build_url(&self, endpoint: &str, params: &[(&str, &str)]) -> String {
        let query: Vec<String> = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect();
        format!("{}/{}?{}", self.base_url, endpoint, query.join("&"))
    }

    fn view_url(&self, plant: &PlantRef, view: ChartView) -> String {
        let mut params = vec![
            ("subject", plant.subject.as_str()),
            ("plant", plant.plant.as_str()),
        ];
        let endpoint = match view {
            ChartView::Raw(metric) => {
                params.push(("metric", metric.as_str()));
                "get_plot"
            }
            ChartView::Historical => "get_historical_trends",
            ChartView::Realtime => "get_realtime_analysis",
        };
        self.build_url(endpoint, &params)
    }

    async fn read_json<T: DeserializeOwned>(
        url: &str,
        response: reqwest::Response,
    ) -> Result<T, TelemetryError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TelemetryError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| TelemetryError::Decode {
                url: url.to_string(),
                source,
            })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, TelemetryError> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|source| TelemetryError::Request {
                url: url.to_string(),
                source,
            })?;
        Self::read_json(url, response).await
    }
}

#[async_trait]
impl TelemetrySource for HttpTelemetrySource {
    async fn fetch_view(
        &self,
        plant: &PlantRef,
        view: ChartView,
    ) -> Result<serde_json::Value, TelemetryError> {
        self.get_json(&self.view_url(plant, view)).await
    }

    async fn fetch_tank_status(&self, plant: &PlantRef) -> Result<TankStatus, TelemetryError> {
        let url = self.build_url(
            "get_latest_tank_status",
            &[("subject", plant.subject.as_str()), ("plant", plant.plant.as_str())],
        );
        let tank: TankResponse = self.get_json(&url).await?;
        Ok(TankStatus {
            level: tank.value.and_then(round_value),
            measured_at: tank.time.as_deref().and_then(parse_timestamp),
        })
    }

    async fn irrigate(
        &self,
        plant: &PlantRef,
        percentage: Option<f64>,
    ) -> Result<IrrigationReceipt, TelemetryError> {
        let url = format!("{}/irrigate", self.base_url);
        let request = IrrigateRequest {
            subject: &plant.subject,
            plant_serial: &plant.plant,
            percentage,
        };
        tracing::debug!("POST {} {:?}", url, request);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|source| TelemetryError::Request {
                url: url.clone(),
                source,
            })?;
        let receipt: IrrigateResponse = Self::read_json(&url, response).await?;
        Ok(IrrigationReceipt {
            percentage_used: receipt.percentage_used,
        })
    }
}
