use crate::error::{ApiError, ApiResult};
use crate::records::{EntityRecord, ItemRecord, PriceRecord, WireItem, WirePrice};
use crate::throttle::Throttle;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Most ids the API accepts in one `ids=` request.
pub const BATCH_LIMIT: usize = 200;

/// Schema version that exposes the numeric profession `code`.
const PROFESSION_SCHEMA: &str = "2019-12-19T00:00:00.000Z";

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub request_spacing: Duration,
    pub timeout: Duration,
    pub lang: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: "https://api.guildwars2.com/v2".into(),
            request_spacing: Duration::from_millis(100),
            timeout: Duration::from_secs(10),
            lang: None,
        }
    }
}

pub struct RemoteDataClient {
    http: reqwest::Client,
    base_url: String,
    lang: Option<String>,
    throttle: Throttle,
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl RemoteDataClient {
    pub fn new(options: ClientOptions) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(concat!("lodestar/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: options.base_url.trim_end_matches('/').to_owned(),
            lang: options.lang,
            throttle: Throttle::new(options.request_spacing),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        let url = format!("{}/{}", self.base_url, path);
        let mut request = self.http.get(&url).query(query);
        if let Some(lang) = &self.lang {
            request = request.query(&[("lang", lang)]);
        }

        let value: Value = self
            .throttle
            .run(async {
                let response = request.send().await?;
                let status = response.status();
                // 206 is how the API reports a batch with some unknown ids.
                if !status.is_success() {
                    return Err(ApiError::Status {
                        url: url.clone(),
                        status: status.as_u16(),
                    });
                }
                Ok::<_, ApiError>(response.json::<Value>().await?)
            })
            .await?;

        debug!(%url, "fetched");
        Ok(serde_json::from_value(value)?)
    }

    /// Fetch `ids` in chunks of `BATCH_LIMIT`. A failed chunk is logged and
    /// skipped; the other chunks still count.
    async fn get_chunked(&self, path: &str, ids: &[u32]) -> Vec<Value> {
        let mut out = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(BATCH_LIMIT) {
            match self
                .get_json::<Vec<Value>>(path, &[("ids", join_ids(chunk))])
                .await
            {
                Ok(values) => out.extend(values),
                Err(e) => warn!(
                    path,
                    first = chunk[0],
                    len = chunk.len(),
                    error = %e,
                    "batch fetch failed"
                ),
            }
        }
        out
    }

    async fn get_entity(&self, path: &str, id: u32) -> Option<EntityRecord> {
        match self
            .get_json::<Value>(&format!("{path}/{id}"), &[])
            .await
        {
            Ok(value) => {
                let record = EntityRecord::from_object(value, "id");
                if record.is_none() {
                    warn!(path, id, "response missing id or name");
                }
                record
            }
            Err(e) => {
                warn!(path, id, error = %e, "fetch failed");
                None
            }
        }
    }

    async fn get_entities(&self, path: &str, ids: &[u32]) -> Vec<EntityRecord> {
        self.get_chunked(path, ids)
            .await
            .into_iter()
            .filter_map(|v| EntityRecord::from_object(v, "id"))
            .collect()
    }

    /// Professions are keyed by name upstream; the numeric `code` is what the
    /// link identity carries.
    pub async fn fetch_profession(&self, code: u32) -> Option<EntityRecord> {
        let query = [
            ("ids", "all".to_owned()),
            ("v", PROFESSION_SCHEMA.to_owned()),
        ];
        match self.get_json::<Vec<Value>>("professions", &query).await {
            Ok(all) => all
                .into_iter()
                .filter_map(|v| EntityRecord::from_object(v, "code"))
                .find(|p| p.id == code),
            Err(e) => {
                warn!(code, error = %e, "profession fetch failed");
                None
            }
        }
    }

    pub async fn fetch_specialization(&self, id: u32) -> Option<EntityRecord> {
        self.get_entity("specializations", id).await
    }

    pub async fn fetch_specializations(&self, ids: &[u32]) -> Vec<EntityRecord> {
        self.get_entities("specializations", ids).await
    }

    pub async fn fetch_map(&self, id: u32) -> Option<EntityRecord> {
        self.get_entity("maps", id).await
    }

    pub async fn fetch_maps(&self, ids: &[u32]) -> Vec<EntityRecord> {
        self.get_entities("maps", ids).await
    }

    /// Every id listed on the trading post.
    pub async fn fetch_tradeable_ids(&self) -> Option<Vec<u32>> {
        match self.get_json::<Vec<u32>>("commerce/prices", &[]).await {
            Ok(ids) => Some(ids),
            Err(e) => {
                warn!(error = %e, "tradeable id list fetch failed");
                None
            }
        }
    }

    pub async fn fetch_items(&self, ids: &[u32]) -> Vec<ItemRecord> {
        self.get_chunked("items", ids)
            .await
            .into_iter()
            .filter_map(|v| serde_json::from_value::<WireItem>(v).ok())
            .map(ItemRecord::from)
            .collect()
    }

    pub async fn fetch_price(&self, id: u32) -> Option<PriceRecord> {
        match self
            .get_json::<WirePrice>(&format!("commerce/prices/{id}"), &[])
            .await
        {
            Ok(wire) => Some(wire.into()),
            Err(e) => {
                warn!(id, error = %e, "price fetch failed");
                None
            }
        }
    }

    pub async fn fetch_prices(&self, ids: &[u32]) -> Vec<PriceRecord> {
        self.get_chunked("commerce/prices", ids)
            .await
            .into_iter()
            .filter_map(|v| serde_json::from_value::<WirePrice>(v).ok())
            .map(PriceRecord::from)
            .collect()
    }
}
