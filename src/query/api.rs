use std::sync::LazyLock;

use serde_json::json;

use crate::client::error::{invalid_argument, KintoResult};
use crate::client::{KintoResponse, ResourceClient};
use crate::logger::Logger;
use crate::model::{KintoModel, ModelConfig};
use crate::query::spec::QuerySpec;

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@kinto/query"));

/// Selects what [`Query::get`] reads. Exactly one field may be set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GetOptions {
    pub record_id: Option<String>,
    pub record_ids: Option<Vec<String>>,
    pub limit: Option<u64>,
}

impl GetOptions {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            record_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn by_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            record_ids: Some(ids.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn with_limit(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }

    fn selected_modes(&self) -> usize {
        [
            self.record_id.is_some(),
            self.record_ids.is_some(),
            self.limit.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}

/// Read access to one collection.
#[derive(Clone, Debug)]
pub struct Query<C> {
    client: C,
    config: ModelConfig,
}

impl<C: ResourceClient> Query<C> {
    pub fn new(
        client: C,
        bucket: impl Into<String>,
        collection: impl Into<String>,
    ) -> KintoResult<Self> {
        let config = ModelConfig::new(bucket, collection);
        config.validate()?;
        Ok(Self { client, config })
    }

    /// Query over the collection a model type is stored in.
    pub fn for_model<M: KintoModel>(client: C) -> KintoResult<Self> {
        let config = M::config();
        config.validate()?;
        Ok(Self { client, config })
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn bucket(&self) -> &str {
        self.config.bucket()
    }

    pub fn collection(&self) -> &str {
        self.config.collection()
    }

    /// Reads a single record, a set of records by id, or the first `limit` records.
    ///
    /// With no mode selected nothing is sent and `Ok(None)` is returned. Selecting more
    /// than one mode is rejected before any request.
    pub fn get(&self, options: GetOptions) -> KintoResult<Option<KintoResponse>> {
        if options.selected_modes() > 1 {
            return Err(invalid_argument(
                "Query::get accepts only one of record_id, record_ids or limit",
            ));
        }

        let GetOptions {
            record_id,
            record_ids,
            limit,
        } = options;

        if let Some(id) = record_id {
            return self
                .client
                .get_record(self.bucket(), self.collection(), &id)
                .map(Some);
        }

        if let Some(ids) = record_ids {
            if ids.is_empty() {
                return Err(invalid_argument("Query::get needs at least one record id"));
            }
            let query = vec![("in_id".to_string(), ids.join(","))];
            return self.list(&query).map(Some);
        }

        if let Some(limit) = limit {
            let query = vec![("_limit".to_string(), limit.to_string())];
            return self.list(&query).map(Some);
        }

        Ok(None)
    }

    /// Lists records matching `spec`.
    ///
    /// The reserved keys are removed from `spec`; what remains are the pass-through
    /// filters that were sent.
    pub fn filter(&self, spec: &mut QuerySpec) -> KintoResult<KintoResponse> {
        let query = spec.render()?;
        self.list(&query)
    }

    fn list(&self, query: &[(String, String)]) -> KintoResult<KintoResponse> {
        LOGGER.debug_with(
            "listing records",
            json!({
                "bucket": self.bucket(),
                "collection": self.collection(),
                "query": query,
            }),
        );
        self.client
            .list_records(self.bucket(), self.collection(), query)
    }
}
