use std::collections::BTreeSet;
use std::sync::LazyLock;

use serde_json::json;

use crate::client::error::{configuration_error, decode_error, invalid_argument, KintoResult};
use crate::client::{BatchResponse, KintoResponse, Operation, ResourceClient};
use crate::logger::Logger;
use crate::model::{to_crud_payload, to_operation, KintoModel, ModelConfig, RecordMeta};

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@kinto/gateway"));

/// Runs model-level interactions against a [`ResourceClient`].
///
/// The gateway provisions buckets and collections, writes single records while keeping
/// each model's server-assigned `id`/`last_modified` in sync, and submits batches.
#[derive(Clone, Debug)]
pub struct Gateway<C> {
    client: C,
}

impl<C: ResourceClient> Gateway<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }

    /// Creates every distinct bucket referenced by `configs`.
    ///
    /// Safe to repeat: an existing bucket is accepted by the client. Every config is
    /// validated before the first request is sent.
    pub fn ensure_buckets<I>(&self, configs: I) -> KintoResult<Vec<KintoResponse>>
    where
        I: IntoIterator<Item = ModelConfig>,
    {
        let configs = validated(configs)?;
        let mut seen = BTreeSet::new();
        let buckets: Vec<&str> = configs
            .iter()
            .map(ModelConfig::bucket)
            .filter(|bucket| seen.insert(*bucket))
            .collect();

        buckets
            .into_iter()
            .map(|bucket| {
                LOGGER.info_with("ensuring bucket", json!({ "bucket": bucket }));
                self.client.create_bucket(bucket)
            })
            .collect()
    }

    /// Creates the collection of every config, one call per config.
    pub fn ensure_collections<I>(&self, configs: I) -> KintoResult<Vec<KintoResponse>>
    where
        I: IntoIterator<Item = ModelConfig>,
    {
        validated(configs)?
            .iter()
            .map(|config| {
                LOGGER.info_with(
                    "ensuring collection",
                    json!({ "bucket": config.bucket(), "collection": config.collection() }),
                );
                self.client
                    .create_collection(config.bucket(), config.collection())
            })
            .collect()
    }

    /// Stores `model` as a new record and copies the assigned identity back onto it.
    pub fn create_record<M: KintoModel>(&self, model: &mut M) -> KintoResult<KintoResponse> {
        let payload = to_crud_payload(model)?;
        let response =
            self.client
                .create_record(&payload.bucket, &payload.collection, payload.data)?;
        model.meta_mut().apply(response.data_object()?)?;
        LOGGER.debug_with(
            "created record",
            json!({
                "bucket": payload.bucket,
                "collection": payload.collection,
                "id": model.id(),
            }),
        );
        Ok(response)
    }

    /// Replaces the stored record of a saved `model` and refreshes its revision.
    pub fn update_record<M: KintoModel>(&self, model: &mut M) -> KintoResult<KintoResponse> {
        let id = require_id(model, "update")?;
        let payload = to_crud_payload(model)?;
        let response = self.client.update_record(
            &payload.bucket,
            &payload.collection,
            &id,
            payload.data,
        )?;
        model.meta_mut().apply(response.data_object()?)?;
        LOGGER.debug_with(
            "updated record",
            json!({
                "bucket": payload.bucket,
                "collection": payload.collection,
                "id": id,
            }),
        );
        Ok(response)
    }

    /// Deletes the stored record of a saved `model`.
    ///
    /// The model itself is left untouched, including its `id`.
    pub fn delete_record<M: KintoModel>(&self, model: &M) -> KintoResult<KintoResponse> {
        let id = require_id(model, "delete")?;
        let config = M::config();
        config.validate()?;
        let response = self
            .client
            .delete_record(config.bucket(), config.collection(), &id)?;
        LOGGER.debug_with(
            "deleted record",
            json!({
                "bucket": config.bucket(),
                "collection": config.collection(),
                "id": id,
            }),
        );
        Ok(response)
    }

    /// Submits one record creation per model, in order, as a single batch request.
    ///
    /// Sub-responses are not checked nor applied to the models; see
    /// [`sync_batch_results`] for the latter.
    pub fn batch<M: KintoModel>(&self, models: &[M]) -> KintoResult<BatchResponse> {
        let operations = models
            .iter()
            .map(to_operation)
            .collect::<KintoResult<Vec<_>>>()?;
        self.batch_operations(operations)
    }

    /// Submits already rendered operations, which may target different model types.
    pub fn batch_operations(&self, operations: Vec<Operation>) -> KintoResult<BatchResponse> {
        if operations.is_empty() {
            return Ok(BatchResponse::default());
        }

        let submitted = operations.len();
        let response = self.client.batch(operations)?;
        if response.len() != submitted {
            return Err(decode_error(format!(
                "Batch response has {} sub-responses for {submitted} operations",
                response.len()
            )));
        }

        let failures = response.failures();
        if !failures.is_empty() {
            let statuses: Vec<_> = failures
                .iter()
                .map(|(index, sub)| json!({ "index": index, "status": sub.status }))
                .collect();
            LOGGER.warn_with(
                format!("{} of {submitted} batched operations failed", failures.len()),
                json!(statuses),
            );
        }
        Ok(response)
    }
}

/// Copies the identities assigned by a batch of creations back onto `models`.
///
/// `models` must be the slice passed to [`Gateway::batch`]. Failed sub-responses are
/// skipped and their models stay unsaved. Returns how many models were updated.
pub fn sync_batch_results<M: KintoModel>(
    models: &mut [M],
    response: &BatchResponse,
) -> KintoResult<usize> {
    if models.len() != response.len() {
        return Err(invalid_argument(format!(
            "Cannot match {} models against {} batch sub-responses",
            models.len(),
            response.len()
        )));
    }

    // Decode every identity first so a bad sub-response leaves all models untouched.
    let mut identities = Vec::with_capacity(models.len());
    for sub in response.iter() {
        match sub.data().filter(|_| sub.is_success()) {
            Some(data) => {
                let mut meta = RecordMeta::default();
                meta.apply(data)?;
                identities.push(Some(meta));
            }
            None => identities.push(None),
        }
    }

    let mut synced = 0;
    for (model, identity) in models.iter_mut().zip(identities) {
        if let Some(meta) = identity {
            *model.meta_mut() = meta;
            synced += 1;
        }
    }
    Ok(synced)
}

fn validated<I>(configs: I) -> KintoResult<Vec<ModelConfig>>
where
    I: IntoIterator<Item = ModelConfig>,
{
    let configs: Vec<ModelConfig> = configs.into_iter().collect();
    for config in &configs {
        config.validate()?;
    }
    Ok(configs)
}

fn require_id<M: KintoModel>(model: &M, action: &str) -> KintoResult<String> {
    model.id().map(str::to_owned).ok_or_else(|| {
        let config = M::config();
        configuration_error(format!(
            "Cannot {action} a record of `{}/{}` that was never created (missing id)",
            config.bucket(),
            config.collection()
        ))
    })
}
