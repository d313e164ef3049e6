use serde_json::{json, Map, Value as JsonValue};

use crate::client::error::KintoResult;
use crate::client::{Operation, OperationMethod};
use crate::model::KintoModel;

/// Arguments of a direct record call against the resource client.
#[derive(Clone, Debug, PartialEq)]
pub struct CrudPayload {
    pub bucket: String,
    pub collection: String,
    pub data: Map<String, JsonValue>,
}

/// Renders a model into the coordinates and data of a single CRUD call.
///
/// Pure: the model is only read and nothing is sent.
pub fn to_crud_payload<M: KintoModel>(model: &M) -> KintoResult<CrudPayload> {
    let config = M::config();
    config.validate()?;
    Ok(CrudPayload {
        data: model.fields()?,
        bucket: config.bucket().to_owned(),
        collection: config.collection().to_owned(),
    })
}

/// Renders a model into a batch descriptor.
///
/// Descriptors are always record creations, even for a model that already has an
/// `id`; batched updates and deletes are not supported.
pub fn to_operation<M: KintoModel>(model: &M) -> KintoResult<Operation> {
    let config = M::config();
    config.validate()?;
    Ok(Operation {
        method: OperationMethod::Post,
        path: config.records_path(),
        body: Some(json!({ "data": model.fields()? })),
    })
}
