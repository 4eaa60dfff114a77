//! Retrieval of the annotation records of a base item

use crate::error::AnnotateResult;
use crate::models::{Annotation, AnnotationSummary};
use crate::registry::{decode_reply, RegistryClient};

/// Fetch every annotation record of `item_id`, in registry order.
///
/// The bulk `annotation/item/<id>` endpoint is tried first. Registries that
/// reject it as a bad request (HTTP 400) are queried record by record
/// instead: the summary listing, then one call per annotation id. Any other
/// failure is returned as is.
pub fn fetch_annotations<C: RegistryClient + ?Sized>(
    client: &C,
    item_id: &str,
) -> AnnotateResult<Vec<Annotation>> {
    let path = format!("annotation/item/{}", item_id);
    match client.get(&path, &[]) {
        Ok(reply) => {
            let annotations: Vec<Annotation> = decode_reply(&path, reply)?;
            tracing::info!(item = item_id, count = annotations.len(), "fetched annotations");
            Ok(annotations)
        }
        Err(e) if e.is_client_error() => {
            tracing::warn!(
                item = item_id,
                "bulk annotation fetch rejected ({}), fetching one by one",
                e
            );
            fetch_one_by_one(client, item_id)
        }
        Err(e) => Err(e.into()),
    }
}

fn fetch_one_by_one<C: RegistryClient + ?Sized>(
    client: &C,
    item_id: &str,
) -> AnnotateResult<Vec<Annotation>> {
    let reply = client.get("annotation", &[("itemId", item_id), ("limit", "0")])?;
    let summaries: Vec<AnnotationSummary> = decode_reply("annotation", reply)?;

    let mut annotations = Vec::with_capacity(summaries.len());
    for summary in &summaries {
        let path = format!("annotation/{}", summary.id);
        annotations.push(decode_reply::<Annotation>(&path, client.get(&path, &[])?)?);
    }

    tracing::info!(item = item_id, count = annotations.len(), "fetched annotations individually");
    Ok(annotations)
}
