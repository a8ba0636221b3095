//! Error views written by the orchestrator on behalf of a failing service.
use crate::mmif::{Document, ERROR_PROPERTY};
use serde_json::json;

/// Copy `last_good` and append one view owned by `identity` whose metadata
/// records `message` as its error.
pub fn synthesize(last_good: &Document, identity: &str, message: &str) -> Document {
    let mut document = last_good.clone();
    let view = document.new_view();
    view.set_app_identifier(identity);
    view.set_property(ERROR_PROPERTY, json!({ "message": message }));
    document
}
