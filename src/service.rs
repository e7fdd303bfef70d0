//! Pass-through service behind the HTTP verb endpoints.
//!
//! Every operation is a pure function of its input.

use crate::model::{RequestData, ResponseData};

/// Stateless service wrapping inputs into response envelopes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpService;

impl HttpService {
    pub fn new() -> Self {
        Self
    }

    pub fn handle_get(&self, param: &str) -> ResponseData {
        ResponseData::success(format!("GET param: {param}"))
    }

    pub fn handle_post(&self, request: &RequestData) -> ResponseData {
        verb_message("POST", request)
    }

    pub fn handle_put(&self, request: &RequestData) -> ResponseData {
        verb_message("PUT", request)
    }

    pub fn handle_patch(&self, request: &RequestData) -> ResponseData {
        verb_message("PATCH", request)
    }

    /// DELETE answers with plain text rather than an envelope.
    pub fn handle_delete(&self, id: &str) -> String {
        format!("Deleted ID: {id}")
    }
}

fn verb_message(verb: &str, request: &RequestData) -> ResponseData {
    ResponseData::success(format!("{verb} value: {}", request.value))
}
