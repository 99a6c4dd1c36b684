//! The catch-all echo application.

use std::error::Error;

use http::{header, Method, Request, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{body::Body, record::RequestRecord, App};

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE";

/// Handles every path with GET, POST, PUT and DELETE: logs the request to
/// stdout and answers with a fixed JSON acknowledgement. Other methods get
/// a 405 with an `Allow` header.
#[derive(Clone, Copy, Default)]
pub struct EchoApp;

#[derive(Serialize)]
struct Ack<'a> {
    message: String,
    path: &'a str,
}

fn is_supported(method: &Method) -> bool {
    *method == Method::GET
        || *method == Method::POST
        || *method == Method::PUT
        || *method == Method::DELETE
}

impl App for EchoApp {
    type Body = Body;
    type Error = Box<dyn Error + Send + Sync>;

    fn handle(&self, req: Request<Body>) -> Result<Response<Body>, Self::Error> {
        if !is_supported(req.method()) {
            debug!(method = %req.method(), path = req.uri().path(), "method not allowed");
            return Ok(Response::builder()
                .status(StatusCode::METHOD_NOT_ALLOWED)
                .header(header::ALLOW, ALLOWED_METHODS)
                .body(Body::empty())?);
        }

        let record = RequestRecord::new(req.method(), req.uri(), req.headers(), req.body());
        if let Err(err) = record.log() {
            warn!(%err, "failed to write request log");
        }

        let ack = Ack {
            message: format!("Handled {}", req.method()),
            path: req.uri().path(),
        };

        Ok(Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&ack)?))?)
    }
}
