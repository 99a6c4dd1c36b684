#![doc = include_str!("../README.md")]

pub mod body;
pub mod config;
mod connection;
pub mod echo;
pub mod record;
mod request;
mod response;
pub mod server;

use std::{
    error::Error,
    io::{self, BufReader, BufWriter, Write},
};

pub use body::Body;
pub use connection::Connection;
use headers::HeaderMapExt;
use http::HeaderValue;
pub use http::{header, Method, Request, Response, StatusCode, Uri, Version};
use request::ParseError;
pub use server::Server;

type IncomingRequest = Request<Body>;

/// Maps [`Request`]s to [`Response`]s.
///
/// Usually you don't need to manually implement this trait, as its `Fn`
/// implementation might suffice most of the needs.
///
/// ```no_run
/// # use std::convert::Infallible;
/// # use parrot::{Body, Request, Response, Server, StatusCode};
/// fn app(req: Request<Body>) -> Result<Response<Body>, Infallible> {
///     Ok(Response::builder()
///         .status(StatusCode::OK)
///         .body(Body::empty())
///         .unwrap())
/// }
///
/// fn main() -> std::io::Result<()> {
///     Server::bind("0.0.0.0:4567").serve(app)
/// }
/// ```
///
/// Implementing the trait directly lets you reject `Expect: 100-continue`
/// requests before their body is read:
/// ```no_run
/// # use std::convert::Infallible;
/// # use headers::HeaderMapExt;
/// # use parrot::{App, Body, Request, Response, Server, StatusCode};
/// #[derive(Clone)]
/// struct UploadHandler {
///     max_length: u64,
/// }
///
/// impl App for UploadHandler {
///     type Body = &'static str;
///     type Error = Infallible;
///
///     fn handle(&self, _req: Request<Body>) -> Result<Response<Self::Body>, Self::Error> {
///         Ok(Response::builder()
///             .status(StatusCode::OK)
///             .body("Thanks for the info!")
///             .unwrap())
///     }
///
///     fn should_continue(&self, head: &Request<()>) -> StatusCode {
///         match head.headers().typed_get::<headers::ContentLength>() {
///             Some(len) if len.0 <= self.max_length => StatusCode::CONTINUE,
///             _ => StatusCode::EXPECTATION_FAILED,
///         }
///     }
/// }
///
/// fn main() -> std::io::Result<()> {
///     Server::bind("0.0.0.0:4567").serve(UploadHandler { max_length: 1024 })
/// }
/// ```
pub trait App {
    type Body: Into<Body>;
    type Error: Into<Box<dyn Error + Send + Sync>>;

    fn handle(&self, request: IncomingRequest) -> Result<Response<Self::Body>, Self::Error>;

    fn should_continue(&self, _: &Request<()>) -> StatusCode {
        StatusCode::CONTINUE
    }
}

impl<F, B, Err> App for F
where
    F: Fn(IncomingRequest) -> Result<Response<B>, Err>,
    F: Sync + Send,
    F: Clone,
    B: Into<Body>,
    Err: Into<Box<dyn Error + Send + Sync>>,
{
    type Body = B;
    type Error = Err;

    fn handle(&self, request: IncomingRequest) -> Result<Response<Self::Body>, Self::Error> {
        self(request)
    }
}

pub(crate) fn serve<C: Into<Connection>, A: App>(stream: C, app: A) -> io::Result<()> {
    let conn = stream.into();
    let mut reader = BufReader::new(conn.clone());
    let mut writer = BufWriter::new(conn);

    loop {
        let head = match request::parse_head(&mut reader) {
            Ok(head) => head,
            Err(ParseError::ConnectionClosed) => break,
            Err(err) => return Err(io::Error::new(io::ErrorKind::InvalidData, err)),
        };

        let asks_for_close = head
            .headers()
            .typed_get::<headers::Connection>()
            .filter(|conn| conn.contains("close"))
            .is_some();

        let asks_for_keep_alive = head
            .headers()
            .typed_get::<headers::Connection>()
            .filter(|conn| conn.contains("keep-alive"))
            .is_some();

        let version = head.version();

        let demands_close = match version {
            Version::HTTP_10 => !asks_for_keep_alive,
            _ => asks_for_close,
        };

        let expects_continue = head
            .headers()
            .typed_get::<headers::Expect>()
            .filter(|expect| expect == &headers::Expect::CONTINUE)
            .is_some();

        if expects_continue {
            match app.should_continue(&head) {
                status @ StatusCode::CONTINUE => {
                    let res = Response::builder()
                        .status(status)
                        .body(Body::empty())
                        .unwrap();
                    response::write_response(res, &mut writer)?;
                    writer.flush()?;
                }
                // The body was never sent, so the stream cannot be reused
                // for a next request.
                status => {
                    let res = Response::builder()
                        .status(status)
                        .header(header::CONNECTION, HeaderValue::from_static("close"))
                        .body(Body::empty())
                        .unwrap();
                    response::write_response(res, &mut writer)?;
                    writer.flush()?;
                    break;
                }
            };
        }

        let body = request::read_body(&mut reader, head.headers())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        let (parts, ()) = head.into_parts();
        let req = Request::from_parts(parts, body);

        let res = app
            .handle(req)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;

        let mut res = res.map(Into::into);
        *res.version_mut() = version;

        if version == Version::HTTP_10 && !asks_for_keep_alive {
            res.headers_mut()
                .insert(header::CONNECTION, HeaderValue::from_static("close"));
        }

        response::write_response(res, &mut writer)?;
        writer.flush()?;

        if demands_close {
            break;
        }
    }

    Ok(())
}
