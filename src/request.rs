use std::io::{self, BufRead, Read};

use headers::HeaderMapExt;
use http::{HeaderMap, Method, Request, Version};
use thiserror::Error;

use crate::body::Body;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("io error")]
    Io(#[from] io::Error),
    #[error("invalid request")]
    Invalid(#[from] httparse::Error),
    #[error("incomplete request")]
    IncompleteRequest,
    #[error("unsupported http version: {0}")]
    UnsupportedHttpVersion(u8),
    #[error("invalid Transfer-Encoding header")]
    InvalidTransferEncoding,
    #[error("invalid header")]
    InvalidHeader(#[from] headers::Error),
    #[error("invalid chunk size")]
    InvalidChunkSize,
    #[error("failed to parse http request")]
    Unknown,
}

/// Reads and parses a request head (request line plus headers), leaving the
/// stream positioned at the first body byte.
///
/// The head is returned without a body so the serve loop can answer an
/// `Expect: 100-continue` before [`read_body`] captures the payload.
pub(crate) fn parse_head(stream: &mut impl BufRead) -> Result<Request<()>, ParseError> {
    let mut buf = Vec::with_capacity(800);

    loop {
        if stream.read_until(b'\n', &mut buf)? == 0 {
            break;
        }

        match buf.as_slice() {
            [.., b'\r', b'\n', b'\r', b'\n'] => break,
            [.., b'\n', b'\n'] => break,
            _ => continue,
        }
    }

    if buf.is_empty() {
        return Err(ParseError::ConnectionClosed);
    }

    let mut headers = [httparse::EMPTY_HEADER; 64];
    let mut req = httparse::Request::new(&mut headers);
    req.parse(&buf)?;

    let method = req
        .method
        .map(|method| method.as_bytes())
        .ok_or(ParseError::IncompleteRequest)?;

    let path = req.path.ok_or(ParseError::IncompleteRequest)?;

    let version = match req.version.ok_or(ParseError::IncompleteRequest)? {
        0 => Version::HTTP_10,
        1 => Version::HTTP_11,
        version => return Err(ParseError::UnsupportedHttpVersion(version)),
    };

    let head = Request::builder()
        .method(Method::from_bytes(method).map_err(|_| ParseError::IncompleteRequest)?)
        .uri(path)
        .version(version);

    let head = headers
        .into_iter()
        .take_while(|header| *header != httparse::EMPTY_HEADER)
        .map(|header| (header.name, header.value))
        .fold(head, |head, (name, value)| head.header(name, value));

    head.body(()).map_err(|_| ParseError::Unknown)
}

/// Captures the whole request body into memory, honoring `Content-Length`
/// and `Transfer-Encoding: chunked` framing. No framing means no body.
pub(crate) fn read_body(
    stream: &mut impl BufRead,
    headers: &HeaderMap,
) -> Result<Body, ParseError> {
    if let Some(encoding) = headers.typed_try_get::<headers::TransferEncoding>()? {
        if !encoding.is_chunked() {
            // https://datatracker.ietf.org/doc/html/rfc2616#section-3.6
            return Err(ParseError::InvalidTransferEncoding);
        }
        read_chunked_body(stream)
    } else if let Some(len) = headers.typed_try_get::<headers::ContentLength>()? {
        // The buffer grows with bytes actually received, a forged
        // Content-Length must not preallocate arbitrary memory.
        let mut buf = Vec::new();
        stream.by_ref().take(len.0).read_to_end(&mut buf)?;
        if (buf.len() as u64) < len.0 {
            return Err(ParseError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before the whole body arrived",
            )));
        }
        Ok(Body::from(buf))
    } else {
        Ok(Body::empty())
    }
}

fn read_chunked_body(stream: &mut impl BufRead) -> Result<Body, ParseError> {
    let mut body = Vec::new();

    loop {
        let mut buf = Vec::new();

        let size = loop {
            if stream.read_until(b'\n', &mut buf)? == 0 {
                return Err(ParseError::InvalidChunkSize);
            }

            match httparse::parse_chunk_size(&buf) {
                Ok(httparse::Status::Complete((_pos, size))) => break size,
                Ok(httparse::Status::Partial) => continue,
                Err(_) => return Err(ParseError::InvalidChunkSize),
            }
        };

        if size == 0 {
            // Skip the (possibly empty) trailer section up to the blank line.
            let mut line = Vec::new();
            while stream.read_until(b'\n', &mut line)? > 0 {
                if line == b"\r\n" || line == b"\n" {
                    break;
                }
                line.clear();
            }
            return Ok(Body::from(body));
        }

        let mut chunk = vec![0_u8; size as usize];
        stream.read_exact(&mut chunk)?;
        body.extend_from_slice(&chunk);

        // chunk-terminating CRLF
        let mut crlf = Vec::new();
        stream.read_until(b'\n', &mut crlf)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_request(mut stream: impl BufRead) -> Result<Request<Body>, ParseError> {
        let head = parse_head(&mut stream)?;
        let body = read_body(&mut stream, head.headers())?;
        let (parts, ()) = head.into_parts();
        Ok(Request::from_parts(parts, body))
    }

    #[test]
    fn parses_request_without_body() {
        let req = "GET /lolwut HTTP/1.1\r\nHost: lol.com\r\n\r\n";
        let req = std::io::Cursor::new(req);

        let req = parse_request(req).unwrap();

        assert_eq!(Version::HTTP_11, req.version());
        assert_eq!("/lolwut", req.uri().path());
        assert_eq!(
            Some("lol.com"),
            req.headers()
                .get(http::header::HOST)
                .and_then(|v| v.to_str().ok())
        );
        assert!(req.body().is_empty());
    }

    #[test]
    fn parses_request_with_content_length_body() {
        let req = "POST /lol HTTP/1.1\r\nHost: lol.com\r\nContent-Length: 6\r\n\r\nlolwut ignored";
        let req = std::io::Cursor::new(req);

        let req = parse_request(req).unwrap();

        assert_eq!(req.body().as_bytes(), b"lolwut");
    }

    #[test]
    fn parses_request_with_chunked_body() {
        let req = "POST /lol HTTP/1.1\r\nHost: lol.com\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nlol\r\n3\r\nwut\r\n0\r\n\r\n";
        let req = std::io::Cursor::new(req);

        let req = parse_request(req).unwrap();

        assert_eq!(req.body().as_bytes(), b"lolwut");
    }

    #[test]
    fn parses_request_with_chunked_body_and_extensions() {
        let req = "POST /lol HTTP/1.1\r\nHost: lol.com\r\nTransfer-Encoding: chunked\r\n\r\n3;extension\r\nlol\r\n3\r\nwut\r\n0\r\n\r\n";
        let req = std::io::Cursor::new(req);

        let req = parse_request(req).unwrap();

        assert_eq!(req.body().as_bytes(), b"lolwut");
    }

    #[test]
    fn keeps_stream_position_after_chunked_body() {
        let reqs = "POST /a HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nlol\r\n0\r\n\r\nGET /b HTTP/1.1\r\n\r\n";
        let mut stream = std::io::Cursor::new(reqs);

        let first = {
            let head = parse_head(&mut stream).unwrap();
            read_body(&mut stream, head.headers()).unwrap()
        };
        assert_eq!(first.as_bytes(), b"lol");

        let second = parse_head(&mut stream).unwrap();
        assert_eq!("/b", second.uri().path());
    }

    #[test]
    fn preserves_query_string_in_uri() {
        let req = "PUT /items/42?force=true HTTP/1.1\r\nHost: lol.com\r\n\r\n";
        let req = std::io::Cursor::new(req);

        let req = parse_request(req).unwrap();

        assert_eq!("/items/42", req.uri().path());
        assert_eq!(Some("force=true"), req.uri().query());
    }

    #[test]
    fn fails_when_the_body_is_shorter_than_content_length() {
        let req = "POST /lol HTTP/1.1\r\nHost: lol.com\r\nContent-Length: 9999999999\r\n\r\nhello";
        let req = std::io::Cursor::new(req);

        match parse_request(req) {
            Err(ParseError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected an eof error, got {other:?}"),
        }
    }

    #[test]
    fn fails_to_parse_incomplete_request() {
        let req = std::io::Cursor::new("POST /lol");

        assert!(matches!(
            parse_request(req),
            Err(ParseError::IncompleteRequest)
        ));
    }

    #[test]
    fn reports_closed_connections() {
        let req = std::io::Cursor::new("");

        assert!(matches!(
            parse_request(req),
            Err(ParseError::ConnectionClosed)
        ));
    }
}
