use std::io::{self, Write};

use crate::body::Body;

/// Serializes a response to the wire.
///
/// A `content-length` is always emitted for non-informational responses
/// (even when zero) so keep-alive clients know where the body ends.
pub(crate) fn write_response(
    res: http::Response<Body>,
    stream: &mut impl Write,
) -> io::Result<()> {
    let (parts, body) = res.into_parts();

    stream.write_all(format!("{:?} {}\r\n", parts.version, parts.status).as_bytes())?;

    for (name, val) in parts.headers.iter() {
        stream.write_all(format!("{name}: ").as_bytes())?;
        stream.write_all(val.as_bytes())?;
        stream.write_all(b"\r\n")?;
    }

    if !parts.status.is_informational() && !parts.headers.contains_key(http::header::CONTENT_LENGTH)
    {
        stream.write_all(format!("content-length: {}\r\n", body.len()).as_bytes())?;
    }

    stream.write_all(b"\r\n")?;
    stream.write_all(body.as_bytes())?;

    Ok(())
}
