use bytes::Bytes;

/// A fully buffered request or response payload.
///
/// Bodies are always captured in memory before an application sees them, so
/// this is a thin wrapper over [`Bytes`]. Cloning is cheap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body(Bytes);

impl Body {
    pub fn empty() -> Self {
        Body(Bytes::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Bytes> for Body {
    fn from(body: Bytes) -> Self {
        Body(body)
    }
}

impl From<Vec<u8>> for Body {
    fn from(body: Vec<u8>) -> Self {
        Body(Bytes::from(body))
    }
}

impl From<&[u8]> for Body {
    fn from(body: &[u8]) -> Self {
        Body(Bytes::copy_from_slice(body))
    }
}

impl From<&str> for Body {
    fn from(body: &str) -> Self {
        body.as_bytes().into()
    }
}

impl From<String> for Body {
    fn from(body: String) -> Self {
        Body(Bytes::from(body.into_bytes()))
    }
}
