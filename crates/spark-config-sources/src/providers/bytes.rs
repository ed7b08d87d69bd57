use std::sync::Arc;

use spark_config::{PropertyMap, PropertyProvider, SourceError, Snapshot};

/// 内存中的原始字节块，常与 [`JsonParser`](crate::JsonParser) 等解析器组合成自定义数据源。
#[derive(Clone, Debug)]
pub struct BytesProvider {
    bytes: Arc<[u8]>,
}

impl BytesProvider {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
        }
    }
}

impl PropertyProvider for BytesProvider {
    fn read_bytes(&self, _staged: &Snapshot) -> Result<Vec<u8>, SourceError> {
        Ok(self.bytes.to_vec())
    }

    fn read(&self, _staged: &Snapshot) -> Result<PropertyMap, SourceError> {
        Err(SourceError::Unsupported {
            provider: "bytes",
            operation: "read",
        })
    }
}
