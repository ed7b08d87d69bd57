//! 配置提供者：文件、环境变量与内存字节块。

mod bytes;
mod env;
mod file;

pub use bytes::BytesProvider;
pub use env::{EnvProvider, default_key_transform};
pub use file::FileProvider;
