//! 微服务宿主约定俗成的配置键及其默认值。

/// 带默认值的配置键。
///
/// 通过 [`ConfigLoader::well_known`](crate::ConfigLoader::well_known) 读取，
/// 未初始化或值为空时返回 `default`。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WellKnownProperty {
    pub key: &'static str,
    pub default: &'static str,
}

impl WellKnownProperty {
    pub const fn new(key: &'static str, default: &'static str) -> Self {
        Self { key, default }
    }
}

pub const MICROSERVICE_NAME: WellKnownProperty =
    WellKnownProperty::new("microservice.name", "unknown");

pub const MICROSERVICE_NAMESPACE: WellKnownProperty =
    WellKnownProperty::new("microservice.namespace", "unknown");

pub const PROFILE: WellKnownProperty = WellKnownProperty::new("profile", "default");

pub const SERVER_HOSTNAME: WellKnownProperty =
    WellKnownProperty::new("cloud.public.host", "unknown");

pub const CONFIG_SERVER_URL: WellKnownProperty =
    WellKnownProperty::new("config-server.url", "http://config-server:8080");

/// HTTP 请求头缓冲区上限（字节）。
pub const HTTP_BUFFER_HEADER_MAX_SIZE: WellKnownProperty =
    WellKnownProperty::new("http.buffer.header.max.size", "10240");
