//! 分阶段合并引擎。
//!
//! # 教案式说明
//! - **意图 (Why)**：Init 与 Refresh 共用同一套“按序读取、后写覆盖”的合并语义；
//!   Init 需要逐源重试，因此单步 [`apply_source`] 与整轮 [`merge`] 分开暴露。
//! - **逻辑 (How)**：暂存快照从 `base` 克隆而来，依次把每个数据源的贡献并入；
//!   每个 Provider 读取时看到的是截至其前一个数据源为止的累计结果。
//! - **契约 (What)**：任一数据源失败即中止整轮合并，暂存快照被丢弃，绝不会被提交。

use tracing::debug;

use crate::error::{ConfigError, SourceError};
use crate::snapshot::Snapshot;
use crate::source::PropertySource;

/// 读取单个数据源并并入暂存快照。
///
/// 贡献在写入前已完整计算，失败时 `staging` 保持调用前的状态，
/// Init 的重试循环可以直接在同一暂存快照上再次尝试。
pub fn apply_source(staging: &mut Snapshot, source: &PropertySource) -> Result<(), SourceError> {
    let contribution = match source.parser() {
        Some(parser) => {
            let bytes = source.provider().read_bytes(staging)?;
            parser.unmarshal(&bytes)?
        }
        None => source.provider().read(staging)?,
    };

    debug!(
        source = source.name(),
        keys = contribution.len(),
        "property source applied"
    );
    staging.merge_from(contribution);
    Ok(())
}

/// 以 `base` 为起点按序合并全部数据源，生成新的快照。
///
/// - 空数据源列表返回 `base` 的拷贝（Init / Refresh 传入空快照，即得到空结果）；
/// - 返回的错误携带失败数据源的名称。
pub fn merge(base: &Snapshot, sources: &[PropertySource]) -> Result<Snapshot, ConfigError> {
    let mut staging = base.clone();
    for source in sources {
        apply_source(&mut staging, source).map_err(|source_error| ConfigError::Source {
            source_name: source.name_owned(),
            source: source_error,
        })?;
    }
    Ok(staging)
}
