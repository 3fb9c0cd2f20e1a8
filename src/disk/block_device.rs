use std::io::Result;

use crate::disk::types::Block;

/// 块设备抽象：文件系统只通过整块读写访问底层存储。
///
/// `block_id` 超出 `[0, block_count())` 或底层 I/O 失败时返回错误。
pub trait BlockDevice: Send + Sync {
    fn read_block(&self, block_id: u64, buf: &mut Block) -> Result<()>;
    fn write_block(&self, block_id: u64, buf: &Block) -> Result<()>;

    /// 设备包含的块总数
    fn block_count(&self) -> u64;

    /// 关闭设备，确保已写入的数据落盘
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

pub(crate) fn check_range(block_id: u64, block_count: u64) -> Result<()> {
    if block_id >= block_count {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("block {} out of range (device has {} blocks)", block_id, block_count),
        ));
    }
    Ok(())
}
