/// 每个逻辑块（Block）的大小：4KB
/// 文件系统以“块”为最小读写单位。
pub const BLOCK_SIZE: usize = 4096;

/// 默认磁盘块数：8192 块，即 32MB 的磁盘镜像。
pub const DISK_BLOCKS: u64 = 8192;

/// 定义一个逻辑块类型（每块 4KB 的字节数组）
pub type Block = [u8; BLOCK_SIZE];

/// 给定块数的磁盘镜像大小（字节）
pub const fn disk_size(total_blocks: u64) -> u64 {
    total_blocks * BLOCK_SIZE as u64
}
