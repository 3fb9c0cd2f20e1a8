use serde::{Deserialize, Serialize};

use crate::{
    disk::BLOCK_SIZE,
    fs::{
        config::SUPER_BLOCK_BLOCK_ID,
        directory::Directory,
        error::{FileSystemError, Result},
        fat::Fat,
        image::codec,
    },
};
use bincode::Options;

/// 超级块：记录各区域的起始块号（单位均为块）
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    pub fat_offset: u32,        // FAT 起始块号
    pub directory_offset: u32,  // 根目录起始块号
    pub data_block_offset: u32, // 数据区起始块号
}

/// 字节数向上取整为块数
pub fn blocks_for(bytes: u64) -> u32 {
    ((bytes + BLOCK_SIZE as u64 - 1) / BLOCK_SIZE as u64) as u32
}

impl SuperBlock {
    /// 按各结构序列化后的大小计算块对齐的区域布局
    pub fn for_disk(total_blocks: u64) -> Result<Self> {
        let empty = Self {
            fat_offset: 0,
            directory_offset: 0,
            data_block_offset: 0,
        };
        let super_blocks = blocks_for(codec().serialized_size(&empty)?);
        let fat_blocks = blocks_for(codec().serialized_size(&Fat::new(total_blocks))?);
        let dir_blocks = blocks_for(codec().serialized_size(&Directory::new())?);

        let fat_offset = SUPER_BLOCK_BLOCK_ID + super_blocks;
        let directory_offset = fat_offset + fat_blocks;
        let data_block_offset = directory_offset + dir_blocks;

        // 至少要留出一个数据块
        if data_block_offset as u64 >= total_blocks {
            return Err(FileSystemError::DiskFull);
        }

        Ok(Self {
            fat_offset,
            directory_offset,
            data_block_offset,
        })
    }

    /// 挂载时检查读回的布局是否可信
    pub fn validate(&self, total_blocks: u64) -> Result<()> {
        let ordered = SUPER_BLOCK_BLOCK_ID < self.fat_offset
            && self.fat_offset < self.directory_offset
            && self.directory_offset < self.data_block_offset;
        if !ordered || self.data_block_offset as u64 >= total_blocks {
            return Err(FileSystemError::Corrupted(format!(
                "bad superblock layout fat={} dir={} data={} on a {}-block disk",
                self.fat_offset, self.directory_offset, self.data_block_offset, total_blocks
            )));
        }
        Ok(())
    }
}
