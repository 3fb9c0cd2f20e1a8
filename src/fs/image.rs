use bincode::{DefaultOptions, Options};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    disk::{Block, BlockDevice, BLOCK_SIZE},
    fs::error::{FileSystemError, Result},
};

/// 元数据的编码方式：定长整数、小端、允许区域尾部的填充字节
pub fn codec() -> impl Options + Copy {
    DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

/// 整个磁盘在内存中的镜像，按块号寻址
#[derive(Debug, Clone)]
pub struct DiskImage {
    blocks: Vec<u8>,   // 扁平化存储
    total_blocks: u64, // 块总数
}

impl DiskImage {
    pub fn new(total_blocks: u64) -> Self {
        Self {
            blocks: vec![0u8; (total_blocks as usize) * BLOCK_SIZE],
            total_blocks,
        }
    }

    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    fn range(&self, block: u32, offset: usize, len: usize) -> Result<std::ops::Range<usize>> {
        if block as u64 >= self.total_blocks || offset + len > BLOCK_SIZE {
            return Err(FileSystemError::Corrupted(format!(
                "access to block {} bytes {}..{} is out of range",
                block,
                offset,
                offset + len
            )));
        }
        let start = block as usize * BLOCK_SIZE + offset;
        Ok(start..start + len)
    }

    pub fn slice(&self, block: u32, offset: usize, len: usize) -> Result<&[u8]> {
        let range = self.range(block, offset, len)?;
        Ok(&self.blocks[range])
    }

    pub fn slice_mut(&mut self, block: u32, offset: usize, len: usize) -> Result<&mut [u8]> {
        let range = self.range(block, offset, len)?;
        Ok(&mut self.blocks[range])
    }

    /// 把块内 `from` 之后的字节清零
    pub fn zero_from(&mut self, block: u32, from: usize) -> Result<()> {
        self.slice_mut(block, from, BLOCK_SIZE - from)?.fill(0);
        Ok(())
    }

    pub fn zero_block(&mut self, block: u32) -> Result<()> {
        self.zero_from(block, 0)
    }

    /// 将结构体序列化到从 `start` 开始、长 `blocks` 块的区域
    pub fn write_region<T: Serialize>(&mut self, start: u32, blocks: u32, value: &T) -> Result<()> {
        let bytes = codec().serialize(value)?;
        let capacity = blocks as usize * BLOCK_SIZE;
        if bytes.len() > capacity {
            return Err(FileSystemError::Corrupted(format!(
                "{} bytes of metadata do not fit in {} blocks at {}",
                bytes.len(),
                blocks,
                start
            )));
        }
        let begin = start as usize * BLOCK_SIZE;
        let region = self
            .blocks
            .get_mut(begin..begin + capacity)
            .ok_or_else(|| FileSystemError::Corrupted(format!("region at {} overruns disk", start)))?;
        region[..bytes.len()].copy_from_slice(&bytes);
        region[bytes.len()..].fill(0);
        Ok(())
    }

    pub fn read_region<T: DeserializeOwned>(&self, start: u32, blocks: u32) -> Result<T> {
        let begin = start as usize * BLOCK_SIZE;
        let region = self
            .blocks
            .get(begin..begin + blocks as usize * BLOCK_SIZE)
            .ok_or_else(|| FileSystemError::Corrupted(format!("region at {} overruns disk", start)))?;
        Ok(codec().deserialize(region)?)
    }

    /// 从设备读入全部块
    pub fn load<D: BlockDevice>(disk: &D) -> Result<Self> {
        let mut image = Self::new(disk.block_count());
        let mut buf: Block = [0u8; BLOCK_SIZE];
        for (i, chunk) in image.blocks.chunks_exact_mut(BLOCK_SIZE).enumerate() {
            disk.read_block(i as u64, &mut buf)?;
            chunk.copy_from_slice(&buf);
        }
        Ok(image)
    }

    /// 整盘写回设备，每写一块回调一次进度
    pub fn flush<D: BlockDevice>(
        &self,
        disk: &D,
        mut progress: impl FnMut(u64, u64),
    ) -> Result<()> {
        let mut buf: Block = [0u8; BLOCK_SIZE];
        for (i, chunk) in self.blocks.chunks_exact(BLOCK_SIZE).enumerate() {
            buf.copy_from_slice(chunk);
            disk.write_block(i as u64, &buf)?;
            progress(i as u64 + 1, self.total_blocks);
        }
        Ok(())
    }
}
