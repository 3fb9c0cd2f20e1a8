use crate::{
    disk::{BlockDevice, BLOCK_SIZE},
    fs::{
        error::{FileSystemError, Result},
        fat::FatEntry,
        FileSystem,
    },
};

impl<D: BlockDevice> FileSystem<D> {
    /// 从数据区起点向后找第一个空闲块（首次适配）
    pub fn find_free_block(&self) -> Result<u32> {
        self.fat
            .first_unused(self.super_block.data_block_offset)
            .ok_or(FileSystemError::DiskFull)
    }

    pub fn free_blocks(&self) -> u64 {
        self.fat.count_unused(self.super_block.data_block_offset)
    }

    /// 释放从 `head` 开始的整条链：逐块清零并标记为空闲，
    /// 到 EOF 块为止。`head` 本身空闲时什么都不做。返回释放的块数。
    pub fn free_chain(&mut self, head: u32) -> Result<u64> {
        if head as u64 >= self.fat.len() {
            return Err(FileSystemError::InvalidArgument(format!(
                "block {} is outside the disk",
                head
            )));
        }

        let mut block = head;
        let mut freed = 0;
        loop {
            let entry = self.fat.get(block)?;
            match entry {
                FatEntry::Unused if freed == 0 => return Ok(0),
                // 环形链会回到已经释放过的块
                FatEntry::Unused | FatEntry::Reserved if freed > 0 => {
                    return Err(FileSystemError::Corrupted(format!(
                        "chain from {} runs into {:?} block {}",
                        head, entry, block
                    )));
                }
                FatEntry::Reserved => {
                    return Err(FileSystemError::InvalidArgument(format!(
                        "block {} is reserved",
                        head
                    )));
                }
                _ => {}
            }

            self.image.zero_block(block)?;
            self.fat.set(block, FatEntry::Unused)?;
            freed += 1;
            log::trace!("freed block {}", block);

            match entry {
                FatEntry::Next(next) => block = next,
                _ => return Ok(freed),
            }
        }
    }

    /// 定位第 `offset` 字节之前最后一个字节所在的块。
    /// 从首块出发恰好走 ⌈offset / BLOCK_SIZE⌉ − 1 步，
    /// 返回（块号，块内偏移）；块内偏移可能等于 BLOCK_SIZE。
    pub(crate) fn locate(&self, head: u32, offset: u64) -> Result<(u32, usize)> {
        if offset == 0 {
            return Ok((head, 0));
        }

        let hops = (offset + BLOCK_SIZE as u64 - 1) / BLOCK_SIZE as u64 - 1;
        let mut block = head;
        for _ in 0..hops {
            block = match self.fat.get(block)? {
                FatEntry::Next(next) => next,
                other => {
                    return Err(FileSystemError::Corrupted(format!(
                        "chain from {} ends at block {} ({:?}) before offset {}",
                        head, block, other, offset
                    )))
                }
            };
        }
        Ok((block, (offset - hops * BLOCK_SIZE as u64) as usize))
    }

    /// 给链尾追加一个新块，磁盘已满时返回 `DiskFull`
    pub(crate) fn extend_chain(&mut self, tail: u32) -> Result<u32> {
        let fresh = self.find_free_block()?;
        self.fat.set(tail, FatEntry::Next(fresh))?;
        self.fat.set(fresh, FatEntry::Eof)?;
        log::trace!("linked block {} after {}", fresh, tail);
        Ok(fresh)
    }

    /// 按文件名列出块链，诊断用
    pub fn chain_of(&self, name: &str) -> Result<Vec<u32>> {
        let head = self
            .directory
            .get(name)
            .map(|attr| attr.offset)
            .ok_or_else(|| FileSystemError::NotFound(name.to_string()))?;

        let mut chain = vec![head];
        let mut block = head;
        while let FatEntry::Next(next) = self.fat.get(block)? {
            if chain.len() as u64 >= self.fat.len() {
                return Err(FileSystemError::Corrupted(format!(
                    "chain of {} does not terminate",
                    name
                )));
            }
            chain.push(next);
            block = next;
        }
        Ok(chain)
    }
}
