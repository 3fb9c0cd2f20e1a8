use std::{
    io::{Error, ErrorKind, Result},
    sync::{Arc, Mutex},
};

use crate::disk::{
    block_device::{check_range, BlockDevice},
    types::{Block, BLOCK_SIZE},
};

/// 内存中的磁盘。克隆得到的句柄共享同一块缓冲区，
/// 因此关闭后仍可以用另一个句柄重新挂载。
#[derive(Debug, Clone)]
pub struct MemDisk {
    blocks: Arc<Mutex<Vec<u8>>>,
    block_count: u64,
}

impl MemDisk {
    pub fn new(block_count: u64) -> Self {
        Self {
            blocks: Arc::new(Mutex::new(vec![0u8; block_count as usize * BLOCK_SIZE])),
            block_count,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<u8>>> {
        self.blocks
            .lock()
            .map_err(|_| Error::new(ErrorKind::Other, "memory disk lock poisoned"))
    }
}

impl BlockDevice for MemDisk {
    fn read_block(&self, block_id: u64, buf: &mut Block) -> Result<()> {
        check_range(block_id, self.block_count)?;
        let blocks = self.lock()?;
        let start = block_id as usize * BLOCK_SIZE;
        buf.copy_from_slice(&blocks[start..start + BLOCK_SIZE]);
        Ok(())
    }

    fn write_block(&self, block_id: u64, buf: &Block) -> Result<()> {
        check_range(block_id, self.block_count)?;
        let mut blocks = self.lock()?;
        let start = block_id as usize * BLOCK_SIZE;
        blocks[start..start + BLOCK_SIZE].copy_from_slice(buf);
        Ok(())
    }

    fn block_count(&self) -> u64 {
        self.block_count
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}
