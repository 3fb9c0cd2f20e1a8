use std::{
    fs::{File, OpenOptions},
    io::{Error, ErrorKind, Read, Result, Seek, SeekFrom, Write},
    path::Path,
    sync::Mutex,
};

use crate::disk::{
    block_device::{check_range, BlockDevice},
    types::{disk_size, Block, BLOCK_SIZE},
};

/// 以宿主机上的普通文件作为虚拟磁盘
#[derive(Debug)]
pub struct FileDisk {
    file: Mutex<File>,
    block_count: u64,
}

impl FileDisk {
    /// 创建（或重置长度）一个磁盘镜像文件
    pub fn create<P: AsRef<Path>>(path: P, block_count: u64) -> Result<Self> {
        if block_count == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "disk must have at least one block"));
        }
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        file.set_len(disk_size(block_count))?;

        log::debug!(
            "created disk image {} ({} blocks)",
            path.as_ref().display(),
            block_count
        );

        Ok(Self {
            file: Mutex::new(file),
            block_count,
        })
    }

    /// 打开已有的磁盘镜像，块数由文件长度推出
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
        let len = file.metadata()?.len();

        if len == 0 || len % BLOCK_SIZE as u64 != 0 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!(
                    "{}: size {} is not a whole number of {}-byte blocks",
                    path.as_ref().display(),
                    len,
                    BLOCK_SIZE
                ),
            ));
        }

        Ok(Self {
            file: Mutex::new(file),
            block_count: len / BLOCK_SIZE as u64,
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|_| Error::new(ErrorKind::Other, "disk file lock poisoned"))
    }
}

impl BlockDevice for FileDisk {
    fn read_block(&self, block_id: u64, buf: &mut Block) -> Result<()> {
        check_range(block_id, self.block_count)?;
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(block_id * BLOCK_SIZE as u64))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&self, block_id: u64, buf: &Block) -> Result<()> {
        check_range(block_id, self.block_count)?;
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(block_id * BLOCK_SIZE as u64))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn block_count(&self) -> u64 {
        self.block_count
    }

    fn close(self) -> Result<()> {
        let file = self
            .file
            .into_inner()
            .map_err(|_| Error::new(ErrorKind::Other, "disk file lock poisoned"))?;
        file.sync_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_image() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("minifat-disk-{}.img", uuid::Uuid::new_v4()))
    }

    #[test]
    fn create_then_open_keeps_blocks() {
        let path = temp_image();
        let disk = FileDisk::create(&path, 4).unwrap();
        let mut block: Block = [0; BLOCK_SIZE];
        block[..5].copy_from_slice(b"hello");
        disk.write_block(3, &block).unwrap();
        disk.close().unwrap();

        let disk = FileDisk::open(&path).unwrap();
        assert_eq!(disk.block_count(), 4);
        let mut out: Block = [0; BLOCK_SIZE];
        disk.read_block(3, &mut out).unwrap();
        assert_eq!(&out[..5], b"hello");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn out_of_range_block_is_an_error() {
        let path = temp_image();
        let disk = FileDisk::create(&path, 2).unwrap();
        let mut buf: Block = [0; BLOCK_SIZE];
        assert!(disk.read_block(2, &mut buf).is_err());
        assert!(disk.write_block(7, &buf).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn open_rejects_partial_block_images() {
        let path = temp_image();
        std::fs::write(&path, vec![0u8; BLOCK_SIZE + 1]).unwrap();
        assert!(FileDisk::open(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }
}
