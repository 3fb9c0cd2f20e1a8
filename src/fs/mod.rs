use std::path::Path;

use crate::{
    disk::{BlockDevice, FileDisk, DISK_BLOCKS},
    fs::{
        config::SUPER_BLOCK_BLOCK_ID,
        descriptor::DescriptorTable,
        directory::Directory,
        error::{FileSystemError, Result},
        fat::{Fat, FatEntry},
        image::DiskImage,
        super_block::SuperBlock,
    },
};

pub mod alloc;
pub mod config;
pub mod descriptor;
pub mod directory;
pub mod error;
pub mod fat;
pub mod image;
pub mod io;
pub mod super_block;

// 镜像大小和文件大小都以 u32 记录
const MAX_DISK_BLOCKS: u64 = u32::MAX as u64 / crate::disk::BLOCK_SIZE as u64;

fn check_disk_size(total_blocks: u64) -> Result<()> {
    if total_blocks > MAX_DISK_BLOCKS {
        return Err(FileSystemError::InvalidArgument(format!(
            "disk of {} blocks exceeds the {} block limit",
            total_blocks, MAX_DISK_BLOCKS
        )));
    }
    Ok(())
}

/// 已挂载的卷。构造即挂载，`unmount` 消耗自身，
/// 因此一个实例同一时间只对应一个卷。
#[derive(Debug)]
pub struct FileSystem<D: BlockDevice = FileDisk> {
    disk: D,                      // 底层块设备
    super_block: SuperBlock,      // 各区域布局
    fat: Fat,                     // 块链
    directory: Directory,         // 根目录
    descriptors: DescriptorTable, // 打开的文件
    image: DiskImage,             // 整盘内容
}

/// 目录中一个文件的概要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub head: u32,
}

/// 卷的整体状态，供诊断输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    pub total_blocks: u64,
    pub free_blocks: u64,
    pub fat_offset: u32,
    pub directory_offset: u32,
    pub data_block_offset: u32,
    pub files: usize,
    pub open_files: usize,
}

impl FileSystem<FileDisk> {
    /// 在 `path` 创建默认大小的磁盘镜像并格式化
    pub fn make<P: AsRef<Path>>(path: P) -> Result<()> {
        Self::make_with_progress(path, DISK_BLOCKS, |_, _| {})
    }

    pub fn make_with_progress<P: AsRef<Path>>(
        path: P,
        total_blocks: u64,
        progress: impl FnMut(u64, u64),
    ) -> Result<()> {
        let disk = FileDisk::create(path.as_ref(), total_blocks)?;
        Self::format_with_progress(disk, progress)
    }

    pub fn mount<P: AsRef<Path>>(path: P) -> Result<Self> {
        let disk = FileDisk::open(path.as_ref())?;
        Self::mount_on(disk)
    }
}

impl<D: BlockDevice> FileSystem<D> {
    /// 在设备上写入一个空文件系统，完成后关闭设备
    pub fn format(disk: D) -> Result<()> {
        Self::format_with_progress(disk, |_, _| {})
    }

    pub fn format_with_progress(disk: D, progress: impl FnMut(u64, u64)) -> Result<()> {
        let total_blocks = disk.block_count();
        check_disk_size(total_blocks)?;

        let super_block = SuperBlock::for_disk(total_blocks)?;
        let mut fat = Fat::new(total_blocks);
        fat.reserve(super_block.data_block_offset);

        let mut fs = Self {
            disk,
            super_block,
            fat,
            directory: Directory::new(),
            descriptors: DescriptorTable::new(),
            image: DiskImage::new(total_blocks),
        };
        fs.flush(progress)?;
        fs.disk.close()?;

        log::info!(
            "formatted {} blocks: fat@{} dir@{} data@{}",
            total_blocks,
            super_block.fat_offset,
            super_block.directory_offset,
            super_block.data_block_offset
        );
        Ok(())
    }

    /// 读入整盘镜像，并按超级块中的偏移还原 FAT 与目录
    pub fn mount_on(disk: D) -> Result<Self> {
        let total_blocks = disk.block_count();
        check_disk_size(total_blocks)?;
        let image = DiskImage::load(&disk)?;

        let super_block: SuperBlock = image.read_region(SUPER_BLOCK_BLOCK_ID, 1)?;
        super_block.validate(total_blocks)?;

        let fat: Fat = image.read_region(
            super_block.fat_offset,
            super_block.directory_offset - super_block.fat_offset,
        )?;
        fat.validate(total_blocks, super_block.data_block_offset)?;

        let mut directory: Directory = image.read_region(
            super_block.directory_offset,
            super_block.data_block_offset - super_block.directory_offset,
        )?;
        directory.validate()?;

        log::info!(
            "mounted {} blocks with {} files, {} blocks free",
            total_blocks,
            directory.len(),
            fat.count_unused(super_block.data_block_offset)
        );

        Ok(Self {
            disk,
            super_block,
            fat,
            directory,
            descriptors: DescriptorTable::new(),
            image,
        })
    }

    /// 把元数据序列化进镜像后整盘写回
    fn flush(&mut self, progress: impl FnMut(u64, u64)) -> Result<()> {
        let sb = self.super_block;
        self.image
            .write_region(SUPER_BLOCK_BLOCK_ID, sb.fat_offset - SUPER_BLOCK_BLOCK_ID, &sb)?;
        self.image
            .write_region(sb.fat_offset, sb.directory_offset - sb.fat_offset, &self.fat)?;
        self.image.write_region(
            sb.directory_offset,
            sb.data_block_offset - sb.directory_offset,
            &self.directory,
        )?;
        self.image.flush(&self.disk, progress)
    }

    /// 写回磁盘但保持挂载
    pub fn sync(&mut self) -> Result<()> {
        self.flush(|_, _| {})
    }

    /// 写回磁盘并关闭设备；仍打开的描述符随之丢弃
    pub fn unmount(self) -> Result<()> {
        self.unmount_with_progress(|_, _| {})
    }

    pub fn unmount_with_progress(mut self, progress: impl FnMut(u64, u64)) -> Result<()> {
        if !self.descriptors.is_empty() {
            log::warn!(
                "unmounting with {} descriptors still open",
                self.descriptors.len()
            );
        }
        self.flush(progress)?;
        self.disk.close()?;
        log::info!("unmounted");
        Ok(())
    }

    pub fn create(&mut self, name: &str) -> Result<()> {
        if self.directory.is_full() {
            return Err(FileSystemError::DirectoryFull);
        }
        directory::check_name(name)?;
        if self.directory.find(name).is_some() {
            return Err(FileSystemError::AlreadyExists(name.to_string()));
        }

        let head = self.find_free_block()?;
        self.directory.add(name, head)?;
        self.fat.set(head, FatEntry::Eof)?;
        self.image.zero_block(head)?;

        log::debug!("created {} at block {}", name, head);
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        let head = self
            .directory
            .get(name)
            .map(|attr| attr.offset)
            .ok_or_else(|| FileSystemError::NotFound(name.to_string()))?;
        if self.descriptors.is_open(head) {
            return Err(FileSystemError::Busy(name.to_string()));
        }

        // 先释放块链，失败时目录项仍然保留
        let freed = self.free_chain(head)?;
        self.directory.remove(name);

        log::debug!("deleted {}, freed {} blocks", name, freed);
        Ok(())
    }

    pub fn open(&mut self, name: &str) -> Result<usize> {
        if self.descriptors.len() == config::MAX_OPEN_FILES {
            return Err(FileSystemError::TooManyOpenFiles);
        }
        let head = self
            .directory
            .get(name)
            .map(|attr| attr.offset)
            .ok_or_else(|| FileSystemError::NotFound(name.to_string()))?;

        let handle = self.descriptors.open(head)?;
        log::debug!("opened {} as fd {}", name, handle);
        Ok(handle)
    }

    pub fn close(&mut self, handle: usize) -> Result<()> {
        self.descriptors.close(handle)?;
        log::debug!("closed fd {}", handle);
        Ok(())
    }

    /// 目录中的全部文件，按目录顺序
    pub fn files(&self) -> Vec<FileInfo> {
        self.directory
            .entries()
            .iter()
            .map(|attr| FileInfo {
                name: attr.name.clone(),
                size: attr.size as u64,
                head: attr.offset,
            })
            .collect()
    }

    pub fn info(&self) -> VolumeInfo {
        VolumeInfo {
            total_blocks: self.image.total_blocks(),
            free_blocks: self.free_blocks(),
            fat_offset: self.super_block.fat_offset,
            directory_offset: self.super_block.directory_offset,
            data_block_offset: self.super_block.data_block_offset,
            files: self.directory.len(),
            open_files: self.descriptors.len(),
        }
    }

    pub fn fat_entry(&self, block: u32) -> Option<FatEntry> {
        self.fat.get(block).ok()
    }
}
