use crate::{
    disk::{BlockDevice, BLOCK_SIZE},
    fs::{
        descriptor::Cursor,
        error::{FileSystemError, Result},
        fat::FatEntry,
        FileSystem,
    },
};

impl<D: BlockDevice> FileSystem<D> {
    /// 描述符对应的目录项下标
    fn attribute_index(&self, handle: usize) -> Result<usize> {
        let head = self.descriptors.get(handle)?.head;
        self.directory.find_by_head(head).ok_or_else(|| {
            FileSystemError::Corrupted(format!("fd {} refers to a missing file", handle))
        })
    }

    fn file_size(&self, idx: usize) -> u64 {
        self.directory
            .attribute(idx)
            .map_or(0, |attr| attr.size as u64)
    }

    /// 从当前位置读取最多 `n` 字节到 `buf`。
    ///
    /// `n` 按文件总大小截断（不是剩余大小），读到链尾即停止。
    pub fn read(&mut self, handle: usize, buf: &mut [u8], n: usize) -> Result<usize> {
        let idx = self.attribute_index(handle)?;
        let size = self.file_size(idx);
        let mut cursor = self.descriptors.get(handle)?.cursor;

        let mut remaining = n.min(buf.len()).min(size as usize);
        let mut done = 0;
        while remaining > 0 {
            if cursor.offset == BLOCK_SIZE {
                match self.fat.get(cursor.block)? {
                    FatEntry::Next(next) => {
                        cursor.block = next;
                        cursor.offset = 0;
                    }
                    FatEntry::Eof => break,
                    other => {
                        return Err(FileSystemError::Corrupted(format!(
                            "block {} of an open file is {:?}",
                            cursor.block, other
                        )))
                    }
                }
            }

            let chunk = (BLOCK_SIZE - cursor.offset).min(remaining);
            let src = self.image.slice(cursor.block, cursor.offset, chunk)?;
            buf[done..done + chunk].copy_from_slice(src);

            cursor.offset += chunk;
            cursor.pos += chunk as u64;
            done += chunk;
            remaining -= chunk;
        }

        self.descriptors.get_mut(handle)?.cursor = cursor;
        Ok(done)
    }

    /// 从当前位置写入 `buf` 的前 `n` 字节，必要时向链尾追加新块。
    ///
    /// 磁盘写满时返回已写入的字节数（短写），不报错。
    pub fn write(&mut self, handle: usize, buf: &[u8], n: usize) -> Result<usize> {
        let idx = self.attribute_index(handle)?;
        let mut size = self.file_size(idx);
        let mut cursor = self.descriptors.get(handle)?.cursor;

        let n = n.min(buf.len());
        let mut done = 0;
        while done < n {
            if cursor.offset == BLOCK_SIZE {
                let next = match self.fat.get(cursor.block)? {
                    FatEntry::Next(next) => next,
                    FatEntry::Eof => match self.extend_chain(cursor.block) {
                        Ok(fresh) => fresh,
                        Err(FileSystemError::DiskFull) => {
                            log::warn!("disk full: short write of {} of {} bytes", done, n);
                            break;
                        }
                        Err(e) => return Err(e),
                    },
                    other => {
                        return Err(FileSystemError::Corrupted(format!(
                            "block {} of an open file is {:?}",
                            cursor.block, other
                        )))
                    }
                };
                cursor.block = next;
                cursor.offset = 0;
            }

            let chunk = (BLOCK_SIZE - cursor.offset).min(n - done);
            self.image
                .slice_mut(cursor.block, cursor.offset, chunk)?
                .copy_from_slice(&buf[done..done + chunk]);

            cursor.offset += chunk;
            cursor.pos += chunk as u64;
            done += chunk;
            // 只有越过原来的文件末尾才增长
            size = size.max(cursor.pos);
        }

        if let Some(attr) = self.directory.attribute_mut(idx) {
            attr.size = size as u32;
        }
        self.descriptors.get_mut(handle)?.cursor = cursor;
        Ok(done)
    }

    pub fn get_filesize(&self, handle: usize) -> Result<u64> {
        let idx = self.attribute_index(handle)?;
        Ok(self.file_size(idx))
    }

    /// 当前读写位置（文件内字节偏移）
    pub fn tell(&self, handle: usize) -> Result<u64> {
        Ok(self.descriptors.get(handle)?.cursor.pos)
    }

    /// 把读写位置移到 `offset`，允许恰好停在文件末尾
    pub fn lseek(&mut self, handle: usize, offset: i64) -> Result<()> {
        let idx = self.attribute_index(handle)?;
        let size = self.file_size(idx);
        if offset < 0 || offset as u64 > size {
            return Err(FileSystemError::InvalidArgument(format!(
                "seek to {} in a file of {} bytes",
                offset, size
            )));
        }

        let head = self.descriptors.get(handle)?.head;
        let cursor = self.cursor_at(head, offset as u64)?;
        self.descriptors.get_mut(handle)?.cursor = cursor;
        Ok(())
    }

    fn cursor_at(&self, head: u32, offset: u64) -> Result<Cursor> {
        let (block, in_block) = self.locate(head, offset)?;
        Ok(Cursor {
            block,
            offset: in_block,
            pos: offset,
        })
    }

    /// 把文件截短到 `length` 字节，释放多余的块并清零尾块剩余部分
    pub fn truncate(&mut self, handle: usize, length: i64) -> Result<()> {
        let idx = self.attribute_index(handle)?;
        let size = self.file_size(idx);
        if length < 0 || length as u64 > size {
            return Err(FileSystemError::InvalidArgument(format!(
                "truncate to {} in a file of {} bytes",
                length, size
            )));
        }
        let length = length as u64;

        let head = self.descriptors.get(handle)?.head;
        let (tail, in_block) = self.locate(head, length)?;
        let freed = match self.fat.get(tail)? {
            FatEntry::Next(next) => self.free_chain(next)?,
            FatEntry::Eof => 0,
            other => {
                return Err(FileSystemError::Corrupted(format!(
                    "tail block {} is {:?}",
                    tail, other
                )))
            }
        };
        self.fat.set(tail, FatEntry::Eof)?;
        self.image.zero_from(tail, in_block)?;
        if let Some(attr) = self.directory.attribute_mut(idx) {
            attr.size = length as u32;
        }

        // 同一文件上越过新末尾的描述符都退回到末尾
        let end = Cursor {
            block: tail,
            offset: in_block,
            pos: length,
        };
        for desc in self.descriptors.iter_mut() {
            if desc.head == head && desc.cursor.pos > length {
                desc.cursor = end;
            }
        }

        log::debug!(
            "truncated fd {} from {} to {} bytes, freed {} blocks",
            handle,
            size,
            length,
            freed
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        disk::{MemDisk, BLOCK_SIZE},
        fs::{error::ErrorKind, FileSystem},
    };

    fn mounted(blocks: u64) -> FileSystem<MemDisk> {
        let disk = MemDisk::new(blocks);
        FileSystem::format(disk.clone()).unwrap();
        FileSystem::mount_on(disk).unwrap()
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| b'a' + (i % 25) as u8).collect()
    }

    fn open_new(fs: &mut FileSystem<MemDisk>, name: &str) -> usize {
        fs.create(name).unwrap();
        fs.open(name).unwrap()
    }

    #[test]
    fn what_is_this() {
        let mut fs = mounted(32);
        let fd = open_new(&mut fs, "example");
        assert_eq!(fs.write(fd, b"what is this\0", 13).unwrap(), 13);
        assert_eq!(fs.get_filesize(fd).unwrap(), 13);

        fs.lseek(fd, 0).unwrap();
        let mut out = [0u8; 13];
        assert_eq!(fs.read(fd, &mut out, 13).unwrap(), 13);
        assert_eq!(&out, b"what is this\0");

        fs.truncate(fd, 10).unwrap();
        assert_eq!(fs.get_filesize(fd).unwrap(), 10);
        fs.lseek(fd, 0).unwrap();
        let mut out = [0u8; 13];
        assert_eq!(fs.read(fd, &mut out, 10).unwrap(), 10);
        assert_eq!(&out[..10], b"what is th");
    }

    #[test]
    fn read_is_clamped_to_file_size() {
        let mut fs = mounted(32);
        let fd = open_new(&mut fs, "f");
        fs.write(fd, b"hello", 5).unwrap();
        fs.lseek(fd, 0).unwrap();
        let mut out = [0u8; 64];
        assert_eq!(fs.read(fd, &mut out, 64).unwrap(), 5);
        assert_eq!(&out[..5], b"hello");
    }

    #[test]
    fn read_clamps_against_total_size_not_remaining() {
        let mut fs = mounted(32);
        let fd = open_new(&mut fs, "f");
        fs.write(fd, b"hello", 5).unwrap();
        fs.lseek(fd, 3).unwrap();
        // 请求 5 字节不超过文件大小，越过末尾的部分是 0
        let mut out = [0xffu8; 5];
        assert_eq!(fs.read(fd, &mut out, 5).unwrap(), 5);
        assert_eq!(&out, b"lo\0\0\0");
    }

    #[test]
    fn read_of_empty_file_returns_nothing() {
        let mut fs = mounted(32);
        let fd = open_new(&mut fs, "f");
        let mut out = [0u8; 8];
        assert_eq!(fs.read(fd, &mut out, 8).unwrap(), 0);
    }

    #[test]
    fn multi_block_write_chains_and_reads_back() {
        let mut fs = mounted(32);
        let fd = open_new(&mut fs, "chonk");
        let data = pattern(9000);
        assert_eq!(fs.write(fd, &data, data.len()).unwrap(), 9000);
        assert_eq!(fs.chain_of("chonk").unwrap().len(), 3);

        fs.lseek(fd, 0).unwrap();
        let mut out = vec![0u8; 9000];
        assert_eq!(fs.read(fd, &mut out, 9000).unwrap(), 9000);
        assert_eq!(out, data);
    }

    #[test]
    fn exact_block_write_does_not_allocate_ahead() {
        let mut fs = mounted(32);
        let fd = open_new(&mut fs, "f");
        let data = pattern(BLOCK_SIZE);
        fs.write(fd, &data, BLOCK_SIZE).unwrap();
        assert_eq!(fs.chain_of("f").unwrap().len(), 1);

        // 下一次写才追加新块
        fs.write(fd, b"!", 1).unwrap();
        assert_eq!(fs.chain_of("f").unwrap().len(), 2);
        assert_eq!(fs.get_filesize(fd).unwrap(), BLOCK_SIZE as u64 + 1);
    }

    #[test]
    fn successive_small_reads_cross_block_boundaries() {
        let mut fs = mounted(32);
        let fd = open_new(&mut fs, "f");
        let data = pattern(3 * BLOCK_SIZE - 5);
        fs.write(fd, &data, data.len()).unwrap();
        fs.lseek(fd, 0).unwrap();

        let mut collected = Vec::new();
        let mut chunk = [0u8; 1000];
        while collected.len() < data.len() {
            let want = (data.len() - collected.len()).min(1000);
            let n = fs.read(fd, &mut chunk, want).unwrap();
            assert_eq!(n, want);
            collected.extend_from_slice(&chunk[..n]);
        }
        assert_eq!(collected, data);
        assert_eq!(fs.tell(fd).unwrap(), data.len() as u64);
    }

    #[test]
    fn overwrite_keeps_size() {
        let mut fs = mounted(32);
        let fd = open_new(&mut fs, "f");
        let data = pattern(5000);
        fs.write(fd, &data, data.len()).unwrap();

        fs.lseek(fd, 4090).unwrap();
        assert_eq!(fs.write(fd, b"XXXXXXXXXXXX", 12).unwrap(), 12);
        assert_eq!(fs.get_filesize(fd).unwrap(), 5000);

        fs.lseek(fd, 4090).unwrap();
        let mut out = [0u8; 14];
        fs.read(fd, &mut out, 14).unwrap();
        assert_eq!(&out[..12], b"XXXXXXXXXXXX");
        assert_eq!(&out[12..], &data[4102..4104]);
    }

    #[test]
    fn write_past_end_grows_by_the_overhang() {
        let mut fs = mounted(32);
        let fd = open_new(&mut fs, "f");
        fs.write(fd, b"0123456789", 10).unwrap();
        fs.lseek(fd, 6).unwrap();
        fs.write(fd, b"abcdefgh", 8).unwrap();
        assert_eq!(fs.get_filesize(fd).unwrap(), 14);

        fs.lseek(fd, 0).unwrap();
        let mut out = [0u8; 14];
        fs.read(fd, &mut out, 14).unwrap();
        assert_eq!(&out, b"012345abcdefgh");
    }

    #[test]
    fn seek_targets_the_block_holding_the_offset() {
        let mut fs = mounted(32);
        let fd = open_new(&mut fs, "f");
        let data = pattern(4 * BLOCK_SIZE);
        fs.write(fd, &data, data.len()).unwrap();

        for offset in [1, BLOCK_SIZE - 1, BLOCK_SIZE, BLOCK_SIZE + 1, 2 * BLOCK_SIZE + 17] {
            fs.lseek(fd, offset as i64).unwrap();
            let mut out = [0u8; 8];
            assert_eq!(fs.read(fd, &mut out, 8).unwrap(), 8);
            assert_eq!(&out, &data[offset..offset + 8], "offset {}", offset);
        }
    }

    #[test]
    fn seek_bounds() {
        let mut fs = mounted(32);
        let fd = open_new(&mut fs, "f");
        fs.write(fd, b"abc", 3).unwrap();
        assert_eq!(fs.lseek(fd, -1).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(fs.lseek(fd, 4).unwrap_err().kind(), ErrorKind::InvalidArgument);
        fs.lseek(fd, 3).unwrap();
        assert_eq!(fs.tell(fd).unwrap(), 3);

        fs.write(fd, b"de", 2).unwrap();
        assert_eq!(fs.get_filesize(fd).unwrap(), 5);
    }

    #[test]
    fn seek_to_end_of_full_block_then_append() {
        let mut fs = mounted(32);
        let fd = open_new(&mut fs, "f");
        let data = pattern(2 * BLOCK_SIZE);
        fs.write(fd, &data, data.len()).unwrap();
        fs.lseek(fd, BLOCK_SIZE as i64).unwrap();
        fs.write(fd, b"mid", 3).unwrap();
        fs.lseek(fd, 2 * BLOCK_SIZE as i64).unwrap();
        fs.write(fd, b"end", 3).unwrap();
        assert_eq!(fs.chain_of("f").unwrap().len(), 3);

        fs.lseek(fd, BLOCK_SIZE as i64).unwrap();
        let mut out = [0u8; 3];
        fs.read(fd, &mut out, 3).unwrap();
        assert_eq!(&out, b"mid");
        fs.lseek(fd, 2 * BLOCK_SIZE as i64).unwrap();
        fs.read(fd, &mut out, 3).unwrap();
        assert_eq!(&out, b"end");
    }

    #[test]
    fn short_write_when_disk_fills() {
        // 3 个元数据块 + 5 个数据块
        let mut fs = mounted(8);
        let fd = open_new(&mut fs, "f");
        fs.write(fd, b"head", 4).unwrap();

        let data = pattern(6 * BLOCK_SIZE);
        let written = fs.write(fd, &data, data.len()).unwrap();
        assert!(written < data.len());
        assert_eq!(written, 5 * BLOCK_SIZE - 4);
        assert_eq!(fs.get_filesize(fd).unwrap(), 4 + written as u64);
        assert_eq!(fs.free_blocks(), 0);

        // 已满时继续写返回 0
        assert_eq!(fs.write(fd, b"more", 4).unwrap(), 0);
    }

    #[test]
    fn truncate_large_file_frees_tail_blocks() {
        let mut fs = mounted(32);
        let fd = open_new(&mut fs, "f");
        let data = pattern(9000);
        fs.write(fd, &data, data.len()).unwrap();
        let free_before = fs.free_blocks();

        fs.truncate(fd, 10).unwrap();
        assert_eq!(fs.chain_of("f").unwrap().len(), 1);
        assert_eq!(fs.free_blocks(), free_before + 2);
        assert_eq!(fs.tell(fd).unwrap(), 10);

        fs.lseek(fd, 0).unwrap();
        let mut out = [0u8; 12];
        assert_eq!(fs.read(fd, &mut out, 12).unwrap(), 10);
        assert_eq!(&out[..10], &data[..10]);
    }

    #[test]
    fn truncate_zeroes_the_dropped_tail() {
        let mut fs = mounted(32);
        let fd = open_new(&mut fs, "f");
        fs.write(fd, b"0123456789", 10).unwrap();
        fs.truncate(fd, 4).unwrap();
        let fd2 = fs.open("f").unwrap();
        fs.lseek(fd2, 4).unwrap();
        fs.write(fd2, b"x", 1).unwrap();
        fs.lseek(fd2, 0).unwrap();
        let mut out = [0xffu8; 5];
        fs.read(fd2, &mut out, 5).unwrap();
        assert_eq!(&out, b"0123x");
        assert_eq!(fs.image.slice(fs.files()[0].head, 5, 5).unwrap(), &[0u8; 5]);
    }

    #[test]
    fn truncate_on_block_boundary_and_to_zero() {
        let mut fs = mounted(32);
        let fd = open_new(&mut fs, "f");
        let data = pattern(3 * BLOCK_SIZE);
        fs.write(fd, &data, data.len()).unwrap();

        fs.truncate(fd, BLOCK_SIZE as i64).unwrap();
        assert_eq!(fs.chain_of("f").unwrap().len(), 1);
        assert_eq!(fs.get_filesize(fd).unwrap(), BLOCK_SIZE as u64);

        fs.truncate(fd, 0).unwrap();
        assert_eq!(fs.chain_of("f").unwrap().len(), 1);
        assert_eq!(fs.get_filesize(fd).unwrap(), 0);
        assert_eq!(fs.tell(fd).unwrap(), 0);

        fs.write(fd, b"again", 5).unwrap();
        fs.lseek(fd, 0).unwrap();
        let mut out = [0u8; 5];
        fs.read(fd, &mut out, 5).unwrap();
        assert_eq!(&out, b"again");
    }

    #[test]
    fn truncate_rejects_growth() {
        let mut fs = mounted(32);
        let fd = open_new(&mut fs, "f");
        fs.write(fd, b"abc", 3).unwrap();
        assert_eq!(fs.truncate(fd, 4).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(fs.truncate(fd, -1).unwrap_err().kind(), ErrorKind::InvalidArgument);
        fs.truncate(fd, 3).unwrap();
        assert_eq!(fs.get_filesize(fd).unwrap(), 3);
    }

    #[test]
    fn truncate_pulls_back_other_cursors() {
        let mut fs = mounted(32);
        let writer = open_new(&mut fs, "f");
        let data = pattern(2 * BLOCK_SIZE + 100);
        fs.write(writer, &data, data.len()).unwrap();

        let reader = fs.open("f").unwrap();
        fs.lseek(reader, 2 * BLOCK_SIZE as i64 + 50).unwrap();
        fs.lseek(writer, 3).unwrap();

        fs.truncate(writer, 20).unwrap();
        assert_eq!(fs.tell(reader).unwrap(), 20);
        assert_eq!(fs.tell(writer).unwrap(), 3);

        // reader 在新末尾追加
        fs.write(reader, b"tail", 4).unwrap();
        fs.lseek(writer, 0).unwrap();
        let mut out = [0u8; 24];
        fs.read(writer, &mut out, 24).unwrap();
        assert_eq!(&out[..20], &data[..20]);
        assert_eq!(&out[20..], b"tail");
    }

    #[test]
    fn independent_cursors() {
        let mut fs = mounted(32);
        let a = open_new(&mut fs, "f");
        fs.write(a, b"abcdef", 6).unwrap();
        let b = fs.open("f").unwrap();

        let mut out = [0u8; 3];
        fs.read(b, &mut out, 3).unwrap();
        assert_eq!(&out, b"abc");
        assert_eq!(fs.tell(a).unwrap(), 6);
        assert_eq!(fs.tell(b).unwrap(), 3);
    }

    #[test]
    fn unknown_handle_is_not_found() {
        let mut fs = mounted(32);
        let mut buf = [0u8; 4];
        assert_eq!(fs.read(3, &mut buf, 4).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(fs.write(3, &buf, 4).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(fs.get_filesize(3).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(fs.lseek(3, 0).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(fs.truncate(3, 0).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn n_is_clamped_to_buffer_length() {
        let mut fs = mounted(32);
        let fd = open_new(&mut fs, "f");
        assert_eq!(fs.write(fd, b"abc", 100).unwrap(), 3);
        fs.lseek(fd, 0).unwrap();
        let mut out = [0u8; 2];
        assert_eq!(fs.read(fd, &mut out, 100).unwrap(), 2);
    }
}
