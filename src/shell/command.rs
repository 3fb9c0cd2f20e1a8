use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use minifat::{FileSystem, DISK_BLOCKS};
use std::error::Error;

use crate::shell::Session;

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Disks,
    Make(String),
    Mount(String),
    Unmount,
    Info,
    Ls,
    Create(String),
    Rm(String),
    Open(String),
    Close(usize),
    Read(usize, usize),
    Write(usize, String),
    Seek(usize, i64),
    Truncate(usize, i64),
    Size(usize),
    Exit,
}

fn block_progress(len: u64, template: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(template) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// 在磁盘目录下新建并格式化一个镜像
pub fn make_disk(session: &Session, name: &str) -> Result<(), Box<dyn Error>> {
    let path = session.disk_path(name);
    println!("💾 Creating disk {}...", path.display().to_string().cyan());
    let pb = block_progress(DISK_BLOCKS, "[{bar:40.green/black}] {pos}/{len} blocks {msg}");
    FileSystem::make_with_progress(&path, DISK_BLOCKS, |done, _| pb.set_position(done))?;
    pb.finish_with_message("✅ formatted");
    Ok(())
}

pub fn mount_disk(session: &mut Session, name: &str) -> Result<(), Box<dyn Error>> {
    if let Some(current) = session.mounted_name() {
        return Err(format!("{} is already mounted, unmount it first", current).into());
    }
    let fs = FileSystem::mount(session.disk_path(name))?;
    session.attach(name, fs);
    println!("📀 Mounted {}", name.green());
    Ok(())
}

pub fn unmount_disk(session: &mut Session) -> Result<(), Box<dyn Error>> {
    let (name, fs) = session.detach().ok_or("no disk is mounted")?;
    let pb = block_progress(fs.info().total_blocks, "[{bar:40.cyan/blue}] {pos}/{len} blocks");
    fs.unmount_with_progress(|done, _| pb.set_position(done))?;
    pb.finish_and_clear();
    println!("⏏️  Unmounted {}", name.yellow());
    Ok(())
}

pub fn execute_command(cmd: &Command, session: &mut Session) -> Result<(), Box<dyn Error>> {
    match cmd {
        Command::Help => print_help(),
        Command::Disks => {
            let disks = session.list_disks()?;
            if disks.is_empty() {
                println!("{}", "(no disks yet, try 'make <disk>')".bright_black());
            }
            for disk in disks {
                println!("💽  {}", disk);
            }
        }
        Command::Make(name) => make_disk(session, name)?,
        Command::Mount(name) => mount_disk(session, name)?,
        Command::Unmount => unmount_disk(session)?,
        Command::Info => {
            let fs = session.fs()?;
            let info = fs.info();
            println!("{}", "📊 Volume Info".bright_yellow().bold());
            println!(
                "{}: fat={} dir={} data={}",
                "Superblock".blue(),
                info.fat_offset,
                info.directory_offset,
                info.data_block_offset
            );
            println!(
                "{}: {} total, {} free",
                "Blocks".blue(),
                info.total_blocks,
                info.free_blocks
            );
            println!(
                "{}: {} files, {} open",
                "Files".blue(),
                info.files,
                info.open_files
            );
            let fat: Vec<String> = (0..20)
                .filter_map(|block| fs.fat_entry(block))
                .map(|entry| i32::from(entry).to_string())
                .collect();
            println!("{}: {}", "FAT (first 20)".blue(), fat.join(" "));
        }
        Command::Ls => {
            let fs = session.fs()?;
            let files = fs.files();
            if files.is_empty() {
                println!("{}", "(empty)".bright_black());
            }
            for file in files {
                println!("📄  {:<16} {:>10} bytes  @{}", file.name, file.size, file.head);
            }
        }
        Command::Create(name) => {
            session.fs_mut()?.create(name)?;
            println!("📝 Created file: {}", name.green());
        }
        Command::Rm(name) => {
            session.fs_mut()?.delete(name)?;
            println!("❌ Deleted file: {}", name.red());
        }
        Command::Open(name) => {
            let fd = session.fs_mut()?.open(name)?;
            println!("📂 {} opened as fd {}", name.cyan(), fd.to_string().bold());
        }
        Command::Close(fd) => {
            session.fs_mut()?.close(*fd)?;
            println!("📁 Closed fd {}", fd);
        }
        Command::Read(fd, n) => {
            // 读取量不会超过文件大小
            let n = (*n).min(session.fs()?.get_filesize(*fd)? as usize);
            let mut buf = vec![0u8; n];
            let read = session.fs_mut()?.read(*fd, &mut buf, n)?;
            println!("📖 {} bytes read", read);
            println!("{}", String::from_utf8_lossy(&buf[..read]));
        }
        Command::Write(fd, content) => {
            let bytes = content.as_bytes();
            let written = session.fs_mut()?.write(*fd, bytes, bytes.len())?;
            if written < bytes.len() {
                println!(
                    "{} only {} of {} bytes written, disk is full",
                    "⚠️ ".yellow(),
                    written,
                    bytes.len()
                );
            } else {
                println!("{} {} bytes written", "✅".green(), written);
            }
        }
        Command::Seek(fd, offset) => {
            session.fs_mut()?.lseek(*fd, *offset)?;
            println!("🔍 fd {} now at {}", fd, offset);
        }
        Command::Truncate(fd, len) => {
            session.fs_mut()?.truncate(*fd, *len)?;
            println!("✂️  fd {} truncated to {} bytes", fd, len);
        }
        Command::Size(fd) => {
            let size = session.fs()?.get_filesize(*fd)?;
            println!("📏 {} bytes", size);
        }
        Command::Exit => {
            if session.mounted_name().is_some() {
                unmount_disk(session)?;
            }
            println!("{}", "👋 Exiting MiniFAT shell...".yellow().bold());
        }
    }

    Ok(())
}

fn print_help() {
    println!("{}", "📘 MiniFAT Commands".bright_cyan().bold());
    println!(
        "{}",
        "
  disks              List disk images
  make <disk>        Create and format a new disk image
  mount <disk>       Mount a disk image
  unmount            Flush and unmount the current disk
  info               Show layout and usage of the mounted disk
  ls                 List files
  create <file>      Create an empty file
  rm <file>          Delete a file
  open <file>        Open a file, printing its fd
  close <fd>         Close a file descriptor
  read <fd> <n>      Read up to n bytes
  write <fd> <text>  Write text at the cursor
  seek <fd> <off>    Move the cursor
  truncate <fd> <n>  Shrink a file to n bytes
  size <fd>          Show file size
  help               Show this help message
  exit               Unmount and quit
"
        .bright_black()
    );
}
