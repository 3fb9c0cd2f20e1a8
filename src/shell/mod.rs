pub mod command;
pub mod parse;

use crate::shell::{
    command::{execute_command, make_disk, mount_disk, Command},
    parse::parse_command,
};
use colored::*;
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use dialoguer::{Confirm, Input};
use minifat::FileSystem;
use reedline::{DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};
use std::{
    io::stdout,
    path::{Path, PathBuf},
};

/// 磁盘镜像目录，可用环境变量覆盖
pub const DISK_DIR_ENV: &str = "MINIFAT_DISK_DIR";
const DEFAULT_DISK_DIR: &str = "./disks/";

/// shell 的会话状态：磁盘目录和当前挂载的卷
pub struct Session {
    disk_dir: PathBuf,
    mounted: Option<(String, FileSystem)>,
}

impl Session {
    pub fn new<P: AsRef<Path>>(disk_dir: P) -> Self {
        Self {
            disk_dir: disk_dir.as_ref().to_path_buf(),
            mounted: None,
        }
    }

    pub fn from_env() -> Self {
        let dir = std::env::var(DISK_DIR_ENV).unwrap_or_else(|_| DEFAULT_DISK_DIR.to_string());
        Self::new(dir)
    }

    pub fn disk_path(&self, name: &str) -> PathBuf {
        self.disk_dir.join(name)
    }

    pub fn list_disks(&self) -> std::io::Result<Vec<String>> {
        if !self.disk_dir.exists() {
            return Ok(Vec::new());
        }
        let mut disks: Vec<String> = std::fs::read_dir(&self.disk_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| !name.starts_with('.'))
            .collect();
        disks.sort();
        Ok(disks)
    }

    pub fn mounted_name(&self) -> Option<&str> {
        self.mounted.as_ref().map(|(name, _)| name.as_str())
    }

    pub fn attach(&mut self, name: &str, fs: FileSystem) {
        self.mounted = Some((name.to_string(), fs));
    }

    pub fn detach(&mut self) -> Option<(String, FileSystem)> {
        self.mounted.take()
    }

    pub fn fs(&self) -> Result<&FileSystem, String> {
        self.mounted
            .as_ref()
            .map(|(_, fs)| fs)
            .ok_or_else(|| "no disk is mounted, try 'mount <disk>'".to_string())
    }

    pub fn fs_mut(&mut self) -> Result<&mut FileSystem, String> {
        self.mounted
            .as_mut()
            .map(|(_, fs)| fs)
            .ok_or_else(|| "no disk is mounted, try 'mount <disk>'".to_string())
    }
}

pub fn start_shell() {
    boot_animation();

    let mut session = Session::from_env();
    choose_disk(&mut session);

    let username = whoami::username();
    let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "localhost".to_string());

    println!(
        "{}",
        "Type 'help' for available commands. Use ↑↓ for history, Tab for auto-completion.\n"
            .bright_black()
    );

    // 初始化 reedline
    let history_path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".minifat_history");

    let mut line_editor = Reedline::create();
    match FileBackedHistory::with_file(100, history_path) {
        Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
        Err(e) => log::warn!("command history disabled: {}", e),
    }

    // 命令补全
    let commands: Vec<String> = [
        "help", "disks", "make", "mount", "unmount", "info", "ls", "create", "rm", "open",
        "close", "read", "write", "seek", "truncate", "size", "exit",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();
    let completer = reedline::DefaultCompleter::new_with_wordlen(commands, 2);
    line_editor = line_editor.with_completer(Box::new(completer));

    loop {
        let volume = session.mounted_name().unwrap_or("-").to_string();
        let full_prompt = format!(
            "{}:{}> ",
            format!("{}@{}", username, hostname).green(),
            volume.blue()
        );

        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic(full_prompt),
            DefaultPromptSegment::Basic("MiniFAT".bright_blue().bold().to_string()),
        );

        let input = line_editor.read_line(&prompt);

        match input {
            Ok(Signal::Success(buffer)) => {
                let trimmed = buffer.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_command(trimmed) {
                    Some(cmd) => {
                        if let Err(e) = execute_command(&cmd, &mut session) {
                            println!("{} {}", "❌ Error:".red().bold(), e);
                        }
                        if matches!(cmd, Command::Exit) {
                            println!("{}", "👋 Bye!".bright_yellow());
                            break;
                        }
                    }
                    None => println!(
                        "{}",
                        "⚠️  Unknown command. Type 'help' for command list.".yellow()
                    ),
                }
            }
            Ok(Signal::CtrlC) => {
                println!();
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("{}", "Exiting MiniFAT...".yellow());
                if let Err(e) = execute_command(&Command::Exit, &mut session) {
                    println!("{} {}", "❌ Error:".red().bold(), e);
                }
                break;
            }
            Err(e) => {
                println!("Error reading line: {}", e);
                break;
            }
        }
    }

    println!("{}", "GoodBye!".bright_yellow());
}

/// 启动时询问新建磁盘还是加载已有磁盘
fn choose_disk(session: &mut Session) {
    let create = match Confirm::new()
        .with_prompt("Create a new disk?")
        .default(true)
        .interact()
    {
        Ok(create) => create,
        Err(e) => {
            log::debug!("no interactive terminal, skipping disk selection: {}", e);
            return;
        }
    };

    if !create {
        match session.list_disks() {
            Ok(disks) if !disks.is_empty() => {
                println!("{}", "List of available disks:".bright_cyan());
                for disk in disks {
                    println!("  {}", disk);
                }
            }
            Ok(_) => println!("{}", "(no disks found)".bright_black()),
            Err(e) => println!("{} {}", "❌ Error:".red().bold(), e),
        }
    }

    let prompt = if create {
        "Name the new disk"
    } else {
        "Enter the name of disk to load"
    };
    let name: String = match Input::new().with_prompt(prompt).interact_text() {
        Ok(name) => name,
        Err(e) => {
            log::debug!("disk selection aborted: {}", e);
            return;
        }
    };
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) {
        println!("{}", "Invalid disk name!".red());
        return;
    }

    let result = if create {
        make_disk(session, name).and_then(|_| mount_disk(session, name))
    } else {
        mount_disk(session, name)
    };
    if let Err(e) = result {
        println!("{} {}", "❌ Error:".red().bold(), e);
    }
}

/// 欢迎画面
fn boot_animation() {
    let mut stdout = stdout();

    if let Err(e) = execute!(
        stdout,
        Clear(ClearType::All),
        cursor::MoveTo(0, 0),
        SetForegroundColor(Color::Cyan),
        Print(format!("Welcome to MiniFAT v{}\n", env!("CARGO_PKG_VERSION"))),
        ResetColor
    ) {
        log::debug!("terminal does not support clearing: {}", e);
    }
    println!(
        "{}",
        format!(
            "[{} blocks × {} bytes per disk]",
            minifat::DISK_BLOCKS,
            minifat::BLOCK_SIZE
        )
        .bright_black()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("minifat-shell-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn session_runs_a_full_cycle() {
        let dir = temp_dir();
        let mut session = Session::new(&dir);
        assert!(session.list_disks().unwrap().is_empty());
        assert!(session.fs().is_err());

        execute_command(&Command::Make("d1".into()), &mut session).unwrap();
        assert_eq!(session.list_disks().unwrap(), vec!["d1".to_string()]);
        execute_command(&Command::Mount("d1".into()), &mut session).unwrap();
        assert!(execute_command(&Command::Mount("d1".into()), &mut session).is_err());

        execute_command(&Command::Create("notes".into()), &mut session).unwrap();
        execute_command(&Command::Open("notes".into()), &mut session).unwrap();
        execute_command(&Command::Write(0, "hello shell".into()), &mut session).unwrap();
        execute_command(&Command::Truncate(0, 5), &mut session).unwrap();
        assert_eq!(session.fs().unwrap().get_filesize(0).unwrap(), 5);
        execute_command(&Command::Close(0), &mut session).unwrap();
        execute_command(&Command::Unmount, &mut session).unwrap();
        assert!(session.mounted_name().is_none());

        execute_command(&Command::Mount("d1".into()), &mut session).unwrap();
        let files = session.fs().unwrap().files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size, 5);
        execute_command(&Command::Exit, &mut session).unwrap();
        assert!(session.mounted_name().is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn commands_need_a_mounted_disk() {
        let mut session = Session::new(temp_dir());
        assert!(execute_command(&Command::Ls, &mut session).is_err());
        assert!(execute_command(&Command::Unmount, &mut session).is_err());
        assert!(execute_command(&Command::Mount("missing".into()), &mut session).is_err());
    }
}
