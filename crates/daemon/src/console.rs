//! Interactive console driving the mount registry.
//!
//! A small line-oriented REPL: mount and unmount buckets, list what is
//! mounted, exit. Ctrl-C clears the line, Ctrl-D (or `exit`) quits.

use std::path::PathBuf;
use std::sync::Arc;

use reedline::{DefaultPrompt, DefaultPromptSegment, Reedline, Signal};

use client::S3Client;

use crate::config::Credentials;
use crate::fs::FsConfig;
use crate::fuse::FuseBackend;
use crate::registry::{MountIdentity, MountRegistry};

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Mount { bucket: String, mountpoint: PathBuf },
    Unmount { target: String },
    List,
    Clear,
    Help,
    Exit,
}

/// Parse one console line. Empty input is an error so the caller can just
/// reprompt.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let verb = words.next().ok_or("")?;

    let command = match verb {
        "mount" => {
            let bucket = words.next().ok_or("usage: mount <bucket> <mountpoint>")?;
            let mountpoint = words.next().ok_or("usage: mount <bucket> <mountpoint>")?;
            Command::Mount {
                bucket: bucket.to_string(),
                mountpoint: PathBuf::from(mountpoint),
            }
        }
        "unmount" | "umount" => {
            let target = words.next().ok_or("usage: unmount <mountpoint|bucket>")?;
            Command::Unmount {
                target: target.to_string(),
            }
        }
        "list" | "ls" => Command::List,
        "cls" | "clear" => Command::Clear,
        "help" | "?" => Command::Help,
        "exit" | "quit" => Command::Exit,
        other => return Err(format!("unknown command: {other} (try 'help')")),
    };

    if let Some(extra) = words.next() {
        return Err(format!("unexpected argument: {extra}"));
    }
    Ok(command)
}

const HELP: &str = "\
commands:
  mount <bucket> <mountpoint>   mount a bucket (read-only)
  unmount <mountpoint|bucket>   unmount by path, access_id/bucket, or bucket
  list                          show active mounts
  cls                           clear the screen
  help                          show this text
  exit                          unmount everything and quit";

/// The interactive front end. Owns nothing but references: the registry
/// outlives the console and is drained by the caller on shutdown.
pub struct Console {
    registry: Arc<MountRegistry<FuseBackend>>,
    credentials: Credentials,
    fs_config: FsConfig,
}

impl Console {
    pub fn new(
        registry: Arc<MountRegistry<FuseBackend>>,
        credentials: Credentials,
        fs_config: FsConfig,
    ) -> Self {
        Self {
            registry,
            credentials,
            fs_config,
        }
    }

    /// Read-eval loop. Returns when the user exits.
    pub fn run(&self) -> anyhow::Result<()> {
        let mut editor = Reedline::create();
        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic("ossfs".to_string()),
            DefaultPromptSegment::Empty,
        );

        loop {
            match editor.read_line(&prompt)? {
                Signal::Success(line) => {
                    let command = match parse_command(&line) {
                        Ok(c) => c,
                        Err(msg) => {
                            if !msg.is_empty() {
                                println!("{msg}");
                            }
                            continue;
                        }
                    };
                    if !self.dispatch(&mut editor, command)? {
                        break;
                    }
                }
                Signal::CtrlC => continue,
                Signal::CtrlD => break,
            }
        }

        Ok(())
    }

    /// Execute one command; false means quit.
    fn dispatch(&self, editor: &mut Reedline, command: Command) -> anyhow::Result<bool> {
        Ok(match command {
            Command::Mount { bucket, mountpoint } => {
                self.mount(&bucket, mountpoint);
                true
            }
            Command::Unmount { target } => {
                if self.registry.unmount(&target) {
                    println!("unmounted {target}");
                } else {
                    println!("nothing mounted matches {target}");
                }
                true
            }
            Command::List => {
                let mounts = self.registry.list();
                if mounts.is_empty() {
                    println!("no active mounts");
                } else {
                    for mount in mounts {
                        println!("{}  {}", mount.identity, mount.mountpoint.display());
                    }
                }
                true
            }
            Command::Clear => {
                editor.clear_screen()?;
                true
            }
            Command::Help => {
                println!("{HELP}");
                true
            }
            Command::Exit => false,
        })
    }

    fn mount(&self, bucket: &str, mountpoint: PathBuf) {
        let client = match S3Client::connect(&self.credentials.s3_config(bucket)) {
            Ok(c) => c,
            Err(e) => {
                println!("cannot build client for {bucket}: {e}");
                return;
            }
        };

        let identity = MountIdentity {
            access_id: self.credentials.access_id.clone(),
            bucket: bucket.to_string(),
        };

        match self.registry.mount(
            identity,
            Arc::new(client),
            &mountpoint,
            self.fs_config.clone(),
        ) {
            Ok(()) => println!("mounted {bucket} at {}", mountpoint.display()),
            Err(e) => println!("mount failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mount() {
        assert_eq!(
            parse_command("mount media /mnt/media").unwrap(),
            Command::Mount {
                bucket: "media".to_string(),
                mountpoint: PathBuf::from("/mnt/media"),
            }
        );
    }

    #[test]
    fn parses_unmount_aliases() {
        for verb in ["unmount", "umount"] {
            assert_eq!(
                parse_command(&format!("{verb} /mnt/media")).unwrap(),
                Command::Unmount {
                    target: "/mnt/media".to_string()
                }
            );
        }
    }

    #[test]
    fn parses_simple_verbs() {
        assert_eq!(parse_command("  list ").unwrap(), Command::List);
        assert_eq!(parse_command("ls").unwrap(), Command::List);
        assert_eq!(parse_command("cls").unwrap(), Command::Clear);
        assert_eq!(parse_command("clear").unwrap(), Command::Clear);
        assert_eq!(parse_command("help").unwrap(), Command::Help);
        assert_eq!(parse_command("exit").unwrap(), Command::Exit);
        assert_eq!(parse_command("quit").unwrap(), Command::Exit);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_command("").is_err());
        assert!(parse_command("mount media").is_err());
        assert!(parse_command("mount media /mnt extra").is_err());
        assert!(parse_command("frobnicate").is_err());
    }
}
