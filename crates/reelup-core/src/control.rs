//! Control commands for a running upload session, and the socket path.
//!
//! A running `reelup upload` owns the job store and listens on a Unix
//! socket. `reelup pause 3`, `cancel`, `remove` and `resume` from another
//! terminal write one command line to it and the running manager applies it.

use std::fmt;
use std::path::PathBuf;

use crate::job::JobId;

/// One control request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Pause(JobId),
    Cancel(JobId),
    Remove(JobId),
    /// Re-attach the file at `path`. The path must be absolute: the session
    /// runs in another working directory.
    Resume { id: JobId, path: PathBuf },
}

impl ControlCommand {
    /// Parses one command line. Anything malformed is `None`.
    ///
    /// `resume <id> <path>` takes the rest of the line as the path, so paths
    /// may contain spaces.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace)?;
        let rest = rest.trim_start();

        if verb == "resume" {
            let (id, path) = rest.split_once(char::is_whitespace)?;
            let id: JobId = id.parse().ok()?;
            let path = PathBuf::from(path.trim_start());
            if !path.is_absolute() {
                return None;
            }
            return Some(ControlCommand::Resume { id, path });
        }

        let id: JobId = rest.parse().ok()?;
        match verb {
            "pause" => Some(ControlCommand::Pause(id)),
            "cancel" => Some(ControlCommand::Cancel(id)),
            "remove" => Some(ControlCommand::Remove(id)),
            _ => None,
        }
    }

    pub fn job_id(&self) -> JobId {
        match self {
            ControlCommand::Pause(id)
            | ControlCommand::Cancel(id)
            | ControlCommand::Remove(id)
            | ControlCommand::Resume { id, .. } => *id,
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlCommand::Pause(id) => write!(f, "pause {}", id),
            ControlCommand::Cancel(id) => write!(f, "cancel {}", id),
            ControlCommand::Remove(id) => write!(f, "remove {}", id),
            ControlCommand::Resume { id, path } => write!(f, "resume {} {}", id, path.display()),
        }
    }
}

/// Default path for the control socket (same XDG state dir as the job store).
pub fn default_control_socket_path() -> std::io::Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("reelup")?;
    xdg_dirs.place_state_file("control.sock")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_commands() {
        assert_eq!(ControlCommand::parse("pause 3"), Some(ControlCommand::Pause(3)));
        assert_eq!(ControlCommand::parse("  cancel 12\n"), Some(ControlCommand::Cancel(12)));
        assert_eq!(ControlCommand::parse("remove 4"), Some(ControlCommand::Remove(4)));
    }

    #[test]
    fn parse_resume_keeps_spaces_in_path() {
        assert_eq!(
            ControlCommand::parse("resume 5 /srv/media/day one/clip 1.mp4\n"),
            Some(ControlCommand::Resume {
                id: 5,
                path: PathBuf::from("/srv/media/day one/clip 1.mp4"),
            })
        );
    }

    #[test]
    fn parse_rejects_malformed_lines() {
        assert_eq!(ControlCommand::parse(""), None);
        assert_eq!(ControlCommand::parse("pause"), None);
        assert_eq!(ControlCommand::parse("pause x"), None);
        assert_eq!(ControlCommand::parse("pause 1 2"), None);
        assert_eq!(ControlCommand::parse("start 1"), None);
        assert_eq!(ControlCommand::parse("resume 1"), None);
        assert_eq!(ControlCommand::parse("resume 1 relative/clip.mp4"), None);
    }

    #[test]
    fn display_matches_wire_format() {
        let cmd = ControlCommand::Cancel(9);
        assert_eq!(cmd.to_string(), "cancel 9");
        assert_eq!(cmd.job_id(), 9);
        assert_eq!(ControlCommand::parse(&cmd.to_string()), Some(cmd));

        let resume = ControlCommand::Resume {
            id: 2,
            path: PathBuf::from("/tmp/a b.mp4"),
        };
        assert_eq!(resume.to_string(), "resume 2 /tmp/a b.mp4");
        assert_eq!(ControlCommand::parse(&resume.to_string()), Some(resume));
    }
}
