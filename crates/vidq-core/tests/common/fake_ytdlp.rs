//! Shell script standing in for the yt-dlp binary.
//!
//! Answers the title lookup (`--skip-download`) with a fixed title and
//! otherwise prints progress-template lines, or fails like yt-dlp does.

use std::fs;
use std::path::{Path, PathBuf};

const SUCCESS_BODY: &str = r#"
echo "[youtube] abc123: Downloading webpage"
echo "vidq-progress|downloading|256|1024|NA|  25.0%|1.00MiB/s|00:03|Fake Clip"
echo "vidq-progress|downloading|1024|1024|NA|100.0%|1.00MiB/s|00:00|Fake Clip"
echo "vidq-progress|finished|1024|1024|NA|100.0%|1.00MiB/s|00:00|Fake Clip"
echo "[Merger] Merging formats into \"Fake Clip.mp4\""
exit 0
"#;

const FAILURE_BODY: &str = r#"
echo "[youtube] abc123: Downloading webpage"
echo "ERROR: [youtube] abc123: Video unavailable" >&2
exit 1
"#;

pub fn install_success(dir: &Path) -> PathBuf {
    install(dir, "yt-dlp-ok", SUCCESS_BODY)
}

pub fn install_failure(dir: &Path) -> PathBuf {
    install(dir, "yt-dlp-fail", FAILURE_BODY)
}

/// Writes its pid to `pid_file`, reports one progress line, then hangs.
pub fn install_stalling(dir: &Path, pid_file: &Path) -> PathBuf {
    let body = format!(
        "echo $$ > \"{}\"\necho \"vidq-progress|downloading|1|1024|NA|  0.1%|1.00KiB/s|10:00|Fake Clip\"\nexec sleep 30\n",
        pid_file.display()
    );
    install(dir, "yt-dlp-stall", &body)
}

fn install(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let script = format!(
        "#!/bin/sh\nfor a in \"$@\"; do\n  if [ \"$a\" = \"--skip-download\" ]; then echo \"Fake Clip\"; exit 0; fi\ndone\n{body}"
    );
    fs::write(&path, script).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
    path
}
