//! `vidq doctor` – report external tools the fetcher relies on.

use std::process::{Command, Stdio};
use vidq_core::config::VidqConfig;

struct Check<'a> {
    label: &'static str,
    /// Programs tried in order, each with its version flag.
    candidates: Vec<(&'a str, &'static str)>,
    hint: &'static str,
}

pub fn run_doctor(cfg: &VidqConfig) {
    let checks = [
        Check {
            label: "yt-dlp",
            candidates: vec![(cfg.ytdlp_bin.as_str(), "--version")],
            hint: "install yt-dlp or set ytdlp_bin / VIDQ_YTDLP",
        },
        Check {
            label: "ffmpeg",
            candidates: vec![("ffmpeg", "-version")],
            hint: "needed to merge video+audio and to extract audio",
        },
        Check {
            label: "JavaScript runtime",
            candidates: vec![("deno", "--version"), ("node", "--version"), ("bun", "--version")],
            hint: "some sites need deno or node for yt-dlp extraction",
        },
    ];

    let mut missing = 0;
    for check in &checks {
        let found = check
            .candidates
            .iter()
            .find_map(|(program, flag)| probe(program, flag).map(|v| (*program, v)));
        match found {
            Some((program, version)) => println!("ok       {:<20} {program} {version}", check.label),
            None => {
                missing += 1;
                tracing::warn!(tool = check.label, "not found");
                println!("missing  {:<20} {}", check.label, check.hint);
            }
        }
    }
    if missing > 0 {
        println!("{missing} tool(s) missing; downloads may fail or skip steps.");
    }
}

/// First output line of `program flag`, if it runs and exits 0.
fn probe(program: &str, flag: &str) -> Option<String> {
    let output = Command::new(program)
        .arg(flag)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}
