//! yt-dlp subprocess fetcher.
//!
//! stdout and stderr are drained by two reader threads into one channel; the
//! calling worker thread consumes it and drives the hooks, so hook calls stay
//! on a single thread per job.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;

use super::parse::{parse_line, progress_template, OutputLine};
use super::{
    CookieSource, FetchError, FetchHooks, FetchRequest, MediaFetcher, MessageLevel,
    PostProcessEvent,
};
use crate::preset::PostProcessor;

pub struct YtDlpFetcher {
    program: String,
}

enum StreamLine {
    Stdout(String),
    Stderr(String),
}

impl YtDlpFetcher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument list for a download.
    pub fn download_args(request: &FetchRequest) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--newline".into(),
            "--no-warnings".into(),
            "--progress-template".into(),
            progress_template(),
            "-f".into(),
            request.format.clone(),
            "-o".into(),
            request.output_template.to_string_lossy().into_owned(),
        ];
        if let Some(merge) = &request.merge_output_format {
            args.push("--merge-output-format".into());
            args.push(merge.clone());
        }
        for pp in &request.postprocessors {
            match pp {
                PostProcessor::ExtractAudio {
                    preferred_codec,
                    preferred_quality,
                } => {
                    args.push("--extract-audio".into());
                    args.push("--audio-format".into());
                    args.push(preferred_codec.clone());
                    if let Some(quality) = preferred_quality {
                        args.push("--audio-quality".into());
                        args.push(quality.clone());
                    }
                }
            }
        }
        push_cookie_args(&mut args, request.cookies.as_ref());
        args.push("--".into());
        args.push(request.url.clone());
        args
    }

    /// Argument list for the metadata-only title lookup.
    pub fn title_args(request: &FetchRequest) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--skip-download".into(),
            "--no-warnings".into(),
            "--no-playlist".into(),
            "--print".into(),
            "title".into(),
        ];
        push_cookie_args(&mut args, request.cookies.as_ref());
        args.push("--".into());
        args.push(request.url.clone());
        args
    }

    fn command(&self, args: &[String]) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .env("PYTHONIOENCODING", "UTF-8")
            .stdin(Stdio::null());
        command
    }

    fn spawn_error(&self, source: std::io::Error) -> FetchError {
        FetchError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

impl MediaFetcher for YtDlpFetcher {
    fn resolve_title(&self, request: &FetchRequest) -> Result<Option<String>, FetchError> {
        let output = self
            .command(&Self::title_args(request))
            .output()
            .map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Failed {
                code: output.status.code(),
                message: failure_message(stderr.lines(), output.status.code()),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string))
    }

    fn fetch(&self, request: &FetchRequest, hooks: &mut dyn FetchHooks) -> Result<(), FetchError> {
        let args = Self::download_args(request);
        tracing::debug!(program = %self.program, ?args, "spawning yt-dlp");
        let mut child = ChildGuard::new(
            self.command(&args)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .map_err(|e| self.spawn_error(e))?,
        );

        let lines = spawn_line_readers(&mut child.child);
        let mut post_processor: Option<String> = None;
        let mut errors: Vec<String> = Vec::new();

        for line in lines {
            let (StreamLine::Stdout(text) | StreamLine::Stderr(text)) = line;
            match parse_line(&text) {
                OutputLine::Progress(progress) => hooks.on_download(&progress),
                OutputLine::DownloadFinished => hooks.on_download_finished(),
                OutputLine::PostProcessor(name) => {
                    if post_processor.as_deref() != Some(name.as_str()) {
                        if let Some(previous) = post_processor.take() {
                            hooks.on_post_process(&PostProcessEvent::Finished { name: previous });
                        }
                        hooks.on_post_process(&PostProcessEvent::Started { name: name.clone() });
                        post_processor = Some(name);
                    }
                    hooks.on_message(MessageLevel::Info, text.trim());
                }
                OutputLine::Message(level, message) => {
                    if level == MessageLevel::Error {
                        errors.push(message.clone());
                    }
                    hooks.on_message(level, &message);
                }
                OutputLine::Blank => {}
            }
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(FetchError::Failed {
                code: status.code(),
                message: failure_message(errors.iter().map(String::as_str), status.code()),
            });
        }
        if let Some(name) = post_processor {
            hooks.on_post_process(&PostProcessEvent::Finished { name });
        }
        Ok(())
    }
}

fn push_cookie_args(args: &mut Vec<String>, cookies: Option<&CookieSource>) {
    match cookies {
        Some(CookieSource::File(path)) => {
            args.push("--cookies".into());
            args.push(path.to_string_lossy().into_owned());
        }
        Some(CookieSource::Browser(browser)) => {
            args.push("--cookies-from-browser".into());
            args.push(browser.clone());
        }
        None => {}
    }
}

/// Last `ERROR:` line, else last non-empty line, else the exit code.
fn failure_message<'a>(lines: impl Iterator<Item = &'a str>, code: Option<i32>) -> String {
    let mut last = None;
    let mut last_error = None;
    for line in lines.map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with("ERROR:") {
            last_error = Some(line);
        }
        last = Some(line);
    }
    match last_error.or(last) {
        Some(line) => line.trim_start_matches("ERROR:").trim().to_string(),
        None => match code {
            Some(code) => format!("yt-dlp exited with status {code}"),
            None => "yt-dlp terminated by signal".to_string(),
        },
    }
}

/// Kills and reaps the child if dropped before `wait`, e.g. when a hook panics.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
        }
    }

    fn wait(&mut self) -> std::io::Result<ExitStatus> {
        let status = self.child.wait()?;
        self.reaped = true;
        Ok(status)
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            tracing::debug!(pid = self.child.id(), "killing abandoned yt-dlp process");
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn spawn_line_readers(child: &mut Child) -> mpsc::Receiver<StreamLine> {
    let (tx, rx) = mpsc::channel();
    if let Some(stdout) = child.stdout.take() {
        let tx = tx.clone();
        thread::spawn(move || forward_lines(stdout, StreamLine::Stdout, tx));
    }
    if let Some(stderr) = child.stderr.take() {
        thread::spawn(move || forward_lines(stderr, StreamLine::Stderr, tx));
    }
    rx
}

fn forward_lines<R: Read>(stream: R, wrap: fn(String) -> StreamLine, tx: mpsc::Sender<StreamLine>) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                if tx.send(wrap(line)).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!("yt-dlp output read: {}", e);
                break;
            }
        }
    }
}
