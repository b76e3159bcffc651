// Copyright 2021-2025 Martin Pool

//! A `mutants.out` directory holding logs and other output.
//!
//! *CAUTION:* This currently doesn't interact with Cargo locking, and if two `mutation-engine`
//! processes access the same directory they'll tread on each other...

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};

use crate::Result;

const OUTDIR_NAME: &str = "mutants.out";
const ROTATED_NAME: &str = "mutants.out.old";

/// Text inserted in log files to make important sections more visible.
pub const LOG_MARKER: &str = "***";

/// Default cap on how much of a scenario's captured output is retained for
/// reporting, once the run has finished: the file on disk is never
/// truncated, only what gets read back for the outcome summary.
pub const DEFAULT_OUTPUT_TRUNCATION_BYTES: usize = 1_048_576;

/// A `mutants.out` directory holding logs and other output information.
#[derive(Debug)]
pub struct OutputDir {
    path: Utf8PathBuf,
    log_dir: Utf8PathBuf,
}

impl OutputDir {
    /// Create a new `mutants.out` output directory, within the given directory.
    ///
    /// If the directory already exists, it's rotated to `mutants.out.old`. If that directory
    /// exists, it's deleted.
    pub fn new(in_dir: &Utf8Path) -> Result<OutputDir> {
        let path = in_dir.join(OUTDIR_NAME);
        if path.exists() {
            let rotated = in_dir.join(ROTATED_NAME);
            if rotated.exists() {
                fs::remove_dir_all(&rotated).with_context(|| format!("remove {rotated}"))?;
            }
            fs::rename(&path, &rotated).with_context(|| format!("move {path} to {rotated}"))?;
        }
        fs::create_dir(&path).with_context(|| format!("create output directory {path}"))?;
        let log_dir = path.join("log");
        fs::create_dir(&log_dir).with_context(|| format!("create log directory {log_dir}"))?;
        Ok(OutputDir { path, log_dir })
    }

    /// Create a new log for a given scenario.
    ///
    /// Returns the [LogFile] that subprocess output should be appended to,
    /// and that can later be read back (possibly truncated).
    pub fn create_log(&self, scenario_name: &str) -> Result<LogFile> {
        LogFile::create_in(&self.log_dir, scenario_name)
    }

    /// Return the path of the `mutants.out` directory.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// Read at most `max_bytes` of `path`, taken from its tail, prefixed with a
/// marker line if anything was cut. Used both by [LogFile::truncated_content]
/// and by the History Store, which reads a scenario's log back after the
/// [LogFile] itself has gone out of scope.
pub fn read_truncated(path: &Utf8Path, max_bytes: usize) -> Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    File::open(path)
        .and_then(|mut f| f.read_to_end(&mut buf))
        .with_context(|| format!("read log file {path}"))?;
    let full = String::from_utf8_lossy(&buf).into_owned();
    if full.len() <= max_bytes {
        return Ok(full);
    }
    // Cut on a char boundary, then to the next line start, so we don't
    // split a UTF-8 sequence or leave a partial line at the front.
    let mut start = full.len() - max_bytes;
    while !full.is_char_boundary(start) {
        start += 1;
    }
    let tail = match full[start..].find('\n') {
        Some(i) => &full[start + i + 1..],
        None => &full[start..],
    };
    Ok(format!(
        "[... output truncated; showing the last {max_bytes} bytes ...]\n{tail}"
    ))
}

pub fn clean_filename(s: &str) -> String {
    let s = s.replace('/', "__");
    s.chars()
        .map(|c| match c {
            '\\' | ' ' | ':' | '<' | '>' | '?' | '*' | '|' | '"' => '_',
            c => c,
        })
        .collect::<String>()
}

/// A log file for execution of a single scenario, mixing subprocess output
/// with commentary written by the engine itself.
#[derive(Debug)]
pub struct LogFile {
    path: Utf8PathBuf,
    write_to: File,
}

impl LogFile {
    pub fn create_in(log_dir: &Utf8Path, scenario_name: &str) -> Result<LogFile> {
        // TODO: Remember which names have already been used this run to avoid the
        // probe loop, although in practice collisions are rare.
        let basename = clean_filename(scenario_name);
        for i in 0..1000 {
            let t = if i == 0 {
                format!("{basename}.log")
            } else {
                format!("{basename}_{i:03}.log")
            };
            let path = log_dir.join(t);
            match OpenOptions::new()
                .write(true)
                .read(true)
                .create_new(true)
                .open(&path)
            {
                Ok(write_to) => return Ok(LogFile { path, write_to }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(anyhow::Error::from(e).context("create test log file")),
            }
        }
        unreachable!("couldn't create any test log in {log_dir:?} for {scenario_name:?}");
    }

    /// Return the full, untruncated content of the log as a string.
    pub fn log_content(&self) -> Result<String> {
        let mut buf: Vec<u8> = Vec::new();
        File::open(&self.path)
            .and_then(|mut f| f.read_to_end(&mut buf))
            .with_context(|| format!("read log file {}", self.path))?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Return at most `max_bytes` of the log, taken from its tail, prefixed
    /// with a marker line if anything was cut.
    ///
    /// This is what gets attached to a scenario outcome for reporting; the
    /// file on disk is left intact so a user can always open the full log.
    pub fn truncated_content(&self, max_bytes: usize) -> Result<String> {
        read_truncated(&self.path, max_bytes)
    }

    /// Open the log file to append more content.
    pub fn open_append(&self) -> Result<File> {
        OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {} for append", self.path))
    }

    /// Write a message, with a marker. Ignore errors.
    pub fn message(&mut self, message: &str) {
        let _ = write!(self.write_to, "\n{LOG_MARKER} {message}");
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}
