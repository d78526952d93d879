//! Frame streams backed by `ffmpeg`/`ffprobe` subprocesses.
//!
//! Decoding pipes `rawvideo` `rgb24` out of ffmpeg's stdout, encoding pipes
//! the same format into its stdin. Child processes are owned by the stream
//! objects and are reaped when those are dropped.

use std::ffi::OsString;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::error::{Result, VideoError};
use crate::video::stream::{FrameSink, FrameSource};
use crate::video::types::{Frame, VideoParams};

/// Check whether the `ffmpeg` executable can be launched
pub fn check_ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Read width, height and frame rate of the first video stream
pub fn probe<P: AsRef<Path>>(path: P) -> Result<VideoParams> {
    let path = path.as_ref();
    let output = Command::new("ffprobe")
        .args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=width,height,avg_frame_rate,r_frame_rate",
            "-of", "default=noprint_wrappers=1",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| VideoError::LoadFailed {
            path: format!("{}: ffprobe could not be started ({})", path.display(), e),
        })?;

    if !output.status.success() {
        debug!("ffprobe stderr: {}", String::from_utf8_lossy(&output.stderr).trim());
        return Err(VideoError::LoadFailed { path: path.display().to_string() }.into());
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let params = parse_probe_output(&text).ok_or_else(|| VideoError::LoadFailed {
        path: format!("{}: no video stream", path.display()),
    })?;

    info!(
        "Probed {}: {}x{} @ {:.3} fps",
        path.display(),
        params.width,
        params.height,
        params.fps
    );
    Ok(params)
}

/// Parse `key=value` lines produced by `ffprobe -of default=noprint_wrappers=1`
fn parse_probe_output(text: &str) -> Option<VideoParams> {
    let mut width = None;
    let mut height = None;
    let mut avg_rate = None;
    let mut raw_rate = None;

    for line in text.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        match key {
            "width" => width = value.parse::<u32>().ok(),
            "height" => height = value.parse::<u32>().ok(),
            "avg_frame_rate" => avg_rate = parse_rate(value),
            "r_frame_rate" => raw_rate = parse_rate(value),
            _ => {}
        }
    }

    let (width, height) = (width?, height?);
    if width == 0 || height == 0 {
        return None;
    }
    // avg_frame_rate is 0/0 for some containers; fall back to the raw rate
    let fps = avg_rate.or(raw_rate).unwrap_or_else(|| {
        warn!("No usable frame rate reported, assuming 30 fps");
        30.0
    });
    Some(VideoParams::new(width, height, fps))
}

/// Parse a rational like `30000/1001`, rejecting zero and non-finite rates
fn parse_rate(value: &str) -> Option<f64> {
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Collect a child's stderr on a background thread so a chatty process can
/// never block on a full pipe.
fn drain_stderr(child: &mut Child) -> Option<JoinHandle<String>> {
    let mut stderr = child.stderr.take()?;
    Some(thread::spawn(move || {
        let mut text = String::new();
        let _ = stderr.read_to_string(&mut text);
        text
    }))
}

fn join_stderr(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Fill `buf` from `reader`, returning how many bytes were read before EOF
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

struct Decoder {
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
}

/// Arguments decoding the first video stream of `path` to raw RGB24 on stdout
///
/// Frames leave ffmpeg exactly as stored: no rate conversion (so variable
/// frame rate input is neither padded nor thinned) and no display-matrix
/// rotation (so frames keep the coded size reported by ffprobe).
fn decoder_args(path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-v", "error", "-nostdin", "-noautorotate", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(path.as_os_str().to_owned());
    args.extend(
        [
            "-map", "0:v:0",
            "-fps_mode", "passthrough",
            "-f", "rawvideo",
            "-pix_fmt", "rgb24",
            "pipe:1",
        ]
        .into_iter()
        .map(OsString::from),
    );
    args
}

impl Decoder {
    fn spawn(path: &Path) -> Result<Self> {
        let mut child = Command::new("ffmpeg")
            .args(decoder_args(path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VideoError::LoadFailed {
                path: format!("{}: ffmpeg could not be started ({})", path.display(), e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| VideoError::DecodingFailed {
            reason: "ffmpeg stdout not available - pipe failed".to_string(),
        })?;
        let stderr = drain_stderr(&mut child);

        Ok(Self { child, stdout, stderr })
    }

    /// Stop the process and reap it; returns whatever it wrote to stderr
    fn shutdown(mut self) -> String {
        let _ = self.child.kill();
        let _ = self.child.wait();
        join_stderr(self.stderr.take())
    }

    /// Wait for a process that reached EOF on its own
    fn finish(mut self) -> (bool, String) {
        let ok = self.child.wait().map(|s| s.success()).unwrap_or(false);
        (ok, join_stderr(self.stderr.take()))
    }
}

/// Sequential decoder for a video file
pub struct FfmpegSource {
    path: PathBuf,
    params: VideoParams,
    decoder: Option<Decoder>,
    buffer: Vec<u8>,
    frames_read: usize,
}

impl FfmpegSource {
    /// Probe and open `path` for decoding
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(VideoError::LoadFailed { path: path.display().to_string() }.into());
        }

        let params = probe(&path)?;
        let decoder = Decoder::spawn(&path)?;
        debug!("Started decoder for {}", path.display());

        Ok(Self {
            buffer: vec![0; params.frame_bytes()],
            path,
            params,
            decoder: Some(decoder),
            frames_read: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn release(&mut self) {
        if let Some(decoder) = self.decoder.take() {
            let stderr = decoder.shutdown();
            if !stderr.is_empty() {
                debug!("ffmpeg ({}) stderr: {}", self.path.display(), stderr);
            }
        }
    }
}

impl FrameSource for FfmpegSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn params(&self) -> VideoParams {
        self.params
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(decoder) = self.decoder.as_mut() else {
            return Ok(None);
        };

        let filled = read_full(&mut decoder.stdout, &mut self.buffer).map_err(|e| {
            VideoError::DecodingFailed { reason: format!("{}: {}", self.path.display(), e) }
        })?;

        if filled == self.buffer.len() {
            self.frames_read += 1;
            let frame = Frame::from_rgb_bytes(self.params.width, self.params.height, self.buffer.clone())
                .ok_or_else(|| VideoError::DecodingFailed {
                    reason: "decoded buffer does not match frame size".to_string(),
                })?;
            return Ok(Some(frame));
        }

        // End of stream: reap the decoder
        if let Some(decoder) = self.decoder.take() {
            let (ok, stderr) = decoder.finish();
            if !ok {
                warn!(
                    "ffmpeg stopped decoding {} after {} frames: {}",
                    self.path.display(),
                    self.frames_read,
                    stderr
                );
            }
        }
        if filled > 0 {
            warn!(
                "Dropping truncated trailing frame in {} ({} of {} bytes)",
                self.path.display(),
                filled,
                self.buffer.len()
            );
        }
        debug!("{} exhausted after {} frames", self.path.display(), self.frames_read);
        Ok(None)
    }

    fn rewind(&mut self) -> Result<()> {
        self.release();
        self.decoder = Some(Decoder::spawn(&self.path)?);
        self.frames_read = 0;
        debug!("Rewound {}", self.path.display());
        Ok(())
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.release();
    }
}

/// Map a container codec tag to the ffmpeg encoder producing it
pub fn encoder_for_tag(tag: &str) -> Option<&'static str> {
    match tag {
        "mp4v" => Some("mpeg4"),
        "avc1" | "h264" => Some("libx264"),
        _ => None,
    }
}

/// MP4 encoder fed with raw frames
///
/// Output goes to a hidden sibling file that is renamed onto the requested
/// path only when ffmpeg exits successfully.
pub struct FfmpegSink {
    path: PathBuf,
    partial_path: PathBuf,
    params: VideoParams,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<String>>,
    frames_written: usize,
}

impl FfmpegSink {
    pub fn create<P: AsRef<Path>>(path: P, params: VideoParams, codec_tag: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let encoder = encoder_for_tag(codec_tag).ok_or_else(|| VideoError::InvalidParameters {
            details: format!("unsupported codec tag '{}'", codec_tag),
        })?;
        if params.width == 0 || params.height == 0 || params.fps <= 0.0 {
            return Err(VideoError::InvalidParameters {
                details: format!("{}x{} @ {} fps", params.width, params.height, params.fps),
            }
            .into());
        }

        let partial_path = partial_path_for(&path);
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-y", "-f", "rawvideo", "-pix_fmt", "rgb24"])
            .args(["-s", &format!("{}x{}", params.width, params.height)])
            .args(["-r", &params.fps.to_string()])
            .args(["-i", "pipe:0"])
            .args(["-c:v", encoder, "-tag:v", codec_tag, "-pix_fmt", "yuv420p", "-f", "mp4"])
            .arg(&partial_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VideoError::EncodingFailed {
                reason: format!("ffmpeg could not be started ({})", e),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| VideoError::EncodingFailed {
            reason: "ffmpeg stdin not available - pipe failed".to_string(),
        })?;
        let stderr = drain_stderr(&mut child);

        info!(
            "Encoding {} ({}x{} @ {:.3} fps, {} via {})",
            path.display(),
            params.width,
            params.height,
            params.fps,
            codec_tag,
            encoder
        );

        Ok(Self {
            path,
            partial_path,
            params,
            child: Some(child),
            stdin: Some(stdin),
            stderr,
            frames_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encoder_error(&mut self, reason: String) -> VideoError {
        self.abort();
        VideoError::EncodingFailed { reason }
    }
}

fn partial_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.mp4".to_string());
    path.with_file_name(format!(".{}.partial", name))
}

/// Move a finished partial file onto its target, removing it if that fails
fn commit_partial(partial: &Path, target: &Path) -> Result<()> {
    if let Err(e) = std::fs::rename(partial, target) {
        let _ = std::fs::remove_file(partial);
        return Err(e.into());
    }
    Ok(())
}

impl FrameSink for FfmpegSink {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if !self.params.matches(frame) {
            return Err(VideoError::InvalidParameters {
                details: format!(
                    "frame is {}x{} but encoder expects {}x{}",
                    frame.width(),
                    frame.height(),
                    self.params.width,
                    self.params.height
                ),
            }
            .into());
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(VideoError::EncodingFailed { reason: "encoder already closed".to_string() }.into());
        };
        if let Err(e) = stdin.write_all(frame.as_rgb_bytes()) {
            let stderr = join_stderr(self.stderr.take());
            return Err(self.encoder_error(format!("{} ({})", e, stderr)).into());
        }
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        // Closing stdin signals EOF to the encoder
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return Err(VideoError::EncodingFailed { reason: "encoder already closed".to_string() }.into());
        };

        let status = child.wait();
        let stderr = join_stderr(self.stderr.take());
        let status = match status {
            Ok(status) if status.success() => status,
            Ok(status) => {
                let _ = std::fs::remove_file(&self.partial_path);
                return Err(VideoError::EncodingFailed {
                    reason: format!("ffmpeg exited with {}: {}", status, stderr),
                }
                .into());
            }
            Err(e) => {
                let _ = std::fs::remove_file(&self.partial_path);
                return Err(e.into());
            }
        };
        debug!("Encoder exited with {}", status);

        commit_partial(&self.partial_path, &self.path)?;
        info!("Wrote {} frames to {}", self.frames_written, self.path.display());
        Ok(())
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            let _ = join_stderr(self.stderr.take());
            if std::fs::remove_file(&self.partial_path).is_ok() {
                debug!("Removed partial output {}", self.partial_path.display());
            }
        }
    }

    fn frames_written(&self) -> usize {
        self.frames_written
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.abort();
    }
}
