//! External ffmpeg backend.
//!
//! Metadata comes from `ffprobe` JSON; frames travel as raw RGBA over stdin/stdout pipes
//! of an `ffmpeg` child process, so no codec library is linked into the binary.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    error::{Result, VideoError},
    video::{
        io::{MediaBackend, VideoReader, VideoWriter},
        types::Frame,
    },
};

/// Media backend that shells out to `ffprobe` and `ffmpeg`
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    codec: String,
    fallback_fps: f64,
}

impl FfmpegBackend {
    pub fn new<S: Into<String>>(codec: S, fallback_fps: f64) -> Self {
        Self {
            codec: codec.into(),
            fallback_fps,
        }
    }

    /// Check that the `ffmpeg` executable can be launched
    pub fn is_available() -> bool {
        Command::new("ffmpeg")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn probe(&self, path: &Path) -> Result<ProbeInfo> {
        let output = Command::new("ffprobe")
            .args(["-v", "quiet", "-print_format", "json", "-show_streams", "-select_streams", "v:0"])
            .arg(path)
            .output()
            .map_err(|_| VideoError::OpenFailed {
                path: path.display().to_string(),
            })?;

        if !output.status.success() {
            return Err(VideoError::OpenFailed {
                path: path.display().to_string(),
            }
            .into());
        }

        let json = String::from_utf8_lossy(&output.stdout);
        parse_probe(&json, self.fallback_fps)
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new("libx264", 30.0)
    }
}

impl MediaBackend for FfmpegBackend {
    fn open_reader(&self, path: &Path) -> Result<Box<dyn VideoReader>> {
        let info = self.probe(path)?;
        info!(
            "Opened {} ({}x{} @ {:.2}fps, {} frames)",
            path.display(),
            info.width,
            info.height,
            info.fps,
            info.frame_count
        );
        Ok(Box::new(FfmpegReader {
            path: path.to_path_buf(),
            info,
            decoder: None,
            next_index: 0,
        }))
    }

    fn open_writer(&self, path: &Path, resolution: (u32, u32), fps: f64) -> Result<Box<dyn VideoWriter>> {
        let (width, height) = resolution;
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { self.fallback_fps };

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-y", "-f", "rawvideo", "-pix_fmt", "rgba"])
            .args(["-s", &format!("{}x{}", width, height)])
            .args(["-r", &fps.to_string()])
            .args(["-i", "-", "-c:v", &self.codec, "-pix_fmt", "yuv420p"])
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VideoError::EncodingFailed {
                reason: format!("Failed to spawn FFmpeg process: {}", e),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| VideoError::EncodingFailed {
            reason: "FFmpeg stdin unavailable".to_string(),
        })?;

        debug!("Spawned encoder for {} with codec {}", path.display(), self.codec);
        Ok(Box::new(FfmpegWriter {
            child: Some(child),
            stdin: Some(stdin),
            resolution,
        }))
    }
}

/// Stream properties read from ffprobe
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub frame_count: u64,
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

/// Parse `ffprobe -print_format json -show_streams` output for the first video stream
pub fn parse_probe(json: &str, fallback_fps: f64) -> Result<ProbeInfo> {
    let output: ProbeOutput = serde_json::from_str(json).map_err(|e| VideoError::DecodingFailed {
        reason: format!("invalid ffprobe output: {}", e),
    })?;

    let stream = output.streams.into_iter().next().ok_or_else(|| VideoError::DecodingFailed {
        reason: "no video stream".to_string(),
    })?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(VideoError::DecodingFailed {
                reason: "video stream has no dimensions".to_string(),
            }
            .into())
        }
    };

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate))
        .unwrap_or(fallback_fps);

    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .or_else(|| {
            stream
                .duration
                .as_deref()
                .and_then(|d| d.parse::<f64>().ok())
                .map(|duration| (duration * fps).round().max(0.0) as u64)
        })
        .unwrap_or(0);

    Ok(ProbeInfo {
        width,
        height,
        fps,
        frame_count,
    })
}

/// Parse an ffmpeg rational such as `30000/1001`; `0/0` yields `None`
fn parse_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num.trim().parse::<f64>().ok()? / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

struct Decoder {
    child: Child,
    stdout: ChildStdout,
}

/// Decodes frames in order from a single `ffmpeg` child; seeking backwards restarts it
struct FfmpegReader {
    path: PathBuf,
    info: ProbeInfo,
    decoder: Option<Decoder>,
    next_index: u64,
}

impl FfmpegReader {
    fn frame_bytes(&self) -> usize {
        self.info.width as usize * self.info.height as usize * 4
    }

    fn spawn_decoder(&self) -> Result<Decoder> {
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(&self.path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgba", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VideoError::DecodingFailed {
                reason: format!("Failed to spawn FFmpeg process: {}", e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| VideoError::DecodingFailed {
            reason: "FFmpeg stdout unavailable".to_string(),
        })?;
        Ok(Decoder { child, stdout })
    }

    fn stop_decoder(&mut self) {
        if let Some(mut decoder) = self.decoder.take() {
            if let Err(e) = decoder.child.kill() {
                debug!("Decoder already exited: {}", e);
            }
            let _ = decoder.child.wait();
        }
    }
}

impl VideoReader for FfmpegReader {
    fn frame_count(&self) -> u64 {
        self.info.frame_count
    }

    fn resolution(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn fps(&self) -> f64 {
        self.info.fps
    }

    fn decode_frame(&mut self, index: u64) -> Result<Frame> {
        if index >= self.info.frame_count {
            return Err(VideoError::FrameOutOfRange {
                index,
                total: self.info.frame_count,
            }
            .into());
        }

        if index < self.next_index || self.decoder.is_none() {
            self.stop_decoder();
            self.decoder = Some(self.spawn_decoder()?);
            self.next_index = 0;
        }

        let frame_bytes = self.frame_bytes();
        let mut data = vec![0u8; frame_bytes];
        let decoder = self.decoder.as_mut().ok_or_else(|| VideoError::DecodingFailed {
            reason: "decoder not running".to_string(),
        })?;

        while self.next_index <= index {
            decoder.stdout.read_exact(&mut data).map_err(|e| VideoError::DecodingFailed {
                reason: format!("frame {}: {}", self.next_index, e),
            })?;
            self.next_index += 1;
        }

        Frame::from_rgba_bytes(self.info.width, self.info.height, data).ok_or_else(|| {
            VideoError::DecodingFailed {
                reason: "short frame".to_string(),
            }
            .into()
        })
    }

    fn close(&mut self) -> Result<()> {
        self.stop_decoder();
        Ok(())
    }
}

impl Drop for FfmpegReader {
    fn drop(&mut self) {
        self.stop_decoder();
    }
}

/// Pipes raw RGBA frames into an `ffmpeg` encoder child
struct FfmpegWriter {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    resolution: (u32, u32),
}

impl VideoWriter for FfmpegWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.dimensions() != self.resolution {
            return Err(VideoError::EncodingFailed {
                reason: format!(
                    "frame is {:?}, encoder expects {:?}",
                    frame.dimensions(),
                    self.resolution
                ),
            }
            .into());
        }

        let stdin = self.stdin.as_mut().ok_or_else(|| VideoError::EncodingFailed {
            reason: "encoder already closed".to_string(),
        })?;
        stdin.write_all(frame.pixels()).map_err(|e| VideoError::EncodingFailed {
            reason: format!("FFmpeg pipe closed: {}", e),
        })?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        // Closing stdin signals end of stream
        drop(self.stdin.take());

        let Some(child) = self.child.take() else {
            return Ok(());
        };
        let output = child.wait_with_output().map_err(|e| VideoError::EncodingFailed {
            reason: format!("FFmpeg execution failed: {}", e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VideoError::EncodingFailed {
                reason: format!("FFmpeg failed: {}", stderr.trim()),
            }
            .into());
        }
        Ok(())
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            warn!("Encoder dropped without close; terminating FFmpeg");
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_reads_stream() {
        let json = r#"{"streams": [{"index": 0, "codec_name": "h264", "width": 1280, "height": 720,
            "r_frame_rate": "30/1", "avg_frame_rate": "30000/1001", "nb_frames": "240", "duration": "8.008"}]}"#;
        let info = parse_probe(json, 25.0).unwrap();

        assert_eq!((info.width, info.height), (1280, 720));
        assert!((info.fps - 29.97).abs() < 0.01);
        assert_eq!(info.frame_count, 240);
    }

    #[test]
    fn test_parse_probe_estimates_frame_count_from_duration() {
        let json = r#"{"streams": [{"width": 640, "height": 480, "avg_frame_rate": "0/0",
            "r_frame_rate": "25/1", "duration": "2.0"}]}"#;
        let info = parse_probe(json, 30.0).unwrap();

        assert_eq!(info.fps, 25.0);
        assert_eq!(info.frame_count, 50);
    }

    #[test]
    fn test_parse_probe_uses_fallback_fps() {
        let json = r#"{"streams": [{"width": 8, "height": 8}]}"#;
        let info = parse_probe(json, 30.0).unwrap();
        assert_eq!(info.fps, 30.0);
        assert_eq!(info.frame_count, 0);
    }

    #[test]
    fn test_parse_probe_rejects_missing_stream() {
        assert!(parse_probe(r#"{"streams": []}"#, 30.0).is_err());
        assert!(parse_probe("not json", 30.0).is_err());
        assert!(parse_probe(r#"{"streams": [{"width": 0, "height": 4}]}"#, 30.0).is_err());
    }

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("30/1"), Some(30.0));
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("24"), Some(24.0));
        assert_eq!(parse_rate("abc"), None);
    }
}
