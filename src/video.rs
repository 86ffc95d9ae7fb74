//! Frame layout and ffmpeg muxing.
//!
//! The assembler works in three ffmpeg passes: encode the resized frames into a silent
//! XVID video, concatenate the narration clips into a single track, then mux that track
//! onto the video while re-encoding to H.264/AAC. The final duration always equals the
//! silent video's (frames / fps); narration that runs longer is cut off.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, ensure};
use image::imageops::FilterType;
use tracing::{debug, info, warn};

use crate::demux::audio_duration_seconds;
use crate::fetch::open_image;
use crate::opts::PipelineOpts;
use crate::tool;

/// Narration/picture drift tolerated before we log about it.
const DURATION_WARN_SECONDS: f64 = 0.5;

/// Paths produced by [`VideoAssembler::assemble`].
#[derive(Debug, Clone)]
pub struct AssembledVideo {
    pub silent_video: PathBuf,
    pub final_video: PathBuf,
    pub frame_count: usize,
    pub duration_seconds: f64,
}

pub struct VideoAssembler {
    ffmpeg: String,
    scratch_parent: PathBuf,
    frame_width: u32,
    frame_height: u32,
    fps: u32,
    silent_video: PathBuf,
    final_video: PathBuf,
}

impl VideoAssembler {
    pub fn from_opts(opts: &PipelineOpts) -> Self {
        Self {
            ffmpeg: "ffmpeg".to_owned(),
            scratch_parent: opts.work_dir.clone(),
            frame_width: opts.frame_width,
            frame_height: opts.frame_height,
            fps: opts.fps,
            silent_video: opts.silent_video_path(),
            final_video: opts.final_video_path(),
        }
    }

    /// Override the program name or path (defaults to `ffmpeg` on `PATH`).
    pub fn ffmpeg(mut self, program: impl Into<String>) -> Self {
        self.ffmpeg = program.into();
        self
    }

    /// Build the silent video from `images` and mux the concatenated `audio` onto it.
    ///
    /// Both slices are consumed in order. Intermediate frames and the joined narration
    /// track live in a scratch directory that is removed on return.
    pub fn assemble(&self, images: &[PathBuf], audio: &[PathBuf]) -> Result<AssembledVideo> {
        ensure!(!images.is_empty(), "no images to assemble into a video");
        ensure!(!audio.is_empty(), "no narration audio to mux");
        ensure!(self.fps > 0, "fps must be positive");

        let scratch = tempfile::Builder::new()
            .prefix("frames-")
            .tempdir_in(&self.scratch_parent)
            .context("failed to create scratch directory")?;

        let frame_count = write_frames(
            images,
            scratch.path(),
            self.frame_width,
            self.frame_height,
        )?;
        self.encode_silent(scratch.path())?;
        info!(video = %self.silent_video.display(), frames = frame_count, "silent video created");

        let narration = self.concat_audio(audio, scratch.path())?;

        let duration_seconds = frame_count as f64 / self.fps as f64;
        match audio_duration_seconds(&narration) {
            Ok(audio_seconds)
                if (audio_seconds - duration_seconds).abs() > DURATION_WARN_SECONDS =>
            {
                warn!(
                    video_seconds = duration_seconds,
                    audio_seconds, "narration length differs from video length"
                );
            }
            Ok(audio_seconds) => debug!(audio_seconds, "narration length matches video"),
            Err(err) => warn!(error = %format!("{err:#}"), "could not measure narration length"),
        }

        self.mux(&narration, duration_seconds)?;
        info!(video = %self.final_video.display(), seconds = duration_seconds, "final video saved");

        Ok(AssembledVideo {
            silent_video: self.silent_video.clone(),
            final_video: self.final_video.clone(),
            frame_count,
            duration_seconds,
        })
    }

    fn encode_silent(&self, frames_dir: &Path) -> Result<()> {
        let fps = self.fps.to_string();
        tool::run(
            Command::new(&self.ffmpeg)
                .args(["-y", "-loglevel", "error", "-framerate"])
                .arg(&fps)
                .arg("-i")
                .arg(frames_dir.join("frame_%05d.png"))
                .args(["-c:v", "mpeg4", "-vtag", "XVID", "-q:v", "5"])
                .args(["-pix_fmt", "yuv420p", "-r"])
                .arg(&fps)
                .arg(&self.silent_video),
        )
        .context("failed to encode silent video")?;
        Ok(())
    }

    /// Join the narration clips with ffmpeg's concat demuxer (stream copy, no re-encode).
    fn concat_audio(&self, audio: &[PathBuf], scratch: &Path) -> Result<PathBuf> {
        let list_path = scratch.join("narration.txt");
        write_concat_list(&list_path, audio)?;

        let ext = audio[0]
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp3");
        let out = scratch.join(format!("narration.{ext}"));

        tool::run(
            Command::new(&self.ffmpeg)
                .args(["-y", "-loglevel", "error", "-f", "concat", "-safe", "0", "-i"])
                .arg(&list_path)
                .args(["-c", "copy"])
                .arg(&out),
        )
        .context("failed to concatenate narration audio")?;

        debug!(clips = audio.len(), track = %out.display(), "narration concatenated");
        Ok(out)
    }

    fn mux(&self, narration: &Path, duration_seconds: f64) -> Result<()> {
        let fps = self.fps.to_string();
        tool::run(
            Command::new(&self.ffmpeg)
                .args(["-y", "-loglevel", "error", "-i"])
                .arg(&self.silent_video)
                .arg("-i")
                .arg(narration)
                .args(["-map", "0:v:0", "-map", "1:a:0"])
                .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-r"])
                .arg(&fps)
                .args(["-c:a", "aac", "-t"])
                .arg(format!("{duration_seconds:.3}"))
                .arg(&self.final_video),
        )
        .context("failed to mux narration onto video")?;
        Ok(())
    }
}

/// Resize every image to exactly `width`x`height` (aspect ratio is not preserved) and
/// write them as `frame_00000.png`, `frame_00001.png`, ... into `dir`.
pub fn write_frames(images: &[PathBuf], dir: &Path, width: u32, height: u32) -> Result<usize> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create frames dir: {}", dir.display()))?;

    for (i, path) in images.iter().enumerate() {
        let img = open_image(path)?;
        let frame = img.resize_exact(width, height, FilterType::Triangle).to_rgb8();

        let frame_path = dir.join(format!("frame_{i:05}.png"));
        frame
            .save(&frame_path)
            .with_context(|| format!("failed to write frame {}", frame_path.display()))?;
    }

    Ok(images.len())
}

/// Write an ffmpeg concat-demuxer list referencing `files` by absolute path.
pub fn write_concat_list(list_path: &Path, files: &[PathBuf]) -> Result<()> {
    let file = fs::File::create(list_path)
        .with_context(|| format!("failed to create concat list: {}", list_path.display()))?;
    let mut writer = BufWriter::new(file);

    for path in files {
        let abs = std::path::absolute(path)
            .with_context(|| format!("failed to resolve {}", path.display()))?;
        writeln!(writer, "file '{}'", escape_concat_path(&abs.to_string_lossy()))?;
    }

    writer.flush()?;
    Ok(())
}

/// Quote a path for the concat demuxer: `'` becomes `'\''`.
fn escape_concat_path(path: &str) -> String {
    path.replace('\'', r"'\''")
}
