use std::path::{Path, PathBuf};

/// Options that control where and how the pipeline writes its outputs.
///
/// This struct represents *library-level configuration*, not CLI flags directly.
/// The CLI maps user input into this type so tests and other frontends can
/// construct options programmatically.
#[derive(Debug, Clone)]
pub struct PipelineOpts {
    /// Directory that receives `images/`, `audio/`, the manifest and both videos.
    pub work_dir: PathBuf,

    /// Output frame width in pixels. Images are stretched to fit.
    pub frame_width: u32,

    /// Output frame height in pixels.
    pub frame_height: u32,

    /// Frames per second of the silent video. One frame is emitted per image, so this is
    /// also the number of images shown per second.
    pub fps: u32,

    /// Language code handed to the speech synthesizer (e.g. `"en"`).
    pub language: String,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            frame_width: 1280,
            frame_height: 720,
            fps: 1,
            language: "en".to_owned(),
        }
    }
}

impl PipelineOpts {
    pub fn with_work_dir(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            ..Self::default()
        }
    }

    pub fn images_dir(&self) -> PathBuf {
        self.work_dir.join("images")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.work_dir.join("audio")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.work_dir.join("narration.json")
    }

    pub fn silent_video_path(&self) -> PathBuf {
        self.work_dir.join("output_video.avi")
    }

    pub fn final_video_path(&self) -> PathBuf {
        self.work_dir.join("final_video.mp4")
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}
