use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use mangacast::backends::blip::{BlipCaptioner, device};
use mangacast::backends::google_tts::GoogleTts;
use mangacast::backends::tesseract::TesseractOcr;
use mangacast::logging;
use mangacast::opts::PipelineOpts;
use mangacast::pipeline::Pipeline;
use mangacast::sources::{default_urls, load_urls};

fn main() -> Result<()> {
    logging::init();
    let params = Params::parse();

    let urls = match &params.urls {
        Some(path) => load_urls(path, params.chapter.as_deref())?,
        None => default_urls(),
    };
    info!(count = urls.len(), "image URLs loaded");

    fs::create_dir_all(&params.work_dir).with_context(|| {
        format!(
            "failed to create work dir: {}",
            params.work_dir.display()
        )
    })?;

    let opts = PipelineOpts {
        work_dir: params.work_dir,
        frame_width: params.frame_width,
        frame_height: params.frame_height,
        fps: params.fps,
        language: params.language,
    };

    let captioner = BlipCaptioner::load(&params.model_dir, device(params.cpu)?)?;
    let ocr = TesseractOcr::with_language(params.ocr_language);
    let tts = GoogleTts::new()?;

    let mut pipeline = Pipeline::new(opts, ocr, captioner, tts)?;
    let output = pipeline.run(&urls)?;

    println!(
        "Final video with voiceover saved as {} ({} images)",
        output.video.final_video.display(),
        output.assets.len()
    );
    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "mangacast")]
#[command(about = "Turn manga pages into a narrated video")]
struct Params {
    /// URL list: one URL per line, or chapter JSON (`[{"chapterName", "images"}]`).
    /// Defaults to the built-in chapter 0 page list.
    #[arg(short = 'u', long = "urls")]
    urls: Option<PathBuf>,

    /// Only use this chapter from a chapter JSON file.
    #[arg(short = 'c', long = "chapter", requires = "urls")]
    chapter: Option<String>,

    /// Directory receiving images/, audio/, narration.json and the videos.
    #[arg(short = 'w', long = "work-dir", default_value = ".")]
    work_dir: PathBuf,

    /// Directory holding the BLIP `model.safetensors` and `tokenizer.json`.
    #[arg(short = 'm', long = "model-dir", default_value = "./models/blip-large")]
    model_dir: PathBuf,

    /// Run the caption model on CPU even when a GPU is available.
    #[arg(long = "cpu", default_value_t = false)]
    cpu: bool,

    #[arg(long = "frame-width", default_value_t = 1280)]
    frame_width: u32,

    #[arg(long = "frame-height", default_value_t = 720)]
    frame_height: u32,

    /// Images shown per second.
    #[arg(long = "fps", default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    fps: u32,

    /// Narration language code.
    #[arg(short = 'l', long = "language", default_value = "en")]
    language: String,

    /// Tesseract language pack used for OCR.
    #[arg(long = "ocr-language", default_value = "eng")]
    ocr_language: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_fixed_layout() {
        let params = Params::try_parse_from(["mangacast"]).expect("parse defaults");
        assert!(params.urls.is_none());
        assert_eq!(params.work_dir, PathBuf::from("."));
        assert_eq!((params.frame_width, params.frame_height), (1280, 720));
        assert_eq!(params.fps, 1);
        assert_eq!(params.language, "en");
    }

    #[test]
    fn chapter_requires_a_url_file() {
        assert!(Params::try_parse_from(["mangacast", "--chapter", "Chapter 1"]).is_err());
        let params = Params::try_parse_from([
            "mangacast",
            "--urls",
            "chapters.json",
            "--chapter",
            "Chapter 1",
        ])
        .expect("parse chapter params");
        assert_eq!(params.chapter.as_deref(), Some("Chapter 1"));
    }

    #[test]
    fn zero_fps_is_rejected() {
        assert!(Params::try_parse_from(["mangacast", "--fps", "0"]).is_err());
    }
}
