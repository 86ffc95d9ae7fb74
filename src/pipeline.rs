//! High-level API for turning a list of image URLs into a narrated video.
//!
//! `Pipeline` owns the long-lived resources (HTTP client, OCR backend, the loaded caption
//! model, the speech backend) and runs the stages strictly in sequence. Each stage
//! consumes the previous stage's output in full before the next one starts:
//!
//! fetch → OCR → captions → narration sentences → speech → video
//!
//! Every per-image collection stays aligned with the fetched assets. Images that failed
//! to download never enter the pipeline, so there are no placeholders downstream.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use tracing::{debug, info};

use crate::backend::{Captioner, Synthesizer, TextExtractor};
use crate::fetch::{Fetcher, ImageAsset};
use crate::narration::{NarrationEntry, compose_narration, write_manifest};
use crate::opts::PipelineOpts;
use crate::video::{AssembledVideo, VideoAssembler};

/// Everything a full pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub assets: Vec<ImageAsset>,
    pub entries: Vec<NarrationEntry>,
    pub video: AssembledVideo,
}

pub struct Pipeline<O, C, S> {
    opts: PipelineOpts,
    fetcher: Fetcher,
    ocr: O,
    captioner: C,
    synthesizer: S,
    assembler: VideoAssembler,
}

impl<O, C, S> Pipeline<O, C, S>
where
    O: TextExtractor,
    C: Captioner,
    S: Synthesizer,
{
    pub fn new(opts: PipelineOpts, ocr: O, captioner: C, synthesizer: S) -> Result<Self> {
        let fetcher = Fetcher::new(opts.images_dir())?;
        let assembler = VideoAssembler::from_opts(&opts);
        Ok(Self {
            opts,
            fetcher,
            ocr,
            captioner,
            synthesizer,
            assembler,
        })
    }

    /// Replace the video assembler (e.g. to point at a specific ffmpeg binary).
    pub fn with_assembler(mut self, assembler: VideoAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Run every stage and write `final_video.mp4`.
    pub fn run(&mut self, urls: &[String]) -> Result<PipelineOutput> {
        let assets = self.fetch(urls)?;
        ensure!(
            !assets.is_empty(),
            "none of the {} image URLs could be downloaded",
            urls.len()
        );

        let entries = self.narrate(&assets)?;

        let images: Vec<PathBuf> = assets.iter().map(|a| a.path.clone()).collect();
        let audio: Vec<PathBuf> = entries.iter().map(|e| e.audio_path.clone()).collect();
        let video = self.assembler.assemble(&images, &audio)?;

        Ok(PipelineOutput {
            assets,
            entries,
            video,
        })
    }

    /// Stage 1: download images. Non-200 responses are dropped.
    pub fn fetch(&self, urls: &[String]) -> Result<Vec<ImageAsset>> {
        self.fetcher.fetch_all(urls)
    }

    /// Stages 2–5 for already-fetched assets, then write the narration manifest.
    pub fn narrate(&mut self, assets: &[ImageAsset]) -> Result<Vec<NarrationEntry>> {
        let texts = self.extract_texts(assets)?;
        let captions = self.generate_captions(assets)?;

        let sentences: Vec<String> = texts
            .iter()
            .zip(&captions)
            .map(|(text, caption)| compose_narration(text, caption))
            .collect();
        info!(count = sentences.len(), "narration composed");

        let audio_paths = self.synthesize(assets, &sentences)?;

        let entries: Vec<NarrationEntry> = assets
            .iter()
            .zip(texts)
            .zip(captions)
            .zip(sentences)
            .zip(audio_paths)
            .map(
                |((((asset, text), caption), narration), audio_path)| NarrationEntry {
                    index: asset.index,
                    image_url: asset.url.clone(),
                    image_path: asset.path.clone(),
                    text,
                    caption,
                    narration,
                    audio_path,
                },
            )
            .collect();

        let manifest = self.opts.manifest_path();
        write_manifest(&manifest, &entries)?;
        info!(manifest = %manifest.display(), entries = entries.len(), "narration manifest written");

        Ok(entries)
    }

    /// Stage 2: OCR every image.
    pub fn extract_texts(&self, assets: &[ImageAsset]) -> Result<Vec<String>> {
        let mut texts = Vec::with_capacity(assets.len());
        for asset in assets {
            let text = self
                .ocr
                .extract_text(&asset.path)
                .with_context(|| format!("OCR failed for {}", asset.path.display()))?;
            debug!(index = asset.index, text = %text, "extracted text");
            texts.push(text);
        }
        info!(count = texts.len(), "text extracted");
        Ok(texts)
    }

    /// Stage 3: caption every image with the shared model handle.
    pub fn generate_captions(&mut self, assets: &[ImageAsset]) -> Result<Vec<String>> {
        let mut captions = Vec::with_capacity(assets.len());
        for asset in assets {
            let caption = self
                .captioner
                .caption(&asset.path)
                .with_context(|| format!("captioning failed for {}", asset.path.display()))?;
            debug!(index = asset.index, caption = %caption, "generated caption");
            captions.push(caption);
        }
        info!(count = captions.len(), "captions generated");
        Ok(captions)
    }

    /// Stage 5: one audio file per sentence, named after the asset's index.
    pub fn synthesize(&self, assets: &[ImageAsset], sentences: &[String]) -> Result<Vec<PathBuf>> {
        ensure!(
            assets.len() == sentences.len(),
            "{} sentences for {} images",
            sentences.len(),
            assets.len()
        );

        let audio_dir = self.opts.audio_dir();
        fs::create_dir_all(&audio_dir)
            .with_context(|| format!("failed to create audio dir: {}", audio_dir.display()))?;

        let mut paths = Vec::with_capacity(sentences.len());
        for (asset, sentence) in assets.iter().zip(sentences) {
            let path = audio_dir.join(format!(
                "audio_{}.{}",
                asset.index,
                self.synthesizer.extension()
            ));
            self.synthesizer
                .synthesize(sentence, &self.opts.language, &path)
                .with_context(|| format!("speech synthesis failed for {}", path.display()))?;
            debug!(index = asset.index, path = %path.display(), "synthesized narration");
            paths.push(path);
        }
        info!(count = paths.len(), "voiceover generated");
        Ok(paths)
    }

    pub fn opts(&self) -> &PipelineOpts {
        &self.opts
    }

    pub fn captioner(&self) -> &C {
        &self.captioner
    }

    pub fn synthesizer(&self) -> &S {
        &self.synthesizer
    }
}
