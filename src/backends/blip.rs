//! BLIP image captioning on top of `candle-transformers`.
//!
//! The model (vision encoder + text decoder) and its tokenizer are loaded once by
//! [`BlipCaptioner::load`] and reused for every image. Generation is greedy, starting from
//! the `[DEC]` token and stopping at `[SEP]`.
//!
//! Only the *large* checkpoint (`Salesforce/blip-image-captioning-large`) is supported,
//! because that is the configuration candle ships. Captions are therefore longer and
//! worded differently from what the smaller `blip-image-captioning-base` produces for
//! the same page.

use std::path::Path;

use anyhow::{Context, Result, anyhow, ensure};
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::blip;
use image::DynamicImage;
use image::imageops::FilterType;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::backend::Captioner;
use crate::fetch::open_image;

/// Weights file expected inside the model directory.
pub const MODEL_FILE: &str = "model.safetensors";

/// Tokenizer file expected inside the model directory.
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Square input resolution of the BLIP vision encoder.
pub const IMAGE_SIZE: usize = 384;

// CLIP normalization constants used by the BLIP image processor.
const IMAGE_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const IMAGE_STD: [f32; 3] = [0.268_629_54, 0.261_302_6, 0.275_777_1];

/// `[DEC]`: the decoder's beginning-of-sequence token.
const BOS_TOKEN_ID: u32 = 30522;

/// `[SEP]`: terminates a caption.
const SEP_TOKEN_ID: u32 = 102;

/// Maximum caption length in tokens, including `[DEC]`.
const MAX_CAPTION_TOKENS: usize = 20;

/// Select the inference device. Falls back to CPU when CUDA isn't compiled in or present.
pub fn device(cpu: bool) -> Result<Device> {
    if cpu {
        return Ok(Device::Cpu);
    }
    let device = Device::cuda_if_available(0).context("failed to probe CUDA device")?;
    Ok(device)
}

/// An explicitly owned, loaded BLIP captioning model.
pub struct BlipCaptioner {
    model: blip::BlipForConditionalGeneration,
    tokenizer: Tokenizer,
    device: Device,
}

impl BlipCaptioner {
    /// Load `model.safetensors` and `tokenizer.json` from `model_dir`.
    pub fn load(model_dir: &Path, device: Device) -> Result<Self> {
        let model_path = model_dir.join(MODEL_FILE);
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);

        ensure!(
            model_path.is_file(),
            "BLIP weights not found at '{}' (run model-downloader --name blip-large)",
            model_path.display()
        );
        ensure!(
            tokenizer_path.is_file(),
            "BLIP tokenizer not found at '{}'",
            tokenizer_path.display()
        );

        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|err| {
            anyhow!(
                "failed to load tokenizer from '{}': {err}",
                tokenizer_path.display()
            )
        })?;

        let config = blip::Config::image_captioning_large();

        // Safety: the weights file is memory-mapped read-only and must not be modified
        // while the model is alive.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[&model_path], DType::F32, &device)
                .with_context(|| format!("failed to map weights '{}'", model_path.display()))?
        };
        let model = blip::BlipForConditionalGeneration::new(&config, vb)
            .context("failed to build BLIP model")?;

        info!(model = %model_path.display(), device = ?device, "loaded BLIP captioning model");

        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    fn generate(&mut self, image_path: &Path) -> Result<String> {
        let img = open_image(image_path)?;
        let pixels = preprocess(&img);

        let pixels =
            Tensor::from_vec(pixels, (3, IMAGE_SIZE, IMAGE_SIZE), &self.device)?.unsqueeze(0)?;
        let image_embeds = self.model.vision_model().forward(&pixels)?;

        self.model.reset_kv_cache();

        // No temperature: argmax decoding, so the seed never matters.
        let mut logits_processor = LogitsProcessor::new(0, None, None);
        let mut token_ids = vec![BOS_TOKEN_ID];

        for step in 0..MAX_CAPTION_TOKENS - 1 {
            // The decoder keeps a KV cache, so after the first step only the newest token
            // needs to be fed.
            let context_size = if step > 0 { 1 } else { token_ids.len() };
            let start = token_ids.len().saturating_sub(context_size);
            let input_ids = Tensor::new(&token_ids[start..], &self.device)?.unsqueeze(0)?;

            let logits = self
                .model
                .text_decoder()
                .forward(&input_ids, &image_embeds)?;
            let logits = logits.squeeze(0)?;
            let logits = logits.get(logits.dim(0)? - 1)?;

            let token = logits_processor.sample(&logits)?;
            if token == SEP_TOKEN_ID {
                break;
            }
            token_ids.push(token);
        }

        let caption = self
            .tokenizer
            .decode(&token_ids[1..], true)
            .map_err(|err| anyhow!("failed to decode caption tokens: {err}"))?;
        let caption = caption.trim().to_owned();

        debug!(image = %image_path.display(), tokens = token_ids.len() - 1, caption = %caption, "captioned image");
        Ok(caption)
    }
}

impl Captioner for BlipCaptioner {
    fn caption(&mut self, image_path: &Path) -> crate::Result<String> {
        Ok(self.generate(image_path)?)
    }
}

/// Resize to the encoder resolution and normalize into a CHW `f32` buffer.
pub fn preprocess(img: &DynamicImage) -> Vec<f32> {
    let rgb = img
        .resize_exact(IMAGE_SIZE as u32, IMAGE_SIZE as u32, FilterType::CatmullRom)
        .to_rgb8();

    let plane = IMAGE_SIZE * IMAGE_SIZE;
    let mut out = vec![0f32; 3 * plane];
    for (i, pixel) in rgb.pixels().enumerate() {
        for c in 0..3 {
            let value = pixel.0[c] as f32 / 255.0;
            out[c * plane + i] = (value - IMAGE_MEAN[c]) / IMAGE_STD[c];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn preprocess_produces_normalized_chw_planes() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 80, Rgb([255, 0, 128])));
        let data = preprocess(&img);

        let plane = IMAGE_SIZE * IMAGE_SIZE;
        assert_eq!(data.len(), 3 * plane);

        let expected_r = (1.0 - IMAGE_MEAN[0]) / IMAGE_STD[0];
        let expected_g = (0.0 - IMAGE_MEAN[1]) / IMAGE_STD[1];
        assert!((data[0] - expected_r).abs() < 0.02);
        assert!((data[plane] - expected_g).abs() < 0.02);
        assert!((data[3 * plane - 1] - data[2 * plane]).abs() < 1e-6);
    }

    #[test]
    fn load_reports_missing_weights() {
        let dir = tempfile::tempdir().expect("tempdir");
        let msg = match BlipCaptioner::load(dir.path(), Device::Cpu) {
            Ok(_) => panic!("expected error for missing weights"),
            Err(err) => format!("{err:#}"),
        };
        assert!(msg.contains("BLIP weights not found"), "unexpected: {msg}");
    }
}
