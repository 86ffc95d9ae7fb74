pub mod blip;
pub mod espeak;
pub mod google_tts;
pub mod tesseract;
