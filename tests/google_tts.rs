mod common;

use common::{Route, serve};
use mangacast::backend::Synthesizer;
use mangacast::backends::google_tts::GoogleTts;

#[test]
fn long_text_is_requested_in_chunks_and_appended() -> anyhow::Result<()> {
    let base = serve(vec![Route {
        path: "/translate_tts",
        status: 200,
        body: b"MP3".to_vec(),
    }]);
    let tts = GoogleTts::with_endpoint(format!("{base}/translate_tts"))?;

    let dir = tempfile::tempdir()?;
    let out = dir.path().join("audio_0.mp3");

    // 30 five-letter words = 179 chars, which needs two requests.
    let text = vec!["panel"; 30].join(" ");
    tts.synthesize(&text, "en", &out)?;

    assert_eq!(std::fs::read(&out)?, b"MP3MP3");
    assert_eq!(tts.extension(), "mp3");
    Ok(())
}

#[test]
fn error_status_fails_synthesis() -> anyhow::Result<()> {
    let base = serve(vec![Route {
        path: "/translate_tts",
        status: 500,
        body: Vec::new(),
    }]);
    let tts = GoogleTts::with_endpoint(format!("{base}/translate_tts"))?;

    let dir = tempfile::tempdir()?;
    let err = tts
        .synthesize("hello", "en", &dir.path().join("audio_0.mp3"))
        .unwrap_err();
    assert!(err.to_string().contains("bad status"), "unexpected: {err}");
    Ok(())
}
