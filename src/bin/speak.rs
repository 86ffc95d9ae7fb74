// Write spoken audio for a piece of text to a WAV file using espeak-ng.
//
//   speak "<text_to_speak>" "<output_path>"
//
// Exits 1 with a usage message on the wrong number of arguments, and 1 with the error
// message if synthesis fails.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use mangacast::backend::Synthesizer;
use mangacast::backends::espeak::{EspeakOpts, EspeakTts};
use mangacast::logging;

const USAGE: &str = "Usage: speak \"<text_to_speak>\" \"<output_path>\"";

#[derive(Parser, Debug)]
#[command(name = "speak")]
#[command(about = "Write spoken audio for a piece of text to a file")]
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Params {
    #[arg(allow_hyphen_values = true)]
    text: String,

    #[arg(allow_hyphen_values = true)]
    output_path: PathBuf,
}

fn main() -> ExitCode {
    logging::init();

    let Some(params) = parse_params(std::env::args_os()) else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    match generate_audio(&params.text, &params.output_path) {
        Ok(()) => {
            println!(
                "Successfully generated audio at {}",
                params.output_path.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("An error occurred: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Exactly two user arguments, counted before clap sees them so a bare `--` is one of them.
fn parse_params<I>(args: I) -> Option<Params>
where
    I: IntoIterator<Item = OsString>,
{
    let args: Vec<OsString> = args.into_iter().collect();
    if args.len() != 3 {
        return None;
    }
    Params::try_parse_from(args).ok()
}

fn generate_audio(text: &str, output_path: &std::path::Path) -> mangacast::Result<()> {
    let tts = EspeakTts::new(EspeakOpts {
        rate_wpm: 160,
        volume: 0.9,
        voice: None,
    });
    tts.synthesize(text, "en", output_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Option<Params> {
        parse_params(args.iter().map(OsString::from))
    }

    #[test]
    fn exactly_two_arguments_are_accepted() {
        let params = parse(&["speak", "Hello there", "out.wav"]).expect("two args");
        assert_eq!(params.text, "Hello there");
        assert_eq!(params.output_path, PathBuf::from("out.wav"));
    }

    #[test]
    fn wrong_argument_counts_are_rejected() {
        assert!(parse(&["speak"]).is_none());
        assert!(parse(&["speak", "only text"]).is_none());
        assert!(parse(&["speak", "a", "b", "c"]).is_none());
        assert!(parse(&["speak", "--help"]).is_none());
        assert!(parse(&["speak", "--", "a", "b"]).is_none());
    }
}
