// A small CLI utility to download the known caption models (weights + tokenizer)
// into a target directory.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "model-downloader")]
#[command(about = "Download caption models for mangacast", long_about = None)]
struct Args {
    /// List supported model names and exit.
    #[arg(long)]
    list: bool,

    /// Model name (example: blip-large)
    #[arg(long, required_unless_present = "list")]
    name: Option<String>,

    /// Parent directory for models; each model gets its own subdirectory.
    #[arg(long, default_value = "./models")]
    dir: PathBuf,
}

/// One file belonging to a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ModelFile {
    /// Filename written to disk.
    filename: &'static str,

    /// Full download URL.
    url: &'static str,
}

/// Download source for a known model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ModelSpec {
    /// Friendly name users type; also the subdirectory name.
    name: &'static str,

    description: &'static str,

    files: &'static [ModelFile],
}

// Safetensors weights for BLIP live on a PR branch of the upstream repo.
static MODELS: &[ModelSpec] = &[ModelSpec {
    name: "blip-large",
    description: "Salesforce BLIP image captioning (large)",
    files: &[
        ModelFile {
            filename: "model.safetensors",
            url: "https://huggingface.co/Salesforce/blip-image-captioning-large/resolve/refs%2Fpr%2F18/model.safetensors",
        },
        ModelFile {
            filename: "tokenizer.json",
            url: "https://huggingface.co/Salesforce/blip-image-captioning-large/resolve/main/tokenizer.json",
        },
    ],
}];

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list {
        print_model_list();
        return Ok(());
    }

    let Some(name) = args.name.as_deref() else {
        anyhow::bail!("--name is required unless --list is given");
    };

    let spec = lookup_model(name).with_context(|| {
        format!("unknown model '{name}'. Run with --list to see supported models.")
    })?;

    let model_dir = args.dir.join(spec.name);
    fs::create_dir_all(&model_dir)
        .with_context(|| format!("failed to create target dir: {}", model_dir.display()))?;

    let client = Client::builder()
        .user_agent("mangacast-model-downloader")
        .build()
        .context("failed to build HTTP client")?;

    for file in spec.files {
        println!("⬇️  {} ({})", file.filename, spec.name);
        match fetch_model_file(&client, file, &model_dir)? {
            Fetched::AlreadyPresent => println!("✅ already exists, skipped"),
            Fetched::Downloaded { bytes } => println!("✅ saved {bytes} bytes"),
        }
    }

    println!("model ready in {}", model_dir.display());
    Ok(())
}

/// Outcome of [`fetch_model_file`].
#[derive(Debug, PartialEq, Eq)]
enum Fetched {
    AlreadyPresent,
    Downloaded { bytes: u64 },
}

/// Download one file of a model into `model_dir` unless it is already there.
fn fetch_model_file(client: &Client, file: &ModelFile, model_dir: &Path) -> Result<Fetched> {
    let dest_path = model_dir.join(file.filename);
    if dest_path.is_file() {
        return Ok(Fetched::AlreadyPresent);
    }

    let resp = client
        .get(file.url)
        .send()
        .with_context(|| format!("request failed: {}", file.url))?
        .error_for_status()
        .with_context(|| format!("download failed (bad status): {}", file.url))?;

    let total = resp.content_length();
    let bytes = save_atomically(resp, total, &dest_path)?;
    Ok(Fetched::Downloaded { bytes })
}

fn lookup_model(name: &str) -> Option<&'static ModelSpec> {
    MODELS.iter().find(|m| m.name == name)
}

fn print_model_list() {
    print!("{}", model_list_string());
}

fn model_list_string() -> String {
    let mut out = String::new();

    out.push_str("Caption models:\n");
    for m in MODELS {
        out.push_str("  - ");
        out.push_str(m.name);
        out.push_str(" (");
        out.push_str(m.description);
        out.push_str(")\n");
    }

    out
}

/// `model.safetensors` → `model.safetensors.part`.
fn part_path(dest_path: &Path) -> PathBuf {
    let mut name = dest_path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn progress_bar(total_bytes: Option<u64>) -> Result<ProgressBar> {
    let pb = match total_bytes {
        Some(total) if total > 0 => ProgressBar::new(total),
        _ => ProgressBar::new_spinner(),
    };
    let style = ProgressStyle::with_template(
        "{spinner:.green} {bytes}/{total_bytes} {bar:40.cyan/blue} {eta}",
    )
    .context("invalid progress template")?
    .progress_chars("#>-");
    pb.set_style(style);
    Ok(pb)
}

/// Stream `reader` into `dest_path` and return the byte count.
///
/// Bytes land in a `.part` sibling that is synced and renamed into place once the
/// stream ends. On failure the `.part` file is removed and `dest_path` is untouched.
fn save_atomically<R: Read>(reader: R, total_bytes: Option<u64>, dest_path: &Path) -> Result<u64> {
    let part = part_path(dest_path);
    let pb = progress_bar(total_bytes)?;

    let result = write_part(pb.wrap_read(reader), &part).and_then(|bytes| {
        fs::rename(&part, dest_path)
            .with_context(|| format!("failed to move into place: {}", dest_path.display()))?;
        Ok(bytes)
    });

    pb.finish_and_clear();
    if result.is_err() {
        let _ = fs::remove_file(&part);
    }
    result
}

fn write_part(mut reader: impl Read, part: &Path) -> Result<u64> {
    let mut file = fs::File::create(part)
        .with_context(|| format!("failed to create {}", part.display()))?;
    let bytes = io::copy(&mut reader, &mut file)
        .with_context(|| format!("download interrupted: {}", part.display()))?;
    file.sync_all()?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_model_finds_blip_and_its_files() {
        let blip = lookup_model("blip-large").expect("expected blip-large spec");
        let names: Vec<&str> = blip.files.iter().map(|f| f.filename).collect();
        assert_eq!(names, vec!["model.safetensors", "tokenizer.json"]);

        assert!(lookup_model("definitely-not-a-model").is_none());
    }

    #[test]
    fn model_list_string_includes_known_names() {
        let list = model_list_string();
        assert!(list.contains("Caption models:\n"));
        assert!(list.contains("  - blip-large ("));
    }

    #[test]
    fn args_parse_requires_name_unless_list() {
        let err = Args::try_parse_from(["model-downloader"])
            .err()
            .expect("expected missing-args error");
        assert!(err.to_string().contains("--name"));

        let args =
            Args::try_parse_from(["model-downloader", "--list"]).expect("parse list params");
        assert!(args.list);
        assert!(args.name.is_none());
    }

    #[test]
    fn blip_files_come_from_the_large_checkpoint() {
        // The captioner builds `Config::image_captioning_large`, so weights must match.
        let blip = lookup_model("blip-large").expect("expected blip-large spec");
        for file in blip.files {
            assert!(
                file.url
                    .starts_with("https://huggingface.co/Salesforce/blip-image-captioning-large/"),
                "{}",
                file.url
            );
        }
    }

    #[test]
    fn part_path_appends_a_suffix() {
        assert_eq!(
            part_path(Path::new("models/blip-large/model.safetensors")),
            PathBuf::from("models/blip-large/model.safetensors.part")
        );
    }

    #[test]
    fn save_atomically_writes_renames_and_counts() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let dest_path = dir.path().join("tokenizer.json");

        let bytes = b"{\"model\":{}}".to_vec();
        let written = save_atomically(
            std::io::Cursor::new(bytes.clone()),
            Some(bytes.len() as u64),
            &dest_path,
        )?;

        assert_eq!(written, bytes.len() as u64);
        assert_eq!(std::fs::read(&dest_path)?, bytes);
        assert!(!part_path(&dest_path).exists());
        Ok(())
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("connection reset"))
        }
    }

    #[test]
    fn save_atomically_cleans_up_on_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let dest_path = dir.path().join("model.safetensors");

        let err = save_atomically(FailingReader, None, &dest_path).unwrap_err();
        assert!(format!("{err:#}").contains("connection reset"));
        assert!(!dest_path.exists());
        assert!(!part_path(&dest_path).exists());
        Ok(())
    }

    #[test]
    fn existing_files_are_not_downloaded_again() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("tokenizer.json"), b"{}")?;

        // An unroutable URL: any request would fail the test.
        let file = ModelFile {
            filename: "tokenizer.json",
            url: "http://127.0.0.1:9/tokenizer.json",
        };
        let client = Client::new();
        assert_eq!(
            fetch_model_file(&client, &file, dir.path())?,
            Fetched::AlreadyPresent
        );
        assert_eq!(std::fs::read(dir.path().join("tokenizer.json"))?, b"{}");
        Ok(())
    }
}
