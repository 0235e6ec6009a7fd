/// Linkdeck offline converter.
///
/// Runs the same parse → group → render pipeline as the bot on a local file:
///
/// ```text
/// linkdeck batch.txt --layout subjects -o batch.html
/// linkdeck batch.txt --json
/// ```
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use linkdeck_shared::{ConvertOptions, Converter, Layout};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Convert a `Name: URL` text list into an HTML link page")]
struct Args {
    /// Input .txt file
    input: PathBuf,

    /// Output file (defaults to the input path with .html or .json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Page layout: tabs or subjects
    #[arg(short, long, env = "PAGE_LAYOUT", default_value = "tabs")]
    layout: Layout,

    /// Page title (defaults to the input file stem)
    #[arg(short, long)]
    title: Option<String>,

    /// Credit shown in the page header
    #[arg(long, env = "CREDIT")]
    credit: Option<String>,

    /// Link for the credit
    #[arg(long, env = "CREDIT_URL")]
    credit_url: Option<String>,

    /// Token for PW cloudfront player links
    #[arg(long, env = "PW_TOKEN", hide_env_values = true)]
    pw_token: Option<String>,

    /// Write the grouped catalog as JSON instead of HTML
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("linkdeck_cli=info".parse()?)
                .add_directive("linkdeck_shared=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let written = run(&args)?;
    println!("{}", written.display());
    Ok(())
}

fn default_output(input: &Path, json: bool) -> PathBuf {
    input.with_extension(if json { "json" } else { "html" })
}

fn run(args: &Args) -> Result<PathBuf> {
    let content = std::fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let content = String::from_utf8_lossy(&content);

    let title = match &args.title {
        Some(t) => t.clone(),
        None => args
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "links".to_string()),
    };

    let converter = Converter::new(ConvertOptions {
        layout: args.layout,
        pw_token: args.pw_token.clone(),
        credit: args.credit.clone(),
        credit_url: args.credit_url.clone(),
    })?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.input, args.json));

    if args.json {
        let (catalog, stats) = converter.catalog(&content, &title)?;
        let body = serde_json::to_string_pretty(&serde_json::json!({
            "title": title,
            "stats": stats,
            "catalog": catalog,
        }))?;
        std::fs::write(&output, body)
            .with_context(|| format!("writing {}", output.display()))?;
        info!("Wrote catalog for {} entries to {}", stats.entries, output.display());
    } else {
        let conversion = converter.convert(&content, &title)?;
        std::fs::write(&output, &conversion.html)
            .with_context(|| format!("writing {}", output.display()))?;
        info!(
            "Wrote {} ({} videos, {} pdfs, {} others)",
            output.display(),
            conversion.stats.videos,
            conversion.stats.pdfs,
            conversion.stats.others
        );
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = "\
(Physics) L1 Motion: https://x.io/l1.m3u8
(Physics) L1 Motion: https://x.io/l1.pdf
Notes - Ch1: https://x.io/ch1.pdf
";

    fn args(input: PathBuf, extra: &[&str]) -> Args {
        let mut argv = vec!["linkdeck".to_string(), input.display().to_string()];
        argv.extend(extra.iter().map(|s| s.to_string()));
        Args::parse_from(argv)
    }

    #[test]
    fn test_html_next_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("batch.txt");
        std::fs::write(&input, LIST).unwrap();

        let out = run(&args(input, &["--layout", "subjects"])).unwrap();
        assert_eq!(out, dir.path().join("batch.html"));
        let html = std::fs::read_to_string(out).unwrap();
        assert!(html.contains("<title>batch</title>"));
        assert!(html.contains("Physics (1)"));
    }

    #[test]
    fn test_json_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("batch.txt");
        std::fs::write(&input, LIST).unwrap();

        let out = run(&args(input, &["--json", "--title", "Batch"])).unwrap();
        assert_eq!(out.extension().unwrap(), "json");
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(value["title"], "Batch");
        assert_eq!(value["stats"]["entries"], 3);
        assert_eq!(value["catalog"]["layout"], "tabs");
        assert_eq!(value["catalog"]["pdfs"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_explicit_output_and_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        assert!(run(&args(missing, &[])).is_err());

        let input = dir.path().join("a.txt");
        std::fs::write(&input, LIST).unwrap();
        let target = dir.path().join("page.html");
        let out = run(&args(input, &["-o", target.to_str().unwrap()])).unwrap();
        assert_eq!(out, target);
        assert!(target.exists());
    }
}
