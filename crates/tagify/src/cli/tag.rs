//! The `tagify tag` command.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, ValueEnum};
use tagify_core::output::OutputFormat as CoreOutputFormat;
use tagify_core::pipeline::detect_content_type;
use tagify_core::{Config, OutputWriter, TaggingPipeline, UploadedImage};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Arguments for the `tag` command.
#[derive(Args, Debug)]
pub struct TagArgs {
    /// Image file to tag
    #[arg(required = true)]
    pub input: PathBuf,

    /// Name to stamp onto the result (defaults to the file name)
    #[arg(long)]
    pub name: Option<String>,

    /// Source URL to stamp onto the result
    #[arg(long)]
    pub url: Option<String>,

    /// Owner to stamp onto the result
    #[arg(long)]
    pub owner: Option<String>,

    /// Declared content type (sniffed from the file when omitted)
    #[arg(long)]
    pub content_type: Option<String>,

    /// Model name (overrides config)
    #[arg(long, env = "TAGIFY_MODEL")]
    pub model: Option<String>,

    /// Backend endpoint (overrides config)
    #[arg(long, env = "TAGIFY_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Pretty-print JSON output (ignored for jsonl)
    #[arg(long)]
    pub pretty: bool,
}

/// Supported output formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// One JSON document
    Json,
    /// Compact single-line JSON, the same bytes as `json` without `--pretty`.
    /// Convenient for appending results to a `.jsonl` log.
    Jsonl,
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

impl TagArgs {
    /// Whether any metadata flag asks for the enriched result.
    fn wants_metadata(&self) -> bool {
        self.name.is_some() || self.url.is_some() || self.owner.is_some()
    }
}

/// Execute the tag command.
pub async fn execute(args: TagArgs, mut config: Config) -> anyhow::Result<()> {
    if !args.input.is_file() {
        anyhow::bail!(
            "Input file does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            args.input
        );
    }

    if let Some(model) = &args.model {
        config.model.name = model.clone();
    }
    if let Some(endpoint) = &args.endpoint {
        config.model.endpoint = endpoint.clone();
    }

    let pipeline = TaggingPipeline::from_config(&config)?;
    let image = open_upload(&args.input, args.content_type.clone()).await?;
    let filename = image.filename().unwrap_or_default().to_string();

    let stdout = std::io::stdout();
    let mut writer = OutputWriter::new(stdout.lock(), args.format.into(), args.pretty);

    if args.wants_metadata() {
        let result = pipeline
            .run_enriched(
                image,
                args.name.unwrap_or(filename),
                args.url.unwrap_or_default(),
                args.owner.unwrap_or_default(),
            )
            .await
            .with_context(|| format!("Failed to tag {:?}", args.input))?;
        writer.write(&result)?;
    } else {
        let tags = pipeline
            .run(image)
            .await
            .with_context(|| format!("Failed to tag {:?}", args.input))?;
        writer.write(&tags)?;
    }

    writer.flush()?;
    Ok(())
}

/// Open a file as an upload, declaring its size and content type.
///
/// Without an explicit content type the leading bytes are sniffed; an
/// unrecognized file gets no content type and the pipeline rejects it.
async fn open_upload(path: &Path, content_type: Option<String>) -> anyhow::Result<UploadedImage> {
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Cannot open {path:?}"))?;
    let size = file.metadata().await?.len();

    let content_type = match content_type {
        Some(ct) => Some(ct),
        None => {
            let mut header = [0u8; 16];
            let n = file.read(&mut header).await?;
            file.rewind().await?;
            let sniffed = detect_content_type(&header[..n]);
            tracing::debug!("Sniffed content type for {path:?}: {sniffed:?}");
            sniffed.map(String::from)
        }
    };

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());

    Ok(UploadedImage::from_reader(file, content_type, size, filename))
}
