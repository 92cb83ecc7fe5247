//! `mdxai` command-line tool

mod cli;

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use mdxai_core::prelude::*;
use mdxai_core::registry::list_specifications;
use serde_json::{Map, Value};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Config file picked up from the working directory
const LOCAL_CONFIG: &str = "mdxai.toml";

#[tokio::main]
async fn main() {
    let matches = cli::build().get_matches();
    init_logging(matches.get_flag("log-json"));

    match run(&matches).await {
        Ok(success) => std::process::exit(if success { 0 } else { 1 }),
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mdxai=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Dispatch a subcommand; `Ok(false)` means it ran but reported failure
async fn run(matches: &ArgMatches) -> Result<bool> {
    let config = load_config(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;

    match matches.subcommand() {
        Some(("generate", args)) => generate(config, args).await,
        Some(("batch", args)) => batch(config, args).await,
        Some(("call", args)) => call(config, args).await,
        Some(("list", args)) => list(config, args).await,
        _ => bail!("unknown command"),
    }
}

fn load_config(path: Option<&Path>) -> Result<MdxaiConfig> {
    let config = match path {
        Some(path) => MdxaiConfig::load(path)?,
        None if Path::new(LOCAL_CONFIG).exists() => MdxaiConfig::load(LOCAL_CONFIG)?,
        None => MdxaiConfig::default(),
    };
    Ok(config.apply_env(std::env::vars()))
}

fn backend(config: &MdxaiConfig) -> Result<Arc<dyn Backend>> {
    config.validate()?;
    Ok(Arc::new(OpenAiBackend::from_config(&config.api)?))
}

fn request_from(args: &ArgMatches, prompt: String) -> GenerationRequest {
    let mut request = GenerationRequest::new(prompt);
    if let Some(type_name) = args.get_one::<String>("type") {
        request = request.with_type(type_name);
    }
    if args.get_flag("recursive") {
        request = request.recursive(args.get_one::<u32>("depth").copied().unwrap_or(1));
    }
    request
}

async fn generate(config: MdxaiConfig, args: &ArgMatches) -> Result<bool> {
    let prompt = match args.get_one::<String>("prompt") {
        Some(prompt) => prompt.clone(),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading prompt from stdin")?;
            buf
        }
    };
    if prompt.trim().is_empty() {
        bail!("prompt is empty");
    }

    let mut request = request_from(args, prompt.trim().to_string());
    if let Some(model) = args.get_one::<String>("model") {
        request = request.with_model(model);
    }
    if let Some(components) = args.get_many::<String>("components") {
        request = request.with_components(components.cloned());
    }

    let generator = Generator::new(backend(&config)?, config);
    deliver(
        &generator,
        &request,
        args.get_flag("stream"),
        args.get_one::<PathBuf>("output").map(PathBuf::as_path),
        &mut std::io::stdout(),
        &mut std::io::stderr(),
    )
    .await?;
    Ok(true)
}

/// Run one generation and write the document to `output`, or to `out`
///
/// With `stream`, raw chunks are echoed to `progress` as they arrive. A
/// timeout's partial text is saved to `output` before the error is returned.
async fn deliver(
    generator: &Generator,
    request: &GenerationRequest,
    stream: bool,
    output: Option<&Path>,
    out: &mut impl Write,
    progress: &mut impl Write,
) -> Result<()> {
    let outcome = if stream {
        let outcome = generator
            .generate_streaming(request, |chunk| {
                let _ = progress.write_all(chunk.as_bytes());
                let _ = progress.flush();
            })
            .await;
        let _ = writeln!(progress);
        outcome
    } else {
        generator.generate(request).await
    };

    match (outcome, output) {
        (Ok(result), Some(path)) => {
            std::fs::write(path, &result.content)
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), "document written");
            Ok(())
        }
        (Ok(result), None) => {
            out.write_all(result.content.as_bytes())?;
            out.flush()?;
            Ok(())
        }
        (Err(err), output) => {
            if let (Some(partial), Some(path)) = (err.partial_output(), output) {
                std::fs::write(path, partial)
                    .with_context(|| format!("writing partial output to {}", path.display()))?;
                tracing::warn!(path = %path.display(), "partial output written");
            }
            Err(err.into())
        }
    }
}

async fn batch(mut config: MdxaiConfig, args: &ArgMatches) -> Result<bool> {
    if let Some(max) = args.get_one::<usize>("concurrency") {
        config = config.with_max_concurrency(*max);
    }
    let files: Vec<PathBuf> = args
        .get_many::<PathBuf>("files")
        .map(|files| files.cloned().collect())
        .unwrap_or_default();
    let output_dir = args.get_one::<PathBuf>("output-dir");
    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let generator = Generator::new(backend(&config)?, config);
    let failures = run_batch(
        &generator,
        &files,
        |prompt| request_from(args, prompt),
        output_dir.map(PathBuf::as_path),
    )
    .await;
    Ok(failures == 0)
}

/// Generate one document per prompt file and return the number of failures
///
/// Unreadable inputs and failed writes count against their own file only.
async fn run_batch<F>(
    generator: &Generator,
    files: &[PathBuf],
    make_request: F,
    output_dir: Option<&Path>,
) -> usize
where
    F: Fn(String) -> GenerationRequest,
{
    let mut failures = 0usize;
    let mut inputs = Vec::with_capacity(files.len());
    let mut requests = Vec::with_capacity(files.len());
    for file in files {
        match std::fs::read_to_string(file) {
            Ok(prompt) => {
                inputs.push(file);
                requests.push(make_request(prompt.trim().to_string()));
            }
            Err(err) => {
                failures += 1;
                tracing::error!(file = %file.display(), error = %err, "prompt file unreadable");
                eprintln!("{}: {err}", file.display());
            }
        }
    }
    if requests.is_empty() {
        return failures;
    }

    let results = generator.generate_batch(&requests).await;
    for (file, result) in inputs.into_iter().zip(results) {
        let written = result.map_err(anyhow::Error::from).and_then(|result| {
            let target = output_path(file, output_dir);
            std::fs::write(&target, &result.content)
                .with_context(|| format!("writing {}", target.display()))?;
            Ok(target)
        });
        match written {
            Ok(target) => println!("{} -> {}", file.display(), target.display()),
            Err(err) => {
                failures += 1;
                let message = format!("{err:#}");
                tracing::error!(file = %file.display(), error = %message, "generation failed");
                eprintln!("{}: {message}", file.display());
            }
        }
    }
    failures
}

/// `<stem>.mdx` beside the input, or inside `output_dir`
fn output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let file_name = input.with_extension("mdx");
    match (output_dir, file_name.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => file_name,
    }
}

async fn call(mut config: MdxaiConfig, args: &ArgMatches) -> Result<bool> {
    if let Some(dir) = args.get_one::<PathBuf>("functions-dir") {
        config = config.with_functions_dir(dir);
    }
    let name = args
        .get_one::<String>("name")
        .context("function name is required")?;
    let function_args = parse_args(args.get_many::<String>("arg").into_iter().flatten())?;

    let registry = Registry::new(backend(&config)?, config);
    let result = registry.invoke(name, function_args).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(!result.is_error())
}

async fn list(mut config: MdxaiConfig, args: &ArgMatches) -> Result<bool> {
    if let Some(dir) = args.get_one::<PathBuf>("functions-dir") {
        config = config.with_functions_dir(dir);
    }
    let dir = config.functions_dir;
    let names = list_specifications(&dir).await?;
    if names.is_empty() {
        eprintln!("no functions in {}", dir.display());
    }
    for name in names {
        println!("{name}");
    }
    Ok(true)
}

/// Decode `key=value` pairs; values that parse as JSON keep their type
fn parse_args<'a, I>(pairs: I) -> Result<Map<String, Value>>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut map = Map::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("argument `{pair}` is not key=value");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("argument `{pair}` has an empty key");
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        map.insert(key.to_string(), value);
    }
    Ok(map)
}
