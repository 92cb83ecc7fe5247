//! File-backed registry of typed AI functions
//!
//! A function named `summarize` is described by `<functions_dir>/summarize.md`:
//!
//! ```text
//! ---
//! model: gpt-4o
//! system: You are a helpful AI assistant.
//! schema:
//!   type: object
//!   properties:
//!     content:
//!       type: string
//!   required:
//!     - content
//! ---
//!
//! Optional prompt template, appended to the system prompt.
//! ```
//!
//! The file is created from a default template on first use and re-read on
//! every call, so edits take effect without restarting. Handles are cached per
//! name.

use crate::backend::{Backend, StructuredRequest};
use crate::config::MdxaiConfig;
use crate::error::{MdxaiError, Result};
use crate::timeout::with_timeout;
use dashmap::DashMap;
use mdxai_document::{parse, render_body, stringify, Document, ParseOptions, StringifyOptions};
use mdxai_schema::{CompiledSchema, OutputShape};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Extension of specification files
pub const SPEC_EXTENSION: &str = "md";

/// System prompt written into new specifications
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Frontmatter keys with engine meaning; every other key is a static field
const RESERVED_KEYS: &[&str] = &["model", "system", "schema"];

/// Parsed specification file
#[derive(Debug, Clone)]
pub struct Specification {
    /// Function name
    pub name: String,
    /// Model identifier
    pub model: String,
    /// System prompt including any body template
    pub system_prompt: String,
    /// Output schema as written
    pub output_schema: Option<Value>,
    /// Other frontmatter fields, passed as default arguments
    pub fields: Map<String, Value>,
}

impl Specification {
    /// Parse specification text
    ///
    /// # Errors
    /// Malformed frontmatter is a generation error; a missing `model` is a
    /// configuration error.
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let document = parse(text, &ParseOptions::default())
            .map_err(|e| MdxaiError::generation(format!("invalid specification `{name}`: {e}")))?;

        let model = document
            .get("model")
            .and_then(serde_yaml::Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| {
                MdxaiError::configuration(format!("specification `{name}` has no model"))
            })?
            .to_string();

        let mut system_prompt = document
            .get("system")
            .and_then(serde_yaml::Value::as_str)
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
            .to_string();
        let template = render_body(&document.body);
        if !template.trim().is_empty() {
            system_prompt.push_str("\n\n");
            system_prompt.push_str(template.trim_end());
        }

        let output_schema = document
            .get("schema")
            .map(to_json)
            .transpose()?
            .filter(|s| !s.is_null());

        let mut fields = Map::new();
        for (key, value) in &document.metadata {
            let Some(key) = key.as_str() else { continue };
            if RESERVED_KEYS.contains(&key) || key.starts_with(mdxai_document::document::PRIMARY_PREFIX) {
                continue;
            }
            fields.insert(key.to_string(), to_json(value)?);
        }

        Ok(Self {
            name: name.to_string(),
            model,
            system_prompt,
            output_schema,
            fields,
        })
    }

    /// Compile the output schema
    #[must_use]
    pub fn compile(&self) -> CompiledSchema {
        CompiledSchema::compile(self.output_schema.as_ref())
    }
}

fn to_json(value: &serde_yaml::Value) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| MdxaiError::generation(format!("specification value is not JSON-compatible: {e}")))
}

/// Default specification text for a new function
///
/// # Errors
/// Returns a parsing error if the template cannot be serialized.
pub fn default_template(model: &str) -> Result<String> {
    let mut document = Document::new();
    document.set("model", model.into());
    document.set("system", DEFAULT_SYSTEM_PROMPT.into());
    let schema: serde_yaml::Value = serde_yaml::from_str(
        "type: object\nproperties:\n  content:\n    type: string\nrequired:\n  - content\n",
    )
    .map_err(|e| MdxaiError::parsing(e.to_string()))?;
    document.set("schema", schema);
    Ok(stringify(&document, &StringifyOptions::default())?)
}

/// Check that `name` is usable as a file stem
///
/// # Errors
/// Returns a configuration error describing the problem.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MdxaiError::configuration("function name is empty"));
    }
    if name == "." || name == ".." {
        return Err(MdxaiError::configuration(format!("invalid function name `{name}`")));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(MdxaiError::configuration(format!(
            "function name `{name}` contains a path separator"
        )));
    }
    Ok(())
}

/// Handle to one function's specification file
#[derive(Debug)]
pub struct AiFunction {
    name: String,
    path: PathBuf,
    creation: tokio::sync::Mutex<()>,
}

/// Write `text` to a freshly created `file`, removing `path` if the write fails
async fn write_or_remove<W>(path: &Path, mut file: W, text: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = match file.write_all(text.as_bytes()).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        drop(file);
        if let Err(remove) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %remove, "could not remove partial specification");
        }
        return Err(MdxaiError::io_error(path, e));
    }
    Ok(())
}

impl AiFunction {
    fn new(name: &str, dir: &Path) -> Self {
        Self {
            name: name.to_string(),
            path: dir.join(format!("{name}.{SPEC_EXTENSION}")),
            creation: tokio::sync::Mutex::new(()),
        }
    }

    /// Function name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Specification file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the specification file from the default template if absent
    ///
    /// Never overwrites an existing file.
    ///
    /// # Errors
    /// Returns an IO error when the directory or file cannot be written.
    pub async fn ensure_exists(&self, default_model: &str) -> Result<bool> {
        let _guard = self.creation.lock().await;
        if tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| MdxaiError::io_error(&self.path, e))?
        {
            return Ok(false);
        }
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| MdxaiError::io_error(dir, e))?;
        }

        let template = default_template(default_model)?;
        let opened = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await;
        let file = match opened {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(MdxaiError::io_error(&self.path, e)),
        };
        write_or_remove(&self.path, file, &template).await?;

        tracing::info!(function = %self.name, path = %self.path.display(), "created default specification");
        Ok(true)
    }

    /// Read and parse the specification file
    ///
    /// # Errors
    /// See [`Specification::parse`]; unreadable files are IO errors.
    pub async fn load(&self) -> Result<Specification> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| MdxaiError::io_error(&self.path, e))?;
        Specification::parse(&self.name, &text)
    }
}

/// Result of a function call
///
/// Failures are carried as a single `error` field of the form
/// `"<Kind>: <message>"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FunctionResult(Map<String, Value>);

impl FunctionResult {
    /// Error key
    pub const ERROR_KEY: &'static str = "error";

    /// Result carrying an error
    #[must_use]
    pub fn from_error(err: &MdxaiError) -> Self {
        let mut fields = Map::new();
        fields.insert(
            Self::ERROR_KEY.to_string(),
            Value::String(format!("{}: {}", err.kind(), err.message())),
        );
        Self(fields)
    }

    /// Error text, if the call failed
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.0.get(Self::ERROR_KEY).and_then(Value::as_str)
    }

    /// Whether the call failed
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error().is_some()
    }

    /// Look up a field
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// All fields
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Convert into a JSON object
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for FunctionResult {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Registry of AI functions backed by a directory of specification files
pub struct Registry {
    backend: Arc<dyn Backend>,
    config: MdxaiConfig,
    functions: DashMap<String, Arc<AiFunction>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("backend", &self.backend.name())
            .field("functions_dir", &self.config.functions_dir)
            .field("cached", &self.functions.len())
            .finish()
    }
}

impl Registry {
    /// Create registry over a backend
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, config: MdxaiConfig) -> Self {
        Self {
            backend,
            config,
            functions: DashMap::new(),
        }
    }

    /// Directory holding specification files
    #[must_use]
    pub fn functions_dir(&self) -> &Path {
        &self.config.functions_dir
    }

    /// Get or create the cached handle for `name`
    ///
    /// # Errors
    /// Returns a configuration error for names that are not valid file stems.
    pub fn function(&self, name: &str) -> Result<Arc<AiFunction>> {
        validate_name(name)?;
        let entry = self
            .functions
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(AiFunction::new(name, &self.config.functions_dir)));
        Ok(Arc::clone(entry.value()))
    }

    /// Call a function; never fails
    ///
    /// Every failure is reported through [`FunctionResult::error`].
    pub async fn invoke(&self, name: &str, args: Map<String, Value>) -> FunctionResult {
        match self.try_invoke(name, args).await {
            Ok(fields) => FunctionResult::from(fields),
            Err(err) => {
                tracing::error!(function = name, error = %err, "function call failed");
                FunctionResult::from_error(&err)
            }
        }
    }

    /// Call a function, propagating failures
    ///
    /// # Errors
    /// - `Configuration` for invalid names or a specification without `model`
    /// - `Generation` for malformed specifications, backend failures, or output
    ///   that does not match the schema
    /// - `Timeout` when the backend call exceeds the step limit
    /// - `Io` when the specification file cannot be created or read
    pub async fn try_invoke(&self, name: &str, args: Map<String, Value>) -> Result<Map<String, Value>> {
        let function = self.function(name)?;
        function.ensure_exists(&self.config.default_model).await?;
        let spec = function.load().await?;
        let schema = spec.compile();

        let mut input = spec.fields.clone();
        input.extend(args);
        let prompt = serde_json::to_string_pretty(&Value::Object(input))?;

        tracing::info!(function = name, model = %spec.model, shape = %schema.shape(), "calling function");
        let request = StructuredRequest {
            prompt,
            system: spec.system_prompt.clone(),
            model: spec.model.clone(),
            schema,
        };
        let output = with_timeout(
            "function",
            self.config.step_timeout(),
            self.backend.generate_structured(&request),
        )
        .await?;

        shape_output(&request.schema, &output)
    }

    /// Names of all specification files in the functions directory, sorted
    ///
    /// # Errors
    /// See [`list_specifications`].
    pub async fn list(&self) -> Result<Vec<String>> {
        list_specifications(&self.config.functions_dir).await
    }
}

/// Names of all specification files in `dir`, sorted
///
/// A missing directory yields an empty list.
///
/// # Errors
/// Returns an IO error when the directory cannot be read.
pub async fn list_specifications(dir: &Path) -> Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(MdxaiError::io_error(dir, e)),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| MdxaiError::io_error(dir, e))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(SPEC_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Interpret structured output according to the schema's shape
fn shape_output(schema: &CompiledSchema, output: &Value) -> Result<Map<String, Value>> {
    let mut result = Map::new();
    match schema.shape() {
        OutputShape::Array => {
            let items = schema.validate(output)?;
            result.insert("items".to_string(), items);
        }
        OutputShape::Object => match schema.validate(output)? {
            Value::Object(fields) => result.extend(fields),
            other => {
                return Err(MdxaiError::generation(format!(
                    "expected an object, got {}",
                    mdxai_schema::json_type(&other)
                )))
            }
        },
        OutputShape::Freeform => {
            result.insert("content".to_string(), output.clone());
        }
    }
    Ok(result)
}
