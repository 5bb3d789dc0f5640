//! SEL command line

use clap::{Parser, Subcommand};
use sel::config::EvalConfig;
use sel::error::report_error;
use sel::eval::{ContextRef, Engine, MapContext};
use sel::lexer::tokenize_at;
use sel::model::Element;
use sel::model::document::{SchemaDocument, load_instance_file};
use sel::parser::template::{Segment, split};
use sel::parser::parse_template;
use sel::repl::{Repl, host_value, render};
use sel::{CompileError, Status};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sel", version, about = "SEL - Sapphire expression language")]
struct Cli {
    /// Settings file; `sel.toml` is searched for upward when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fraction digits kept by division
    #[arg(long, global = true)]
    scale: Option<i64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct ModelArgs {
    /// JSON schema file
    #[arg(long)]
    schema: Option<PathBuf>,

    /// JSON instance document of the schema's root type
    #[arg(long, requires = "schema")]
    model: Option<PathBuf>,

    /// Host variable binding, `name=value`
    #[arg(long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate a template and print its value or error status
    Eval {
        /// Template, e.g. `Total: ${ Sum(Lines, 'Amount') }`
        template: String,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Validate an instance document and print every failing property
    Validate {
        /// JSON schema file
        #[arg(long)]
        schema: PathBuf,
        /// JSON instance document
        #[arg(long)]
        model: PathBuf,
    },
    /// Parse a template and dump its AST as JSON (debug)
    Parse { template: String },
    /// Tokenize the blocks of a template (debug)
    Tokens { template: String },
    /// Start an interactive session
    Repl {
        #[command(flatten)]
        model: ModelArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };
    init_logging(&config.log_filter);

    let engine = Engine::with_config(config);
    let result = match cli.command {
        Command::Eval { template, model } => eval_template(&engine, &template, &model),
        Command::Validate { schema, model } => validate(&engine, &schema, &model),
        Command::Parse { template } => parse(&template),
        Command::Tokens { template } => tokens(&template),
        Command::Repl { model } => repl(engine, &model),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}

/// `SEL_LOG` wins over the configured filter
fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_env("SEL_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<EvalConfig, CompileError> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => std::env::current_dir()
            .ok()
            .and_then(|dir| EvalConfig::discover(&dir)),
    };
    let mut config = match path {
        Some(path) => EvalConfig::load(&path)?,
        None => EvalConfig::default(),
    };
    if let Some(scale) = cli.scale {
        config.decimal_scale = scale;
    }
    Ok(config)
}

type CliResult = Result<bool, Box<dyn std::error::Error>>;

/// Compile errors are rendered against the template; false means failure
fn compile_or_report<T>(template: &str, result: sel::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            report_error("<template>", template, &e);
            None
        }
    }
}

fn variables(bindings: &[String]) -> Result<Rc<MapContext>, CompileError> {
    let variables = MapContext::new();
    for binding in bindings {
        let (name, value) = binding.split_once('=').ok_or_else(|| {
            CompileError::config(format!("variable binding `{binding}` is not name=value"))
        })?;
        variables.set(name.trim(), host_value(value));
    }
    Ok(variables)
}

fn load_model(engine: &Engine, schema: &Path, model: Option<&Path>) -> sel::Result<Element> {
    let document = SchemaDocument::load(schema)?;
    let schema = document.build(engine.clone())?;
    let element = match model {
        Some(path) => load_instance_file(&schema, &document.root, path)?,
        None => schema.instantiate(&document.root)?,
    };
    debug!(element = %element, "loaded model");
    Ok(element)
}

fn element_for(engine: &Engine, args: &ModelArgs) -> sel::Result<Option<Element>> {
    args.schema
        .as_deref()
        .map(|schema| load_model(engine, schema, args.model.as_deref()))
        .transpose()
}

fn eval_template(engine: &Engine, template: &str, args: &ModelArgs) -> CliResult {
    let Some(function) = compile_or_report(template, engine.compile(template)) else {
        return Ok(false);
    };
    let globals = variables(&args.vars)?;
    let element = element_for(engine, args)?;
    let context: ContextRef = match &element {
        Some(element) => element.context_with(globals),
        None => globals as ContextRef,
    };
    let result = function.evaluate(&context);
    let status = result.status();
    println!("{}", render(&result));
    drop(result);
    if let Some(element) = element {
        element.dispose();
    }
    Ok(!status.is_error())
}

fn validate(engine: &Engine, schema: &Path, model: &Path) -> CliResult {
    let root = load_model(engine, schema, Some(model))?;
    let mut failures = Vec::new();
    collect_failures(&root, &root.element_type().name().to_string(), &mut failures);
    for (path, status) in &failures {
        println!("{path}: {}: {}", status.severity, status.message);
    }
    let status = root.element_validation();
    println!("{}", status);
    root.dispose();
    Ok(!status.is_error())
}

fn collect_failures(element: &Element, path: &str, failures: &mut Vec<(String, Status)>) {
    for property in element.element_type().properties() {
        let status = match element.validation(&property.name) {
            Ok(status) => status,
            Err(e) => Status::error(e.to_string()),
        };
        if !status.is_ok() {
            failures.push((format!("{path}.{}", property.name), status));
        }
        if let Ok(items) = element.list(&property.name) {
            for (index, item) in items.iter().enumerate() {
                collect_failures(item, &format!("{path}.{}[{index}]", property.name), failures);
            }
        }
        if let Ok(Some(child)) = element.element(&property.name) {
            collect_failures(&child, &format!("{path}.{}", property.name), failures);
        }
    }
}

fn parse(template: &str) -> CliResult {
    let Some(ast) = compile_or_report(template, parse_template(template)) else {
        return Ok(false);
    };
    println!("{}", serde_json::to_string_pretty(&ast)?);
    Ok(true)
}

fn tokens(template: &str) -> CliResult {
    let Some(segments) = compile_or_report(template, split(template)) else {
        return Ok(false);
    };
    for segment in segments {
        match segment {
            Segment::Text { text, span } => {
                println!("Text({text:?}) @ {}..{}", span.start, span.end)
            }
            Segment::Block { body, span } => {
                let Some(tokens) = compile_or_report(template, tokenize_at(body, span.start))
                else {
                    return Ok(false);
                };
                for (tok, span) in &tokens {
                    println!("{:?} @ {}..{}", tok, span.start, span.end);
                }
            }
        }
    }
    Ok(true)
}

fn repl(engine: Engine, args: &ModelArgs) -> CliResult {
    let element = element_for(&engine, args)?;
    let mut repl = Repl::new(engine)?;
    for binding in &args.vars {
        if let Some((name, value)) = binding.split_once('=') {
            repl.variables().set(name.trim(), host_value(value));
        }
    }
    if let Some(element) = element {
        repl = repl.with_element(element);
    }
    repl.run()?;
    Ok(true)
}
