use clap::Parser as ClapParser;
use clap::Subcommand;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::logger;
use judgeline::embedded_templates;
use judgeline::error::{CatalogueError, JudgeError};
use judgeline::judge::{
    self, CommandTransport, EvaluationOptions, EvaluationRequest, JudgeConfig, Subject,
};
use judgeline::template::{Catalogue, CustomPromptSegments, TemplateStore};

#[derive(ClapParser)]
#[command(name = "judgeline", version, about = "LLM-as-a-judge evaluation engine")]
struct Cli {
    /// Path to judge config YAML file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Path to a template catalogue (YAML or JSON)
    #[arg(long, value_name = "FILE", global = true)]
    templates: Option<PathBuf>,

    /// Print debug diagnostics to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a single piece of content
    Eval {
        /// Content to evaluate (reads --file or stdin if omitted)
        content: Option<String>,

        /// Read the content from a file ("-" for stdin)
        #[arg(short, long, value_name = "FILE", conflicts_with = "content")]
        file: Option<PathBuf>,

        #[command(flatten)]
        judge: JudgeArgs,
    },
    /// Ask which of two texts better meets the criteria
    Compare {
        /// First text
        text_a: String,
        /// Second text
        text_b: String,

        /// Treat TEXT_A and TEXT_B as file paths
        #[arg(long)]
        files: bool,

        #[command(flatten)]
        judge: JudgeArgs,
    },
    /// Parse a judge response offline against a template's rules
    Parse {
        /// Template whose output rules apply
        #[arg(short, long)]
        template: String,

        /// Response file (stdin if omitted)
        file: Option<PathBuf>,

        /// Split off text after "Reasoning:"
        #[arg(short, long)]
        reasoning: bool,
    },
    /// List available templates
    Templates {
        /// Show descriptions and system prompts
        #[arg(short, long)]
        verbose: bool,
    },
    /// Print a template as YAML
    Show {
        template_id: String,
    },
    /// Write the built-in catalogue to ~/.config/judgeline/ for customization
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(clap::Args, Debug, Default)]
struct JudgeArgs {
    /// Evaluation (or comparison) criteria
    #[arg(long)]
    criteria: String,

    /// Template identifier
    #[arg(short, long)]
    template: Option<String>,

    /// Override the system message
    #[arg(long)]
    system: Option<String>,

    /// Override the user instruction prefix
    #[arg(long)]
    prefix: Option<String>,

    /// Override the user instruction suffix
    #[arg(long)]
    suffix: Option<String>,

    /// Output-format instruction given to the judge
    #[arg(long = "format", value_name = "INSTRUCTION")]
    format_instruction: Option<String>,

    /// Ask the judge to explain its verdict
    #[arg(short, long)]
    reasoning: bool,

    /// Ask the judge to think step by step first
    #[arg(long)]
    chain_of_thought: bool,

    /// Judge model identifier (overrides config)
    #[arg(short, long)]
    model: Option<String>,

    /// Print the prompt without calling the judge
    #[arg(long)]
    dry_run: bool,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,
}

impl JudgeArgs {
    fn custom_segments(&self) -> Option<CustomPromptSegments> {
        let segments = CustomPromptSegments {
            system_message: self.system.clone(),
            user_instruction_prefix: self.prefix.clone(),
            user_instruction_suffix: self.suffix.clone(),
        };
        (!segments.is_empty()).then_some(segments)
    }

    /// Options for the engine. `default_template` applies only when neither a
    /// template nor any custom segment was given.
    fn to_options(&self, config: &JudgeConfig, default_template: &str) -> EvaluationOptions {
        let custom_segments = self.custom_segments();
        let template_id = match (&self.template, &custom_segments) {
            (Some(id), _) => Some(id.clone()),
            (None, None) => Some(default_template.to_string()),
            (None, Some(_)) => None,
        };
        EvaluationOptions {
            template_id,
            custom_segments,
            output_format_instruction: self.format_instruction.clone(),
            provide_reasoning: self.reasoning,
            chain_of_thought: self.chain_of_thought,
            model_id: self.model.clone().unwrap_or_else(|| config.model.clone()),
            sampling: config.sampling.clone(),
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_env("JUDGELINE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if debug { "judgeline=debug" } else { "judgeline=warn" })
    });
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

/// Load the catalogue with fallback: --templates flag > config > default path > embedded.
fn load_catalogue(
    explicit_path: Option<&PathBuf>,
    config: &JudgeConfig,
) -> Result<Catalogue, CatalogueError> {
    if let Some(path) = explicit_path.or(config.templates.as_ref()) {
        return Catalogue::load(path);
    }

    let default_path = judge::config_dir().join(embedded_templates::FILE_NAME);
    if default_path.exists() {
        return Catalogue::load(&default_path);
    }

    Catalogue::embedded()
}

fn load_judge_config(explicit_path: Option<&PathBuf>) -> JudgeConfig {
    match explicit_path {
        Some(path) => judge::load_config_from_path(path),
        None => judge::load_config(),
    }
}

/// Main entry point. Returns the process exit code.
pub fn run() -> i32 {
    yansi::whenever(yansi::Condition::TTY_AND_COLOR);

    let cli = Cli::parse();
    init_tracing(cli.debug);

    // Handle Init command early (no config needed)
    if let Commands::Init { force } = &cli.command {
        return run_init(*force);
    }

    let config = load_judge_config(cli.config.as_ref());
    let catalogue = match load_catalogue(cli.templates.as_ref(), &config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("judgeline: {e}");
            return 2;
        }
    };

    match cli.command {
        Commands::Eval {
            content,
            file,
            judge: args,
        } => {
            let content = match content {
                Some(text) => text,
                None => match read_input(file.as_deref()) {
                    Ok(text) => text,
                    Err(e) => {
                        eprintln!("judgeline: {e}");
                        return 2;
                    }
                },
            };
            let request = EvaluationRequest {
                subject: Subject::Single { content },
                criteria: args.criteria.clone(),
                options: args.to_options(&config, "likert_scale"),
            };
            run_evaluation(&catalogue, &config, &request, &args)
        }
        Commands::Compare {
            text_a,
            text_b,
            files,
            judge: args,
        } => {
            let (text_a, text_b) = if files {
                match (
                    read_input(Some(Path::new(&text_a))),
                    read_input(Some(Path::new(&text_b))),
                ) {
                    (Ok(a), Ok(b)) => (a, b),
                    (Err(e), _) | (_, Err(e)) => {
                        eprintln!("judgeline: {e}");
                        return 2;
                    }
                }
            } else {
                (text_a, text_b)
            };
            let request = EvaluationRequest {
                subject: Subject::Pair { text_a, text_b },
                criteria: args.criteria.clone(),
                options: args.to_options(&config, "pairwise_comparison"),
            };
            run_evaluation(&catalogue, &config, &request, &args)
        }
        Commands::Parse {
            template,
            file,
            reasoning,
        } => run_parse(&catalogue, &template, file.as_deref(), reasoning),
        Commands::Templates { verbose } => run_templates(&catalogue, verbose),
        Commands::Show { template_id } => run_show(&catalogue, &template_id),
        Commands::Init { .. } => unreachable!(), // handled above
    }
}

/// Exit code for an engine error: caller mistakes are 2, runtime failures 1.
fn exit_code(error: &JudgeError) -> i32 {
    match error {
        JudgeError::Transport(_) => 1,
        JudgeError::CallerContract(_)
        | JudgeError::TemplateNotFound(_)
        | JudgeError::InvalidTemplate { .. } => 2,
    }
}

fn run_evaluation(
    catalogue: &Catalogue,
    config: &JudgeConfig,
    request: &EvaluationRequest,
    args: &JudgeArgs,
) -> i32 {
    if args.dry_run {
        return match judge::prepare(catalogue, request) {
            Ok(prepared) => {
                if args.json {
                    print_json(&prepared);
                } else {
                    crate::output::print_prompt(&prepared.prompt);
                }
                0
            }
            Err(e) => {
                eprintln!("judgeline: {e}");
                exit_code(&e)
            }
        };
    }

    let transport = CommandTransport::from_config(config);
    let evaluation = match judge::evaluate(catalogue, &transport, request) {
        Ok(evaluation) => evaluation,
        Err(e) => {
            eprintln!("judgeline: {e}");
            return exit_code(&e);
        }
    };

    if config.log {
        logger::log_evaluation(&logger::make_entry(&evaluation));
    }

    if args.json {
        print_json(&evaluation);
    } else {
        crate::output::print_evaluation(&evaluation);
    }
    0
}

fn run_parse(catalogue: &Catalogue, template_id: &str, file: Option<&Path>, reasoning: bool) -> i32 {
    let template = match catalogue.get_template(template_id) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("judgeline: {e}");
            return 2;
        }
    };
    let raw = match read_input(file) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("judgeline: {e}");
            return 2;
        }
    };
    let judgment = judge::parse(&template.output_parser_rules, &raw, reasoning);
    print_json(&judgment);
    0
}

fn run_templates(catalogue: &Catalogue, verbose: bool) -> i32 {
    let templates = catalogue.templates();
    if verbose {
        println!("{}", crate::output::templates_table_verbose(&templates));
    } else {
        println!("{}", crate::output::templates_table(&templates));
    }
    println!("{} templates", templates.len());
    0
}

fn run_show(catalogue: &Catalogue, template_id: &str) -> i32 {
    let template = match catalogue.get_template(template_id) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("judgeline: {e}");
            return 2;
        }
    };
    match serde_norway::to_string(template) {
        Ok(yaml) => {
            print!("{yaml}");
            0
        }
        Err(e) => {
            eprintln!("judgeline: failed to serialize template: {e}");
            1
        }
    }
}

fn run_init(force: bool) -> i32 {
    let target_dir = judge::config_dir();
    let templates_path = target_dir.join(embedded_templates::FILE_NAME);

    if templates_path.exists() && !force {
        eprintln!(
            "judgeline: {} already exists. Use --force to overwrite.",
            templates_path.display()
        );
        return 1;
    }

    if let Err(e) = std::fs::create_dir_all(&target_dir) {
        eprintln!("judgeline: failed to create {}: {e}", target_dir.display());
        return 1;
    }

    if let Err(e) = std::fs::write(&templates_path, embedded_templates::DEFAULT_TEMPLATES) {
        eprintln!("judgeline: failed to write {}: {e}", templates_path.display());
        return 1;
    }

    println!("Templates written to {}", templates_path.display());
    println!("Edit it to customize.");

    0
}

/// Read from a file, or from stdin when the path is absent or "-".
fn read_input(file: Option<&Path>) -> Result<String, String> {
    match file {
        Some(path) if path.to_str() != Some("-") => std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display())),
        _ => {
            if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
                return Err("no input provided. Pass it as an argument, use --file <path> or pipe it to stdin.".to_string());
            }
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            Ok(buf)
        }
    }
}

/// Print a JSON value to stdout.
fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("judgeline: failed to serialize output: {e}");
            println!("{{}}");
        }
    }
}
