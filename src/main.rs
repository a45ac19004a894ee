//! Resume tailor: fit a master resume to a job description with an LLM

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use resume_tailor::cli::{self, Cli, Commands, ConfigAction, TemplateAction};
use resume_tailor::config::Config;
use resume_tailor::input::InputLoader;
use resume_tailor::llm::OpenAiClient;
use resume_tailor::output::{save_report_to_file, ReportGenerator, RunReport};
use resume_tailor::pipeline::{Pipeline, TailorOptions};
use resume_tailor::processing::document::{JobRequirement, RankedSelection, ResumeBlock};
use resume_tailor::processing::{ContentRanker, JobAnalyzer, RankerSettings, ResumeParser};
use resume_tailor::typeset::template::TemplateOrigin;
use resume_tailor::typeset::{LatexTypesetter, LayoutSettings, ResumeBuilder, TemplateStore, Typesetter};
use resume_tailor::{Result, ResumeTailorError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command, config, cli.config).await {
        error!("Command failed: {}", e);
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn run_command(command: Commands, config: Config, config_file: Option<PathBuf>) -> Result<()> {
    match command {
        Commands::Tailor {
            resume,
            job,
            template,
            output_dir,
            max_iterations,
            no_feedback,
            max_blocks,
            format,
            report,
        } => {
            let output_format = match format {
                Some(format) => cli::parse_output_format(&format).map_err(ResumeTailorError::InvalidInput)?,
                None => config.output.format,
            };

            let mut options = TailorOptions::from_config(&config);
            if let Some(template) = template {
                options.template = template;
            }
            if let Some(dir) = output_dir {
                options.output_dir = dir;
            }
            if let Some(iterations) = max_iterations {
                options.max_iterations = iterations;
            }
            if let Some(max_blocks) = max_blocks {
                options.budget.max_blocks = Some(max_blocks);
            }
            if no_feedback {
                options.feedback = false;
            }

            println!("🚀 Tailoring resume");
            println!("📄 Resume: {}", resume.display());
            println!("💼 Job Description: {}", job.display());
            println!("🧾 Template: {}", options.template);
            if !options.feedback {
                println!("⚠️  Layout feedback disabled");
            }

            let loader = InputLoader::new();
            let resume_text = loader.load(&resume).await?;
            let job_text = loader.load(&job).await?;

            let llm = OpenAiClient::from_config(&config)?;
            let typesetter = LatexTypesetter::new(&config.render);
            info!("Using model {} with {}", llm.model(), config.render.engine);

            let spinner = stage_spinner();
            let run = Pipeline::new(&llm, &typesetter, &config)
                .run(&resume_text, &job_text, &options, |stage| {
                    spinner.set_message(stage.to_string())
                })
                .await;
            spinner.finish_and_clear();
            let run = run?;

            let summary = RunReport::from_run(&run, &resume, &job);
            let rendered = ReportGenerator::new(config.output.color_output).generate_report(&summary, output_format)?;

            match report {
                Some(path) => {
                    save_report_to_file(&rendered, &path)?;
                    println!("📝 Report saved to {}", path.display());
                }
                None => println!("{}", rendered),
            }

            println!(
                "\n✅ Tailored resume written to {}",
                run.pdf_path.display().to_string().green().bold()
            );
            Ok(())
        }

        Commands::Parse { resume, out } => {
            let resume_text = InputLoader::new().load(&resume).await?;
            let llm = OpenAiClient::from_config(&config)?;

            let spinner = stage_spinner();
            spinner.set_message("Parsing resume into blocks");
            let blocks = ResumeParser::new(&llm).parse(&resume_text).await;
            spinner.finish_and_clear();
            let blocks = blocks?;

            println!("📄 Found {} blocks", blocks.len());
            write_json(&blocks, out.as_deref())
        }

        Commands::Analyze { job, out } => {
            let job_text = InputLoader::new().load(&job).await?;
            let llm = OpenAiClient::from_config(&config)?;

            let spinner = stage_spinner();
            spinner.set_message("Analyzing job description");
            let requirements = JobAnalyzer::new(&llm).analyze(&job_text).await;
            spinner.finish_and_clear();
            let requirements = requirements?;

            println!("💼 Extracted {} requirements", requirements.len());
            write_json(&requirements, out.as_deref())
        }

        Commands::Rank {
            blocks,
            requirements,
            out,
        } => {
            let blocks: Vec<ResumeBlock> = read_json(&blocks)?;
            let requirements: Vec<JobRequirement> = read_json(&requirements)?;
            let llm = OpenAiClient::from_config(&config)?;

            let spinner = stage_spinner();
            spinner.set_message("Ranking blocks against requirements");
            let selection = ContentRanker::new(&llm, RankerSettings::from_config(&config.selection))
                .rank(&blocks, &requirements)
                .await;
            spinner.finish_and_clear();
            let selection = selection?;

            println!(
                "🎯 Selected {} of {} blocks ({} characters)",
                selection.len(),
                blocks.len(),
                selection.char_count()
            );
            write_json(&selection, out.as_deref())
        }

        Commands::Build {
            selection,
            template,
            out,
        } => {
            let selection: RankedSelection = read_json(&selection)?;
            let template_id = template.unwrap_or_else(|| config.template.default_template.clone());
            let store = TemplateStore::new(config.template.templates_dir.clone());
            let builder = ResumeBuilder::new(store.load(&template_id)?);

            let layout = LayoutSettings::from_config(&config.template).clamped(&config.feedback);
            let source = builder.build(&selection, &layout)?;

            match out {
                Some(path) => {
                    std::fs::write(&path, &source)?;
                    println!("🧾 LaTeX written to {}", path.display());
                }
                None => println!("{}", source),
            }
            Ok(())
        }

        Commands::Render { source, out } => {
            let tex = std::fs::read_to_string(&source)?;
            let typesetter = LatexTypesetter::new(&config.render);

            let spinner = stage_spinner();
            spinner.set_message(format!("Typesetting with {}", config.render.engine));
            let document = typesetter.compile(&tex).await;
            spinner.finish_and_clear();
            let document = document?;

            let pdf_path = out.unwrap_or_else(|| source.with_extension("pdf"));
            std::fs::write(&pdf_path, &document.pdf)?;
            println!("✅ {} ({} page(s))", pdf_path.display(), document.page_count);
            Ok(())
        }

        Commands::Templates { action } => {
            let store = TemplateStore::new(config.template.templates_dir.clone());
            match action {
                TemplateAction::List => {
                    println!("🧾 Available templates:");
                    for info in store.list()? {
                        let marker = if info.id == config.template.default_template { " (default)" } else { "" };
                        match info.origin {
                            TemplateOrigin::BuiltIn => println!("  {}{} - built-in", info.id, marker),
                            TemplateOrigin::File(path) => {
                                println!("  {}{} - {}", info.id, marker, path.display())
                            }
                        }
                    }
                }
                TemplateAction::Show { id } => {
                    let template = store.load(&id)?;
                    let slots: Vec<&str> = template.slots().iter().map(|c| c.label()).collect();
                    println!("% slots: {}", slots.join(", "));
                    println!("{}", store.source(&id)?);
                }
            }
            Ok(())
        }

        Commands::Config { action } => {
            let path = config_file.unwrap_or_else(Config::config_path);
            match action {
                Some(ConfigAction::Show) | None => {
                    println!("⚙️  Configuration ({})", path.display());
                    let content = toml::to_string_pretty(&config)
                        .map_err(|e| ResumeTailorError::Configuration(e.to_string()))?;
                    println!("{}", content);
                }
                Some(ConfigAction::Reset) => {
                    Config::default().save_to(&path)?;
                    println!("✅ Configuration reset to defaults: {}", path.display());
                }
                Some(ConfigAction::Path) => println!("{}", path.display()),
            }
            Ok(())
        }
    }
}

fn stage_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg:.cyan} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn write_json<T: Serialize + ?Sized>(value: &T, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            std::fs::write(path, json)?;
            println!("💾 Saved to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
