use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use preseea::config::{self, Settings};
use preseea::{Corpus, FilterState, Sample};

#[derive(Parser)]
#[command(name = "preseea", about = "Query the PRESEEA corpus and report pronoun/verb agreement")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl a phrase for one city and write the CSV report
    Report {
        #[arg(long)]
        city: String,
        #[arg(long)]
        phrase: String,
        /// Read samples from a JSON file instead of crawling
        #[arg(long)]
        samples: Option<PathBuf>,
        /// Author written into the report header
        #[arg(long)]
        author: Option<String>,
        /// Directory the report is written to
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print the samples matching a full filter
    Search {
        #[command(flatten)]
        filter: FilterArgs,
        /// Print samples as JSON
        #[arg(long)]
        json: bool,
    },
    /// Count the samples matching a full filter
    Count {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// List corpus countries and their cities
    Cities {
        #[arg(long)]
        country: Option<String>,
    },
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    city: String,
    #[arg(long, default_value = "all")]
    gender: String,
    #[arg(long, default_value = "all")]
    age: String,
    #[arg(long, default_value = "all")]
    education: String,
    #[arg(long)]
    phrase: String,
}

impl FilterArgs {
    fn apply<'t>(&self, corpus: &'t Corpus) -> anyhow::Result<FilterState<'t>> {
        let mut filter = corpus.filter();
        filter.set_filter(
            &self.city,
            &self.gender,
            &self.age,
            &self.education,
            &self.phrase,
        )?;
        if !filter.is_complete() {
            bail!("incomplete filter ({filter}); check the labels with `preseea cities`");
        }
        Ok(filter)
    }
}

fn main() -> anyhow::Result<()> {
    config::init_tracing();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load().context("loading settings")?;

    match cli.command {
        Commands::Report {
            city,
            phrase,
            samples,
            author,
            out,
        } => {
            if let Some(author) = author {
                settings.author = author;
            }
            if let Some(out) = out {
                settings.report_dir = out;
            }
            let corpus = Corpus::new(settings)?;
            let written = match samples {
                Some(path) => {
                    let samples = load_samples(&path)?;
                    let filter = corpus.city_filter(&city, &phrase)?;
                    let total = samples.len();
                    corpus.report_from_samples(&filter, samples, total)?
                }
                None => {
                    let pb = spinner(format!("crawling '{}' in {city}", phrase.trim()))?;
                    let written = corpus.create_report(&city, &phrase);
                    pb.finish_and_clear();
                    written?
                }
            };
            match written {
                Some(path) => println!("Report written to {}", path.display()),
                None => println!("No samples found for '{}' in {city}.", phrase.trim()),
            }
        }
        Commands::Search { filter, json } => {
            let corpus = Corpus::new(settings)?;
            let filter = filter.apply(&corpus)?;
            let pb = spinner(format!("searching {filter}"))?;
            let samples = corpus.retrieve(&filter);
            pb.finish_and_clear();
            let samples = samples?;

            if json {
                println!("{}", serde_json::to_string_pretty(&samples)?);
            } else {
                for (idx, s) in samples.iter().enumerate() {
                    println!("{:>4}  {:<14} {:<6} {:<12} {}", idx + 1, s.label, s.date, s.country, s.text);
                }
                println!("{} samples.", samples.len());
            }
        }
        Commands::Count { filter } => {
            let corpus = Corpus::new(settings)?;
            let filter = filter.apply(&corpus)?;
            let pb = spinner(format!("counting {filter}"))?;
            let count = corpus.count(&filter);
            pb.finish_and_clear();
            println!("{}", count?);
        }
        Commands::Cities { country } => {
            let corpus = Corpus::new(settings)?;
            let taxonomy = corpus.taxonomy();
            match country {
                Some(country) => {
                    for city in taxonomy.cities_of(&country)? {
                        println!("{city}");
                    }
                }
                None => {
                    for country in taxonomy.countries() {
                        let cities = taxonomy.cities_of(country)?;
                        println!("{country} ({}): {}", cities.len(), cities.join(", "));
                    }
                    println!("{} cities in total.", taxonomy.number_of_all_cities());
                }
            }
        }
    }

    tracing::debug!(elapsed_ms = t0.elapsed().as_millis() as u64, "done");
    Ok(())
}

fn load_samples(path: &Path) -> anyhow::Result<Vec<Sample>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading samples from {}", path.display()))?;
    let samples = serde_json::from_str(&text)
        .with_context(|| format!("parsing samples in {}", path.display()))?;
    Ok(samples)
}

fn spinner(message: String) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}
