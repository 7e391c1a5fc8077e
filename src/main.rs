use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tagforge::engine::usage::group_usage;
use tagforge::export::writer;
use tagforge::memory::TagFormat;
use tagforge::{CloneRequest, Engine, EngineOptions, Workbook};

#[derive(Parser)]
#[command(name = "tagforge")]
#[command(about = "Memory-map address allocation for Twinsoft tag database exports", long_about = None)]
#[command(version)]
struct Cli {
    /// Workbook directory containing TAGS.csv, TEMPLATE.csv and MEMORY_MAP.csv
    #[arg(long, value_name = "DIR", env = "TAGFORGE_WORKBOOK")]
    workbook: PathBuf,

    /// Exported tag XML file from Twinsoft
    #[arg(long, value_name = "FILE")]
    xml_in: PathBuf,

    /// Output file for the generated XML
    #[arg(long, value_name = "FILE")]
    xml_out: PathBuf,

    /// Print more messages
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate tags using patterns defined in the workbook TAGS table
    Generate {
        /// Pattern selecting GENERATE/BASE rows: a regex, the literal '*'
        /// for all rows, or '?' to print sample patterns
        #[arg(long)]
        pattern: String,

        /// Skip the address bounds check entirely
        #[arg(long)]
        blind_validation: bool,

        /// Suppress the region overlap scan and forgive region lookups
        #[arg(long)]
        ignore_map_errors: bool,

        /// Tolerate exported tags whose group has no MAP entry
        #[arg(long)]
        allow_root_tags: bool,
    },

    /// Clone a folder of exported tags into a new region
    Clone {
        /// Tag name filter regex
        #[arg(long, default_value = r"^.+\d.+")]
        tag_filter: String,

        /// Group filter regex
        #[arg(long)]
        group_filter: String,

        /// Destination group; mirrors the group substitution when omitted
        #[arg(long)]
        dest: Option<String>,

        /// Replacement content ensuring cloned tags and groups are unique,
        /// e.g. the new loop number
        #[arg(long)]
        replace: String,

        /// Address offset to shift cloned tags into
        #[arg(long, allow_hyphen_values = true)]
        offset: i32,

        /// Regex locating the text to substitute in tags and groups
        #[arg(long, default_value = r"\d")]
        replace_pattern: String,

        /// Find this regex in the group path and replace every match
        #[arg(long, requires = "group_replace")]
        group_find: Option<String>,

        /// Replacement for group-find matches
        #[arg(long)]
        group_replace: Option<String>,

        /// Do not clone subfolders, e.g. CHAMBER 1 without CHAMBER 1\SOFTS
        #[arg(long)]
        no_recurse: bool,

        /// Skip the address bounds check entirely
        #[arg(long)]
        blind_validation: bool,

        /// Suppress the region overlap scan and forgive region lookups
        #[arg(long)]
        ignore_map_errors: bool,

        /// Tolerate exported tags whose group has no MAP entry
        #[arg(long)]
        allow_root_tags: bool,
    },

    /// Print loaded tables without allocating
    Tabulate {
        /// Table to render
        item: TabulateItem,

        /// Reshape xmlsummary into memory-map columns
        #[arg(long)]
        mapped: bool,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TabulateItem {
    /// TAGS table rows
    Tags,
    /// MEMORY_MAP table rows
    Map,
    /// TEMPLATE table rows
    Template,
    /// Address usage summary of the export XML
    Xmlsummary,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(&cli) {
        match err.downcast_ref::<tagforge::Error>() {
            Some(e) => eprintln!("{} {}", format!("{}:", e.kind()).red().bold(), e),
            None => eprintln!("{} {:#}", "error:".red().bold(), err),
        }
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "tagforge=debug" } else { "tagforge=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Generate {
            pattern,
            blind_validation,
            ignore_map_errors,
            allow_root_tags,
        } => {
            if pattern == "?" {
                print_pattern_help();
                return Ok(());
            }
            let options = EngineOptions {
                blind_validation: *blind_validation,
                ignore_map_errors: *ignore_map_errors,
                allow_unmapped: *allow_root_tags,
            };
            let engine = load_engine(cli)?;
            let results = engine.generate(pattern, &options)?;
            writer::write_file(&cli.xml_out, &results)?;
            info!("Generate tags operation completed.");
        }

        Commands::Clone {
            tag_filter,
            group_filter,
            dest,
            replace,
            offset,
            replace_pattern,
            group_find,
            group_replace,
            no_recurse,
            blind_validation,
            ignore_map_errors,
            allow_root_tags,
        } => {
            let request = CloneRequest {
                tag_filter: tag_filter.clone(),
                group_filter: group_filter.clone(),
                replace_pattern: replace_pattern.clone(),
                replacement: replace.clone(),
                offset: *offset,
                dest: dest.clone(),
                group_find: group_find.clone(),
                group_replace: group_replace.clone(),
                recurse: !no_recurse,
            };
            let options = EngineOptions {
                blind_validation: *blind_validation,
                ignore_map_errors: *ignore_map_errors,
                allow_unmapped: *allow_root_tags,
            };
            let engine = load_engine(cli)?;
            let results = engine.clone_tags(&request, &options)?;
            writer::write_file(&cli.xml_out, &results)?;
            info!("Clone operation completed.");
        }

        Commands::Tabulate { item, mapped, json } => tabulate(cli, *item, *mapped, *json)?,
    }
    Ok(())
}

fn load_engine(cli: &Cli) -> anyhow::Result<Engine> {
    let workbook = Workbook::open(&cli.workbook)?;
    let catalog = workbook.load_catalog()?;
    let regions = workbook.load_regions()?;
    let snapshot = tagforge::ExportSnapshot::from_file(&cli.xml_in)?;
    Ok(Engine::new(catalog, regions, snapshot))
}

fn print_pattern_help() {
    info!("Patterns use regex syntax. Samples are shown between single quotes:");
    info!("'*'              -> selects every GENERATE and BASE row");
    info!("'^[A-Z]\\d{{2}}_.+' -> one capital, two digits, underscore, then more, e.g. C12_PRIMARY");
    info!("'^C11.+'         -> starts with C11, e.g. C11_LS_100");
}

#[derive(Tabled, Serialize)]
struct TagsRow {
    #[tabled(rename = "CLASS")]
    class: &'static str,
    #[tabled(rename = "NAME/PATTERN")]
    name: String,
    #[tabled(rename = "TEMPLATE")]
    template: String,
    #[tabled(rename = "GROUP")]
    group: String,
    #[tabled(rename = "TYPE")]
    format: String,
    #[tabled(rename = "MEM_ID")]
    region_id: String,
}

#[derive(Tabled, Serialize)]
struct MapRow {
    #[tabled(rename = "MEM_ID")]
    region_id: String,
    #[tabled(rename = "MEM_TYPE")]
    format: String,
    #[tabled(rename = "START_ADDRESS")]
    start_address: u32,
    #[tabled(rename = "LENGTH")]
    length: u32,
    #[tabled(rename = "END_ADDRESS")]
    end_address: u32,
}

#[derive(Tabled, Serialize)]
struct TemplateRow {
    #[tabled(rename = "TEMPLATE")]
    template: String,
    #[tabled(rename = "SUFFIX")]
    suffix: String,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
    #[tabled(rename = "TYPE")]
    format: String,
    #[tabled(rename = "INITIAL_VALUE")]
    initial_value: String,
}

#[derive(Tabled, Serialize)]
struct SummaryRow {
    #[tabled(rename = "GROUP")]
    group: String,
    #[tabled(rename = "FORMAT")]
    format: String,
    #[tabled(rename = "SIGNED")]
    signed: bool,
    #[tabled(rename = "MB_MIN")]
    min_address: u32,
    #[tabled(rename = "MB_MAX")]
    max_address: u32,
}

fn tabulate(cli: &Cli, item: TabulateItem, mapped: bool, json: bool) -> anyhow::Result<()> {
    let workbook = Workbook::open(&cli.workbook)?;
    match item {
        TabulateItem::Tags => {
            let catalog = workbook.load_catalog()?;
            let rows: Vec<TagsRow> = catalog
                .entries()
                .map(|entry| match entry {
                    tagforge::catalog::CatalogEntry::Base(tag) => TagsRow {
                        class: "BASE",
                        name: tag.name.clone(),
                        template: String::new(),
                        group: tag.group.clone(),
                        format: tag.format.to_string(),
                        region_id: String::new(),
                    },
                    tagforge::catalog::CatalogEntry::Generate(pattern) => TagsRow {
                        class: "GENERATE",
                        name: pattern.pattern.clone(),
                        template: pattern.template.clone(),
                        group: pattern.group.clone(),
                        format: String::new(),
                        region_id: String::new(),
                    },
                    tagforge::catalog::CatalogEntry::Map(entry) => TagsRow {
                        class: "MAP",
                        name: String::new(),
                        template: String::new(),
                        group: entry.group.clone(),
                        format: String::new(),
                        region_id: entry.region_id.clone(),
                    },
                })
                .collect();
            info!("TAGS table in workbook {}", cli.workbook.display());
            render(&rows, json)?;
        }

        TabulateItem::Map => {
            let regions = workbook.load_regions()?;
            let rows: Vec<MapRow> = regions
                .iter()
                .map(|region| MapRow {
                    region_id: region.region_id.clone(),
                    format: region.format.to_string(),
                    start_address: region.start_address,
                    length: region.length,
                    end_address: region.end_address(),
                })
                .collect();
            info!("MEMORY_MAP table in workbook {}", cli.workbook.display());
            render(&rows, json)?;
        }

        TabulateItem::Template => {
            let catalog = workbook.load_catalog()?;
            let rows: Vec<TemplateRow> = catalog
                .templates()
                .map(|entry| TemplateRow {
                    template: entry.template.clone(),
                    suffix: entry.suffix.clone(),
                    description: entry.description.clone(),
                    format: entry.format.to_string(),
                    initial_value: entry.initial_value.clone().unwrap_or_default(),
                })
                .collect();
            info!("TEMPLATE table in workbook {}", cli.workbook.display());
            render(&rows, json)?;
        }

        TabulateItem::Xmlsummary => {
            let snapshot = tagforge::ExportSnapshot::from_file(&cli.xml_in)?;
            if mapped {
                // Region-keyed summary in MEMORY_MAP shape, ready to paste
                // back into the workbook; unmapped groups are tolerated
                let catalog = workbook.load_catalog()?;
                let mapping = catalog.group_mapping();
                let usage = tagforge::UsageSummary::summarize(&snapshot, &mapping, true)?;
                let rows: Vec<MapRow> = usage
                    .rows()
                    .into_iter()
                    .map(|(region_id, wire, signed, span)| {
                        let format = TagFormat::from_wire(wire, signed);
                        let stride = format.stride(None);
                        MapRow {
                            region_id,
                            format: format.to_string(),
                            start_address: span.min_address,
                            length: (span.max_address - span.min_address) / stride + 1,
                            end_address: span.max_address,
                        }
                    })
                    .collect();
                info!(
                    "Summarizing export {} as MEMORY_MAP",
                    cli.xml_in.display()
                );
                render(&rows, json)?;
            } else {
                let usage = group_usage(&snapshot);
                let rows: Vec<SummaryRow> = usage
                    .iter()
                    .map(|(group, wire, signed, span)| SummaryRow {
                        group: group.clone(),
                        format: wire.to_string(),
                        signed: *signed,
                        min_address: span.min_address,
                        max_address: span.max_address,
                    })
                    .collect();
                info!("Summarizing export {}", cli.xml_in.display());
                render(&rows, json)?;
            }
        }
    }
    Ok(())
}

fn render<T: Tabled + Serialize>(rows: &[T], json: bool) -> anyhow::Result<()> {
    if json {
        let doc = serde_json::to_string_pretty(rows).context("serializing rows")?;
        println!("{}", doc);
    } else {
        println!("{}", Table::new(rows));
    }
    Ok(())
}
