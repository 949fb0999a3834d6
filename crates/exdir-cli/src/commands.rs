use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use exdir::{
    EntryKind, File, FileConfig, FileOptions, Group, Node, Object, OpenMode, Selection, UNIT_KEY,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::cli::*;
use crate::render;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let format = cli.format;
    match cli.command {
        Command::Tree(args) => cmd_tree(args, &config, format),
        Command::Show(args) => cmd_show(args, &config, format),
        Command::Attrs(args) => cmd_attrs(args, &config, format),
        Command::Cat(args) => cmd_cat(args, &config, format),
        Command::Init(args) => cmd_init(args, config, format),
    }
}

/// Inspection never writes, whatever mode the configuration names.
fn open_read_only(path: &Path, config: &FileConfig) -> anyhow::Result<File> {
    debug!(path = %path.display(), "opening read-only");
    File::open_with(path, OpenMode::ReadOnly, config.clone().into_options())
        .with_context(|| format!("cannot open {}", path.display()))
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Kind-specific facts about `path`, without following a final link.
fn summarize(group: &Group, path: &str) -> anyhow::Result<Value> {
    let kind = if path.trim_matches('/').is_empty() {
        EntryKind::Group
    } else {
        group.entry_kind(path)?
    };
    let mut summary = json!({ "name": path, "kind": kind.to_string() });
    match kind {
        EntryKind::Dataset => {
            let dataset = group.dataset(path)?;
            summary["shape"] = json!(dataset.shape()?);
            summary["dtype"] = json!(dataset.dtype()?.name());
            if let Some(unit) = dataset.attrs().get(UNIT_KEY)? {
                summary["unit"] = render::attr(&unit);
            }
        }
        EntryKind::Link => {
            if let Some(link) = group.link(path)? {
                summary["target"] = json!(link.target());
                if let Some(file) = link.file() {
                    summary["file"] = json!(file);
                }
            }
        }
        EntryKind::Missing => bail!("{path}: no such object"),
        _ => {}
    }
    Ok(summary)
}

fn dataset_details(summary: &Value) -> String {
    let shape: Vec<usize> = summary["shape"]
        .as_array()
        .map(|dims| dims.iter().filter_map(Value::as_u64).map(|d| d as usize).collect())
        .unwrap_or_default();
    let mut details = format!(
        "{} {}",
        render::shape(&shape),
        summary["dtype"].as_str().unwrap_or("?")
    );
    if let Some(unit) = summary["unit"].as_str() {
        details.push_str(&format!(" [{unit}]"));
    }
    details
}

fn link_details(summary: &Value) -> String {
    let target = summary["target"].as_str().unwrap_or("?");
    match summary["file"].as_str() {
        Some(file) => format!("-> {file}:{target}"),
        None => format!("-> {target}"),
    }
}

fn tree_line(summary: &Value) -> String {
    let name = summary["name"].as_str().unwrap_or_default();
    let depth = name.matches('/').count().saturating_sub(1);
    let leaf = name.rsplit('/').next().unwrap_or(name);
    let indent = "  ".repeat(depth + 1);
    match summary["kind"].as_str() {
        Some("group") => format!("{indent}{}", format!("{leaf}/").blue().bold()),
        Some("dataset") => format!("{indent}{leaf}  {}", dataset_details(summary).dimmed()),
        Some("link") => format!("{indent}{leaf} {}", link_details(summary).cyan()),
        _ => format!("{indent}{leaf}"),
    }
}

fn cmd_tree(args: TreeArgs, config: &FileConfig, format: OutputFormat) -> anyhow::Result<()> {
    let file = open_read_only(&args.file, config)?;
    let summaries = file
        .descendants()?
        .iter()
        .map(|name| summarize(&file, name))
        .collect::<anyhow::Result<Vec<_>>>()?;

    match format {
        OutputFormat::Json => print_json(&Value::Array(summaries))?,
        OutputFormat::Text => {
            println!("{}", file.file_root().display().to_string().bold());
            for summary in &summaries {
                println!("{}", tree_line(summary));
            }
        }
    }
    file.close()?;
    Ok(())
}

fn cmd_show(args: ShowArgs, config: &FileConfig, format: OutputFormat) -> anyhow::Result<()> {
    let file = open_read_only(&args.file, config)?;
    let mut summary = summarize(&file, &args.object)?;

    // A link is described along with what it resolves to.
    let node = file.get(&args.object);
    if let Ok(node) = &node {
        summary["resolved"] = json!(node.name());
        if let Node::Group(group) = node {
            summary["children"] = json!(group.keys()?);
            let links: Vec<String> = group.links()?.into_iter().map(|(name, _)| name).collect();
            summary["links"] = json!(links);
        }
        if let Some(object) = object_of(node) {
            summary["attributes"] = json!(object.attrs().len()?);
        }
    }

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => {
            let kind = summary["kind"].as_str().unwrap_or_default();
            println!("{} {}", kind.bold(), args.object.yellow());
            match kind {
                "dataset" => println!("  {}", dataset_details(&summary)),
                "link" => {
                    println!("  {}", link_details(&summary).cyan());
                    match &node {
                        Ok(node) => println!("  resolves to {} {}", node.kind(), node.name()),
                        Err(e) => println!("  {} {e}", "dangling:".red()),
                    }
                }
                _ => {}
            }
            for key in ["children", "links"] {
                if let Some(names) = summary[key].as_array().filter(|n| !n.is_empty()) {
                    let names: Vec<&str> = names.iter().filter_map(Value::as_str).collect();
                    println!("  {key}: {}", names.join(", "));
                }
            }
            if let Some(count) = summary["attributes"].as_u64() {
                println!("  attributes: {count}");
            }
        }
    }
    file.close()?;
    Ok(())
}

/// Raw directories carry no records.
fn object_of(node: &Node) -> Option<&Object> {
    match node {
        Node::Group(group) => Some(&**group),
        Node::Dataset(dataset) => Some(&**dataset),
        Node::Raw(_) => None,
    }
}

fn cmd_attrs(args: AttrsArgs, config: &FileConfig, format: OutputFormat) -> anyhow::Result<()> {
    let file = open_read_only(&args.file, config)?;
    let path = args.object.as_deref().unwrap_or("/");
    let node = file.get(path)?;
    let Some(object) = object_of(&node) else {
        bail!("{path} is a raw directory and has no attributes");
    };
    let record = if args.meta { object.meta() } else { object.attrs() };
    let map = record.to_map()?;

    match format {
        OutputFormat::Json => print_json(&render::attr_map(&map))?,
        OutputFormat::Text if map.is_empty() => println!("{}", "(no attributes)".dimmed()),
        OutputFormat::Text => {
            for (key, value) in &map {
                println!("{}: {}", key.cyan(), render::attr(value));
            }
        }
    }
    file.close()?;
    Ok(())
}

fn cmd_cat(args: CatArgs, config: &FileConfig, format: OutputFormat) -> anyhow::Result<()> {
    let file = open_read_only(&args.file, config)?;
    let dataset = file.dataset(&args.dataset)?;
    let value = match args.index {
        Some(index) => dataset.get(&Selection::index(index))?,
        None => dataset.data()?,
    };

    match format {
        OutputFormat::Json => print_json(&json!({
            "shape": value.shape(),
            "dtype": value.dtype().name(),
            "data": render::dataset(&value),
        }))?,
        OutputFormat::Text => {
            println!("{}", render::array(value.array()));
            if let Some(unit) = value.unit() {
                println!("{} {}", "unit:".dimmed(), unit);
            }
            if let Some(uncertainty) = value.uncertainty() {
                println!("{} {}", "uncertainty:".dimmed(), render::array(uncertainty));
            }
        }
    }
    file.close()?;
    Ok(())
}

fn cmd_init(args: InitArgs, config: FileConfig, format: OutputFormat) -> anyhow::Result<()> {
    let (mode, options) = if args.force {
        (OpenMode::Truncate, config.into_options().allow_remove(true))
    } else if config.mode.is_read_only() {
        bail!("cannot create a file in {} mode", config.mode);
    } else {
        (config.mode, config.into_options())
    };
    let file = open_with(&args.file, mode, options)?;
    let root = file.file_root().to_path_buf();
    file.close()?;

    match format {
        OutputFormat::Json => print_json(&json!({ "path": root.display().to_string(), "mode": mode.as_str() }))?,
        OutputFormat::Text => println!(
            "{} Initialized exdir file in {}",
            "✓".green().bold(),
            root.display().to_string().bold()
        ),
    }
    Ok(())
}

fn open_with(path: &Path, mode: OpenMode, options: FileOptions) -> anyhow::Result<File> {
    debug!(path = %path.display(), %mode, "opening");
    File::open_with(path, mode, options).with_context(|| format!("cannot open {}", path.display()))
}
