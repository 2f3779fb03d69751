//! cwxml CLI - inspect, check and re-serialise CodeWalker XML files
//!
//! The file kind is picked from the extension: `.ybn.xml` for bounds,
//! `.yft.xml` for fragments.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use cwxml::{
    has_extension, BoundComposite, BoundFile, BoundItem, Document, Fragment, ReadOptions,
    WriteOptions, XmlFile, Ybn, Yft,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "cwxml")]
#[command(about = "CodeWalker bounds and fragment XML tool", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Fail the load on the first damaged value instead of reporting it
    #[arg(long, global = true)]
    strict: bool,

    /// Spaces per indentation level when writing
    #[arg(long, global = true, default_value_t = 1)]
    indent: usize,

    /// Omit the XML declaration when writing
    #[arg(long, global = true)]
    no_declaration: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a structural summary of a file
    Info {
        /// Path to a .ybn.xml or .yft.xml file
        file: PathBuf,
    },
    /// Report damaged values and unresolved index links
    Check {
        /// Path to a .ybn.xml or .yft.xml file
        file: PathBuf,
    },
    /// Load a file and write it back out
    Roundtrip {
        /// Input file
        input: PathBuf,
        /// Output file
        output: PathBuf,
    },
}

/// A loaded document of either kind.
enum Loaded {
    Bounds(Document<BoundFile>),
    Fragment(Document<Fragment>),
}

impl Loaded {
    fn read_errors(&self) -> &[cwxml::ReadValueError] {
        match self {
            Loaded::Bounds(doc) => &doc.errors,
            Loaded::Fragment(doc) => &doc.errors,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let read_options = if cli.strict {
        ReadOptions::strict()
    } else {
        ReadOptions::lenient()
    };
    let write_options = WriteOptions {
        indent: cli.indent,
        declaration: !cli.no_declaration,
    };

    match cli.command {
        Commands::Info { file } => {
            let loaded = load(&file, &read_options)?;
            show_info(&loaded);
        }
        Commands::Check { file } => {
            let loaded = load(&file, &read_options)?;
            check(&file, &loaded)?;
        }
        Commands::Roundtrip { input, output } => {
            let loaded = load(&input, &read_options)?;
            match &loaded {
                Loaded::Bounds(doc) => doc.root.write_xml_with(&output, &write_options)?,
                Loaded::Fragment(doc) => doc.root.write_xml_with(&output, &write_options)?,
            }
            info!(
                input = %input.display(),
                output = %output.display(),
                read_errors = loaded.read_errors().len(),
                "round trip written"
            );
        }
    }

    Ok(())
}

fn load(path: &Path, options: &ReadOptions) -> Result<Loaded> {
    if has_extension(path, Ybn::FILE_EXTENSION) {
        Ok(Loaded::Bounds(BoundFile::from_xml_file_with(path, options)?))
    } else if has_extension(path, Yft::FILE_EXTENSION) {
        Ok(Loaded::Fragment(Fragment::from_xml_file_with(path, options)?))
    } else {
        bail!(
            "Unknown file kind: {} (expected {} or {})",
            path.display(),
            Ybn::FILE_EXTENSION,
            Yft::FILE_EXTENSION
        )
    }
}

fn show_info(loaded: &Loaded) {
    match loaded {
        Loaded::Bounds(doc) => {
            println!("Bounds file");
            print_composite(&doc.root.composite, 1);
        }
        Loaded::Fragment(doc) => {
            let fragment = &doc.root;
            println!("Fragment: {}", fragment.name);
            println!("  Bone transforms: {}", fragment.bone_transforms.transforms.len());
            println!("  Glass windows: {}", fragment.vehicle_glass_windows.len());
            for (tag, lod) in fragment.lods() {
                println!(
                    "  {tag}: mass {}, {} groups, {} children",
                    lod.archetype.mass,
                    lod.groups.len(),
                    lod.children.len()
                );
                match lod.group_forest() {
                    Ok(forest) => {
                        for (group, depth) in forest.walk() {
                            let indent = "  ".repeat(depth + 2);
                            println!("{indent}[{group}] {}", lod.groups[group].name);
                        }
                    }
                    Err(err) => println!("    groups unresolved: {err}"),
                }
                println!("    Archetype bounds:");
                print_composite(&lod.archetype.bounds, 3);
            }
        }
    }

    let errors = loaded.read_errors().len();
    if errors > 0 {
        println!("{errors} damaged value(s); run `cwxml check` for details");
    }
}

fn print_composite(composite: &BoundComposite, depth: usize) {
    let indent = "  ".repeat(depth);
    let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
    for child in &composite.children {
        *kinds.entry(child.type_name()).or_default() += 1;
    }
    println!("{indent}Composite with {} children", composite.children.len());
    for (kind, count) in kinds {
        println!("{indent}  {kind}: {count}");
    }

    for (i, child) in composite.children.iter().enumerate() {
        if let Some(geometry) = child.geometry() {
            println!(
                "{indent}  [{i}] {}: {} vertices, {} polygons, {} materials",
                child.type_name(),
                geometry.vertices.len(),
                geometry.polygons.len(),
                geometry.materials.len()
            );
        }
        if let BoundItem::Composite(nested) = child {
            print_composite(nested, depth + 2);
        }
    }
}

fn check(path: &Path, loaded: &Loaded) -> Result<()> {
    for error in loaded.read_errors() {
        println!("{error}");
    }

    let integrity = match loaded {
        Loaded::Bounds(doc) => doc.root.composite.validate(),
        Loaded::Fragment(doc) => doc.root.validate(),
    };
    for error in &integrity {
        println!("{error}");
    }

    let problems = loaded.read_errors().len() + integrity.len();
    if problems > 0 {
        bail!("{}: {problems} problem(s) found", path.display());
    }
    println!("{}: ok", path.display());
    Ok(())
}
