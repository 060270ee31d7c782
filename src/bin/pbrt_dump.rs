//! pbrt-dump - inspect a parsed PBRT scene description file.
//!
//! Similar in spirit to `pbrt --parseonly`: load a scene, report what the
//! dispatcher built, and surface the first parse error (with file/line/
//! column) if the file is malformed.

use clap::{Parser, Subcommand};
use colored::*;
use pbrt_scene::scene::Scene;
use pbrt_scene::tokenizer::cursor_location;
use pbrt_scene::{Loader, LoaderConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pbrt-dump")]
#[command(about = "Inspect a PBRT-v3 scene description file", long_about = None)]
#[command(version)]
struct Cli {
    /// Scene file to load
    #[arg(value_name = "FILE")]
    file: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show scene summary (default)
    Info,

    /// List every shape with its material/area-light bindings
    Shapes,

    /// Show the object/instance hierarchy as a tree
    Tree,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let loader = Loader::open(&cli.file, LoaderConfig::default());
    let result = match cli.command {
        Some(Commands::Shapes) => show_shapes(loader.borrow_scene()),
        Some(Commands::Tree) => show_tree(loader.borrow_scene()),
        Some(Commands::Info) | None => show_info(loader.borrow_scene()),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }

    if let Some(err) = loader.error() {
        let location = cursor_location(&err.record().filename, err.record().offset).ok();
        match location {
            Some(loc) => eprintln!("{} {} (line {}, column {})", "parse error:".red().bold(), err, loc.line, loc.column),
            None => eprintln!("{} {}", "parse error:".red().bold(), err),
        }
        std::process::exit(1);
    }
}

fn show_info(scene: &Scene) -> Result<(), String> {
    println!("{}", "PBRT scene".cyan().bold());
    println!(
        " {} {}   {} {}   {} {}",
        "shapes".cyan(),
        scene.shapes.len().to_string().white(),
        "lights".cyan(),
        scene.lights.len().to_string().white(),
        "materials".cyan(),
        scene.materials.len().to_string().white(),
    );
    println!(
        " {} {}   {} {}   {} {}",
        "textures".cyan(),
        scene.textures.len().to_string().white(),
        "mediums".cyan(),
        scene.mediums.len().to_string().white(),
        "objects".cyan(),
        scene.objects.len().to_string().white(),
    );
    println!(" {} {}", "instances".cyan(), scene.instances.len().to_string().white());
    println!();

    print_directive_field("camera", scene.camera.as_ref().map(|c| c.directive_name.as_str()));
    print_directive_field("film", scene.film.as_ref().map(|f| f.directive_name.as_str()));
    print_directive_field("filter", scene.filter.as_ref().map(|f| f.directive_name.as_str()));
    print_directive_field("integrator", scene.integrator.as_ref().map(|i| i.directive_name.as_str()));
    print_directive_field("sampler", scene.sampler.as_ref().map(|s| s.directive_name.as_str()));
    print_directive_field("accelerator", scene.accelerator.as_ref().map(|a| a.directive_name.as_str()));

    if let Some((open, close)) = scene.shutter {
        println!(" {} {} .. {}", "shutter".cyan(), open, close);
    }

    Ok(())
}

fn print_directive_field(label: &str, name: Option<&str>) {
    match name {
        Some(n) => println!(" {} {}", label.cyan(), n.white()),
        None => println!(" {} {}", label.cyan(), "(unset)".truecolor(128, 128, 128)),
    }
}

fn show_shapes(scene: &Scene) -> Result<(), String> {
    if scene.shapes.is_empty() {
        println!("(no shapes)");
        return Ok(());
    }
    for (i, shape) in scene.shapes.iter().enumerate() {
        let material = if shape.material == pbrt_scene::scene::INVALID_INDEX {
            "none".to_string()
        } else {
            shape.material.to_string()
        };
        let area_light = if shape.area_light == pbrt_scene::scene::INVALID_INDEX {
            "none".to_string()
        } else {
            shape.area_light.to_string()
        };
        let triangulated = match &shape.triangulated_indices {
            Some(v) => format!("{} tris", v.len() / 3),
            None => "not triangulated".to_string(),
        };
        println!(
            "{:>4}  {:<16} material={:<6} area_light={:<6} {}",
            i,
            shape.directive_name.bold(),
            material,
            area_light,
            triangulated.truecolor(128, 128, 128),
        );
    }
    Ok(())
}

fn show_tree(scene: &Scene) -> Result<(), String> {
    println!("{}", "Object hierarchy".cyan().bold());
    if scene.objects.is_empty() {
        println!("(no named objects; every shape is a top-level instance)");
    }
    for (i, obj) in scene.objects.iter().enumerate() {
        let is_last = i == scene.objects.len() - 1;
        let connector = if is_last { "└──" } else { "├──" };
        println!(
            "{} {} ({} shapes starting at {})",
            connector,
            obj.name.bold(),
            obj.num_shapes,
            obj.first_shape
        );
    }
    println!();
    println!("{}", "Instances".cyan().bold());
    for (i, inst) in scene.instances.iter().enumerate() {
        let object_name = scene
            .objects
            .get(inst.object_index as usize)
            .map(|o| o.name.as_str())
            .unwrap_or("?");
        println!(" {:>4}  -> {}", i, object_name);
    }
    Ok(())
}
