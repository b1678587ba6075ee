//! Dump the physics descriptors of a USDA file.
//!
//! Usage: uphys_dump <file.usda> [--tokens <tokens.json>] [--owner <path>]...
//!                   [--exclude <path>]... [--json]

use std::env;
use std::fs;

use anyhow::{bail, Context, Result};
use uphys_parse::{
    parse_physics, CustomTokens, Descriptors, ObjectType, ParseOptions, PhysicsReport,
    SimulationOwnerFilter,
};
use uphys_stage::{load_usda, ExcludeListPrimRange, PrimPath};

const USAGE: &str = "Usage: uphys_dump <file.usda> [--tokens <tokens.json>] [--owner <path>]... [--exclude <path>]... [--json]";

struct Args {
    input: String,
    tokens: Option<String>,
    /// `None` entries come from `--owner ""`
    owners: Vec<Option<PrimPath>>,
    excludes: Vec<PrimPath>,
    json: bool,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut input = None;
        let mut tokens = None;
        let mut owners = Vec::new();
        let mut excludes = Vec::new();
        let mut json = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--json" => json = true,
                "--tokens" => tokens = Some(args.next().context("--tokens needs a file")?),
                "--owner" => {
                    let owner = args.next().context("--owner needs a prim path")?;
                    owners.push(if owner.is_empty() {
                        None
                    } else {
                        Some(PrimPath::new(&owner)?)
                    });
                }
                "--exclude" => {
                    let path = args.next().context("--exclude needs a prim path")?;
                    excludes.push(PrimPath::new(&path)?);
                }
                "-h" | "--help" => bail!("{}", USAGE),
                flag if flag.starts_with("--") => bail!("Unknown option {}\n{}", flag, USAGE),
                _ if input.is_none() => input = Some(arg),
                _ => bail!("Unexpected argument {}\n{}", arg, USAGE),
            }
        }

        Ok(Self {
            input: input.context(USAGE)?,
            tokens,
            owners,
            excludes,
            json,
        })
    }

    fn options(&self) -> Result<ParseOptions> {
        let mut options = ParseOptions::default();
        if let Some(path) = &self.tokens {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read token file {}", path))?;
            let tokens: CustomTokens = serde_json::from_str(&text)
                .with_context(|| format!("Invalid token file {}", path))?;
            options = options.with_custom_tokens(tokens);
        }
        if !self.owners.is_empty() {
            options = options
                .with_simulation_owners(SimulationOwnerFilter::from_entries(self.owners.clone()));
        }
        Ok(options)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse(env::args().skip(1))?;
    let options = args.options()?;

    let stage = load_usda(&args.input)
        .with_context(|| format!("Failed to load {}", args.input))?;
    log::info!("Loaded {}", args.input);

    let mut range = ExcludeListPrimRange::new(&stage, args.excludes.iter().cloned());
    let mut report = PhysicsReport::default();
    parse_physics(&stage, &mut range, &options, |object_type, paths, descriptors| {
        if !args.json {
            print_bucket(object_type, paths, descriptors);
        }
        report.record(object_type, descriptors);
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.is_empty() {
        println!("No physics objects found");
    }
    Ok(())
}

fn print_bucket(object_type: ObjectType, paths: &[PrimPath], descriptors: Descriptors<'_>) {
    println!("=== {:?} ({}) ===", object_type, paths.len());
    match descriptors {
        Descriptors::Scenes(scenes) => {
            for scene in scenes {
                println!(
                    "  {} gravity {:.3} along {}",
                    scene.prim_path, scene.gravity_magnitude, scene.gravity_direction
                );
            }
        }
        Descriptors::Shapes(shapes) => {
            for shape in shapes {
                let owner = shape
                    .rigid_body
                    .as_ref()
                    .map_or("static".to_string(), |body| body.to_string());
                println!(
                    "  {} [{}]{}",
                    shape.prim_path,
                    owner,
                    if shape.is_valid { "" } else { " INVALID" }
                );
            }
        }
        Descriptors::RigidBodies(bodies) => {
            for body in bodies {
                println!(
                    "  {} at {} ({} collisions){}",
                    body.prim_path,
                    body.position,
                    body.collisions.len(),
                    if body.is_dynamic() { "" } else { " static/kinematic" }
                );
            }
        }
        Descriptors::Joints(joints) => {
            for joint in joints {
                let side = |body: &Option<PrimPath>| {
                    body.as_ref().map_or("world".to_string(), |b| b.to_string())
                };
                println!(
                    "  {} {} <-> {}",
                    joint.prim_path,
                    side(&joint.body0),
                    side(&joint.body1)
                );
            }
        }
        Descriptors::Articulations(articulations) => {
            for articulation in articulations {
                let roots: Vec<&str> = articulation.root_prims.iter().map(|p| p.as_str()).collect();
                println!(
                    "  {} roots [{}], {} bodies, {} joints{}",
                    articulation.prim_path,
                    roots.join(", "),
                    articulation.articulated_bodies.len(),
                    articulation.articulated_joints.len(),
                    if articulation.is_valid { "" } else { " INVALID" }
                );
            }
        }
        _ => {
            for path in paths {
                println!("  {}", path);
            }
        }
    }
}
