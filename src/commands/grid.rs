use std::collections::HashMap;
use std::str::FromStr;

use clap::{ArgAction, Args};
use oracle_village::{GridPos, Simulation, TemplateImageSource, Tile, TileType, Viewport};
use serde::Serialize;

use super::{PositionArg, parse_ints, print_json};

#[derive(Args)]
pub struct GridArgs {
    /// Region to print: x0,y0,x1,y1 (end-exclusive, clamped to the grid)
    #[arg(long, value_name = "x0,y0,x1,y1")]
    viewport: Option<ViewportArg>,
    /// Cut one tree: x,y,tree_id
    #[arg(long, value_name = "x,y,tree_id")]
    cut: Option<CutArg>,
    /// Store an externally chosen oracle position: x,y
    #[arg(long, value_name = "x,y")]
    oracle: Option<PositionArg>,
    /// Attach an image to a tile type (repeatable): type=url
    #[arg(long = "image", value_name = "TYPE=URL")]
    images: Vec<ImageArg>,
    /// URL template with a {tile} placeholder, applied to every tile type present
    #[arg(long, value_name = "TEMPLATE")]
    image_template: Option<String>,
    /// Print the environment analysis
    #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
    analysis: bool,
    /// Print the full grid state as JSON
    #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
    json: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct ViewportArg([i32; 4]);

impl FromStr for ViewportArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_ints::<4>(s)
            .map(ViewportArg)
            .map_err(|e| format!("Viewport must be formatted as x0,y0,x1,y1 ({})", e))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CutArg {
    at: GridPos,
    tree_id: u64,
}

impl FromStr for CutArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<_> = s.trim().split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err("Cut must be formatted as x,y,tree_id".into());
        }
        let x = parts[0].parse::<i32>().map_err(|_| "x must be an integer")?;
        let y = parts[1].parse::<i32>().map_err(|_| "y must be an integer")?;
        let tree_id = parts[2]
            .parse::<u64>()
            .map_err(|_| "tree_id must be a non-negative integer")?;
        Ok(CutArg {
            at: GridPos::new(x, y),
            tree_id,
        })
    }
}

#[derive(Clone, Debug)]
pub struct ImageArg {
    tile_type: String,
    url: String,
}

impl FromStr for ImageArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tile_type, url) = s
            .split_once('=')
            .ok_or_else(|| "Image must be formatted as type=url".to_string())?;
        Ok(ImageArg {
            tile_type: tile_type.trim().to_string(),
            url: url.trim().to_string(),
        })
    }
}

#[derive(Serialize)]
struct CutOutcome {
    position: GridPos,
    tree_id: u64,
    wood: u32,
}

pub(super) fn run_grid(args: GridArgs, sim: &mut Simulation) -> Result<(), String> {
    if let Some(PositionArg(pos)) = args.oracle {
        sim.grid_mut()
            .set_oracle_position(pos)
            .map_err(|e| e.to_string())?;
    }

    if !args.images.is_empty() {
        let images: HashMap<String, String> = args
            .images
            .iter()
            .map(|img| (img.tile_type.clone(), img.url.clone()))
            .collect();
        let updated = sim.grid_mut().apply_tile_images(&images);
        if !args.json {
            println!("Applied images to {} tiles", updated);
        }
    }
    if let Some(template) = &args.image_template {
        let updated = sim
            .grid_mut()
            .assign_tile_images(&TemplateImageSource::new(template.clone()));
        if !args.json {
            println!("Generated images for {} tiles", updated);
        }
    }

    let cut = match args.cut {
        Some(CutArg { at, tree_id }) => {
            let wood = sim.cut_tree(at, tree_id).map_err(|e| e.to_string())?;
            Some(CutOutcome {
                position: at,
                tree_id,
                wood,
            })
        }
        None => None,
    };

    if args.json {
        let grid = sim.grid();
        return match args.viewport {
            Some(ViewportArg([x0, y0, x1, y1])) => print_json(&grid.viewport(x0, y0, x1, y1)),
            None if args.analysis => print_json(&grid.analysis()),
            None => print_json(&grid.state()),
        };
    }

    let grid = sim.grid();
    let stats = grid.stats();
    println!(
        "Grid {}x{} | standing trees={} cut={} | resources {}",
        grid.size(),
        grid.size(),
        stats.total_trees,
        stats.trees_cut,
        grid.resources()
    );
    match grid.oracle_position() {
        Some(pos) => println!("Oracle at {}", pos),
        None => println!("Oracle position not set"),
    }
    if let Some(outcome) = &cut {
        println!(
            "Cut tree {} at {} for {} wood",
            outcome.tree_id, outcome.position, outcome.wood
        );
    }
    if args.analysis {
        match grid.analysis() {
            Some(analysis) => {
                println!("{}", analysis.memory.map_summary);
                for cluster in &analysis.memory.tree_clusters {
                    println!(
                        "  cluster {} at {} ({} trees)",
                        cluster.cluster_id, cluster.center, cluster.size
                    );
                }
            }
            None => println!("No environment analysis available"),
        }
    }
    if let Some(ViewportArg([x0, y0, x1, y1])) = args.viewport {
        print_viewport(&grid.viewport(x0, y0, x1, y1));
    }
    Ok(())
}

fn tile_glyph(tile: &Tile) -> char {
    if tile.has_standing_tree() {
        return 'T';
    }
    match tile.tile_type {
        TileType::Grass => '.',
        TileType::Dirt => ':',
        TileType::Stone => '^',
        TileType::Forest => 'f',
        TileType::Water => '~',
    }
}

fn print_viewport(view: &Viewport) {
    println!(
        "Viewport x {}..{} y {}..{} ({} tiles)",
        view.x0,
        view.x1,
        view.y0,
        view.y1,
        view.tiles.len()
    );
    for y in view.y0..view.y1 {
        let row: String = view
            .tiles
            .iter()
            .filter(|tile| tile.y == y)
            .map(tile_glyph)
            .collect();
        println!("  {:>3} {}", y, row);
    }
}
